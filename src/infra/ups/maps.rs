//! Downloads UPS printable Ground transit maps and records them in the map index.

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use scraper::{Html, Selector};
use tracing::{Instrument, error, info};

use crate::error::{Result, ShippingError};
use crate::fetch::{HttpClient, fetch_bytes};
use crate::ground::MapStore;

pub const UPS_WEB_URL: &str = "https://www.ups.com";

/// URL of the printable transit map page for an origin zip on `date`.
pub fn map_page_url(base_url: &str, zip_code: &str, date: NaiveDate) -> String {
    format!(
        "{base_url}/maps/printerfriendly?loc=en_US&usmDateCalendar={}&stype=O&zip={zip_code}",
        date.format("%m%d%Y")
    )
}

/// The `src` of `<img id="imgMap">` in the map page.
pub fn find_map_image(html: &str) -> Result<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("img#imgMap")
        .map_err(|e| ShippingError::InvalidResponse(format!("bad selector: {e}")))?;

    document
        .select(&selector)
        .find_map(|img| img.value().attr("src"))
        .map(|src| src.trim().to_string())
        .filter(|src| !src.is_empty())
        .ok_or_else(|| {
            let found = Selector::parse("img")
                .map(|all| document.select(&all).count())
                .unwrap_or(0);
            ShippingError::InvalidResponse(format!(
                "could not find map image among {found} <img> tags"
            ))
        })
}

/// Last path segment of the image `src`, without any query string.
fn file_name_for(src: &str) -> Result<String> {
    src.split(['?', '#'])
        .next()
        .and_then(|path| path.rsplit('/').next())
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .map(str::to_string)
        .ok_or_else(|| ShippingError::InvalidResponse(format!("map image src '{src}' has no file name")))
}

/// Fetches the map for `zip_code` into `map_dir` and returns its file name.
///
/// Does not touch the map index.
#[tracing::instrument(skip(http, map_dir), fields(map_dir = %map_dir.display()))]
pub async fn download_map<C: HttpClient + ?Sized>(
    http: &C,
    base_url: &str,
    zip_code: &str,
    date: NaiveDate,
    map_dir: &Path,
) -> Result<String> {
    let page = fetch_bytes(http, &map_page_url(base_url, zip_code, date)).await?;
    let src = find_map_image(&String::from_utf8_lossy(&page))?;
    let file_name = file_name_for(&src)?;

    let image_url = if src.starts_with("http") {
        src.clone()
    } else {
        format!("{base_url}{src}")
    };
    let image = fetch_bytes(http, &image_url).await?;

    tokio::fs::create_dir_all(map_dir).await?;
    tokio::fs::write(map_dir.join(&file_name), &image).await?;
    info!(file_name, bytes = image.len(), "Map downloaded");
    Ok(file_name)
}

/// Downloads maps for every zip concurrently and appends each success to the
/// map index in `map_dir`. Returns the number of maps indexed.
///
/// A zip whose download or index append fails is logged and skipped; every
/// task is awaited before returning.
pub async fn download_maps<C: HttpClient + 'static>(
    http: Arc<C>,
    base_url: &str,
    zip_codes: &[String],
    date: NaiveDate,
    map_dir: &Path,
    concurrency: usize,
) -> Result<usize> {
    let store = MapStore::new(map_dir);
    let semaphore = Arc::new(tokio::sync::Semaphore::new(concurrency.max(1)));
    let mut tasks = vec![];

    for zip_code in zip_codes {
        let sem = semaphore.clone();
        let http = http.clone();
        let base_url = base_url.to_string();
        let zip_code = zip_code.trim().to_string();
        let map_dir = map_dir.to_path_buf();
        let span = tracing::info_span!("map_download", zip_code = %zip_code);

        tasks.push(tokio::spawn(
            async move {
                let _permit = sem.acquire().await;
                let result =
                    download_map(http.as_ref(), &base_url, &zip_code, date, &map_dir).await;
                (zip_code, result)
            }
            .instrument(span),
        ));
    }

    // Index rows are written here, one at a time, in spawn order.
    let mut indexed = 0;
    for task in tasks {
        match task.await {
            Ok((zip_code, Ok(file_name))) => match store.append(&zip_code, &file_name) {
                Ok(()) => indexed += 1,
                Err(e) => {
                    error!(zip_code, file_name, error = %e, "Map index append failed");
                }
            },
            Ok((zip_code, Err(e))) => {
                error!(zip_code, error = %e, "Map download failed");
            }
            Err(e) => {
                error!(error = %e, "Map download task panicked");
            }
        }
    }

    info!(indexed, requested = zip_codes.len(), "Map downloads finished");
    Ok(indexed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::stub::StubClient;

    const PAGE: &str = r#"<html><body>
        <img src="/img/logo.png">
        <img id="imgMap" src="/maps/ground/map_10001_03042024.gif" alt="map">
    </body></html>"#;

    #[test]
    fn test_map_page_url() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        assert_eq!(
            map_page_url(UPS_WEB_URL, "10001", date),
            "https://www.ups.com/maps/printerfriendly?loc=en_US&usmDateCalendar=03042024&stype=O&zip=10001"
        );
    }

    #[test]
    fn test_find_map_image() {
        assert_eq!(find_map_image(PAGE).unwrap(), "/maps/ground/map_10001_03042024.gif");
    }

    #[test]
    fn test_find_map_image_missing() {
        let err = find_map_image("<html><img src='/a.png'></html>").unwrap_err();
        assert!(err.to_string().contains("1 <img>"));
    }

    #[test]
    fn test_file_name_for() {
        assert_eq!(file_name_for("/maps/a/b.gif?v=2").unwrap(), "b.gif");
        assert!(file_name_for("/maps/").is_err());
    }

    #[tokio::test]
    async fn test_download_maps_indexes_successes() {
        let dir = std::env::temp_dir().join("parcel_rater_test_download_maps");
        let _ = std::fs::remove_dir_all(&dir);
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();

        // Single worker so responses are consumed in order: page, image, failed page.
        let http = Arc::new(StubClient::new(vec![
            (200, PAGE),
            (200, "GIF89a"),
            (500, "down"),
        ]));
        let zips = vec!["10001".to_string(), "60601".to_string()];
        let indexed = download_maps(http, "https://ups.test", &zips, date, &dir, 1)
            .await
            .unwrap();

        assert_eq!(indexed, 1);
        let store = MapStore::new(&dir);
        assert_eq!(store.lookup("10001").unwrap(), "map_10001_03042024.gif");
        assert!(store.lookup("60601").is_err());
        assert!(dir.join("map_10001_03042024.gif").exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_download_maps_continues_after_index_failure() {
        let dir = std::env::temp_dir().join("parcel_rater_test_download_maps_unindexed");
        let _ = std::fs::remove_dir_all(&dir);
        // A directory where the index file should be makes every append fail.
        std::fs::create_dir_all(MapStore::new(&dir).index_path()).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();

        let http = Arc::new(StubClient::new(vec![
            (200, PAGE),
            (200, "GIF89a"),
            (200, PAGE),
            (200, "GIF89a"),
            (200, PAGE),
            (200, "GIF89a"),
        ]));
        let zips = vec!["10001".to_string(), "60601".to_string(), "94103".to_string()];
        let indexed = download_maps(http.clone(), "https://ups.test", &zips, date, &dir, 1)
            .await
            .unwrap();

        assert_eq!(indexed, 0);
        // All three downloads ran to completion.
        assert_eq!(http.requests.lock().unwrap().len(), 6);
        assert!(dir.join("map_10001_03042024.gif").exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
