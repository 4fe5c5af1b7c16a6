use chrono::NaiveDate;
use image::{Rgb, RgbImage};
use parcel_rater::common::{Carrier, Dimensions, Location, RateRequest, Weight};
use parcel_rater::ground::{GroundTransit, MapStore};
use parcel_rater::rates::{CarrierResponse, RawQuote, TransitEstimate, best_rate, normalize};
use rust_decimal_macros::dec;
use std::env;
use std::fs;
use std::path::PathBuf;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Writes a white 640x400 map with `state`'s region filled with `color` and
/// indexes it for `origin_zip`.
fn map_dir_with(name: &str, origin_zip: &str, state: &str, color: [u8; 3]) -> PathBuf {
    let dir = env::temp_dir().join(name);
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();

    let engine = GroundTransit::bundled().unwrap();
    let region = engine.geometry().region_for(state).unwrap();

    let mut img = RgbImage::from_pixel(640, 400, Rgb([255, 255, 255]));
    for x in region.x..region.x + region.width {
        for y in region.y..region.y + region.height {
            img.put_pixel(x, y, Rgb(color));
        }
    }
    // A black border line inside the region should not change the result.
    for x in region.x..region.x + region.width {
        img.put_pixel(x, region.y, Rgb([0, 0, 0]));
    }
    img.save(dir.join("map_10001.png")).unwrap();

    MapStore::new(&dir).append(origin_zip, "map_10001.png").unwrap();
    dir
}

fn request() -> RateRequest {
    RateRequest {
        origination: Location::us("10001", None),
        destination: Location::us("94103", Some("CA".into())),
        weight: Weight::new(0, 12),
        dimensions: Dimensions::new(12, 8, 6),
        // Monday
        ship_date: date(2024, 3, 4),
    }
}

#[test]
fn test_full_pipeline() {
    // Five-day purple from the bundled legend.
    let dir = map_dir_with("parcel_rater_it_pipeline", "10001", "CA", [176, 109, 173]);
    let engine = GroundTransit::bundled().unwrap();
    let request = request();

    let ups = CarrierResponse {
        carrier: Carrier::Ups,
        quotes: vec![
            RawQuote {
                service: "03".into(),
                price: dec!(14.27),
                transit: TransitEstimate::None,
            },
            RawQuote {
                service: "02".into(),
                price: dec!(38.90),
                transit: TransitEstimate::BusinessDays(2),
            },
        ],
    };
    let usps = CarrierResponse {
        carrier: Carrier::Usps,
        quotes: vec![RawQuote {
            service: "Priority Mail 2-Day".into(),
            price: dec!(16.10),
            transit: TransitEstimate::CommitDate(date(2024, 3, 6)),
        }],
    };

    let mut rates = normalize(&ups, &request, &engine, &dir, false);
    rates.extend(normalize(&usps, &request, &engine, &dir, false));

    assert_eq!(rates[0].arrival, Some(date(2024, 3, 9)));
    assert_eq!(rates[1].arrival, Some(date(2024, 3, 6)));
    assert_eq!(rates[2].arrival, Some(date(2024, 3, 6)));

    // Ground is cheapest but arrives too late for a Friday deadline.
    let best = best_rate(&rates, date(2024, 3, 8)).unwrap();
    assert_eq!(best.service, "Priority Mail 2-Day");
    assert_eq!(best.price, dec!(16.10));

    let best = best_rate(&rates, date(2024, 3, 9)).unwrap();
    assert_eq!(best.service, "03");

    assert!(best_rate(&rates, date(2024, 3, 5)).is_err());

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_pipeline_without_map_keeps_carrier_estimate() {
    let dir = env::temp_dir().join("parcel_rater_it_no_map");
    let _ = fs::remove_dir_all(&dir);
    let engine = GroundTransit::bundled().unwrap();

    let ups = CarrierResponse {
        carrier: Carrier::Ups,
        quotes: vec![RawQuote {
            service: "03".into(),
            price: dec!(14.27),
            transit: TransitEstimate::None,
        }],
    };

    let rates = normalize(&ups, &request(), &engine, &dir, false);
    assert_eq!(rates.len(), 1);
    assert_eq!(rates[0].arrival, None);
    assert!(best_rate(&rates, date(2024, 12, 31)).is_err());
}
