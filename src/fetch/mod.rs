mod client;
mod basic;
mod headers;
pub mod auth;

pub use client::HttpClient;
pub use basic::BasicClient;
pub use headers::UserAgent;

use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde::Serialize;
use tracing::debug;

use crate::error::{Result, ShippingError};

/// Executes `req` and turns any non-success status into
/// [`ShippingError::Upstream`] carrying the raw response body.
pub async fn execute_checked<C: HttpClient + ?Sized>(
    client: &C,
    req: reqwest::Request,
) -> Result<reqwest::Response> {
    let method = req.method().clone();
    let url = req.url().clone();
    let resp = client.execute(req).await?;
    let status = resp.status();
    debug!(%method, %url, status = status.as_u16(), "HTTP response");

    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ShippingError::Upstream {
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp)
}

/// A request with a JSON body.
pub fn json_request<T: Serialize + ?Sized>(
    method: reqwest::Method,
    url: &str,
    body: &T,
) -> Result<reqwest::Request> {
    let mut req = reqwest::Request::new(method, url.parse()?);
    req.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    *req.body_mut() = Some(serde_json::to_vec(body)?.into());
    Ok(req)
}

/// A `POST` with an `application/x-www-form-urlencoded` body.
pub fn form_request(url: &str, fields: &[(&str, &str)]) -> Result<reqwest::Request> {
    let body = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(fields)
        .finish();
    let mut req = reqwest::Request::new(reqwest::Method::POST, url.parse()?);
    req.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/x-www-form-urlencoded"),
    );
    *req.body_mut() = Some(body.into());
    Ok(req)
}

pub async fn fetch_bytes<C: HttpClient + ?Sized>(client: &C, url: &str) -> Result<Bytes> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);
    let resp = execute_checked(client, req).await?;
    Ok(resp.bytes().await?)
}


#[cfg(test)]
mod tests {
    use super::stub::StubClient;
    use super::*;

    #[tokio::test]
    async fn test_fetch_bytes_ok() {
        let client = StubClient::new(vec![(200, "hello")]);
        let bytes = fetch_bytes(&client, "https://example.com/a").await.unwrap();
        assert_eq!(&bytes[..], b"hello");
    }

    #[tokio::test]
    async fn test_fetch_bytes_surfaces_upstream_body() {
        let client = StubClient::new(vec![(503, "maintenance")]);
        let err = fetch_bytes(&client, "https://example.com/a").await.unwrap_err();
        assert!(matches!(
            err,
            ShippingError::Upstream { status: 503, ref body } if body == "maintenance"
        ));
    }

    #[test]
    fn test_form_request_encodes_body() {
        let req = form_request("https://example.com/token", &[("grant_type", "client_credentials")])
            .unwrap();
        let body = req.body().and_then(|b| b.as_bytes()).unwrap();
        assert_eq!(body, b"grant_type=client_credentials");
        assert_eq!(
            req.headers()[CONTENT_TYPE],
            "application/x-www-form-urlencoded"
        );
    }

    #[tokio::test]
    async fn test_fetch_bytes_bad_url() {
        let client = StubClient::new(vec![]);
        let err = fetch_bytes(&client, "not a url").await.unwrap_err();
        assert!(matches!(err, ShippingError::Url(_)));
    }
}
