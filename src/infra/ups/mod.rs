//! UPS developer API: OAuth tokens and rating, plus the public Ground maps
//! and zone charts.

pub mod maps;
pub mod rate;
pub mod token;
pub mod zones;

use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};
use tracing::info;

use crate::common::{Carrier, RateRequest};
use crate::error::Result;
use crate::fetch::auth::ApiKey;
use crate::fetch::{HttpClient, execute_checked, json_request};
use crate::rates::CarrierResponse;
use crate::services::CarrierApi;

pub use token::{TokenStore, UpsToken, get_token};

/// Customer integration environment, which the rating calls are made against.
pub const UPS_API_URL: &str = "https://wwwcie.ups.com";

pub struct UpsClient<C> {
    http: ApiKey<C>,
    base_url: String,
}

impl<C: HttpClient> UpsClient<C> {
    /// Client sending `access_token` as a bearer token on every call.
    pub fn new(http: C, access_token: &str) -> Result<Self> {
        Ok(Self {
            http: ApiKey::bearer(http, access_token)?,
            base_url: UPS_API_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl<C: HttpClient> CarrierApi for UpsClient<C> {
    fn carrier(&self) -> Carrier {
        Carrier::Ups
    }

    #[tracing::instrument(
        skip_all,
        fields(
            from = %request.origination.zip_code,
            to = %request.destination.zip_code,
        )
    )]
    async fn quote(&self, request: &RateRequest) -> Result<CarrierResponse> {
        let url = format!(
            "{}/api/rating/{}/{}",
            self.base_url,
            rate::RATING_VERSION,
            rate::REQUEST_OPTION
        );
        let mut req = json_request(
            reqwest::Method::POST,
            &url,
            &rate::rate_request_body(request),
        )?;
        req.headers_mut()
            .insert(HeaderName::from_static("transid"), HeaderValue::from_static("string"));

        let resp = execute_checked(&self.http, req).await?;
        let quotes = rate::parse_rate_response(&resp.bytes().await?)?;
        info!(quotes = quotes.len(), "UPS rates received");

        Ok(CarrierResponse {
            carrier: Carrier::Ups,
            quotes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{Dimensions, Location, Weight};
    use crate::error::ShippingError;
    use crate::fetch::stub::StubClient;
    use chrono::NaiveDate;

    fn request() -> RateRequest {
        RateRequest {
            origination: Location::us("10001", None),
            destination: Location::us("94103", Some("CA".into())),
            weight: Weight::new(0, 12),
            dimensions: Dimensions::new(12, 8, 6),
            ship_date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_quote_posts_to_rating_endpoint() {
        let body = r#"{"RateResponse": {"RatedShipment": [
            {"Service": {"Code": "03"}, "TotalCharges": {"MonetaryValue": "14.27"}}
        ]}}"#;
        let client = UpsClient::new(StubClient::new(vec![(200, body)]), "tok")
            .unwrap()
            .with_base_url("https://ups.test");

        let response = client.quote(&request()).await.unwrap();
        assert_eq!(response.carrier, Carrier::Ups);
        assert_eq!(response.quotes.len(), 1);

        let sent = client.http.inner.requests.lock().unwrap();
        assert_eq!(
            sent[0].url().as_str(),
            "https://ups.test/api/rating/v2205/shoptimeintransit"
        );
        assert_eq!(sent[0].headers()["authorization"], "Bearer tok");
    }

    #[tokio::test]
    async fn test_quote_surfaces_upstream_payload() {
        let payload = r#"{"response":{"errors":[{"code":"111210","message":"bad zip"}]}}"#;
        let client = UpsClient::new(StubClient::new(vec![(400, payload)]), "tok")
            .unwrap()
            .with_base_url("https://ups.test");

        let err = client.quote(&request()).await.unwrap_err();
        match err {
            ShippingError::Upstream { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("111210"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
