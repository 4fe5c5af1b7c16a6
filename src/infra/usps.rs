//! USPS Web Tools RateV4 API and the postcalc zone lookup.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::NaiveDate;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use reqwest::header::{HeaderName, HeaderValue};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, info};

use crate::common::{Carrier, RateRequest};
use crate::config::UspsCredentials;
use crate::error::{Result, ShippingError};
use crate::fetch::{HttpClient, execute_checked};
use crate::rates::{CarrierResponse, RawQuote, TransitEstimate};
use crate::services::CarrierApi;

pub const USPS_API_URL: &str = "https://secure.shippingapis.com/ShippingAPI.dll";
pub const USPS_POSTCALC_URL: &str = "https://postcalc.usps.com";

/// RateV4 request document for all services.
pub fn rate_request_xml(credentials: &UspsCredentials, request: &RateRequest) -> String {
    let dims = &request.dimensions;
    format!(
        r#"<RateV4Request USERID="{user}" PASSWORD="{password}">
    <Revision>2</Revision>
    <Package ID="1ST">
        <Service>ALL</Service>
        <ZipOrigination>{from}</ZipOrigination>
        <ZipDestination>{to}</ZipDestination>
        <Pounds>{pounds}</Pounds>
        <Ounces>{ounces}</Ounces>
        <Container>VARIABLE</Container>
        <Width>{width}</Width>
        <Length>{length}</Length>
        <Height>{height}</Height>
        <Machinable>False</Machinable>
        <DropOffTime></DropOffTime>
        <ShipDate>{ship_date}</ShipDate>
        <SortationLevel></SortationLevel>
        <DestinationEntryFacilityType></DestinationEntryFacilityType>
        <ReturnFees>true</ReturnFees>
    </Package>
</RateV4Request>"#,
        user = escape(credentials.user_id.as_str()),
        password = escape(credentials.password.as_str()),
        from = escape(request.origination.zip_code.as_str()),
        to = escape(request.destination.zip_code.as_str()),
        pounds = request.weight.pounds,
        ounces = request.weight.ounces,
        width = dims.width,
        length = dims.length,
        height = dims.height,
        ship_date = request.ship_date.format("%Y-%m-%d"),
    )
}

#[derive(Debug, Deserialize)]
struct RateV4Response {
    #[serde(rename = "Package")]
    package: Package,
}

#[derive(Debug, Deserialize)]
struct Package {
    #[serde(rename = "Postage", default)]
    postage: Vec<Postage>,
    #[serde(rename = "Error")]
    error: Option<UspsError>,
}

#[derive(Debug, Deserialize)]
struct Postage {
    #[serde(rename = "MailService")]
    mail_service: String,
    #[serde(rename = "Rate")]
    rate: String,
    #[serde(rename = "CommitmentDate", default)]
    commitment_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UspsError {
    #[serde(rename = "Description", default)]
    description: String,
}

/// Strips the escaped trademark markup USPS embeds in service names.
///
/// `Priority Mail Express 2-Day&lt;sup&gt;&#8482;&lt;/sup&gt; Hold For Pickup`
/// becomes `Priority Mail Express 2-Day Hold For Pickup`.
pub fn clean_mail_service(name: &str) -> String {
    if !name.contains(';') {
        return name.to_string();
    }
    let head = name.split('&').next().unwrap_or_default();
    let tail = name.rsplit(';').next().unwrap_or_default();
    format!("{head}{tail}")
}

impl TryFrom<Postage> for RawQuote {
    type Error = ShippingError;

    fn try_from(postage: Postage) -> Result<Self> {
        let service = clean_mail_service(&postage.mail_service);
        let price = Decimal::from_str(postage.rate.trim()).map_err(|e| {
            ShippingError::InvalidResponse(format!(
                "USPS service {service}: bad Rate '{}': {e}",
                postage.rate
            ))
        })?;
        let transit = match postage.commitment_date.as_deref().map(str::trim) {
            Some(date) if !date.is_empty() => {
                let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|e| {
                    ShippingError::InvalidResponse(format!(
                        "USPS service {service}: bad CommitmentDate '{date}': {e}"
                    ))
                })?;
                TransitEstimate::CommitDate(date)
            }
            _ => TransitEstimate::None,
        };

        Ok(RawQuote {
            service,
            price,
            transit,
        })
    }
}

/// Name of the document element, skipping the declaration.
fn root_element(xml: &str) -> Option<String> {
    let mut reader = quick_xml::Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Some(String::from_utf8_lossy(e.name().as_ref()).into_owned());
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

/// Parses a RateV4 response. USPS reports errors with status 200, so an
/// `<Error>` document or package error becomes [`ShippingError::Upstream`].
pub fn parse_rate_response(xml: &str) -> Result<Vec<RawQuote>> {
    if root_element(xml).as_deref() == Some("Error") {
        return Err(ShippingError::Upstream {
            status: 200,
            body: xml.to_string(),
        });
    }

    let response: RateV4Response = quick_xml::de::from_str(xml)?;
    if let Some(error) = response.package.error {
        debug!(description = %error.description, "USPS package error");
        return Err(ShippingError::Upstream {
            status: 200,
            body: xml.to_string(),
        });
    }

    response
        .package
        .postage
        .into_iter()
        .map(RawQuote::try_from)
        .collect()
}

/// Zone number from a postcalc `GetZone` reply: the first digit in
/// `ZoneInformation`.
pub fn parse_zone_response(body: &[u8]) -> Result<u8> {
    #[derive(Deserialize)]
    struct ZoneReply {
        #[serde(rename = "ZoneInformation")]
        zone_information: String,
    }

    let reply: ZoneReply = serde_json::from_slice(body)?;
    reply
        .zone_information
        .chars()
        .find_map(|c| c.to_digit(10))
        .map(|d| d as u8)
        .ok_or_else(|| ShippingError::Upstream {
            status: 200,
            body: reply.zone_information.clone(),
        })
}

pub struct UspsClient<C> {
    http: C,
    credentials: UspsCredentials,
    api_url: String,
    postcalc_url: String,
}

impl<C: HttpClient> UspsClient<C> {
    pub fn new(http: C, credentials: UspsCredentials) -> Self {
        Self {
            http,
            credentials,
            api_url: USPS_API_URL.to_string(),
            postcalc_url: USPS_POSTCALC_URL.to_string(),
        }
    }

    pub fn with_urls(mut self, api_url: impl Into<String>, postcalc_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self.postcalc_url = postcalc_url.into();
        self
    }

    /// Domestic zone between two zips for shipments on `date`.
    #[tracing::instrument(skip(self))]
    pub async fn zone(&self, origin: &str, destination: &str, date: NaiveDate) -> Result<u8> {
        let shipping_date = date.format("%m/%d/%Y").to_string();
        let url = reqwest::Url::parse_with_params(
            &format!("{}/DomesticZoneChart/GetZone", self.postcalc_url),
            &[
                ("origin", origin),
                ("destination", destination),
                ("shippingDate", shipping_date.as_str()),
            ],
        )?;
        let mut req = reqwest::Request::new(reqwest::Method::GET, url);
        req.headers_mut().insert(
            HeaderName::from_static("x-requested-with"),
            HeaderValue::from_static("XMLHttpRequest"),
        );

        let resp = execute_checked(&self.http, req).await?;
        parse_zone_response(&resp.bytes().await?)
    }

    /// Zones from `origin` to each destination, in order.
    pub async fn zones(&self, origin: &str, destinations: &[String], date: NaiveDate) -> Result<Vec<u8>> {
        let mut zones = Vec::with_capacity(destinations.len());
        for destination in destinations {
            zones.push(self.zone(origin, destination, date).await?);
        }
        Ok(zones)
    }
}

#[async_trait]
impl<C: HttpClient> CarrierApi for UspsClient<C> {
    fn carrier(&self) -> Carrier {
        Carrier::Usps
    }

    #[tracing::instrument(
        skip_all,
        fields(
            from = %request.origination.zip_code,
            to = %request.destination.zip_code,
        )
    )]
    async fn quote(&self, request: &RateRequest) -> Result<CarrierResponse> {
        let xml = rate_request_xml(&self.credentials, request);
        let url =
            reqwest::Url::parse_with_params(&self.api_url, &[("API", "RateV4"), ("XML", xml.as_str())])?;
        let mut req = reqwest::Request::new(reqwest::Method::GET, url);
        req.headers_mut().insert(
            reqwest::header::CONTENT_TYPE,
            HeaderValue::from_static("application/xml"),
        );

        let resp = execute_checked(&self.http, req).await?;
        let body = resp.text().await?;
        let quotes = parse_rate_response(&body)?;
        info!(quotes = quotes.len(), "USPS rates received");

        Ok(CarrierResponse {
            carrier: Carrier::Usps,
            quotes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{Dimensions, Location, Weight};
    use crate::fetch::stub::StubClient;
    use rust_decimal_macros::dec;

    const RESPONSE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<RateV4Response><Package ID="1ST"><ZipOrigination>10001</ZipOrigination><ZipDestination>94103</ZipDestination><Pounds>0</Pounds><Ounces>12</Ounces><Machinable>FALSE</Machinable><Zone>8</Zone>
<Postage CLASSID="1"><MailService>Priority Mail 3-Day&amp;lt;sup&amp;gt;&amp;#8482;&amp;lt;/sup&amp;gt;</MailService><Rate>13.75</Rate><CommitmentDate>2024-03-07</CommitmentDate><CommitmentName>3-Day</CommitmentName></Postage>
<Postage CLASSID="2"><MailService>Priority Mail Express 2-Day&amp;lt;sup&amp;gt;&amp;#8482;&amp;lt;/sup&amp;gt; Hold For Pickup</MailService><Rate>61.00</Rate><CommitmentDate>2024-03-06</CommitmentDate></Postage>
<Postage CLASSID="1058"><MailService>USPS Ground Advantage</MailService><Rate>9.10</Rate></Postage>
</Package></RateV4Response>"#;

    fn credentials() -> UspsCredentials {
        UspsCredentials {
            user_id: "USER".into(),
            password: "PASS".into(),
        }
    }

    fn request() -> RateRequest {
        RateRequest {
            origination: Location::us("10001", None),
            destination: Location::us("94103", None),
            weight: Weight::new(0, 12),
            dimensions: Dimensions::new(12, 8, 6),
            ship_date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
        }
    }

    #[test]
    fn test_clean_mail_service() {
        assert_eq!(
            clean_mail_service("Priority Mail 3-Day&lt;sup&gt;&#8482;&lt;/sup&gt;"),
            "Priority Mail 3-Day"
        );
        assert_eq!(
            clean_mail_service(
                "Priority Mail Express 2-Day&lt;sup&gt;&#8482;&lt;/sup&gt; Hold For Pickup"
            ),
            "Priority Mail Express 2-Day Hold For Pickup"
        );
        assert_eq!(clean_mail_service("Media Mail Parcel"), "Media Mail Parcel");
    }

    #[test]
    fn test_parse_rate_response() {
        let quotes = parse_rate_response(RESPONSE).unwrap();
        assert_eq!(quotes.len(), 3);

        assert_eq!(quotes[0].service, "Priority Mail 3-Day");
        assert_eq!(quotes[0].price, dec!(13.75));
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(quotes[0].transit, TransitEstimate::CommitDate(date));

        assert_eq!(quotes[1].service, "Priority Mail Express 2-Day Hold For Pickup");
        assert_eq!(quotes[2].transit, TransitEstimate::None);
    }

    #[test]
    fn test_parse_error_document() {
        let xml = r#"<?xml version="1.0"?><Error><Number>80040B1A</Number><Description>Authorization failure.</Description></Error>"#;
        let err = parse_rate_response(xml).unwrap_err();
        assert!(matches!(err, ShippingError::Upstream { status: 200, ref body } if body.contains("Authorization")));
    }

    #[test]
    fn test_parse_package_error() {
        let xml = r#"<RateV4Response><Package ID="1ST"><Error><Number>-2147219500</Number><Description>Invalid Zip Code.</Description></Error></Package></RateV4Response>"#;
        assert!(matches!(
            parse_rate_response(xml),
            Err(ShippingError::Upstream { .. })
        ));
    }

    #[test]
    fn test_request_xml_escapes_credentials() {
        let creds = UspsCredentials {
            user_id: "a<b".into(),
            password: "p&q".into(),
        };
        let xml = rate_request_xml(&creds, &request());
        assert!(xml.contains(r#"USERID="a&lt;b""#));
        assert!(xml.contains(r#"PASSWORD="p&amp;q""#));
        assert!(xml.contains("<ShipDate>2024-03-04</ShipDate>"));
        assert!(xml.contains("<Ounces>12</Ounces>"));
    }

    #[test]
    fn test_parse_zone_response() {
        let body = br#"{"ZoneInformation": "The Zone is 8. This is not a Local Zone."}"#;
        assert_eq!(parse_zone_response(body).unwrap(), 8);
        let body = br#"{"ZoneInformation": "Invalid origin."}"#;
        assert!(parse_zone_response(body).is_err());
    }

    #[tokio::test]
    async fn test_quote_sends_xml_query() {
        let client = UspsClient::new(StubClient::new(vec![(200, RESPONSE)]), credentials())
            .with_urls("https://usps.test/ShippingAPI.dll", "https://postcalc.test");

        let response = client.quote(&request()).await.unwrap();
        assert_eq!(response.carrier, Carrier::Usps);
        assert_eq!(response.quotes.len(), 3);

        let sent = client.http.requests.lock().unwrap();
        let pairs: Vec<_> = sent[0].url().query_pairs().collect();
        assert_eq!(pairs[0].1, "RateV4");
        assert!(pairs[1].1.contains("<ZipDestination>94103</ZipDestination>"));
    }

    #[tokio::test]
    async fn test_zones_in_order() {
        let client = UspsClient::new(
            StubClient::new(vec![
                (200, r#"{"ZoneInformation": "The Zone is 5."}"#),
                (200, r#"{"ZoneInformation": "The Zone is 1."}"#),
            ]),
            credentials(),
        )
        .with_urls("https://usps.test/ShippingAPI.dll", "https://postcalc.test");
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();

        let zones = client
            .zones("10001", &["60601".to_string(), "10002".to_string()], date)
            .await
            .unwrap();
        assert_eq!(zones, vec![5, 1]);

        let sent = client.http.requests.lock().unwrap();
        assert!(sent[0].url().as_str().contains("shippingDate=03%2F04%2F2024"));
    }
}
