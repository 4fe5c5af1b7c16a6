//! UPS Rating API (`shoptimeintransit`) request body and response types.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::common::{Location, RateRequest};
use crate::error::{Result, ShippingError};
use crate::rates::{RawQuote, TransitEstimate};

pub const RATING_VERSION: &str = "v2205";
pub const REQUEST_OPTION: &str = "shoptimeintransit";

fn address(location: &Location) -> Value {
    json!({
        "AddressLine": location.street.iter().collect::<Vec<_>>(),
        "City": location.city,
        "StateProvinceCode": location.state,
        "PostalCode": location.zip_code,
        "CountryCode": location.country,
    })
}

/// JSON body for a single-package shop-with-transit-time request.
pub fn rate_request_body(request: &RateRequest) -> Value {
    let dims = &request.dimensions;
    let weight = request.weight.to_pounds().to_string();

    json!({
        "RateRequest": {
            "Request": {"TransactionReference": {"CustomerContext": "CustomerContext"}},
            "Shipment": {
                "Shipper": {"Address": address(&request.origination)},
                "ShipTo": {"Name": "ShipToName", "Address": address(&request.destination)},
                "NumOfPieces": "1",
                "DeliveryTimeInformation": {
                    "PackageBillType": "03",
                    "Pickup": {"Date": request.ship_date.format("%Y%m%d").to_string()},
                },
                "Package": {
                    "PackagingType": {"Code": "00", "Description": "Packaging"},
                    "Dimensions": {
                        "UnitOfMeasurement": {"Code": "IN", "Description": "Inches"},
                        "Length": dims.length.to_string(),
                        "Width": dims.width.to_string(),
                        "Height": dims.height.to_string(),
                    },
                    "PackageWeight": {
                        "UnitOfMeasurement": {"Code": "LBS", "Description": "Pounds"},
                        "Weight": weight,
                    },
                },
                "ShipmentTotalWeight": {
                    "UnitOfMeasurement": {"Code": "LBS", "Description": "Pounds"},
                    "Weight": weight,
                },
            },
        }
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Envelope {
    rate_response: RateResponse,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RateResponse {
    rated_shipment: OneOrMany<RatedShipment>,
}

/// UPS collapses single-element arrays into a bare object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(t) => vec![t],
            OneOrMany::Many(v) => v,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CodeField {
    code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Charges {
    monetary_value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GuaranteedDelivery {
    business_days_in_transit: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RatedShipment {
    service: CodeField,
    total_charges: Charges,
    guaranteed_delivery: Option<GuaranteedDelivery>,
}

impl TryFrom<RatedShipment> for RawQuote {
    type Error = ShippingError;

    fn try_from(shipment: RatedShipment) -> Result<Self> {
        let service = shipment.service.code.trim().to_string();
        let price = Decimal::from_str(shipment.total_charges.monetary_value.trim()).map_err(|e| {
            ShippingError::InvalidResponse(format!(
                "UPS service {service}: bad MonetaryValue '{}': {e}",
                shipment.total_charges.monetary_value
            ))
        })?;
        let transit = match shipment.guaranteed_delivery {
            Some(g) => {
                let days = g.business_days_in_transit.trim().parse::<u32>().map_err(|e| {
                    ShippingError::InvalidResponse(format!(
                        "UPS service {service}: bad BusinessDaysInTransit '{}': {e}",
                        g.business_days_in_transit
                    ))
                })?;
                TransitEstimate::BusinessDays(days)
            }
            None => TransitEstimate::None,
        };

        Ok(RawQuote {
            service,
            price,
            transit,
        })
    }
}

/// Parses a successful rating response into quote lines.
pub fn parse_rate_response(body: &[u8]) -> Result<Vec<RawQuote>> {
    let envelope: Envelope = serde_json::from_slice(body)?;
    envelope
        .rate_response
        .rated_shipment
        .into_vec()
        .into_iter()
        .map(RawQuote::try_from)
        .collect()
}
