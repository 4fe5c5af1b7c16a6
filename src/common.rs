//! Shared shipment and rate types used by every carrier adapter.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};

use crate::error::ShippingError;

/// Carriers the rater knows how to quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Carrier {
    Ups,
    Usps,
}

impl fmt::Display for Carrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Carrier::Ups => write!(f, "ups"),
            Carrier::Usps => write!(f, "usps"),
        }
    }
}

/// A postal address. Only `zip_code` is required to quote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: String,
    pub country: Option<String>,
}

impl Location {
    /// Location known only by state and postal code, as the CLI builds them.
    pub fn us(zip_code: impl Into<String>, state: Option<String>) -> Self {
        Self {
            state,
            zip_code: zip_code.into(),
            country: Some("US".to_string()),
            ..Default::default()
        }
    }
}

/// Package weight in pounds and ounces. Ounces are not normalized below 16.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Weight {
    pub pounds: u32,
    pub ounces: u32,
}

impl Weight {
    pub fn new(pounds: u32, ounces: u32) -> Self {
        Self { pounds, ounces }
    }

    pub fn to_ounces(&self) -> u64 {
        u64::from(self.pounds) * 16 + u64::from(self.ounces)
    }

    /// Decimal pounds rounded to two places.
    pub fn to_pounds(&self) -> Decimal {
        (Decimal::from(self.pounds) + Decimal::from(self.ounces) / Decimal::from(16)).round_dp(2)
    }
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} lb {} oz", self.pounds, self.ounces)
    }
}

/// Package dimensions in inches. By convention `length` is the longest side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub length: u32,
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(length: u32, width: u32, height: u32) -> Self {
        Self {
            length,
            width,
            height,
        }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.length, self.width, self.height)
    }
}

impl FromStr for Dimensions {
    type Err = ShippingError;

    /// Parses the compact `LxWxH` form, e.g. `12x8x6`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .split('x')
            .map(|p| p.trim().parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ShippingError::Format(format!("invalid dimensions '{s}': {e}")))?;

        match parts.as_slice() {
            [length, width, height] => Ok(Self::new(*length, *width, *height)),
            _ => Err(ShippingError::Format(format!(
                "invalid dimensions '{s}': expected LxWxH, got {} segments",
                parts.len()
            ))),
        }
    }
}

/// Everything a carrier needs to quote one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateRequest {
    pub origination: Location,
    pub destination: Location,
    pub weight: Weight,
    pub dimensions: Dimensions,
    pub ship_date: NaiveDate,
}

/// A normalized quote.
///
/// `arrival` is `None` when the carrier gave no estimate and Ground
/// inference was skipped or failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rate {
    pub price: Decimal,
    pub service: String,
    #[serde(serialize_with = "serialize_arrival")]
    pub arrival: Option<NaiveDate>,
}

impl Rate {
    pub fn new(price: Decimal, service: impl Into<String>, arrival: Option<NaiveDate>) -> Self {
        Self {
            price,
            service: service.into(),
            arrival,
        }
    }
}

fn serialize_arrival<S: Serializer>(date: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
    match date {
        Some(d) => s.serialize_str(&d.format("%Y-%m-%d").to_string()),
        None => s.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_dimensions_round_trip() {
        let dims: Dimensions = "12x8x6".parse().unwrap();
        assert_eq!(dims, Dimensions::new(12, 8, 6));
        assert_eq!(dims.to_string(), "12x8x6");
    }

    #[test]
    fn test_dimensions_keeps_given_order() {
        let dims: Dimensions = "4x10x2".parse().unwrap();
        assert_eq!(dims.length, 4);
        assert_eq!(dims.to_string(), "4x10x2");
    }

    #[test]
    fn test_dimensions_rejects_bad_input() {
        for bad in ["12x8", "12x8x6x1", "axbxc", "", "12x-1x6"] {
            let err = bad.parse::<Dimensions>().unwrap_err();
            assert!(matches!(err, ShippingError::Format(_)), "{bad}");
        }
    }

    #[test]
    fn test_weight_to_ounces() {
        assert_eq!(Weight::new(2, 3).to_ounces(), 35);
        assert_eq!(Weight::new(0, 20).to_ounces(), 20);
        assert_eq!(Weight::new(0, 0).to_ounces(), 0);
        assert_eq!(
            Weight::new(u32::MAX, u32::MAX).to_ounces(),
            u64::from(u32::MAX) * 17
        );
    }

    #[test]
    fn test_weight_to_pounds() {
        assert_eq!(Weight::new(1, 8).to_pounds(), dec!(1.5));
        assert_eq!(Weight::new(0, 5).to_pounds(), dec!(0.31));
    }

    #[test]
    fn test_weight_display() {
        assert_eq!(Weight::new(2, 3).to_string(), "2 lb 3 oz");
    }

    #[test]
    fn test_rate_serializes_arrival_as_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        let rate = Rate::new(dec!(10.50), "03", Some(date));
        let json = serde_json::to_value(&rate).unwrap();
        assert_eq!(json["arrival"], "2024-03-07");
        assert_eq!(json["service"], "03");

        let none = Rate::new(dec!(1), "x", None);
        let json = serde_json::to_value(&none).unwrap();
        assert!(json["arrival"].is_null());
    }
}
