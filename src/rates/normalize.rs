use std::path::Path;

use chrono::{Datelike, Days, NaiveDate, Weekday};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::common::{Carrier, Rate, RateRequest};
use crate::ground::GroundTransit;

/// UPS service code for Ground.
pub const UPS_GROUND: &str = "03";

/// Delivery estimate as a carrier reported it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitEstimate {
    None,
    /// Guaranteed business days after the ship date (UPS).
    BusinessDays(u32),
    /// Committed delivery date (USPS).
    CommitDate(NaiveDate),
}

/// One validated quote line from a carrier adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawQuote {
    pub service: String,
    pub price: Decimal,
    pub transit: TransitEstimate,
}

/// All quote lines from one carrier for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarrierResponse {
    pub carrier: Carrier,
    pub quotes: Vec<RawQuote>,
}

/// `date` plus `days` weekdays. Weekends are skipped; holidays are not.
pub fn add_business_days(date: NaiveDate, days: u32) -> NaiveDate {
    let mut current = date;
    let mut remaining = days;
    while remaining > 0 {
        current = current + Days::new(1);
        if !matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            remaining -= 1;
        }
    }
    current
}

/// Converts every quote in `response` into a [`Rate`].
///
/// UPS Ground arrivals are replaced by the ship date plus the map-derived
/// day count unless `ignore_ground` is set. When that estimate cannot be produced the quote
/// keeps whatever arrival the carrier gave it.
#[tracing::instrument(
    skip_all,
    fields(carrier = %response.carrier, quotes = response.quotes.len(), ignore_ground)
)]
pub fn normalize(
    response: &CarrierResponse,
    request: &RateRequest,
    ground: &GroundTransit,
    map_dir: &Path,
    ignore_ground: bool,
) -> Vec<Rate> {
    response
        .quotes
        .iter()
        .map(|quote| {
            let mut arrival = match quote.transit {
                TransitEstimate::None => None,
                TransitEstimate::BusinessDays(days) => {
                    Some(add_business_days(request.ship_date, days))
                }
                TransitEstimate::CommitDate(date) => Some(date),
            };

            if response.carrier == Carrier::Ups && quote.service == UPS_GROUND && !ignore_ground {
                match ground_arrival(request, ground, map_dir) {
                    Ok(date) => {
                        debug!(service = %quote.service, %date, "Ground arrival from map");
                        arrival = Some(date);
                    }
                    Err(e) => {
                        warn!(error = %e, "Ground inference failed, keeping carrier estimate");
                    }
                }
            }

            Rate::new(quote.price, quote.service.clone(), arrival)
        })
        .collect()
}

fn ground_arrival(
    request: &RateRequest,
    ground: &GroundTransit,
    map_dir: &Path,
) -> Result<NaiveDate, crate::error::InferenceError> {
    let dest_state = request.destination.state.as_deref().unwrap_or_default();
    let days = ground.ground_days(&request.origination.zip_code, dest_state, map_dir)?;
    // Map bands are calendar days, unlike the guaranteed estimates.
    Ok(request.ship_date + Days::new(days.into()))
}
