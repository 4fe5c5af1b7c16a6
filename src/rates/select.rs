use chrono::NaiveDate;
use tracing::debug;

use crate::common::Rate;
use crate::error::{Result, ShippingError};

/// Rates with a known arrival on or before `arrive_by`, in input order.
pub fn valid_rates(rates: &[Rate], arrive_by: NaiveDate) -> Vec<&Rate> {
    rates
        .iter()
        .filter(|r| r.arrival.is_some_and(|a| a <= arrive_by))
        .collect()
}

/// Cheapest rate arriving by `arrive_by`. Equal prices keep input order.
pub fn best_rate(rates: &[Rate], arrive_by: NaiveDate) -> Result<Rate> {
    let valid = valid_rates(rates, arrive_by);
    debug!(total = rates.len(), valid = valid.len(), %arrive_by, "Selecting best rate");

    valid
        .into_iter()
        .min_by_key(|r| r.price)
        .cloned()
        .ok_or(ShippingError::NoValidRate)
}
