//! Output formatting and persistence for quoted rates and zones.
//!
//! Supports JSON on stdout, CSV append for rates, and CSV zone tables.

use anyhow::Result;
use tracing::debug;

use crate::common::{Carrier, Rate};
use csv::WriterBuilder;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// One exported rate row.
#[derive(Debug, Serialize)]
pub struct RateRecord<'a> {
    pub carrier: Carrier,
    pub service: &'a str,
    pub price: Decimal,
    pub arrival: Option<String>,
}

impl<'a> RateRecord<'a> {
    pub fn new(carrier: Carrier, rate: &'a Rate) -> Self {
        Self {
            carrier,
            service: &rate.service,
            price: rate.price,
            arrival: rate.arrival.map(|d| d.format("%Y-%m-%d").to_string()),
        }
    }
}

/// One row of the zone table.
#[derive(Debug, Serialize)]
pub struct ZoneRecord {
    pub from_zip: String,
    pub to_zip: String,
    pub ups_zone: Option<u8>,
    pub usps_zone: u8,
}

/// Logs rates using Rust's debug pretty-print format.
pub fn print_pretty(rates: &[Rate]) {
    debug!("{:#?}", rates);
}

/// Writes `value` to stdout as JSON.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}

/// Appends rates as rows to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_records(path: &str, carrier: Carrier, rates: &[Rate]) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, rows = rates.len(), "Appending CSV records");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    for rate in rates {
        writer.serialize(RateRecord::new(carrier, rate))?;
    }
    writer.flush()?;

    Ok(())
}

/// Writes the zone table as CSV with a header row.
pub fn write_zones<W: Write>(out: W, zones: &[ZoneRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for zone in zones {
        writer.serialize(zone)?;
    }
    writer.flush()?;
    Ok(())
}
