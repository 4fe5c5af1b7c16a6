//! UPS Ground zones from the published zone chart workbooks.
//!
//! UPS publishes one workbook per 3-digit origin prefix. Its sheet is named
//! after the prefix, and below a few lines of notes sits a table whose header
//! row holds `Dest. ZIP` and `Ground`. Destination cells are either a single
//! prefix (`100`) or an inclusive range (`004-005`).

use std::collections::HashMap;
use std::io::Cursor;

use calamine::{Data, Range, Reader, open_workbook_auto_from_rs};
use tracing::{debug, warn};

use crate::error::{Result, ShippingError};
use crate::fetch::{HttpClient, fetch_bytes};

const DEST_COLUMN: &str = "Dest. ZIP";
const GROUND_COLUMN: &str = "Ground";

fn zip_prefix(zip_code: &str) -> Result<&str> {
    let zip_code = zip_code.trim();
    zip_code
        .get(..3)
        .filter(|p| p.chars().all(|c| c.is_ascii_digit()))
        .ok_or_else(|| ShippingError::Format(format!("'{zip_code}' is not a US zip code")))
}

/// Zone chart URL for the origin's 3-digit prefix.
pub fn zone_chart_url(base_url: &str, origin_zip: &str) -> Result<String> {
    Ok(format!(
        "{base_url}/media/us/currentrates/zone-csv/{}.xls",
        zip_prefix(origin_zip)?
    ))
}

/// Cell contents as trimmed text; whole numbers are zero-padded to three
/// digits the way the charts print prefixes and zones.
fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::String(s) => Some(s.trim().to_string()),
        Data::Int(i) => Some(format!("{i:03}")),
        Data::Float(f) if f.fract() == 0.0 => Some(format!("{:03}", *f as i64)),
        _ => None,
    }
}

/// Destination prefixes covered by a `Dest. ZIP` cell.
fn dest_prefixes(text: &str) -> Vec<String> {
    let bounds = match text.split_once('-') {
        Some((lo, hi)) => lo.trim().parse::<u16>().ok().zip(hi.trim().parse::<u16>().ok()),
        None => text.parse::<u16>().ok().map(|p| (p, p)),
    };
    match bounds {
        Some((lo, hi)) if lo <= hi && hi <= 999 => (lo..=hi).map(|p| format!("{p:03}")).collect(),
        _ => Vec::new(),
    }
}

/// Ground zones from one origin prefix to every destination prefix.
#[derive(Debug, Clone)]
pub struct ZoneChart {
    ground: HashMap<String, u8>,
}

impl ZoneChart {
    /// Parses a zone chart workbook (xls or xlsx) for `origin_zip`.
    pub fn from_workbook(bytes: &[u8], origin_zip: &str) -> Result<Self> {
        let prefix = zip_prefix(origin_zip)?;
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
            .map_err(|e| ShippingError::InvalidResponse(format!("unreadable zone chart: {e}")))?;
        let sheet = workbook.worksheet_range(prefix).map_err(|e| {
            ShippingError::InvalidResponse(format!("zone chart has no sheet '{prefix}': {e}"))
        })?;
        Self::from_sheet(&sheet)
    }

    fn from_sheet(sheet: &Range<Data>) -> Result<Self> {
        let mut rows = sheet.rows();
        let (dest_col, ground_col) = rows
            .by_ref()
            .find_map(|row| {
                let column = |name: &str| {
                    row.iter()
                        .position(|cell| cell_text(cell).as_deref() == Some(name))
                };
                column(DEST_COLUMN).zip(column(GROUND_COLUMN))
            })
            .ok_or_else(|| {
                ShippingError::InvalidResponse(format!(
                    "zone chart has no '{DEST_COLUMN}'/'{GROUND_COLUMN}' header"
                ))
            })?;

        let mut ground = HashMap::new();
        for row in rows {
            let Some(dest) = row.get(dest_col).and_then(cell_text) else {
                continue;
            };
            // Rows without a numeric zone (e.g. "-") have no Ground service.
            let Some(zone) = row
                .get(ground_col)
                .and_then(cell_text)
                .and_then(|z| z.parse::<u8>().ok())
            else {
                continue;
            };
            for prefix in dest_prefixes(&dest) {
                ground.insert(prefix, zone);
            }
        }

        debug!(prefixes = ground.len(), "Parsed UPS zone chart");
        Ok(Self { ground })
    }

    /// Ground zone for `dest_zip`, if the chart lists its prefix.
    pub fn ground_zone(&self, dest_zip: &str) -> Option<u8> {
        let prefix = zip_prefix(dest_zip).ok()?;
        self.ground.get(prefix).copied()
    }

    pub fn len(&self) -> usize {
        self.ground.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ground.is_empty()
    }
}

/// Downloads the zone chart for `origin_zip`.
#[tracing::instrument(skip(http))]
pub async fn fetch_zone_chart<C: HttpClient + ?Sized>(
    http: &C,
    base_url: &str,
    origin_zip: &str,
) -> Result<ZoneChart> {
    let bytes = fetch_bytes(http, &zone_chart_url(base_url, origin_zip)?).await?;
    ZoneChart::from_workbook(&bytes, origin_zip)
}

/// Ground zones from `origin_zip` to each destination, in order. A
/// destination missing from the chart yields `None`.
pub async fn ground_zones<C: HttpClient + ?Sized>(
    http: &C,
    base_url: &str,
    origin_zip: &str,
    destinations: &[String],
) -> Result<Vec<Option<u8>>> {
    let chart = fetch_zone_chart(http, base_url, origin_zip).await?;
    Ok(destinations
        .iter()
        .map(|dest| {
            let zone = chart.ground_zone(dest);
            if zone.is_none() {
                warn!(origin_zip, dest_zip = %dest, "No UPS Ground zone in chart");
            }
            zone
        })
        .collect())
}
