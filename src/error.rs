//! Error types for quoting and Ground transit inference.

use std::io;

use crate::ground::{Region, Rgb};

/// Failures of the Ground transit inference pipeline.
///
/// Kept separate from [`ShippingError`] so the rate normalizer can decide to
/// discard them without touching network or upstream errors.
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("no downloaded map for origin zip {0}")]
    MapNotFound(String),
    #[error("no map region for state '{0}'")]
    UnknownRegion(String),
    #[error("map color {0} does not match any legend entry")]
    UnmatchedColor(Rgb),
    #[error("map region {0:?} has no colored pixels")]
    EmptyRegion(Region),
    #[error("failed to read map index: {0}")]
    Index(#[from] csv::Error),
    #[error("failed to load map image: {0}")]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ShippingError {
    #[error("format error: {0}")]
    Format(String),
    #[error("no valid rates for that configuration")]
    NoValidRate,
    #[error(transparent)]
    Inference(#[from] InferenceError),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("upstream returned status {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("missing configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Xml(#[from] quick_xml::DeError),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T, E = ShippingError> = std::result::Result<T, E>;
