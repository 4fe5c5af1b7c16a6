//! Carrier API clients.

pub mod ups;
pub mod usps;
