//! Turning carrier quotes into [`Rate`](crate::common::Rate)s and picking one.

pub mod normalize;
pub mod select;

pub use normalize::{
    CarrierResponse, RawQuote, TransitEstimate, UPS_GROUND, add_business_days, normalize,
};
pub use select::{best_rate, valid_rates};
