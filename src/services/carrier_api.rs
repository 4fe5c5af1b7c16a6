//! Trait implemented by each carrier's rating client.

use crate::common::{Carrier, RateRequest};
use crate::error::Result;
use crate::rates::CarrierResponse;

/// Abstraction over a carrier rating API (UPS, USPS).
///
/// Implementations validate the carrier's payload and hand back typed quote
/// lines; turning them into rates is left to [`crate::rates::normalize`].
#[async_trait::async_trait]
pub trait CarrierApi: Send + Sync {
    fn carrier(&self) -> Carrier;

    /// Quotes every service the carrier offers for `request`.
    async fn quote(&self, request: &RateRequest) -> Result<CarrierResponse>;
}
