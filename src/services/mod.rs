pub mod carrier_api;

pub use carrier_api::CarrierApi;
