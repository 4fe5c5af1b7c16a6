pub mod common;
pub mod config;
pub mod error;
pub mod fetch;
pub mod ground;
pub mod infra;
pub mod output;
pub mod rates;
pub mod services;
