//! Carrier credentials and other settings read from the environment.
//!
//! `.env` is loaded by the binary before any of these are read.

use std::path::PathBuf;

use crate::error::{Result, ShippingError};

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

fn required(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ShippingError::Config(format!("{name} must be set"))),
    }
}

/// OAuth client credentials for the UPS developer API.
#[derive(Clone)]
pub struct UpsCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl UpsCredentials {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            client_id: required("UPS_CLIENT_ID")?,
            client_secret: required("UPS_CLIENT_SECRET")?,
        })
    }
}

impl std::fmt::Debug for UpsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpsCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .finish()
    }
}

/// Web Tools user for the USPS RateV4 API.
#[derive(Clone)]
pub struct UspsCredentials {
    pub user_id: String,
    pub password: String,
}

impl UspsCredentials {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            user_id: required("USPS_USER_ID")?,
            password: required("USPS_PASSWORD")?,
        })
    }
}

impl std::fmt::Debug for UspsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UspsCredentials")
            .field("user_id", &self.user_id)
            .field("password", &"***")
            .finish()
    }
}

/// Browser user agent for scraped pages (`USER_AGENT`).
pub fn user_agent() -> String {
    std::env::var("USER_AGENT")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string())
}

/// Where the UPS OAuth token is cached (`UPS_TOKEN_PATH`).
pub fn ups_token_path() -> PathBuf {
    std::env::var("UPS_TOKEN_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("ups_token.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_variable_names_it() {
        let err = required("PARCEL_RATER_TEST_SURELY_UNSET").unwrap_err();
        assert!(err.to_string().contains("PARCEL_RATER_TEST_SURELY_UNSET"));
    }

    #[test]
    fn test_credentials_debug_hides_secret() {
        let creds = UpsCredentials {
            client_id: "id".into(),
            client_secret: "hunter2".into(),
        };
        assert!(!format!("{creds:?}").contains("hunter2"));
    }
}
