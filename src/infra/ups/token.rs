//! UPS OAuth client-credentials tokens, cached as JSON on disk.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info};

use crate::config::UpsCredentials;
use crate::error::Result;
use crate::fetch::auth::ApiKey;
use crate::fetch::{HttpClient, execute_checked, form_request};

/// Tokens this close to expiry are refreshed rather than reused.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(deserialize_with = "seconds")]
    expires_in: i64,
}

/// UPS sends `expires_in` as a string; accept a number too.
fn seconds<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(i64),
        Str(String),
    }

    match Raw::deserialize(d)? {
        Raw::Num(n) => Ok(n),
        Raw::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl UpsToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_MARGIN_SECS) >= self.expires_at
    }
}

/// JSON file holding the last issued token.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The cached token, or `None` if nothing has been saved yet.
    pub fn load(&self) -> Result<Option<UpsToken>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    pub fn save(&self, token: &UpsToken) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(token)?)?;
        Ok(())
    }
}

/// Exchanges client credentials for a new access token.
#[tracing::instrument(skip(http, credentials))]
pub async fn create_token<C: HttpClient>(
    http: C,
    base_url: &str,
    credentials: &UpsCredentials,
) -> Result<UpsToken> {
    let http = ApiKey::basic(http, &credentials.client_id, &credentials.client_secret)?;
    let req = form_request(
        &format!("{base_url}/security/v1/oauth/token"),
        &[("grant_type", "client_credentials")],
    )?;

    let resp = execute_checked(&http, req).await?;
    let body: TokenResponse = serde_json::from_slice(&resp.bytes().await?)?;
    let token = UpsToken {
        access_token: body.access_token,
        expires_at: Utc::now() + Duration::seconds(body.expires_in),
    };
    info!(expires_at = %token.expires_at, "UPS token issued");
    Ok(token)
}

/// Returns the cached token, requesting and caching a new one when the cache
/// is empty, expired, or `force_new` is set.
pub async fn get_token<C: HttpClient>(
    http: C,
    base_url: &str,
    credentials: &UpsCredentials,
    store: &TokenStore,
    force_new: bool,
) -> Result<UpsToken> {
    if !force_new {
        if let Some(token) = store.load()? {
            if !token.is_expired(Utc::now()) {
                debug!(path = %store.path().display(), "Using cached UPS token");
                return Ok(token);
            }
        }
    }

    let token = create_token(http, base_url, credentials).await?;
    store.save(&token)?;
    Ok(token)
}
