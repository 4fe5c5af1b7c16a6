use crate::error::{Result, ShippingError};
use crate::fetch::client::HttpClient;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{AUTHORIZATION, HeaderName, HeaderValue};

/// An [`HttpClient`] wrapper that injects an API key as an HTTP header.
///
/// The header is validated when the wrapper is built, so a bad key fails
/// before any request goes out.
pub struct ApiKey<C> {
    pub inner: C,
    header_name: HeaderName,
    value: HeaderValue,
}

impl<C> ApiKey<C> {
    pub fn new(inner: C, header_name: &str, key: &str) -> Result<Self> {
        let header_name = HeaderName::from_bytes(header_name.as_bytes())
            .map_err(|e| ShippingError::Config(format!("invalid header name: {e}")))?;
        let mut value = HeaderValue::from_str(key)
            .map_err(|e| ShippingError::Config(format!("invalid header value: {e}")))?;
        value.set_sensitive(true);
        Ok(Self {
            inner,
            header_name,
            value,
        })
    }

    /// `Authorization: Bearer <token>`, as UPS expects for its OAuth tokens.
    pub fn bearer(inner: C, token: &str) -> Result<Self> {
        Self::new(inner, AUTHORIZATION.as_str(), &format!("Bearer {token}"))
    }

    /// `Authorization: Basic <base64(user:password)>`.
    pub fn basic(inner: C, user: &str, password: &str) -> Result<Self> {
        let encoded = STANDARD.encode(format!("{user}:{password}"));
        Self::new(inner, AUTHORIZATION.as_str(), &format!("Basic {encoded}"))
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for ApiKey<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        req.headers_mut()
            .insert(self.header_name.clone(), self.value.clone());
        self.inner.execute(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::stub::StubClient;

    #[tokio::test]
    async fn test_bearer_sets_authorization() {
        let client = ApiKey::bearer(StubClient::new(vec![(200, "")]), "tok123").unwrap();
        let req = reqwest::Request::new(
            reqwest::Method::GET,
            "https://example.com".parse().unwrap(),
        );
        client.execute(req).await.unwrap();

        let sent = client.inner.requests.lock().unwrap();
        assert_eq!(sent[0].headers()[AUTHORIZATION], "Bearer tok123");
    }

    #[tokio::test]
    async fn test_basic_encodes_credentials() {
        let client = ApiKey::basic(StubClient::new(vec![(200, "")]), "id", "secret").unwrap();
        let req = reqwest::Request::new(
            reqwest::Method::POST,
            "https://example.com".parse().unwrap(),
        );
        client.execute(req).await.unwrap();

        let sent = client.inner.requests.lock().unwrap();
        assert_eq!(sent[0].headers()[AUTHORIZATION], "Basic aWQ6c2VjcmV0");
    }

    #[test]
    fn test_rejects_invalid_key() {
        assert!(ApiKey::bearer(StubClient::new(vec![]), "bad\nkey").is_err());
    }
}
