use crate::fetch::client::HttpClient;
use async_trait::async_trait;
use reqwest::header::{HeaderValue, USER_AGENT};

/// An [`HttpClient`] wrapper that sends a fixed `User-Agent`.
///
/// The public ups.com and usps.com pages reject requests without a browser
/// user agent.
pub struct UserAgent<C> {
    pub inner: C,
    value: Option<HeaderValue>,
}

impl<C> UserAgent<C> {
    /// An unparseable value is dropped and the inner client's default is used.
    pub fn new(inner: C, user_agent: &str) -> Self {
        Self {
            inner,
            value: HeaderValue::from_str(user_agent).ok(),
        }
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for UserAgent<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        if let Some(value) = &self.value {
            req.headers_mut().insert(USER_AGENT, value.clone());
        }
        self.inner.execute(req).await
    }
}
