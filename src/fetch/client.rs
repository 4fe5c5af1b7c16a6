use async_trait::async_trait;
use reqwest::{Request, Response};

/// Transport seam for every carrier call.
///
/// Wrappers such as [`super::UserAgent`] and [`super::auth::ApiKey`] decorate
/// a request and hand it to the client they wrap.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}

/// Lets one client serve several wrappers, e.g. the token call and the
/// rating client.
#[async_trait]
impl<'a, C: HttpClient + ?Sized> HttpClient for &'a C {
    async fn execute(&self, req: Request) -> reqwest::Result<Response> {
        (**self).execute(req).await
    }
}
