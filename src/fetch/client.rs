use async_trait::async_trait;
use reqwest::{Request, Response};

/// Executes prepared HTTP requests. Mobility sources given as URLs are
/// fetched through this seam.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
