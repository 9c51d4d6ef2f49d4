use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Redirector: Send + Sync + 'static {
    /// Resolves a short code to the long URL it redirects to.
    ///
    /// Returns `Err(RedirectorError::NotFound)` if the code is malformed,
    /// unknown or expired.
    async fn resolve(&self, code: &str) -> Result<String>;
}
