use crate::error::Result;
use async_trait::async_trait;
use snip_core::ShortCode;

/// Input of one shortening request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortenParams {
    /// The URL to redirect to. Must be an absolute http(s) URL.
    pub long_url: String,
    /// Caller-chosen alias. A random code is generated when absent.
    pub alias: Option<String>,
}

impl ShortenParams {
    pub fn new(long_url: impl Into<String>) -> Self {
        Self {
            long_url: long_url.into(),
            alias: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

#[async_trait]
pub trait Shortener: Send + Sync + 'static {
    /// Creates a mapping for `params.long_url` and returns the code it was stored under.
    async fn shorten(&self, params: ShortenParams) -> Result<ShortCode>;
}
