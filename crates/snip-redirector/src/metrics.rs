use std::sync::Arc;

use crate::{RedirectorError, Result};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use snip_core::{MappingStore, ShortCode, StorageError, UrlMapping};
use tracing::trace;

const ISO_8601_UTC: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Usage metrics of one mapping, with timestamps rendered as
/// `YYYY-MM-DDTHH:MM:SSZ` in UTC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsView {
    pub short_code: ShortCode,
    pub long_url: String,
    pub num_clicks: u64,
    pub created_at: String,
    pub last_accessed: String,
    pub expires_at: String,
}

impl TryFrom<UrlMapping> for MetricsView {
    type Error = StorageError;

    fn try_from(mapping: UrlMapping) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            created_at: format_unix(mapping.created_at)?,
            last_accessed: format_unix(mapping.last_accessed)?,
            expires_at: format_unix(mapping.expires_at)?,
            short_code: mapping.short_code,
            long_url: mapping.long_url,
            num_clicks: mapping.num_clicks,
        })
    }
}

fn format_unix(seconds: i64) -> std::result::Result<String, StorageError> {
    let timestamp = Timestamp::from_second(seconds).map_err(|e| {
        StorageError::InvalidData(format!("timestamp {seconds} out of range: {e}"))
    })?;
    Ok(timestamp.strftime(ISO_8601_UTC).to_string())
}

/// Read-only access to mapping metrics. Never records a click.
#[derive(Debug, Clone)]
pub struct MetricsReader<S> {
    store: Arc<S>,
}

impl<S: MappingStore> MetricsReader<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    pub async fn get_metrics(&self, code: &str) -> Result<MetricsView> {
        let Ok(short_code) = ShortCode::new(code) else {
            return Err(RedirectorError::NotFound(code.to_string()));
        };

        let Some(mapping) = self.store.get(&short_code).await? else {
            trace!(code = %code, "no metrics for unknown short code");
            return Err(RedirectorError::NotFound(code.to_string()));
        };

        Ok(MetricsView::try_from(mapping)?)
    }
}
