use std::sync::Arc;

use crate::redirector::Redirector;
use crate::tracker::{ClickOutcome, ClickTracker, TrackerSettings};
use crate::{RedirectorError, Result};
use async_trait::async_trait;
use snip_core::{Clock, MappingStore, ShortCode, SystemClock};
use tracing::{debug, trace, warn};

/// Service for handling URL redirects.
///
/// Looks up only the long URL, then records the click. The click result is
/// inspected and logged but never turns a successful lookup into an error.
#[derive(Debug, Clone)]
pub struct RedirectorService<S, C = SystemClock> {
    store: Arc<S>,
    tracker: ClickTracker<Arc<S>, C>,
}

impl<S: MappingStore> RedirectorService<S> {
    pub fn new(store: S) -> Self {
        Self::with_settings(store, TrackerSettings::default())
    }

    pub fn with_settings(store: S, settings: TrackerSettings) -> Self {
        let store = Arc::new(store);
        Self {
            tracker: ClickTracker::with_settings(Arc::clone(&store), settings),
            store,
        }
    }
}

impl<S: MappingStore, C: Clock> RedirectorService<S, C> {
    /// Replaces the clock used to stamp clicks.
    pub fn with_clock<C2: Clock>(self, clock: C2) -> RedirectorService<S, C2> {
        RedirectorService {
            store: self.store,
            tracker: self.tracker.with_clock(clock),
        }
    }

    /// Resolves a short code to its long URL and records the click.
    pub async fn resolve(&self, code: &str) -> Result<String> {
        Redirector::resolve(self, code).await
    }
}

#[async_trait]
impl<S: MappingStore, C: Clock> Redirector for RedirectorService<S, C> {
    async fn resolve(&self, code: &str) -> Result<String> {
        trace!(code = %code, "resolving short code");

        let Ok(short_code) = ShortCode::new(code) else {
            trace!(code = %code, "malformed short code");
            return Err(RedirectorError::NotFound(code.to_string()));
        };

        let Some(long_url) = self.store.get_long_url(&short_code).await? else {
            trace!(code = %code, "short code not found");
            return Err(RedirectorError::NotFound(code.to_string()));
        };

        match self.tracker.record_click(&short_code).await {
            Ok(ClickOutcome::Recorded) => {}
            Ok(ClickOutcome::Missing) => {
                debug!(code = %short_code, "mapping vanished before the click was recorded");
            }
            Err(err) => {
                warn!(code = %short_code, error = %err, "failed to record click");
            }
        }

        debug!(code = %short_code, url = %long_url, "resolved short code");
        Ok(long_url)
    }
}
