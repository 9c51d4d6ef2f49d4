use jiff::SignedDuration;
use snip_core::{
    Clock, MappingStore, MappingUpdate, MetricField, ShortCode, StorageError, SystemClock,
    EXPIRY_WINDOW,
};
use tracing::trace;
use typed_builder::TypedBuilder;

#[derive(Debug, Clone, TypedBuilder)]
pub struct TrackerSettings {
    /// How far past the click the mapping's expiry is pushed.
    #[builder(default = EXPIRY_WINDOW)]
    pub expiry_window: SignedDuration,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Result of recording one click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    Recorded,
    /// The mapping disappeared between the lookup and the update.
    Missing,
}

/// Records redirect events against a mapping's usage metrics.
///
/// Each click is one atomic store update that stamps `last_accessed`,
/// bumps `num_clicks` and pushes `expires_at` to at least one window past
/// now. The expiry never moves backwards, even when the mapping was created
/// with a longer window or by a host whose clock runs ahead.
#[derive(Debug, Clone)]
pub struct ClickTracker<S, C = SystemClock> {
    store: S,
    clock: C,
    settings: TrackerSettings,
}

impl<S: MappingStore> ClickTracker<S> {
    pub fn new(store: S) -> Self {
        Self::with_settings(store, TrackerSettings::default())
    }

    pub fn with_settings(store: S, settings: TrackerSettings) -> Self {
        Self {
            store,
            clock: SystemClock,
            settings,
        }
    }
}

impl<S: MappingStore, C: Clock> ClickTracker<S, C> {
    pub fn with_clock<C2: Clock>(self, clock: C2) -> ClickTracker<S, C2> {
        ClickTracker {
            store: self.store,
            clock,
            settings: self.settings,
        }
    }

    pub async fn record_click(&self, code: &ShortCode) -> Result<ClickOutcome, StorageError> {
        let now = self.clock.now().as_second();
        let expires_at = now.saturating_add(self.settings.expiry_window.as_secs());

        let update = MappingUpdate::new()
            .set(MetricField::LastAccessed, now)
            .increment(MetricField::NumClicks, 1)
            .at_least(MetricField::ExpiresAt, expires_at);

        if self.store.atomic_update(code, update).await? {
            trace!(code = %code, expires_at, "recorded click");
            Ok(ClickOutcome::Recorded)
        } else {
            Ok(ClickOutcome::Missing)
        }
    }
}
