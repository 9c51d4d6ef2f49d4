use crate::shortcode::ShortCode;
use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};

/// How long a mapping stays alive after its last access.
pub const EXPIRY_WINDOW: SignedDuration = SignedDuration::from_secs(60 * 60 * 24 * 365);

/// Longest long URL accepted for shortening.
pub const MAX_URL_LENGTH: usize = 2083;

/// The persisted mapping from a short code to its target URL.
///
/// All timestamps are unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlMapping {
    /// Primary key.
    pub short_code: ShortCode,
    /// The redirect target.
    pub long_url: String,
    /// Set once at creation.
    pub created_at: i64,
    /// Updated on every redirect.
    pub last_accessed: i64,
    /// Pushed forward by the expiry window on every redirect.
    pub expires_at: i64,
    pub num_clicks: u64,
}

impl UrlMapping {
    /// Builds the record written by a fresh shortening: never accessed,
    /// zero clicks, expiring one `window` after `now`.
    pub fn new(
        short_code: ShortCode,
        long_url: impl Into<String>,
        now: Timestamp,
        window: SignedDuration,
    ) -> Self {
        let now = now.as_second();
        Self {
            short_code,
            long_url: long_url.into(),
            created_at: now,
            last_accessed: now,
            expires_at: now.saturating_add(window.as_secs()),
            num_clicks: 0,
        }
    }

    /// Whether the mapping is past its expiry at `now` (unix seconds).
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_mapping_starts_untouched() {
        let now = Timestamp::from_second(1_700_000_000).unwrap();
        let mapping = UrlMapping::new(
            ShortCode::new("abc").unwrap(),
            "https://example.com",
            now,
            EXPIRY_WINDOW,
        );

        assert_eq!(mapping.created_at, 1_700_000_000);
        assert_eq!(mapping.last_accessed, mapping.created_at);
        assert_eq!(mapping.expires_at, 1_700_000_000 + 31_536_000);
        assert_eq!(mapping.num_clicks, 0);
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let now = Timestamp::from_second(100).unwrap();
        let mapping = UrlMapping::new(
            ShortCode::new("abc").unwrap(),
            "https://example.com",
            now,
            SignedDuration::from_secs(10),
        );

        assert!(!mapping.is_expired_at(109));
        assert!(mapping.is_expired_at(110));
    }
}
