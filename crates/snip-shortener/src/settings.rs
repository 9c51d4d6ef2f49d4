use jiff::SignedDuration;
use snip_core::EXPIRY_WINDOW;
use typed_builder::TypedBuilder;

/// Attempts made to find a free random code before giving up.
pub const MAX_RETRIES: usize = 10;

/// Tunables for [`ShortenerService`](crate::ShortenerService).
#[derive(Debug, Clone, TypedBuilder)]
pub struct ShortenerSettings {
    /// Upper bound on generated-code attempts per request.
    #[builder(default = MAX_RETRIES)]
    pub max_retries: usize,
    /// Lifetime of a fresh mapping.
    #[builder(default = EXPIRY_WINDOW)]
    pub expiry_window: SignedDuration,
}

impl Default for ShortenerSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}
