//! Alias allocation for the snip URL shortener.
//!
//! [`ShortenerService`] validates the long URL, then either claims a
//! caller-chosen alias with a single conditional create or draws random
//! codes until one is free, bounded by [`MAX_RETRIES`].

pub mod error;
pub mod service;
pub mod settings;
pub mod shortener;

pub use error::ShortenerError;
pub use service::ShortenerService;
pub use settings::{ShortenerSettings, MAX_RETRIES};
pub use shortener::{ShortenParams, Shortener};
