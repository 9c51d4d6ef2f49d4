//! Core types and traits for the snip URL shortener.
//!
//! This crate provides the types shared by the shortener and redirector
//! services, and the [`MappingStore`] contract both of them are written
//! against. The store itself lives elsewhere (see `snip-storage`).

pub mod clock;
pub mod error;
pub mod mapping;
pub mod shortcode;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CoreError, StorageError};
pub use mapping::{UrlMapping, EXPIRY_WINDOW, MAX_URL_LENGTH};
pub use shortcode::{ShortCode, MAX_ALIAS_LENGTH, MIN_ALIAS_LENGTH};
pub use store::{MappingStore, MappingUpdate, MetricField, UpdateOp};
