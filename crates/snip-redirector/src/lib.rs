//! Read side of the snip URL shortener.
//!
//! [`RedirectorService`] turns a short code into its long URL and records
//! the click through a [`ClickTracker`]. Click tracking is best-effort: a
//! failed metrics update is logged and never fails the redirect.
//! [`MetricsReader`] exposes the usage counters of a mapping.

pub mod error;
pub mod metrics;
pub mod redirector;
pub mod service;
pub mod tracker;

pub use error::{RedirectorError, Result};
pub use metrics::{MetricsReader, MetricsView};
pub use redirector::Redirector;
pub use service::RedirectorService;
pub use tracker::{ClickOutcome, ClickTracker, TrackerSettings};
