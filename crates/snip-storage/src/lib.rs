//! Backing stores implementing the [`MappingStore`] contract.

pub mod memory;
pub mod mysql;

pub use memory::InMemoryStore;
pub use mysql::MySqlStore;
pub use snip_core::{MappingStore, StorageError};
