//! Upstream storage backends
//!
//! The executor only needs a synchronous create/update/delete/get/list
//! contract. Each backend instance is scoped to one namespace.

use crate::domain::Upstream;
use crate::error::StorageError;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

pub trait Storage {
    /// Store a new upstream. Fails with [`StorageError::AlreadyExists`] if the name is taken.
    fn create(&self, upstream: &Upstream) -> Result<Upstream, StorageError>;

    /// Replace an existing upstream, bumping its resource version.
    fn update(&self, upstream: &Upstream) -> Result<Upstream, StorageError>;

    fn delete(&self, name: &str) -> Result<(), StorageError>;

    fn get(&self, name: &str) -> Result<Upstream, StorageError>;

    /// All upstreams in the namespace, ordered by name.
    fn list(&self) -> Result<Vec<Upstream>, StorageError>;
}
