//! In-process upstream store, used in tests and dry runs.

use super::Storage;
use crate::domain::{Metadata, Upstream};
use crate::error::StorageError;
use chrono::Utc;
use std::cell::RefCell;
use std::collections::BTreeMap;

#[derive(Debug)]
pub struct MemoryStorage {
    namespace: String,
    upstreams: RefCell<BTreeMap<String, Upstream>>,
}

impl MemoryStorage {
    pub fn new(namespace: &str) -> Self {
        Self { namespace: namespace.to_string(), upstreams: RefCell::new(BTreeMap::new()) }
    }
}

impl Storage for MemoryStorage {
    fn create(&self, upstream: &Upstream) -> Result<Upstream, StorageError> {
        let mut upstreams = self.upstreams.borrow_mut();
        if upstreams.contains_key(&upstream.name) {
            return Err(StorageError::AlreadyExists(upstream.name.clone()));
        }

        let now = Utc::now();
        let mut stored = upstream.clone();
        stored.metadata = Some(Metadata {
            namespace: self.namespace.clone(),
            resource_version: 1,
            created_at: now,
            updated_at: now,
        });
        upstreams.insert(stored.name.clone(), stored.clone());
        Ok(stored)
    }

    fn update(&self, upstream: &Upstream) -> Result<Upstream, StorageError> {
        let mut upstreams = self.upstreams.borrow_mut();
        let existing = upstreams
            .get_mut(&upstream.name)
            .ok_or_else(|| StorageError::NotFound(upstream.name.clone()))?;

        let mut metadata = existing.metadata.clone().unwrap_or_else(|| Metadata {
            namespace: self.namespace.clone(),
            resource_version: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });
        metadata.resource_version += 1;
        metadata.updated_at = Utc::now();

        *existing = Upstream { metadata: Some(metadata), ..upstream.clone() };
        Ok(existing.clone())
    }

    fn delete(&self, name: &str) -> Result<(), StorageError> {
        self.upstreams
            .borrow_mut()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(name.to_string()))
    }

    fn get(&self, name: &str) -> Result<Upstream, StorageError> {
        self.upstreams
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(name.to_string()))
    }

    fn list(&self) -> Result<Vec<Upstream>, StorageError> {
        Ok(self.upstreams.borrow().values().cloned().collect())
    }
}
