//! SQLite-backed upstream store.

use super::Storage;
use crate::domain::{Metadata, Upstream};
use crate::error::StorageError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS upstreams (
    namespace TEXT NOT NULL,
    name TEXT NOT NULL,
    upstream_type TEXT NOT NULL,
    spec_json TEXT NOT NULL,
    resource_version INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (namespace, name)
);
";

const SELECT_COLUMNS: &str =
    "SELECT name, upstream_type, spec_json, resource_version, created_at, updated_at FROM upstreams";

pub struct SqliteStorage {
    conn: Connection,
    namespace: String,
}

struct UpstreamRow {
    name: String,
    upstream_type: String,
    spec_json: String,
    resource_version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SqliteStorage {
    pub fn open(path: &Path, namespace: &str) -> Result<Self, StorageError> {
        Self::with_connection(Connection::open(path)?, namespace)
    }

    pub fn open_in_memory(namespace: &str) -> Result<Self, StorageError> {
        Self::with_connection(Connection::open_in_memory()?, namespace)
    }

    fn with_connection(conn: Connection, namespace: &str) -> Result<Self, StorageError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn, namespace: namespace.to_string() })
    }

    fn find(&self, name: &str) -> Result<Option<Upstream>, StorageError> {
        let row = self
            .conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE namespace = ?1 AND name = ?2"),
                params![self.namespace, name],
                read_row,
            )
            .optional()?;
        row.map(|r| self.to_upstream(r)).transpose()
    }

    fn to_upstream(&self, row: UpstreamRow) -> Result<Upstream, StorageError> {
        Ok(Upstream {
            name: row.name,
            upstream_type: row.upstream_type,
            spec: serde_json::from_str(&row.spec_json)?,
            metadata: Some(Metadata {
                namespace: self.namespace.clone(),
                resource_version: row.resource_version.max(0) as u64,
                created_at: row.created_at,
                updated_at: row.updated_at,
            }),
        })
    }
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UpstreamRow> {
    Ok(UpstreamRow {
        name: row.get(0)?,
        upstream_type: row.get(1)?,
        spec_json: row.get(2)?,
        resource_version: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

impl Storage for SqliteStorage {
    fn create(&self, upstream: &Upstream) -> Result<Upstream, StorageError> {
        if self.find(&upstream.name)?.is_some() {
            return Err(StorageError::AlreadyExists(upstream.name.clone()));
        }

        let now = Utc::now();
        self.conn.execute(
            "INSERT INTO upstreams(namespace, name, upstream_type, spec_json, resource_version, created_at, updated_at)
             VALUES(?1, ?2, ?3, ?4, 1, ?5, ?5)",
            params![
                self.namespace,
                upstream.name,
                upstream.upstream_type,
                serde_json::to_string(&upstream.spec)?,
                now
            ],
        )?;
        tracing::debug!(namespace = %self.namespace, name = %upstream.name, "created upstream");

        self.get(&upstream.name)
    }

    fn update(&self, upstream: &Upstream) -> Result<Upstream, StorageError> {
        let changed = self.conn.execute(
            "UPDATE upstreams
             SET upstream_type = ?3, spec_json = ?4, resource_version = resource_version + 1, updated_at = ?5
             WHERE namespace = ?1 AND name = ?2",
            params![
                self.namespace,
                upstream.name,
                upstream.upstream_type,
                serde_json::to_string(&upstream.spec)?,
                Utc::now()
            ],
        )?;
        if changed == 0 {
            return Err(StorageError::NotFound(upstream.name.clone()));
        }
        tracing::debug!(namespace = %self.namespace, name = %upstream.name, "updated upstream");

        self.get(&upstream.name)
    }

    fn delete(&self, name: &str) -> Result<(), StorageError> {
        let changed = self.conn.execute(
            "DELETE FROM upstreams WHERE namespace = ?1 AND name = ?2",
            params![self.namespace, name],
        )?;
        if changed == 0 {
            return Err(StorageError::NotFound(name.to_string()));
        }
        tracing::debug!(namespace = %self.namespace, name, "deleted upstream");
        Ok(())
    }

    fn get(&self, name: &str) -> Result<Upstream, StorageError> {
        self.find(name)?.ok_or_else(|| StorageError::NotFound(name.to_string()))
    }

    fn list(&self) -> Result<Vec<Upstream>, StorageError> {
        let mut stmt =
            self.conn.prepare(&format!("{SELECT_COLUMNS} WHERE namespace = ?1 ORDER BY name"))?;
        let rows = stmt.query_map(params![self.namespace], read_row)?;

        let mut upstreams = Vec::new();
        for row in rows {
            upstreams.push(self.to_upstream(row?)?);
        }
        Ok(upstreams)
    }
}
