// ABOUTME: In-process persistence provider holding rows, blobs and an external-object map behind a RwLock.
// ABOUTME: Mirrors the hosted backend's semantics (unique normalized URL, per-kind blob upsert, size-based offload).

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{
    is_fresh, PersistBlobs, PersistMeta, PersistOptions, ResultStore, StoredBlob, StoredResult,
    UpsertOutcome,
};
use crate::error::StoreError;

#[derive(Debug, Default)]
struct Tables {
    rows: HashMap<String, StoredResult>,
    objects: HashMap<String, String>,
}

#[derive(Debug)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    external_storage: bool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// A store with external storage enabled.
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            external_storage: true,
        }
    }

    /// Without external storage every blob stays inline.
    pub fn with_external_storage(mut self, enabled: bool) -> Self {
        self.external_storage = enabled;
        self
    }

    pub fn len(&self) -> usize {
        self.tables
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .rows
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The stored row for `normalized_url`, regardless of age.
    pub fn get(&self, normalized_url: &str) -> Option<StoredResult> {
        self.tables
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .rows
            .get(normalized_url)
            .cloned()
    }

    /// An uploaded object by path.
    pub fn object(&self, path: &str) -> Option<String> {
        self.tables
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .objects
            .get(path)
            .cloned()
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn upsert_result(
        &self,
        meta: PersistMeta,
        blobs: PersistBlobs,
        options: PersistOptions,
    ) -> Result<UpsertOutcome, StoreError> {
        let row = meta.to_row(&blobs)?;
        let mut tables = self.tables.write().unwrap_or_else(|e| e.into_inner());

        let id = tables
            .rows
            .get(&row.normalized_url)
            .map(|existing| existing.id.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let mut outcome = UpsertOutcome {
            id: id.clone(),
            ..Default::default()
        };

        let mut stored_blobs = tables
            .rows
            .get(&row.normalized_url)
            .map(|existing| existing.blobs.clone())
            .unwrap_or_default();

        for (kind, payload) in blobs.payloads() {
            let blob = if self.external_storage
                && kind.needs_external_storage(&payload, options.forces(kind))
            {
                let path = kind.storage_path(&id);
                tables.objects.insert(path.clone(), payload);
                outcome.record_path(kind, path.clone());
                StoredBlob {
                    kind,
                    path: Some(path),
                    content: None,
                }
            } else {
                StoredBlob {
                    kind,
                    path: None,
                    content: Some(payload),
                }
            };
            stored_blobs.retain(|b| b.kind != kind);
            stored_blobs.push(blob);
        }

        let key = row.normalized_url.clone();
        tables.rows.insert(
            key,
            StoredResult {
                id,
                row,
                blobs: stored_blobs,
            },
        );
        Ok(outcome)
    }

    async fn find_fresh_by_url(
        &self,
        normalized_url: &str,
        ttl_ms: i64,
    ) -> Result<Option<StoredResult>, StoreError> {
        if ttl_ms <= 0 {
            return Ok(None);
        }
        let now = Utc::now();
        Ok(self
            .get(normalized_url)
            .filter(|stored| is_fresh(stored.row.ts, now, ttl_ms)))
    }
}
