// ABOUTME: Null-object persistence provider used when no backend is configured.
// ABOUTME: Warns once per instance, reports cache misses and echoes the caller's id on upsert.

use std::sync::Once;

use async_trait::async_trait;

use super::{PersistBlobs, PersistMeta, PersistOptions, ResultStore, StoredResult, UpsertOutcome};
use crate::error::StoreError;

#[derive(Debug)]
pub struct DisabledStore {
    warned: Once,
}

impl Default for DisabledStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DisabledStore {
    pub fn new() -> Self {
        Self {
            warned: Once::new(),
        }
    }

    fn warn_once(&self) {
        self.warned.call_once(|| {
            tracing::warn!("persistence provider missing; persistence disabled");
        });
    }
}

#[async_trait]
impl ResultStore for DisabledStore {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn upsert_result(
        &self,
        meta: PersistMeta,
        _blobs: PersistBlobs,
        _options: PersistOptions,
    ) -> Result<UpsertOutcome, StoreError> {
        self.warn_once();
        Ok(UpsertOutcome {
            id: meta.id.unwrap_or_default(),
            ..Default::default()
        })
    }

    async fn find_fresh_by_url(
        &self,
        _normalized_url: &str,
        _ttl_ms: i64,
    ) -> Result<Option<StoredResult>, StoreError> {
        self.warn_once();
        Ok(None)
    }
}
