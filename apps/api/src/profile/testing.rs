//! In-memory collaborators for engine and router tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::models::profile::PersistedProfile;
use crate::profile::avatar::AssetUploader;
use crate::profile::models::PendingAvatar;
use crate::profile::store::ProfileStore;

pub fn png_avatar() -> PendingAvatar {
    PendingAvatar {
        bytes: Bytes::from_static(b"\x89PNG\r\n\x1a\nfake"),
        content_type: "image/png".to_string(),
        file_name: Some("me.png".to_string()),
    }
}

#[derive(Default)]
pub struct MemoryProfileStore {
    records: Mutex<HashMap<Uuid, PersistedProfile>>,
    upserts: AtomicUsize,
    fail_upserts: AtomicBool,
    fail_loads: AtomicBool,
}

impl MemoryProfileStore {
    pub fn with_record(record: PersistedProfile) -> Self {
        let store = Self::default();
        store.records.lock().unwrap().insert(record.id, record);
        store
    }

    pub fn record(&self, user_id: Uuid) -> Option<PersistedProfile> {
        self.records.lock().unwrap().get(&user_id).cloned()
    }

    /// Number of successful upserts.
    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    pub fn fail_upserts(&self, fail: bool) {
        self.fail_upserts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn load_by_id(&self, user_id: Uuid) -> Result<Option<PersistedProfile>> {
        if self.fail_loads.load(Ordering::SeqCst) {
            bail!("profiles table unavailable");
        }
        Ok(self.record(user_id))
    }

    async fn upsert(&self, user_id: Uuid, record: &PersistedProfile) -> Result<()> {
        if self.fail_upserts.load(Ordering::SeqCst) {
            bail!("profiles table unavailable");
        }
        self.records
            .lock()
            .unwrap()
            .insert(user_id, record.clone());
        self.upserts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryUploader {
    uploads: AtomicUsize,
    fail: AtomicBool,
    /// When set, each upload waits for a permit before completing.
    gate: Option<Arc<Notify>>,
}

impl MemoryUploader {
    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    /// Number of upload attempts, including failed ones.
    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn fail_uploads(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl AssetUploader for MemoryUploader {
    async fn store(&self, user_id: Uuid, _avatar: &PendingAvatar) -> Result<String> {
        let n = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.fail.load(Ordering::SeqCst) {
            bail!("avatar bucket unavailable");
        }
        Ok(format!("https://cdn.example.test/avatars/{user_id}/{n}.png"))
    }
}
