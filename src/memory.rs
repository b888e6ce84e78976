//! In-memory reference collaborators.
//!
//! These back the end-to-end tests and make the whole pipeline runnable
//! without external services. Records are never purged (one moderation
//! decision, no retention policy), so both stores grow for the lifetime of
//! the process.

use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicU64, Ordering},
    },
};

use chrono::Utc;
use tokio::sync::broadcast;

use crate::{
    error::{MuralError, MuralResult},
    model::{ChangeEvent, ModerationStatus, NewRecord, SubmissionRecord},
    ports::{BlobStore, RecordStore},
};

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Record collection backed by a `Vec`, with a broadcast change feed.
pub struct MemoryRecordStore {
    rows: Mutex<Vec<SubmissionRecord>>,
    changes: broadcast::Sender<ChangeEvent>,
    seq: AtomicU64,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            rows: Mutex::new(Vec::new()),
            changes,
            seq: AtomicU64::new(1),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.lock().expect("record store poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: &str) -> Option<SubmissionRecord> {
        self.rows
            .lock()
            .expect("record store poisoned")
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    fn list_by_status(&self, status: ModerationStatus, limit: usize) -> Vec<SubmissionRecord> {
        let rows = self.rows.lock().expect("record store poisoned");
        let mut out: Vec<SubmissionRecord> =
            rows.iter().filter(|r| r.status == status).cloned().collect();
        // Newest first; the zero-padded sequence id breaks same-instant ties.
        out.sort_by(|a, b| (b.created_at, &b.id).cmp(&(a.created_at, &a.id)));
        out.truncate(limit);
        out
    }
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore for MemoryRecordStore {
    async fn insert(&self, new: NewRecord) -> MuralResult<SubmissionRecord> {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let record = SubmissionRecord {
            id: format!("rec-{seq:06}"),
            created_at: Utc::now(),
            display_name: new.fields.display_name,
            instagram: new.fields.instagram,
            caption: new.fields.caption,
            pet_name: new.fields.pet_name,
            pet_age: new.fields.pet_age,
            city: new.fields.city,
            region: new.fields.region,
            storage_path: new.storage_path,
            status: ModerationStatus::Pending,
        };

        self.rows
            .lock()
            .expect("record store poisoned")
            .push(record.clone());
        let _ = self.changes.send(ChangeEvent::inserted(record.clone()));
        Ok(record)
    }

    async fn update_status(&self, id: &str, status: ModerationStatus) -> MuralResult<()> {
        let event = {
            let mut rows = self.rows.lock().expect("record store poisoned");
            let row = rows
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| MuralError::record_not_found(id))?;
            let old = row.clone();
            row.status = status;
            ChangeEvent::updated(old, row.clone())
        };
        let _ = self.changes.send(event);
        Ok(())
    }

    async fn list_approved(&self, limit: usize) -> MuralResult<Vec<SubmissionRecord>> {
        Ok(self.list_by_status(ModerationStatus::Approved, limit))
    }

    async fn list_pending(&self, limit: usize) -> MuralResult<Vec<SubmissionRecord>> {
        Ok(self.list_by_status(ModerationStatus::Pending, limit))
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }
}

struct StoredBlob {
    bytes: Vec<u8>,
    content_type: String,
}

/// Blob storage backed by a `HashMap`, addressable via `memory://` URLs.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, StoredBlob>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().expect("blob store poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bytes(&self, key: &str) -> Option<Vec<u8>> {
        self.blobs
            .lock()
            .expect("blob store poisoned")
            .get(key)
            .map(|b| b.bytes.clone())
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.blobs
            .lock()
            .expect("blob store poisoned")
            .get(key)
            .map(|b| b.content_type.clone())
    }
}

impl BlobStore for MemoryBlobStore {
    async fn upload(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> MuralResult<()> {
        let mut blobs = self.blobs.lock().expect("blob store poisoned");
        if blobs.contains_key(key) {
            return Err(MuralError::upload_failed(format!(
                "key already exists: {key}"
            )));
        }
        blobs.insert(key.to_string(), StoredBlob {
            bytes,
            content_type: content_type.to_string(),
        });
        Ok(())
    }

    // URL resolution does not verify existence, mirroring how public object
    // stores mint URLs from the key alone.
    async fn public_url(&self, key: &str) -> MuralResult<String> {
        Ok(format!("memory://{key}"))
    }
}
