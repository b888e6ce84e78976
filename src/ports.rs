//! External collaborator interfaces.
//!
//! The wall core never talks to a database or an object store directly;
//! everything goes through these two ports. Implementations decide identity
//! assignment, ordering guarantees, and the transport behind the change
//! subscription. See [`crate::memory`] for the in-memory reference pair.

use std::future::Future;

use tokio::sync::broadcast;

use crate::{
    error::MuralResult,
    model::{ChangeEvent, ModerationStatus, NewRecord, SubmissionRecord},
};

/// The record collection: submission rows plus a change feed.
pub trait RecordStore: Send + Sync {
    /// Stores a new record with status `pending`, assigning its id and
    /// creation timestamp. Fails with `PersistFailed`.
    fn insert(&self, new: NewRecord) -> impl Future<Output = MuralResult<SubmissionRecord>> + Send;

    /// Rewrites the status of one record. Fails with `RecordNotFound` or
    /// `PersistFailed`.
    fn update_status(
        &self,
        id: &str,
        status: ModerationStatus,
    ) -> impl Future<Output = MuralResult<()>> + Send;

    /// Approved records, newest first, at most `limit`.
    fn list_approved(
        &self,
        limit: usize,
    ) -> impl Future<Output = MuralResult<Vec<SubmissionRecord>>> + Send;

    /// Pending records, newest first, at most `limit`.
    fn list_pending(
        &self,
        limit: usize,
    ) -> impl Future<Output = MuralResult<Vec<SubmissionRecord>>> + Send;

    /// Change feed over the whole collection. Receivers that fall behind see
    /// `Lagged` and are expected to resync from a fresh snapshot.
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent>;
}

/// Binary asset storage for composed frames.
pub trait BlobStore: Send + Sync {
    /// Uploads bytes under an opaque key. Keys are never overwritten; a
    /// duplicate key fails with `UploadFailed`.
    fn upload(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> impl Future<Output = MuralResult<()>> + Send;

    /// Resolves the publicly displayable URL for a stored key.
    fn public_url(&self, key: &str) -> impl Future<Output = MuralResult<String>> + Send;
}

// Shared-ownership delegation so one store can back several components.

impl<T: RecordStore> RecordStore for std::sync::Arc<T> {
    fn insert(&self, new: NewRecord) -> impl Future<Output = MuralResult<SubmissionRecord>> + Send {
        (**self).insert(new)
    }

    fn update_status(
        &self,
        id: &str,
        status: ModerationStatus,
    ) -> impl Future<Output = MuralResult<()>> + Send {
        (**self).update_status(id, status)
    }

    fn list_approved(
        &self,
        limit: usize,
    ) -> impl Future<Output = MuralResult<Vec<SubmissionRecord>>> + Send {
        (**self).list_approved(limit)
    }

    fn list_pending(
        &self,
        limit: usize,
    ) -> impl Future<Output = MuralResult<Vec<SubmissionRecord>>> + Send {
        (**self).list_pending(limit)
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        (**self).subscribe()
    }
}

impl<T: BlobStore> BlobStore for std::sync::Arc<T> {
    fn upload(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> impl Future<Output = MuralResult<()>> + Send {
        (**self).upload(key, bytes, content_type)
    }

    fn public_url(&self, key: &str) -> impl Future<Output = MuralResult<String>> + Send {
        (**self).public_url(key)
    }
}
