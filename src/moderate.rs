//! The moderation gate: a stateless, guarded status write.

use crate::{
    error::{MuralError, MuralResult},
    model::ModerationStatus,
    ports::RecordStore,
};

/// Authorizes and applies a single moderation decision. Every call is checked
/// independently against the configured operator secret; the gate holds no
/// other state.
pub struct ModerationGate<R> {
    records: R,
    operator_secret: String,
}

impl<R: RecordStore> ModerationGate<R> {
    pub fn new(records: R, operator_secret: impl Into<String>) -> Self {
        Self {
            records,
            operator_secret: operator_secret.into(),
        }
    }

    /// Moves a record to `approved` or `rejected`. The only legal targets are
    /// the two terminal states; `pending` is refused.
    pub async fn moderate(
        &self,
        credential: &str,
        id: &str,
        target: ModerationStatus,
    ) -> MuralResult<()> {
        if credential.is_empty() || credential != self.operator_secret {
            return Err(MuralError::Unauthorized);
        }
        if !target.is_terminal() {
            return Err(MuralError::invalid_target(target.as_str()));
        }
        if id.trim().is_empty() {
            return Err(MuralError::record_not_found(id));
        }

        self.records.update_status(id, target).await?;
        tracing::info!(id, status = target.as_str(), "moderation applied");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        memory::MemoryRecordStore,
        model::{NewRecord, SubmissionFields},
        ports::RecordStore as _,
    };

    fn new_record(name: &str) -> NewRecord {
        NewRecord {
            fields: SubmissionFields {
                display_name: name.to_string(),
                ..SubmissionFields::default()
            },
            storage_path: format!("pending/{name}.jpg"),
        }
    }

    #[tokio::test]
    async fn rejects_wrong_credential() {
        let gate = ModerationGate::new(MemoryRecordStore::new(), "secret");
        let err = gate
            .moderate("nope", "some-id", ModerationStatus::Approved)
            .await
            .unwrap_err();
        assert!(matches!(err, MuralError::Unauthorized));
    }

    #[tokio::test]
    async fn rejects_empty_credential_even_if_secret_is_empty() {
        let gate = ModerationGate::new(MemoryRecordStore::new(), "");
        let err = gate
            .moderate("", "some-id", ModerationStatus::Approved)
            .await
            .unwrap_err();
        assert!(matches!(err, MuralError::Unauthorized));
    }

    #[tokio::test]
    async fn rejects_pending_as_target() {
        let store = MemoryRecordStore::new();
        let rec = store.insert(new_record("ana")).await.unwrap();
        let gate = ModerationGate::new(store, "secret");
        let err = gate
            .moderate("secret", &rec.id, ModerationStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(err, MuralError::InvalidTarget(_)));
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let gate = ModerationGate::new(MemoryRecordStore::new(), "secret");
        let err = gate
            .moderate("secret", "ghost", ModerationStatus::Rejected)
            .await
            .unwrap_err();
        assert!(matches!(err, MuralError::RecordNotFound(_)));
    }

    #[tokio::test]
    async fn approves_pending_record() {
        let store = MemoryRecordStore::new();
        let rec = store.insert(new_record("ana")).await.unwrap();
        let gate = ModerationGate::new(store, "secret");
        gate.moderate("secret", &rec.id, ModerationStatus::Approved)
            .await
            .unwrap();
    }
}
