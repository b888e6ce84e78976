use chrono::{DateTime, Utc};

use crate::error::{MuralError, MuralResult};

/// Caption length cap, enforced at submission and display time.
pub const MAX_CAPTION_CHARS: usize = 50;

/// Region codes are short postal-style abbreviations ("SP", "NY").
pub const MAX_REGION_CHARS: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ModerationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Approved and rejected are terminal; a record is moderated exactly once.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// One stored photo entry. `storage_path` and `created_at` are immutable after
/// creation; `status` is the only field the moderation gate may change.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SubmissionRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub display_name: String,
    pub instagram: Option<String>,
    pub caption: Option<String>,
    pub pet_name: Option<String>,
    pub pet_age: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub storage_path: String,
    pub status: ModerationStatus,
}

/// Raw form fields as the submission surface hands them over.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct SubmissionFields {
    pub display_name: String,
    pub instagram: Option<String>,
    pub caption: Option<String>,
    pub pet_name: Option<String>,
    pub pet_age: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
}

impl SubmissionFields {
    /// Trims every field, strips leading `@` from the handle, uppercases the
    /// region code, and caps the caption length. Empty optionals become `None`.
    pub fn normalized(&self) -> SubmissionFields {
        SubmissionFields {
            display_name: self.display_name.trim().to_string(),
            instagram: self.instagram.as_deref().and_then(clean_handle),
            caption: self
                .caption
                .as_deref()
                .and_then(non_empty)
                .map(|c| cap_chars(&c, MAX_CAPTION_CHARS)),
            pet_name: self.pet_name.as_deref().and_then(non_empty),
            pet_age: self.pet_age.as_deref().and_then(non_empty),
            city: self.city.as_deref().and_then(non_empty),
            region: self
                .region
                .as_deref()
                .and_then(non_empty)
                .map(|r| cap_chars(&r.to_uppercase(), MAX_REGION_CHARS)),
        }
    }
}

/// A record as handed to the record collaborator: the collaborator assigns
/// `id` and `created_at`, and the status always starts at `pending`.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct NewRecord {
    pub fields: SubmissionFields,
    pub storage_path: String,
}

/// Change notification from the record collection: insert carries only `new`,
/// delete only `old`, update both.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct ChangeEvent {
    pub old: Option<SubmissionRecord>,
    pub new: Option<SubmissionRecord>,
}

impl ChangeEvent {
    pub fn inserted(new: SubmissionRecord) -> Self {
        Self {
            old: None,
            new: Some(new),
        }
    }

    pub fn updated(old: SubmissionRecord, new: SubmissionRecord) -> Self {
        Self {
            old: Some(old),
            new: Some(new),
        }
    }

    pub fn deleted(old: SubmissionRecord) -> Self {
        Self {
            old: Some(old),
            new: None,
        }
    }

    /// The row the event is about: the after-image when present, else the
    /// before-image (deletes).
    pub fn row(&self) -> Option<&SubmissionRecord> {
        self.new.as_ref().or(self.old.as_ref())
    }

    /// Parses the wire shape delivered by the realtime transport.
    pub fn from_payload(value: &serde_json::Value) -> MuralResult<Self> {
        serde_json::from_value(value.clone())
            .map_err(|e| MuralError::validation(format!("malformed change payload: {e}")))
    }
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn clean_handle(s: &str) -> Option<String> {
    let trimmed = s.trim().trim_start_matches('@');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn cap_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
