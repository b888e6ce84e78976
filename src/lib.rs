//! Mural is the engine behind a pet-photo live wall: visitors submit a
//! photo with a few details, an operator approves or rejects it, and a
//! venue screen rotates through the approved set in near real time.
//!
//! The crate splits into three surfaces around a shared record store:
//!
//! - [`SubmissionPipeline`]: validate, frame, and store one submission
//! - [`ModerationGate`]: credentialed approve/reject decisions
//! - [`RotationQueue`]: the display-side state machine behind the wall
//!
//! Image framing itself is pure and deterministic; see [`frame`].
#![forbid(unsafe_code)]

pub mod blur;
pub mod composite;
pub mod config;
pub mod error;
pub mod frame;
pub mod memory;
pub mod model;
pub mod moderate;
pub mod overlay;
pub mod ports;
pub mod rotation;
pub mod submit;

pub use crate::config::WallConfig;
pub use crate::error::{MuralError, MuralResult};
pub use crate::frame::{FitMode, FrameLayout, FrameOptions, compose, encode_jpeg, layout};
pub use crate::memory::{MemoryBlobStore, MemoryRecordStore};
pub use crate::model::{
    ChangeEvent, ModerationStatus, NewRecord, SubmissionFields, SubmissionRecord,
};
pub use crate::moderate::ModerationGate;
pub use crate::overlay::OverlayText;
pub use crate::ports::{BlobStore, RecordStore};
pub use crate::rotation::{DisplayFrame, QueueItem, RotationHandle, RotationQueue, RotationState};
pub use crate::submit::{SubmissionPipeline, UploadFile};
