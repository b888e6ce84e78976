//! The submission pipeline: one user-chosen file plus form fields in, one
//! stored pending record out.

use chrono::{DateTime, Utc};
use image::{RgbaImage, imageops};

use crate::{
    config::WallConfig,
    error::{MuralError, MuralResult},
    frame::{self, FrameOptions},
    model::{NewRecord, SubmissionFields},
    ports::{BlobStore, RecordStore},
};

/// Storage keys embed at most this much of the sanitized display name.
const KEY_NAME_CHARS: usize = 40;

/// A file as received from the submission surface.
#[derive(Clone, Debug)]
pub struct UploadFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

pub struct SubmissionPipeline<R, B> {
    records: R,
    blobs: B,
    config: WallConfig,
}

impl<R: RecordStore, B: BlobStore> SubmissionPipeline<R, B> {
    pub fn new(records: R, blobs: B, config: WallConfig) -> Self {
        Self {
            records,
            blobs,
            config,
        }
    }

    /// Validates, frames, uploads, and records one submission, returning the
    /// new record's id. Upload and insert are not transactional: an insert
    /// failure after a successful upload leaves an orphaned asset behind.
    #[tracing::instrument(skip(self, upload, fields, options), fields(file = %upload.name))]
    pub async fn submit(
        &self,
        upload: &UploadFile,
        fields: SubmissionFields,
        options: FrameOptions,
    ) -> MuralResult<String> {
        if !upload.content_type.starts_with("image/") {
            return Err(MuralError::unsupported_media_type(
                upload.content_type.clone(),
            ));
        }

        let fields = fields.normalized();
        if fields.display_name.is_empty() {
            return Err(MuralError::required_field("display name"));
        }

        let decoded = image::load_from_memory(&upload.bytes)
            .map_err(|e| MuralError::invalid_image(format!("decode failed: {e}")))?
            .to_rgba8();
        let source = shrink_source(decoded, self.config.max_source_width);

        let framed = frame::compose(&source, &options)?;
        let jpeg = frame::encode_jpeg(&framed, self.config.jpeg_quality)?;

        let key = storage_key(&fields.display_name, Utc::now());
        self.blobs.upload(&key, jpeg, "image/jpeg").await?;

        let record = self
            .records
            .insert(NewRecord {
                fields,
                storage_path: key.clone(),
            })
            .await?;

        tracing::info!(id = %record.id, key = %key, "submission stored as pending");
        Ok(record.id)
    }
}

/// Bounds composition cost: downscales so the longest side is at most
/// `max_side`, preserving aspect ratio. Smaller sources pass through.
fn shrink_source(img: RgbaImage, max_side: u32) -> RgbaImage {
    let (w, h) = img.dimensions();
    let longest = w.max(h);
    if max_side == 0 || longest <= max_side {
        return img;
    }
    let scale = max_side as f32 / longest as f32;
    let nw = ((w as f32 * scale).round() as u32).max(1);
    let nh = ((h as f32 * scale).round() as u32).max(1);
    imageops::resize(&img, nw, nh, imageops::FilterType::Triangle)
}

/// Collision-resistant storage key: millisecond timestamp plus a sanitized
/// slice of the display name, parked under the `pending/` prefix.
fn storage_key(display_name: &str, at: DateTime<Utc>) -> String {
    let safe: String = display_name
        .chars()
        .take(KEY_NAME_CHARS)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let safe = if safe.is_empty() {
        "guest".to_string()
    } else {
        safe
    };
    format!("pending/{}_{}.jpg", at.timestamp_millis(), safe)
}
