//! Deployment knobs for one wall installation.

use std::time::Duration;

use crate::frame::{FrameOptions, JPEG_QUALITY};

pub const DEFAULT_SLIDE_INTERVAL: Duration = Duration::from_secs(7);
pub const DEFAULT_QUEUE_CAP: usize = 120;
pub const DEFAULT_PENDING_LIMIT: usize = 80;
pub const DEFAULT_OUTPUT_W: u32 = 1920;
pub const DEFAULT_OUTPUT_H: u32 = 1080;
pub const DEFAULT_MAX_SOURCE_W: u32 = 1920;

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct WallConfig {
    /// How long each photo stays on the wall before rotating.
    #[serde(with = "humantime_serde")]
    pub slide_interval: Duration,
    /// Rotation queue bound N; oldest entries are evicted beyond it.
    pub queue_cap: usize,
    /// Page size for the moderation surface's pending list.
    pub pending_limit: usize,
    pub output_w: u32,
    pub output_h: u32,
    /// Sources wider/taller than this are downscaled before composition.
    pub max_source_width: u32,
    pub jpeg_quality: u8,
}

impl Default for WallConfig {
    fn default() -> Self {
        Self {
            slide_interval: DEFAULT_SLIDE_INTERVAL,
            queue_cap: DEFAULT_QUEUE_CAP,
            pending_limit: DEFAULT_PENDING_LIMIT,
            output_w: DEFAULT_OUTPUT_W,
            output_h: DEFAULT_OUTPUT_H,
            max_source_width: DEFAULT_MAX_SOURCE_W,
            jpeg_quality: JPEG_QUALITY,
        }
    }
}

impl WallConfig {
    /// Defaults overridden by `MURAL_*` environment variables. Unparsable or
    /// non-positive values are ignored with a warning, keeping the default.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(ms) = env_positive::<u64>("MURAL_SLIDE_MS") {
            cfg.slide_interval = Duration::from_millis(ms);
        }
        if let Some(cap) = env_positive::<usize>("MURAL_QUEUE_CAP") {
            cfg.queue_cap = cap;
        }
        if let Some(limit) = env_positive::<usize>("MURAL_PENDING_LIMIT") {
            cfg.pending_limit = limit;
        }
        if let Some(w) = env_positive::<u32>("MURAL_OUTPUT_W") {
            cfg.output_w = w;
        }
        if let Some(h) = env_positive::<u32>("MURAL_OUTPUT_H") {
            cfg.output_h = h;
        }
        if let Some(w) = env_positive::<u32>("MURAL_MAX_SOURCE_W") {
            cfg.max_source_width = w;
        }
        cfg
    }

    /// Frame options sized for this deployment, with default framing.
    pub fn frame_options(&self) -> FrameOptions {
        FrameOptions {
            output_w: self.output_w,
            output_h: self.output_h,
            ..FrameOptions::default()
        }
    }
}

fn env_positive<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    let raw = std::env::var(key).ok()?;
    let parsed = parse_positive(&raw);
    if parsed.is_none() {
        tracing::warn!(key, value = %raw, "ignoring invalid config override");
    }
    parsed
}

fn parse_positive<T>(raw: &str) -> Option<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match raw.trim().parse::<T>() {
        Ok(v) if v > T::default() => Some(v),
        _ => None,
    }
}
