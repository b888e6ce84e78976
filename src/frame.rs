//! The frame compositor: normalizes an arbitrary photo into the fixed-aspect
//! display frame the live wall shows.
//!
//! The pipeline is staged and pure — no IO, no hidden state. Given the same
//! source pixels and the same options, [`compose`] always produces the same
//! layout and the same pixels. [`layout`] exposes the geometry on its own so
//! it can be tested without touching pixels.

use std::io::Cursor;

use image::{DynamicImage, RgbaImage, imageops};

use crate::{
    blur,
    composite,
    error::{MuralError, MuralResult},
};

/// Frame background, a near-black charcoal.
pub const BACKGROUND_RGBA: [u8; 4] = [5, 5, 5, 255];

pub const ZOOM_MIN: f32 = 1.0;
pub const ZOOM_MAX: f32 = 2.5;

/// Default JPEG quality for the composed frame (0.9 on the canvas scale).
pub const JPEG_QUALITY: u8 = 90;

// Ambient letterbox fill: a cover-scaled copy of the photo, heavily blurred,
// dimmed, and drawn translucently, then settled with a vertical vignette.
const AMBIENT_BLUR_RADIUS: u32 = 36;
const AMBIENT_BRIGHTNESS: f32 = 0.45;
const AMBIENT_OPACITY: f32 = 0.55;
const VIGNETTE_TOP: f32 = 0.20;
const VIGNETTE_MID: f32 = 0.06;
const VIGNETTE_BOTTOM: f32 = 0.22;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    /// Whole photo visible; letterbox bars filled with the ambient layer.
    #[default]
    Contain,
    /// Photo fills the frame; edges may crop.
    Cover,
}

/// Per-submission composition parameters, chosen by the submitter while
/// previewing and discarded once the output image exists.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FrameOptions {
    pub fit_mode: FitMode,
    /// Extra magnification on top of the fit scale, clamped to [1.0, 2.5].
    pub zoom: f32,
    /// Focal point as a percentage of the source, 0..=100. 50 centers.
    pub offset_x: f32,
    pub offset_y: f32,
    pub output_w: u32,
    pub output_h: u32,
}

impl Default for FrameOptions {
    fn default() -> Self {
        Self {
            fit_mode: FitMode::Contain,
            zoom: 1.0,
            offset_x: 50.0,
            offset_y: 50.0,
            output_w: 1920,
            output_h: 1080,
        }
    }
}

impl FrameOptions {
    pub fn validate(&self) -> MuralResult<()> {
        if self.output_w == 0 || self.output_h == 0 {
            return Err(MuralError::validation("output width/height must be > 0"));
        }
        if !self.zoom.is_finite() {
            return Err(MuralError::validation("zoom must be finite"));
        }
        if !self.offset_x.is_finite() || !self.offset_y.is_finite() {
            return Err(MuralError::validation("focal offsets must be finite"));
        }
        Ok(())
    }
}

/// A placement rectangle in output-frame coordinates. Origins may be negative
/// when the drawn image overflows the frame (cover fit, zoom).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawRect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

/// Resolved geometry for one composition: where the ambient fill (contain
/// mode only) and the photo itself land in the frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameLayout {
    pub ambient: Option<DrawRect>,
    pub photo: DrawRect,
}

/// Computes the deterministic placement geometry for a source of the given
/// dimensions. Fails with `InvalidImage` on a zero-sized source.
pub fn layout(src_w: u32, src_h: u32, options: &FrameOptions) -> MuralResult<FrameLayout> {
    options.validate()?;
    if src_w == 0 || src_h == 0 {
        return Err(MuralError::invalid_image(
            "source image has a zero dimension",
        ));
    }

    let (fw, fh) = (options.output_w as f32, options.output_h as f32);
    let (sw, sh) = (src_w as f32, src_h as f32);

    let cover_scale = (fw / sw).max(fh / sh);
    let ambient = match options.fit_mode {
        FitMode::Contain => {
            let (bw, bh) = (sw * cover_scale, sh * cover_scale);
            Some(DrawRect {
                x: (fw - bw) * 0.5,
                y: (fh - bh) * 0.5,
                w: bw,
                h: bh,
            })
        }
        FitMode::Cover => None,
    };

    let base_scale = match options.fit_mode {
        FitMode::Cover => cover_scale,
        FitMode::Contain => (fw / sw).min(fh / sh),
    };
    let scale = base_scale * options.zoom.clamp(ZOOM_MIN, ZOOM_MAX);
    let (dw, dh) = (sw * scale, sh * scale);

    let px = options.offset_x.clamp(0.0, 100.0) / 100.0;
    let py = options.offset_y.clamp(0.0, 100.0) / 100.0;
    let photo = DrawRect {
        x: (fw - dw) * px,
        y: (fh - dh) * py,
        w: dw,
        h: dh,
    };

    Ok(FrameLayout { ambient, photo })
}

/// Composes the source into a `output_w x output_h` frame.
pub fn compose(src: &RgbaImage, options: &FrameOptions) -> MuralResult<RgbaImage> {
    let lay = layout(src.width(), src.height(), options)?;

    let mut out = RgbaImage::from_pixel(
        options.output_w,
        options.output_h,
        image::Rgba(BACKGROUND_RGBA),
    );

    if let Some(rect) = lay.ambient {
        let mut layer = RgbaImage::new(options.output_w, options.output_h);
        blit(&mut layer, &scaled(src, rect), rect, false);
        blur::gaussian_blur(
            &mut layer,
            AMBIENT_BLUR_RADIUS,
            AMBIENT_BLUR_RADIUS as f32 / 2.0,
        )?;
        composite::dim(&mut layer, AMBIENT_BRIGHTNESS);
        composite::blend_over(&mut out, &layer, AMBIENT_OPACITY)?;
        composite::vertical_vignette(&mut out, VIGNETTE_TOP, VIGNETTE_MID, VIGNETTE_BOTTOM);
    }

    blit(&mut out, &scaled(src, lay.photo), lay.photo, true);
    Ok(out)
}

/// Encodes a composed frame as JPEG. Alpha is flattened (the frame is opaque
/// by construction).
pub fn encode_jpeg(img: &RgbaImage, quality: u8) -> MuralResult<Vec<u8>> {
    let rgb = DynamicImage::ImageRgba8(img.clone()).to_rgb8();
    let mut buf = Vec::new();
    let encoder =
        image::codecs::jpeg::JpegEncoder::new_with_quality(Cursor::new(&mut buf), quality);
    rgb.write_with_encoder(encoder)
        .map_err(|e| MuralError::processing_unavailable(format!("jpeg encode failed: {e}")))?;
    Ok(buf)
}

fn scaled(src: &RgbaImage, rect: DrawRect) -> RgbaImage {
    let w = (rect.w.round() as i64).max(1) as u32;
    let h = (rect.h.round() as i64).max(1) as u32;
    if (w, h) == src.dimensions() {
        src.clone()
    } else {
        imageops::resize(src, w, h, imageops::FilterType::Triangle)
    }
}

/// Draws `img` into `dst` with its top-left corner at the rect origin,
/// clipping whatever falls outside the frame. `alpha_blend` selects between
/// source-over (foreground, which may carry transparency) and straight copy
/// (building the ambient layer on a transparent canvas).
fn blit(dst: &mut RgbaImage, img: &RgbaImage, rect: DrawRect, alpha_blend: bool) {
    let ox = rect.x.round() as i64;
    let oy = rect.y.round() as i64;

    let x0 = ox.max(0);
    let y0 = oy.max(0);
    let x1 = (ox + i64::from(img.width())).min(i64::from(dst.width()));
    let y1 = (oy + i64::from(img.height())).min(i64::from(dst.height()));

    for y in y0..y1 {
        for x in x0..x1 {
            let sx = (x - ox) as u32;
            let sy = (y - oy) as u32;
            let s = img.get_pixel(sx, sy).0;
            let d = dst.get_pixel_mut(x as u32, y as u32);
            if alpha_blend {
                d.0 = composite::over(d.0, s, 1.0);
            } else {
                d.0 = s;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(fit: FitMode, out_w: u32, out_h: u32) -> FrameOptions {
        FrameOptions {
            fit_mode: fit,
            output_w: out_w,
            output_h: out_h,
            ..FrameOptions::default()
        }
    }

    #[test]
    fn layout_rejects_zero_source() {
        let err = layout(0, 10, &FrameOptions::default()).unwrap_err();
        assert!(matches!(err, MuralError::InvalidImage(_)));
    }

    #[test]
    fn layout_rejects_zero_output() {
        let bad = FrameOptions {
            output_w: 0,
            ..FrameOptions::default()
        };
        assert!(layout(10, 10, &bad).is_err());
    }

    #[test]
    fn cover_centered_fills_frame_exactly() {
        // 16:9 source into a 16:9 frame at zoom 1: photo rect == frame.
        let lay = layout(160, 90, &opts(FitMode::Cover, 1920, 1080)).unwrap();
        assert!(lay.ambient.is_none());
        assert_eq!(lay.photo, DrawRect {
            x: 0.0,
            y: 0.0,
            w: 1920.0,
            h: 1080.0
        });
    }

    #[test]
    fn cover_crops_portrait_source() {
        // Portrait into landscape: width fills, height overflows symmetrically.
        let lay = layout(100, 200, &opts(FitMode::Cover, 1000, 500)).unwrap();
        assert_eq!(lay.photo.w, 1000.0);
        assert_eq!(lay.photo.h, 2000.0);
        assert_eq!(lay.photo.x, 0.0);
        assert_eq!(lay.photo.y, (500.0 - 2000.0) * 0.5);
    }

    #[test]
    fn contain_letterboxes_portrait_source() {
        let lay = layout(100, 200, &opts(FitMode::Contain, 1000, 500)).unwrap();
        // Fits by height; centered horizontally.
        assert_eq!(lay.photo.h, 500.0);
        assert_eq!(lay.photo.w, 250.0);
        assert_eq!(lay.photo.x, (1000.0 - 250.0) * 0.5);
        // Ambient layer cover-fills the whole frame.
        let amb = lay.ambient.unwrap();
        assert!(amb.w >= 1000.0 && amb.h >= 500.0);
        assert!(amb.x <= 0.0 && amb.y <= 0.0);
    }

    #[test]
    fn zoom_is_clamped() {
        let base = layout(100, 100, &opts(FitMode::Cover, 500, 500)).unwrap();
        let zoomed = layout(100, 100, &FrameOptions {
            zoom: 99.0,
            ..opts(FitMode::Cover, 500, 500)
        })
        .unwrap();
        assert_eq!(zoomed.photo.w, base.photo.w * ZOOM_MAX);
    }

    #[test]
    fn offset_moves_focal_region() {
        let o = FrameOptions {
            fit_mode: FitMode::Cover,
            zoom: 2.0,
            output_w: 100,
            output_h: 100,
            ..FrameOptions::default()
        };
        let left = layout(100, 100, &FrameOptions { offset_x: 0.0, ..o }).unwrap();
        let right = layout(100, 100, &FrameOptions {
            offset_x: 100.0,
            ..o
        })
        .unwrap();
        assert_eq!(left.photo.x, 0.0);
        assert!(right.photo.x < left.photo.x);
    }

    #[test]
    fn layout_is_deterministic() {
        let o = opts(FitMode::Contain, 640, 360);
        assert_eq!(layout(123, 77, &o).unwrap(), layout(123, 77, &o).unwrap());
    }

    #[test]
    fn compose_cover_leaves_no_background() {
        let src = RgbaImage::from_pixel(32, 18, image::Rgba([250, 10, 10, 255]));
        let out = compose(&src, &opts(FitMode::Cover, 64, 36)).unwrap();
        assert!(out.pixels().all(|px| px.0 != BACKGROUND_RGBA));
    }

    #[test]
    fn compose_contain_fills_bars_with_ambient() {
        // Bright square source in a wide frame: the letterbox columns must not
        // be the flat background color because the blurred photo bleeds there.
        let src = RgbaImage::from_pixel(20, 20, image::Rgba([240, 240, 240, 255]));
        let out = compose(&src, &opts(FitMode::Contain, 80, 40)).unwrap();
        let bar_px = out.get_pixel(2, 20).0;
        assert_ne!(bar_px, BACKGROUND_RGBA);
    }

    #[test]
    fn encode_jpeg_produces_bytes() {
        let src = RgbaImage::from_pixel(8, 8, image::Rgba([90, 120, 30, 255]));
        let bytes = encode_jpeg(&src, JPEG_QUALITY).unwrap();
        assert!(!bytes.is_empty());
        // JPEG SOI marker.
        assert_eq!(&bytes[0..2], &[0xFF, 0xD8]);
    }
}
