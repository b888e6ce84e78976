//! Pixel-level blending helpers for the frame compositor.
//!
//! Everything here works on straight-alpha RGBA8. The display frame the
//! compositor builds is always opaque, so `over` keeps the destination alpha
//! saturated rather than tracking a full premultiplied pipeline.

use image::RgbaImage;

use crate::error::{MuralError, MuralResult};

pub type Rgba8 = [u8; 4];

/// Source-over blend of one straight-alpha pixel, with an extra opacity
/// factor applied to the source.
pub fn over(dst: Rgba8, src: Rgba8, opacity: f32) -> Rgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }

    let inv = 255u16 - u16::from(sa);
    let mut out = [0u8; 4];
    out[3] = u16::from(sa)
        .saturating_add(u16::from(mul_div255(u16::from(dst[3]), inv)))
        .min(255) as u8;
    for i in 0..3 {
        let sc = mul_div255(u16::from(src[i]), u16::from(sa));
        let dc = mul_div255(u16::from(dst[i]), inv);
        out[i] = sc.saturating_add(dc);
    }
    out
}

/// Blends `src` over `dst` at the given opacity. Both images must have the
/// same dimensions.
pub fn blend_over(dst: &mut RgbaImage, src: &RgbaImage, opacity: f32) -> MuralResult<()> {
    if dst.dimensions() != src.dimensions() {
        return Err(MuralError::processing_unavailable(
            "blend_over expects equal-sized layers",
        ));
    }
    for (d, s) in dst.pixels_mut().zip(src.pixels()) {
        d.0 = over(d.0, s.0, opacity);
    }
    Ok(())
}

/// Multiplies the color channels by `factor`, leaving alpha untouched.
/// `factor` below 1.0 darkens; values above 1.0 are clamped per channel.
pub fn dim(img: &mut RgbaImage, factor: f32) {
    let factor = factor.max(0.0);
    for px in img.pixels_mut() {
        for c in 0..3 {
            px.0[c] = ((f32::from(px.0[c]) * factor).round() as i32).clamp(0, 255) as u8;
        }
    }
}

/// Darkens the frame with a vertical gradient: `top`/`mid`/`bottom` are black
/// opacities at rows 0, height/2, and height-1, linearly interpolated between
/// the stops. Used to settle the ambient letterbox fill behind the photo.
pub fn vertical_vignette(img: &mut RgbaImage, top: f32, mid: f32, bottom: f32) {
    let h = img.height();
    if h == 0 {
        return;
    }
    for y in 0..h {
        let t = if h == 1 {
            0.5
        } else {
            y as f32 / (h - 1) as f32
        };
        let alpha = if t < 0.5 {
            lerp(top, mid, t * 2.0)
        } else {
            lerp(mid, bottom, (t - 0.5) * 2.0)
        };
        let shade = [0u8, 0, 0, ((alpha.clamp(0.0, 1.0) * 255.0).round()) as u8];
        for x in 0..img.width() {
            let px = img.get_pixel_mut(x, y);
            px.0 = over(px.0, shade, 1.0);
        }
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t.clamp(0.0, 1.0)
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}
