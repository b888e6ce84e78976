//! Separable Gaussian blur for the ambient background layer.
//!
//! Fixed-point Q16 weights keep the result identical across platforms, which
//! the compositor's determinism contract depends on.

use image::RgbaImage;

use crate::error::{MuralError, MuralResult};

/// Largest radius the compositor will ever ask for.
pub const MAX_BLUR_RADIUS: u32 = 256;

/// Blurs the image in place. `radius == 0` is the identity. Edge pixels are
/// clamped (replicated), so a constant image stays constant.
pub fn gaussian_blur(img: &mut RgbaImage, radius: u32, sigma: f32) -> MuralResult<()> {
    if radius == 0 {
        return Ok(());
    }
    if radius > MAX_BLUR_RADIUS {
        return Err(MuralError::validation(format!(
            "blur radius must be <= {MAX_BLUR_RADIUS}"
        )));
    }

    let kernel = kernel_q16(radius, sigma)?;
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return Ok(());
    }

    let mut tmp = vec![0u8; img.as_raw().len()];
    pass(img.as_raw(), &mut tmp, w, h, &kernel, Axis::Horizontal);
    pass(&tmp, &mut *img, w, h, &kernel, Axis::Vertical);
    Ok(())
}

#[derive(Clone, Copy)]
enum Axis {
    Horizontal,
    Vertical,
}

/// Normalized kernel in Q16 fixed point; weights always sum to exactly 2^16.
fn kernel_q16(radius: u32, sigma: f32) -> MuralResult<Vec<u32>> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(MuralError::validation("blur sigma must be > 0"));
    }

    let r = radius as i32;
    let sigma = f64::from(sigma);
    let denom = 2.0 * sigma * sigma;
    let raw: Vec<f64> = (-r..=r)
        .map(|i| {
            let x = f64::from(i);
            (-x * x / denom).exp()
        })
        .collect();
    let sum: f64 = raw.iter().sum();

    let mut weights: Vec<u32> = raw
        .iter()
        .map(|w| (((w / sum) * 65536.0).round() as i64).clamp(0, 65536) as u32)
        .collect();

    // Push rounding drift into the center tap so the total stays 2^16.
    let acc: i64 = weights.iter().map(|&w| i64::from(w)).sum();
    let mid = weights.len() / 2;
    weights[mid] = (i64::from(weights[mid]) + (65536 - acc)).clamp(0, 65536) as u32;
    Ok(weights)
}

fn pass(src: &[u8], dst: &mut [u8], w: u32, h: u32, kernel: &[u32], axis: Axis) {
    let radius = (kernel.len() / 2) as i32;
    let (w, h) = (w as i32, h as i32);
    let (span, lanes) = match axis {
        Axis::Horizontal => (w, h),
        Axis::Vertical => (h, w),
    };

    for lane in 0..lanes {
        for pos in 0..span {
            let mut acc = [0u64; 4];
            for (ki, &kw) in kernel.iter().enumerate() {
                let tap = (pos + ki as i32 - radius).clamp(0, span - 1);
                let idx = match axis {
                    Axis::Horizontal => (lane * w + tap) as usize * 4,
                    Axis::Vertical => (tap * w + lane) as usize * 4,
                };
                for c in 0..4 {
                    acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                }
            }
            let out = match axis {
                Axis::Horizontal => (lane * w + pos) as usize * 4,
                Axis::Vertical => (pos * w + lane) as usize * 4,
            };
            for c in 0..4 {
                dst[out + c] = (((acc[c] + 32768) >> 16).min(255)) as u8;
            }
        }
    }
}
