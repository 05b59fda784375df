//! Arbitrary-angle rotation.
//!
//! Output geometry is the tight bounding box of the rotated frame;
//! each output pixel is inverse-mapped into the source and sampled
//! bilinearly. Pixels that map outside the source come out black.

use crate::response::{FilterRequest, FilterResponse};
use crate::stage::{forward_changes, ChangedFlags, FilterStage, StageCore};
use rawflow_core::ImageHp;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use std::sync::{Arc, Mutex};

/// Bounding-box dimensions of a `w` x `h` frame rotated by `degrees`.
fn rotated_dimensions(w: u32, h: u32, degrees: f64) -> (u32, u32) {
    let rad = degrees.to_radians();
    let (sin, cos) = (rad.sin().abs(), rad.cos().abs());
    let rw = (w as f64 * cos + h as f64 * sin).round() as u32;
    let rh = (w as f64 * sin + h as f64 * cos).round() as u32;
    (rw.max(1), rh.max(1))
}

/// Bilinear sample at fractional source coordinates; black outside.
fn sample(image: &ImageHp, x: f64, y: f64) -> [u16; 3] {
    let (w, h) = image.dimensions();
    if x < 0.0 || y < 0.0 {
        return [0; 3];
    }
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    if x0 >= w || y0 >= h {
        return [0; 3];
    }
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let fetch = |px: u32, py: u32| -> [f64; 3] {
        let row = image.row(py);
        let i = px as usize * 3;
        [row[i] as f64, row[i + 1] as f64, row[i + 2] as f64]
    };
    let p00 = fetch(x0, y0);
    let p10 = fetch(x1, y0);
    let p01 = fetch(x0, y1);
    let p11 = fetch(x1, y1);

    let mut out = [0u16; 3];
    for c in 0..3 {
        let top = p00[c] * (1.0 - fx) + p10[c] * fx;
        let bottom = p01[c] * (1.0 - fx) + p11[c] * fx;
        let v = top * (1.0 - fy) + bottom * fy;
        out[c] = v.round().clamp(0.0, u16::MAX as f64) as u16;
    }
    out
}

fn rotate_row(
    dst: &mut [u16],
    y: u32,
    image: &ImageHp,
    sin: f64,
    cos: f64,
    out_center: (f64, f64),
    src_center: (f64, f64),
) {
    let dy = y as f64 + 0.5 - out_center.1;
    for (x, px) in dst.chunks_exact_mut(3).enumerate() {
        let dx = x as f64 + 0.5 - out_center.0;
        // inverse rotation back into the source frame
        let sx = dx * cos + dy * sin + src_center.0 - 0.5;
        let sy = -dx * sin + dy * cos + src_center.1 - 0.5;
        px.copy_from_slice(&sample(image, sx, sy));
    }
}

fn rotate(image: &ImageHp, degrees: f64) -> ImageHp {
    let (w, h) = image.dimensions();
    let (rw, rh) = rotated_dimensions(w, h, degrees);
    let rad = degrees.to_radians();
    let (sin, cos) = (rad.sin(), rad.cos());
    let out_center = (rw as f64 / 2.0, rh as f64 / 2.0);
    let src_center = (w as f64 / 2.0, h as f64 / 2.0);

    let mut out = ImageHp::new(rw, rh);
    let row_len = rw as usize * 3;
    let buf = out.make_mut();

    #[cfg(feature = "parallel")]
    buf.par_chunks_mut(row_len).enumerate().for_each(|(y, dst)| {
        rotate_row(dst, y as u32, image, sin, cos, out_center, src_center)
    });

    #[cfg(not(feature = "parallel"))]
    for (y, dst) in buf.chunks_mut(row_len).enumerate() {
        rotate_row(dst, y as u32, image, sin, cos, out_center, src_center);
    }

    out
}

/// Rotates the frame by an arbitrary angle (degrees, clockwise).
pub struct RotateStage {
    core: StageCore,
    degrees: Mutex<f64>,
}

impl RotateStage {
    /// A rotation stage starting at 0 degrees (pass-through).
    pub fn new(previous: Arc<dyn FilterStage>) -> Arc<Self> {
        let stage = Arc::new(Self {
            core: StageCore::chained(Arc::clone(&previous)),
            degrees: Mutex::new(0.0),
        });
        forward_changes(&Arc::downgrade(&stage), &previous);
        stage
    }

    fn angle(&self) -> f64 {
        let degrees = self.degrees.lock().unwrap_or_else(|e| e.into_inner());
        degrees.rem_euclid(360.0)
    }

    /// Sets the angle; announces that both pixels and geometry moved.
    pub fn set_angle(&self, degrees: f64) {
        {
            let mut current = self.degrees.lock().unwrap_or_else(|e| e.into_inner());
            if *current == degrees {
                return;
            }
            *current = degrees;
        }
        self.changed(ChangedFlags::PIXEL_DATA | ChangedFlags::DIMENSIONS);
    }
}

impl FilterStage for RotateStage {
    fn name(&self) -> &'static str {
        "rotate"
    }

    fn core(&self) -> &StageCore {
        &self.core
    }

    fn get_image(&self, request: &FilterRequest) -> FilterResponse {
        // an ROI stated in output coordinates does not map back to an
        // upstream rectangle once rotated, so pull the full frame
        let upstream_request = if self.angle() == 0.0 {
            *request
        } else {
            FilterRequest {
                roi: None,
                quick: request.quick,
            }
        };
        let upstream = match self.core.previous() {
            Some(prev) => prev.get_image(&upstream_request),
            None => FilterResponse::new(),
        };
        let degrees = self.angle();
        if degrees == 0.0 {
            return upstream;
        }
        let Some(image) = upstream.image() else {
            return upstream;
        };

        let rotated = rotate(image, degrees);
        let mut resp = upstream.clone();
        resp.set_image(rotated);
        resp
    }

    fn width(&self) -> u32 {
        match self.core.previous() {
            Some(prev) => rotated_dimensions(prev.width(), prev.height(), self.angle()).0,
            None => 0,
        }
    }

    fn height(&self) -> u32 {
        match self.core.previous() {
            Some(prev) => rotated_dimensions(prev.width(), prev.height(), self.angle()).1,
            None => 0,
        }
    }
}
