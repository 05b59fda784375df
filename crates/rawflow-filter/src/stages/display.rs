//! High-precision to display-precision conversion.
//!
//! [`DisplayStage`] answers [`get_image8`](crate::FilterStage::get_image8)
//! by pulling the high-precision render from upstream and encoding it
//! down to 8 bits per channel with a transfer curve. The curve comes
//! from the stage's own override if set, else from the
//! `embedded-colorspace` side-channel parameter, else sRGB.
//!
//! High-precision pulls pass straight through, so the stage can sit
//! permanently in a chain that also feeds an exporter.

use crate::response::{FilterRequest, FilterResponse, PARAM_EMBEDDED_COLORSPACE};
use crate::stage::{forward_changes, ChangedFlags, FilterStage, StageCore};
use rawflow_color::TransferCurve;
use rawflow_core::{Image8, ImageHp};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use std::sync::{Arc, Mutex};

fn encode_row(src: &[u16], dst: &mut [u8], curve: TransferCurve) {
    for (s, d) in src.iter().zip(dst.iter_mut()) {
        let linear = *s as f32 / u16::MAX as f32;
        let encoded = curve.encode(linear);
        *d = (encoded * 255.0 + 0.5).clamp(0.0, 255.0) as u8;
    }
}

fn encode(image: &ImageHp, curve: TransferCurve) -> Image8 {
    let (w, h) = image.dimensions();
    let mut out = Image8::new(w, h);
    let row_len = w as usize * 3;
    let buf = out.make_mut();

    #[cfg(feature = "parallel")]
    buf.par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, dst)| encode_row(image.row(y as u32), dst, curve));

    #[cfg(not(feature = "parallel"))]
    for (y, dst) in buf.chunks_mut(row_len).enumerate() {
        encode_row(image.row(y as u32), dst, curve);
    }

    out
}

/// Encodes the high-precision render down to 8 bits for display.
pub struct DisplayStage {
    core: StageCore,
    curve_override: Mutex<Option<TransferCurve>>,
}

impl DisplayStage {
    /// A display stage deriving its curve from the response metadata.
    pub fn new(previous: Arc<dyn FilterStage>) -> Arc<Self> {
        let stage = Arc::new(Self {
            core: StageCore::chained(Arc::clone(&previous)),
            curve_override: Mutex::new(None),
        });
        forward_changes(&Arc::downgrade(&stage), &previous);
        stage
    }

    /// Forces a specific curve regardless of the embedded space;
    /// `None` returns to metadata-driven selection.
    pub fn set_curve(&self, curve: Option<TransferCurve>) {
        {
            let mut stored = self.curve_override.lock().unwrap_or_else(|e| e.into_inner());
            *stored = curve;
        }
        self.changed(ChangedFlags::PIXEL_DATA);
    }

    fn pick_curve(&self, upstream: &FilterResponse) -> TransferCurve {
        let stored = self.curve_override.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(curve) = *stored {
            return curve;
        }
        upstream
            .param_space(PARAM_EMBEDDED_COLORSPACE)
            .map(|space| space.transfer())
            .unwrap_or(TransferCurve::Srgb)
    }
}

impl FilterStage for DisplayStage {
    fn name(&self) -> &'static str {
        "display"
    }

    fn core(&self) -> &StageCore {
        &self.core
    }

    fn get_image8(&self, request: &FilterRequest) -> FilterResponse {
        let upstream = match self.core.previous() {
            Some(prev) => prev.get_image(request),
            None => FilterResponse::new(),
        };
        let Some(image) = upstream.image() else {
            return upstream;
        };

        let curve = self.pick_curve(&upstream);
        let encoded = encode(image, curve);

        let mut resp = upstream.clone();
        let (w, h) = (upstream.width(), upstream.height());
        resp.set_image8(encoded);
        resp.set_dimensions(w, h);
        resp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::SourceStage;
    use rawflow_color::lookup_or_create;

    #[test]
    fn test_srgb_default_encoding() {
        // mid-gray linear encodes well above mid under sRGB
        let src = SourceStage::with_image(ImageHp::filled(2, 2, [32768, 32768, 32768]));
        let display = DisplayStage::new(Arc::clone(&src) as Arc<dyn FilterStage>);
        let resp = display.get_image8(&FilterRequest::new());
        let px = resp.image8().unwrap().pixel(0, 0).unwrap();
        assert!(px[0] > 180 && px[0] < 195, "got {}", px[0]);
    }

    #[test]
    fn test_linear_override() {
        let src = SourceStage::with_image(ImageHp::filled(2, 2, [32768, 0, 65535]));
        let display = DisplayStage::new(Arc::clone(&src) as Arc<dyn FilterStage>);
        display.set_curve(Some(TransferCurve::Linear));
        let resp = display.get_image8(&FilterRequest::new());
        assert_eq!(resp.image8().unwrap().pixel(0, 0).unwrap(), [128, 0, 255]);
    }

    #[test]
    fn test_embedded_space_drives_curve() {
        let src = SourceStage::with_image(ImageHp::filled(2, 2, [16384, 16384, 16384]));
        src.set_embedded_colorspace(lookup_or_create("ProPhoto").unwrap());
        let display = DisplayStage::new(Arc::clone(&src) as Arc<dyn FilterStage>);
        let resp = display.get_image8(&FilterRequest::new());
        // ProPhoto is a pure 1.8 power law: 0.25^(1/1.8) * 255
        let expected = (0.25f32.powf(1.0 / 1.8) * 255.0 + 0.5) as u8;
        assert_eq!(resp.image8().unwrap().pixel(1, 1).unwrap()[0], expected);
    }

    #[test]
    fn test_extremes_map_exactly() {
        let src = SourceStage::with_image(ImageHp::filled(1, 2, [0, 65535, 0]));
        let display = DisplayStage::new(Arc::clone(&src) as Arc<dyn FilterStage>);
        let resp = display.get_image8(&FilterRequest::new());
        assert_eq!(resp.image8().unwrap().pixel(0, 0).unwrap(), [0, 255, 0]);
    }

    #[test]
    fn test_missing_input_passes_through() {
        let src = SourceStage::new();
        let display = DisplayStage::new(Arc::clone(&src) as Arc<dyn FilterStage>);
        let resp = display.get_image8(&FilterRequest::new());
        assert!(resp.image8().is_none());
    }
}
