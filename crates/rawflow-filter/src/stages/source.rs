//! The chain head.
//!
//! [`SourceStage`] owns the decoded sensor image and the metadata that
//! travels with it. It is where the side-channel starts: the embedded
//! color space, the premultiplication flag, and the diagonal-sensor
//! width are attached to every response so stages arbitrarily far
//! downstream can read them without a direct reference to the source.

use crate::response::{
    FilterRequest, FilterResponse, ParamValue, PARAM_EMBEDDED_COLORSPACE, PARAM_FUJI_WIDTH,
    PARAM_IS_PREMULTIPLIED,
};
use crate::stage::{ChangedFlags, FilterStage, StageCore};
use rawflow_color::ColorSpace;
use rawflow_core::ImageHp;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct SourceState {
    image: Option<ImageHp>,
    colorspace: Option<Arc<dyn ColorSpace>>,
    premultiplied: bool,
    fuji_width: Option<i64>,
}

/// Chain head holding the decoded image and its metadata.
pub struct SourceStage {
    core: StageCore,
    state: Mutex<SourceState>,
}

impl SourceStage {
    /// An empty source; pulls return an empty response until an image
    /// is loaded.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            core: StageCore::source(),
            state: Mutex::new(SourceState::default()),
        })
    }

    /// A source pre-loaded with an image.
    pub fn with_image(image: ImageHp) -> Arc<Self> {
        let stage = Self::new();
        {
            let mut state = stage.state.lock().unwrap_or_else(|e| e.into_inner());
            state.image = Some(image);
        }
        stage
    }

    /// Replaces the image; announces new pixels and geometry.
    pub fn set_image(&self, image: ImageHp) {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.image = Some(image);
        }
        self.changed(ChangedFlags::PIXEL_DATA | ChangedFlags::DIMENSIONS);
    }

    /// Tags the pixels with the color space they are encoded in.
    pub fn set_embedded_colorspace(&self, space: Arc<dyn ColorSpace>) {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.colorspace = Some(space);
        }
        self.changed(ChangedFlags::PIXEL_DATA);
    }

    /// Flags the channel values as premultiplied.
    pub fn set_premultiplied(&self, premultiplied: bool) {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.premultiplied = premultiplied;
        }
        self.changed(ChangedFlags::PIXEL_DATA);
    }

    /// Records the pre-rotation width of a diagonal-layout sensor.
    pub fn set_fuji_width(&self, width: Option<i64>) {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.fuji_width = width;
        }
        self.changed(ChangedFlags::PIXEL_DATA | ChangedFlags::DIMENSIONS);
    }
}

impl FilterStage for SourceStage {
    fn name(&self) -> &'static str {
        "source"
    }

    fn core(&self) -> &StageCore {
        &self.core
    }

    fn get_image(&self, request: &FilterRequest) -> FilterResponse {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let mut resp = FilterResponse::new();
        let Some(image) = state.image.as_ref() else {
            return resp;
        };

        match request.roi {
            Some(roi) => {
                let clipped = roi.clamped_to(&image.bounds());
                match image.crop(clipped) {
                    Ok(sub) => {
                        resp.set_image(sub);
                        resp.set_dimensions(image.width(), image.height());
                    }
                    Err(_) => resp.set_image(image.clone()),
                }
            }
            None => resp.set_image(image.clone()),
        }

        if let Some(space) = state.colorspace.as_ref() {
            resp.set_param(
                PARAM_EMBEDDED_COLORSPACE,
                ParamValue::Space(Arc::clone(space)),
            );
        }
        resp.set_param(
            PARAM_IS_PREMULTIPLIED,
            ParamValue::Bool(state.premultiplied),
        );
        if let Some(width) = state.fuji_width {
            resp.set_param(PARAM_FUJI_WIDTH, ParamValue::Int(width));
        }
        resp
    }

    fn width(&self) -> u32 {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.image.as_ref().map_or(0, |i| i.width())
    }

    fn height(&self) -> u32 {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.image.as_ref().map_or(0, |i| i.height())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rawflow_color::lookup_or_create;
    use rawflow_core::Rect;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_empty_source_degrades() {
        let src = SourceStage::new();
        let resp = src.get_image(&FilterRequest::new());
        assert!(resp.image().is_none());
        assert_eq!(src.width(), 0);
    }

    #[test]
    fn test_params_attached() {
        let src = SourceStage::with_image(ImageHp::new(10, 10));
        let space = lookup_or_create("sRGB").unwrap();
        src.set_embedded_colorspace(Arc::clone(&space));
        src.set_premultiplied(true);
        src.set_fuji_width(Some(3024));

        let resp = src.get_image(&FilterRequest::new());
        let tagged = resp.param_space(PARAM_EMBEDDED_COLORSPACE).unwrap();
        assert!(Arc::ptr_eq(&tagged, &space));
        assert_eq!(resp.param_bool(PARAM_IS_PREMULTIPLIED), Some(true));
        assert_eq!(resp.param_int(PARAM_FUJI_WIDTH), Some(3024));
    }

    #[test]
    fn test_roi_crop_keeps_declared_geometry() {
        let src = SourceStage::with_image(ImageHp::new(100, 80));
        let resp = src.get_image(&FilterRequest::with_roi(Rect::new(10, 10, 20, 20)));
        assert_eq!(resp.image().unwrap().dimensions(), (20, 20));
        assert_eq!((resp.width(), resp.height()), (100, 80));
    }

    #[test]
    fn test_set_image_announces_geometry() {
        let src = SourceStage::new();
        let hits = Arc::new(AtomicU32::new(0));
        let hits2 = Arc::clone(&hits);
        src.core().add_listener(Box::new(move |mask| {
            assert!(mask.contains(ChangedFlags::PIXEL_DATA | ChangedFlags::DIMENSIONS));
            hits2.fetch_add(1, Ordering::SeqCst);
        }));
        src.set_image(ImageHp::new(4, 4));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
