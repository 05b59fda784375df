//! Filter requests and responses.
//!
//! A [`FilterRequest`] travels down the chain (toward the source) and
//! carries what the consumer wants rendered; a [`FilterResponse`]
//! travels back up and carries the pixels plus a side-channel of named
//! parameters. The side-channel is how stages deep in the chain talk
//! past the stages between them: the source tags the embedded color
//! space, a demosaic step flags premultiplied data, and the display
//! stage reads both without the intermediate stages knowing.
//!
//! Responses are cheap to clone: images share their buffers and the
//! parameter map is small.

use rawflow_color::ColorSpace;
use rawflow_core::{Image8, ImageHp, Rect};
use std::collections::HashMap;
use std::sync::Arc;

/// Side-channel key: the [`ColorSpace`] the pixels are encoded in.
pub const PARAM_EMBEDDED_COLORSPACE: &str = "embedded-colorspace";

/// Side-channel key: whether channel values are premultiplied and must
/// not be white-balanced again.
pub const PARAM_IS_PREMULTIPLIED: &str = "is-premultiplied";

/// Side-channel key: the pre-rotation sensor width of diagonal-layout
/// sensors, needed by geometry stages downstream.
pub const PARAM_FUJI_WIDTH: &str = "fuji-width";

/// What a consumer wants from the chain.
///
/// `roi` narrows the render to a sub-rectangle of the full image;
/// `None` means the whole frame. `quick` asks stages to prefer speed
/// over quality (draft previews during slider drags).
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterRequest {
    /// Region of interest, or `None` for the full frame.
    pub roi: Option<Rect>,
    /// Draft-quality hint.
    pub quick: bool,
}

impl FilterRequest {
    /// A full-frame, full-quality request.
    pub fn new() -> Self {
        Self::default()
    }

    /// A full-quality request for the given region.
    pub fn with_roi(roi: Rect) -> Self {
        Self {
            roi: Some(roi),
            quick: false,
        }
    }

    /// Marks the request as draft quality.
    pub fn quick(mut self) -> Self {
        self.quick = true;
        self
    }
}

/// A typed side-channel value.
#[derive(Debug, Clone)]
pub enum ParamValue {
    /// Integer parameter.
    Int(i64),
    /// Boolean parameter.
    Bool(bool),
    /// Floating-point parameter.
    Float(f64),
    /// A shared color-space handle.
    Space(Arc<dyn ColorSpace>),
}

/// What a stage hands back up the chain.
///
/// Either image slot (or both, or neither) may be populated; the
/// declared `width`/`height` describe the full output geometry even
/// when the attached image only covers an ROI or a draft-scale render.
#[derive(Debug, Clone, Default)]
pub struct FilterResponse {
    image: Option<ImageHp>,
    image8: Option<Image8>,
    width: u32,
    height: u32,
    params: HashMap<String, ParamValue>,
}

impl FilterResponse {
    /// An empty response: no images, zero dimensions, no parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a high-precision image and adopts its dimensions as
    /// the declared geometry.
    pub fn set_image(&mut self, image: ImageHp) {
        self.width = image.width();
        self.height = image.height();
        self.image = Some(image);
    }

    /// Attaches a display-precision image and adopts its dimensions as
    /// the declared geometry.
    pub fn set_image8(&mut self, image: Image8) {
        self.width = image.width();
        self.height = image.height();
        self.image8 = Some(image);
    }

    /// Overrides the declared geometry (draft renders report the
    /// full-size dimensions here while attaching a smaller image).
    pub fn set_dimensions(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    /// The high-precision image, if present.
    #[inline]
    pub fn image(&self) -> Option<&ImageHp> {
        self.image.as_ref()
    }

    /// The display-precision image, if present.
    #[inline]
    pub fn image8(&self) -> Option<&Image8> {
        self.image8.as_ref()
    }

    /// Declared output width.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Declared output height.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Stores a side-channel parameter, replacing any previous value
    /// under the same key.
    pub fn set_param(&mut self, key: impl Into<String>, value: ParamValue) {
        self.params.insert(key.into(), value);
    }

    /// Raw parameter access.
    pub fn param(&self, key: &str) -> Option<&ParamValue> {
        self.params.get(key)
    }

    /// Integer parameter, `None` if absent or differently typed.
    pub fn param_int(&self, key: &str) -> Option<i64> {
        match self.params.get(key) {
            Some(ParamValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    /// Boolean parameter, `None` if absent or differently typed.
    pub fn param_bool(&self, key: &str) -> Option<bool> {
        match self.params.get(key) {
            Some(ParamValue::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    /// Float parameter, `None` if absent or differently typed.
    pub fn param_float(&self, key: &str) -> Option<f64> {
        match self.params.get(key) {
            Some(ParamValue::Float(v)) => Some(*v),
            _ => None,
        }
    }

    /// Color-space parameter, `None` if absent or differently typed.
    pub fn param_space(&self, key: &str) -> Option<Arc<dyn ColorSpace>> {
        match self.params.get(key) {
            Some(ParamValue::Space(s)) => Some(Arc::clone(s)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rawflow_color::lookup_or_create;

    #[test]
    fn test_empty_response() {
        let resp = FilterResponse::new();
        assert!(resp.image().is_none());
        assert!(resp.image8().is_none());
        assert_eq!(resp.width(), 0);
        assert!(resp.param(PARAM_FUJI_WIDTH).is_none());
    }

    #[test]
    fn test_set_image_adopts_dimensions() {
        let mut resp = FilterResponse::new();
        resp.set_image(ImageHp::new(640, 480));
        assert_eq!((resp.width(), resp.height()), (640, 480));

        // a draft render declares full size while carrying less
        resp.set_dimensions(1280, 960);
        assert_eq!(resp.width(), 1280);
        assert_eq!(resp.image().unwrap().width(), 640);
    }

    #[test]
    fn test_typed_params() {
        let mut resp = FilterResponse::new();
        resp.set_param(PARAM_FUJI_WIDTH, ParamValue::Int(3024));
        resp.set_param(PARAM_IS_PREMULTIPLIED, ParamValue::Bool(true));
        resp.set_param("exposure", ParamValue::Float(0.5));

        assert_eq!(resp.param_int(PARAM_FUJI_WIDTH), Some(3024));
        assert_eq!(resp.param_bool(PARAM_IS_PREMULTIPLIED), Some(true));
        assert_eq!(resp.param_float("exposure"), Some(0.5));
        // type mismatch reads as absent
        assert_eq!(resp.param_bool(PARAM_FUJI_WIDTH), None);
    }

    #[test]
    fn test_space_param_shares_instance() {
        let space = lookup_or_create("sRGB").unwrap();
        let mut resp = FilterResponse::new();
        resp.set_param(PARAM_EMBEDDED_COLORSPACE, ParamValue::Space(Arc::clone(&space)));
        let out = resp.param_space(PARAM_EMBEDDED_COLORSPACE).unwrap();
        assert!(Arc::ptr_eq(&out, &space));
    }

    #[test]
    fn test_clone_shares_image_buffer() {
        let mut resp = FilterResponse::new();
        resp.set_image(ImageHp::filled(8, 8, [1, 2, 3]));
        let copy = resp.clone();
        assert!(copy.image().unwrap().shares_buffer(resp.image().unwrap()));
    }
}
