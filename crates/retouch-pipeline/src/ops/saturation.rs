//! Global saturation.

use image::DynamicImage;

use crate::operation::Operation;
use crate::ops::convert_like;
use crate::types::{OperationError, Params};

/// Scale chroma around each pixel's luminance.
///
/// `amount` ranges over `-100..=100`: `-100` is fully desaturated, `0`
/// the identity, `100` doubles the distance from gray. Grayscale input
/// passes through unchanged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Saturation {
    amount: f64,
}

impl Saturation {
    /// Catalog kind name.
    pub const KIND: &'static str = "saturation";

    /// Build from a parameter map.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::InvalidParameter`] for non-numeric or
    /// out-of-range values.
    pub fn from_params(params: &Params) -> Result<Self, OperationError> {
        Ok(Self {
            amount: params.float_in("amount", 0.0, -100.0..=100.0)?,
        })
    }
}

impl Operation for Saturation {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn params(&self) -> Params {
        Params::new().with("amount", self.amount)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn apply(
        &self,
        image: &DynamicImage,
        _scale_factor: f64,
    ) -> Result<DynamicImage, OperationError> {
        if !image.color().has_color() {
            return Ok(image.clone());
        }
        let k = (1.0 + self.amount / 100.0) as f32;
        let mut rgba = image.to_rgba32f();
        for pixel in rgba.pixels_mut() {
            let [r, g, b, a] = pixel.0;
            let l = 0.0722f32.mul_add(b, 0.2126f32.mul_add(r, 0.7152 * g));
            let scale = |c: f32| (c - l).mul_add(k, l).clamp(0.0, 1.0);
            pixel.0 = [scale(r), scale(g), scale(b), a];
        }
        Ok(convert_like(DynamicImage::ImageRgba32F(rgba), image.color()))
    }
}

pub(crate) fn factory(params: &Params) -> Result<Box<dyn Operation>, OperationError> {
    Ok(Box::new(Saturation::from_params(params)?))
}
