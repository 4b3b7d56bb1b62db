//! Grayscale conversion.
//!
//! Uses the `image` crate's luminance conversion, which weights the
//! channels by Rec. 709 luma coefficients rather than averaging them.
//! Alpha is preserved (RGBA becomes luma + alpha).

use image::DynamicImage;

use crate::operation::Operation;
use crate::types::{OperationError, Params};

/// Convert colour images to grayscale. Grayscale input passes through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Grayscale;

impl Grayscale {
    /// Catalog kind name.
    pub const KIND: &'static str = "grayscale";
}

impl Operation for Grayscale {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn params(&self) -> Params {
        Params::new()
    }

    fn apply(
        &self,
        image: &DynamicImage,
        _scale_factor: f64,
    ) -> Result<DynamicImage, OperationError> {
        Ok(image.grayscale())
    }
}

#[allow(clippy::unnecessary_wraps)]
pub(crate) fn factory(_params: &Params) -> Result<Box<dyn Operation>, OperationError> {
    Ok(Box::new(Grayscale))
}
