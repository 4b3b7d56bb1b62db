//! Binary threshold.

use image::DynamicImage;

use crate::operation::Operation;
use crate::types::{OperationError, Params};

/// Map luminance to black or white around a cut-off level.
///
/// Pixels with luma `>= level` become 255, the rest 0. The output is
/// always 8-bit single-channel, whatever the input layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Threshold {
    level: u8,
}

impl Threshold {
    /// Catalog kind name.
    pub const KIND: &'static str = "threshold";
    /// Default cut-off.
    pub const DEFAULT_LEVEL: u8 = 128;

    /// Create a threshold at `level`.
    #[must_use]
    pub const fn new(level: u8) -> Self {
        Self { level }
    }

    /// The cut-off level.
    #[must_use]
    pub const fn level(self) -> u8 {
        self.level
    }

    /// Build from a parameter map (`level`, 0..=255).
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::InvalidParameter`] if `level` is not a
    /// number in range.
    pub fn from_params(params: &Params) -> Result<Self, OperationError> {
        let level = params.float_in("level", f64::from(Self::DEFAULT_LEVEL), 0.0..=255.0)?;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let level = level.round() as u8;
        Ok(Self::new(level))
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LEVEL)
    }
}

impl Operation for Threshold {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn params(&self) -> Params {
        Params::new().with("level", self.level)
    }

    fn apply(
        &self,
        image: &DynamicImage,
        _scale_factor: f64,
    ) -> Result<DynamicImage, OperationError> {
        let mut luma = image.to_luma8();
        for pixel in luma.pixels_mut() {
            pixel.0[0] = if pixel.0[0] >= self.level { 255 } else { 0 };
        }
        Ok(DynamicImage::ImageLuma8(luma))
    }
}

pub(crate) fn factory(params: &Params) -> Result<Box<dyn Operation>, OperationError> {
    Ok(Box::new(Threshold::from_params(params)?))
}
