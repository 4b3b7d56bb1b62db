//! Tone curves: brightness/contrast and gamma.
//!
//! Both are per-sample curves over normalized intensity and run through
//! [`map_color_channels`](super::map_color_channels), so they keep the
//! input's bit depth and leave alpha alone.

use image::DynamicImage;

use crate::operation::Operation;
use crate::types::{OperationError, Params};

/// Additive brightness plus contrast around mid-gray.
///
/// Both parameters range over `-100..=100`; `0` is the identity.
/// Contrast uses the classic `259 (c + 255) / (255 (259 - c))` factor
/// on the 0..255 scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrightnessContrast {
    brightness: f64,
    contrast: f64,
}

impl BrightnessContrast {
    /// Catalog kind name.
    pub const KIND: &'static str = "brightness_contrast";

    /// Create the adjustment.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::InvalidParameter`] if either value lies
    /// outside `-100..=100`.
    pub fn new(brightness: f64, contrast: f64) -> Result<Self, OperationError> {
        Self::from_params(
            &Params::new()
                .with("brightness", brightness)
                .with("contrast", contrast),
        )
    }

    /// Build from a parameter map.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::InvalidParameter`] for non-numeric or
    /// out-of-range values.
    pub fn from_params(params: &Params) -> Result<Self, OperationError> {
        Ok(Self {
            brightness: params.float_in("brightness", 0.0, -100.0..=100.0)?,
            contrast: params.float_in("contrast", 0.0, -100.0..=100.0)?,
        })
    }

    fn contrast_factor(self) -> f64 {
        (259.0 * (self.contrast + 255.0)) / (255.0 * (259.0 - self.contrast))
    }
}

impl Operation for BrightnessContrast {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn params(&self) -> Params {
        Params::new()
            .with("brightness", self.brightness)
            .with("contrast", self.contrast)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn apply(
        &self,
        image: &DynamicImage,
        _scale_factor: f64,
    ) -> Result<DynamicImage, OperationError> {
        let factor = self.contrast_factor() as f32;
        let brightness = self.brightness as f32;
        super::map_color_channels(Self::KIND, image, |v| {
            let x = v * 255.0;
            (factor * (x + brightness - 128.0) + 128.0) / 255.0
        })
    }
}

/// Power-law gamma correction, `out = in^(1/gamma)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gamma {
    gamma: f64,
}

impl Gamma {
    /// Catalog kind name.
    pub const KIND: &'static str = "gamma";

    /// Build from a parameter map (`gamma`, default 1.0, must be in
    /// `0.01..=10`).
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::InvalidParameter`] for non-numeric or
    /// out-of-range values.
    pub fn from_params(params: &Params) -> Result<Self, OperationError> {
        Ok(Self {
            gamma: params.float_in("gamma", 1.0, 0.01..=10.0)?,
        })
    }
}

impl Operation for Gamma {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn params(&self) -> Params {
        Params::new().with("gamma", self.gamma)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn apply(
        &self,
        image: &DynamicImage,
        _scale_factor: f64,
    ) -> Result<DynamicImage, OperationError> {
        let exponent = (1.0 / self.gamma) as f32;
        super::map_color_channels(Self::KIND, image, |v| v.max(0.0).powf(exponent))
    }
}

pub(crate) fn brightness_contrast_factory(
    params: &Params,
) -> Result<Box<dyn Operation>, OperationError> {
    Ok(Box::new(BrightnessContrast::from_params(params)?))
}

pub(crate) fn gamma_factory(params: &Params) -> Result<Box<dyn Operation>, OperationError> {
    Ok(Box::new(Gamma::from_params(params)?))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn gray(v: u8) -> DynamicImage {
        DynamicImage::ImageLuma8(image::GrayImage::from_pixel(2, 2, image::Luma([v])))
    }

    fn value(img: &DynamicImage) -> u8 {
        img.to_luma8().get_pixel(0, 0).0[0]
    }

    #[test]
    fn neutral_brightness_contrast_is_identity() {
        let op = BrightnessContrast::new(0.0, 0.0).unwrap();
        for v in [0, 1, 64, 128, 200, 255] {
            assert_eq!(value(&op.apply(&gray(v), 1.0).unwrap()), v);
        }
    }

    #[test]
    fn brightness_shifts_up() {
        let op = BrightnessContrast::new(20.0, 0.0).unwrap();
        assert_eq!(value(&op.apply(&gray(100), 1.0).unwrap()), 120);
    }

    #[test]
    fn contrast_spreads_values_around_mid_gray() {
        let op = BrightnessContrast::new(0.0, 50.0).unwrap();
        assert!(value(&op.apply(&gray(160), 1.0).unwrap()) > 160);
        assert!(value(&op.apply(&gray(96), 1.0).unwrap()) < 96);
    }

    #[test]
    fn brightness_contrast_rejects_out_of_range() {
        assert!(BrightnessContrast::new(101.0, 0.0).is_err());
        assert!(BrightnessContrast::new(0.0, -120.0).is_err());
    }

    #[test]
    fn unit_gamma_is_identity() {
        let op = Gamma::from_params(&Params::new()).unwrap();
        assert_eq!(value(&op.apply(&gray(77), 1.0).unwrap()), 77);
    }

    #[test]
    fn gamma_above_one_brightens_midtones() {
        let op = Gamma::from_params(&Params::new().with("gamma", 2.2)).unwrap();
        assert!(value(&op.apply(&gray(64), 1.0).unwrap()) > 64);
    }

    #[test]
    fn non_positive_gamma_is_rejected() {
        assert!(Gamma::from_params(&Params::new().with("gamma", 0.0)).is_err());
    }
}
