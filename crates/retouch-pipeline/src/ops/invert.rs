//! Colour inversion.

use image::DynamicImage;

use crate::operation::Operation;
use crate::types::{OperationError, Params};

/// Invert every colour channel; alpha is preserved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Invert;

impl Invert {
    /// Catalog kind name.
    pub const KIND: &'static str = "invert";
}

impl Operation for Invert {
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
        let mut out = image.clone();
        out.invert();
        Ok(out)
    }
}

#[allow(clippy::unnecessary_wraps)]
pub(crate) fn factory(_params: &Params) -> Result<Box<dyn Operation>, OperationError> {
    Ok(Box::new(Invert))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn inverts_colour_keeps_alpha() {
        let img = DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            1,
            1,
            image::Rgba([0, 100, 255, 40]),
        ));
        let out = Invert.apply(&img, 1.0).unwrap();
        assert_eq!(out.to_rgba8().get_pixel(0, 0).0, [255, 155, 0, 40]);
    }

    #[test]
    fn double_inversion_is_identity() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_fn(5, 5, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            image::Rgb([(x * 40) as u8, (y * 30) as u8, 9])
        }));
        let once = Invert.apply(&img, 1.0).unwrap();
        assert_eq!(Invert.apply(&once, 1.0).unwrap(), img);
    }
}
