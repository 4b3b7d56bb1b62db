//! The [`Operation`] contract shared by every pixel transform.
//!
//! An operation is an immutable value object: a kind tag plus a flat
//! parameter map. Applying it borrows the input image and returns a new
//! buffer, so the same instance can be shared between the pipeline, a
//! cloned snapshot, and a background render without synchronisation.

use std::fmt;
use std::sync::Arc;

use crate::types::{DynamicImage, OperationError, Params};

/// A stateless, parameterised image transform.
///
/// Implementations must be pure and deterministic: the same image,
/// parameters and scale factor always produce the same pixels.
pub trait Operation: Send + Sync + fmt::Debug {
    /// Canonical kind name, as registered in the catalog.
    fn kind(&self) -> &'static str;

    /// The parameters this instance was built from.
    ///
    /// Feeding these back into the catalog must reconstruct an
    /// equivalent operation.
    fn params(&self) -> Params;

    /// Apply the transform.
    ///
    /// `scale_factor` is the ratio of the working image to the source
    /// resolution. The render engine only passes values other than 1.0
    /// to operations that report [`is_resolution_dependent`].
    ///
    /// # Errors
    ///
    /// Returns an [`OperationError`] when the image layout is not
    /// supported or the kernel fails.
    ///
    /// [`is_resolution_dependent`]: Operation::is_resolution_dependent
    fn apply(&self, image: &DynamicImage, scale_factor: f64)
    -> Result<DynamicImage, OperationError>;

    /// Whether pixel-distance parameters (radii, sigmas) must be scaled
    /// when the operation runs on a downsampled proxy.
    fn is_resolution_dependent(&self) -> bool {
        false
    }
}

/// Shared handle to an operation held by a pipeline.
pub type OperationRef = Arc<dyn Operation>;

/// Normalize a kind name for lookup: lower-case with `_`, `-` and
/// whitespace removed.
///
/// `"Brightness_Contrast"`, `"brightness-contrast"` and
/// `"brightnesscontrast"` all normalize to the same key.
#[must_use]
pub fn normalize_kind(kind: &str) -> String {
    kind.chars()
        .filter(|c| !matches!(c, '_' | '-') && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Returns `true` if two kind names refer to the same operation.
#[must_use]
pub fn kinds_match(a: &str, b: &str) -> bool {
    normalize_kind(a) == normalize_kind(b)
}

/// Scale factor an operation actually receives.
pub(crate) fn effective_scale(operation: &dyn Operation, scale_factor: f64) -> f64 {
    if operation.is_resolution_dependent() {
        scale_factor
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_ignores_case_and_separators() {
        assert_eq!(normalize_kind("Brightness_Contrast"), "brightnesscontrast");
        assert_eq!(normalize_kind("brightness-contrast"), "brightnesscontrast");
        assert_eq!(normalize_kind(" Gaussian Blur "), "gaussianblur");
    }

    #[test]
    fn kinds_match_across_spellings() {
        assert!(kinds_match("unsharp_mask", "UnsharpMask"));
        assert!(!kinds_match("gamma", "invert"));
    }
}
