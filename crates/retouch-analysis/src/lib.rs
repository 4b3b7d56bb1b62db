//! retouch-analysis: image statistics computed in parallel.
//!
//! [`AnalysisEngine::analyze`] downsamples the image to a bounded
//! working copy, computes every [`AnalysisKind`] on its own worker in a
//! fixed-size rayon pool, and returns a complete [`ResultBundle`] only
//! after all of them finish.
//!
//! | kind | payload |
//! |---|---|
//! | [`Histogram`] | 256-bin counts per channel + luminance |
//! | [`Parade`] | per channel, 256 × width column densities |
//! | [`HueSaturation`] | 360 hue bins, 256 saturation bins |
//! | [`Chromaticity`] | capped Lab samples, 2D `(a, b)` and 3D `(L, a, b)` |

pub mod chroma;
pub mod engine;
pub mod frame;
pub mod histogram;
pub mod hue_sat;
pub mod parade;
pub mod types;

pub use chroma::Chromaticity;
pub use engine::{AnalysisConfig, AnalysisEngine};
pub use frame::Frame;
pub use histogram::Histogram;
pub use hue_sat::HueSaturation;
pub use parade::Parade;
pub use types::{AnalysisError, AnalysisKind, AnalysisResult, ResultBundle};
