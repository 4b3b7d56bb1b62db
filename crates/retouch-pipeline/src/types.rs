//! Shared types for the retouch processing core.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// Re-export `DynamicImage` so downstream crates can pass image buffers
/// around without depending on `image` directly.
///
/// Every pipeline stage borrows its input and returns a fresh buffer, so
/// two stages never alias the same pixels.
pub use image::DynamicImage;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Create dimensions from a width and height.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Dimensions of an image buffer.
    #[must_use]
    pub fn of(image: &DynamicImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }

    /// Total pixel count.
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Length of the longer axis.
    #[must_use]
    pub const fn long_axis(self) -> u32 {
        if self.width >= self.height {
            self.width
        } else {
            self.height
        }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A single operation parameter value.
///
/// Serialized untagged so preset files stay flat:
/// `{"level": 128, "sigma": 2.5, "mode": "linear"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Boolean switch.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating-point value.
    Float(f64),
    /// Free-form text (mode names, etc.).
    Text(String),
}

impl ParamValue {
    /// Numeric view of the value. Integers widen to `f64`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub const fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Int(v) => Some(v as f64),
            Self::Float(v) => Some(v),
            Self::Bool(_) | Self::Text(_) => None,
        }
    }

    /// Boolean view of the value.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match *self {
            Self::Bool(v) => Some(v),
            _ => None,
        }
    }

    /// Text view of the value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Short name of the value's type, for error messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u8> for ParamValue {
    fn from(value: u8) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<f32> for ParamValue {
    fn from(value: f32) -> Self {
        Self::Float(f64::from(value))
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Flat, ordered parameter map of an operation.
///
/// Keys are kept sorted so serialized presets are stable and two
/// parameter maps compare equal regardless of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, ParamValue>);

impl Params {
    /// Create an empty parameter map.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace a parameter.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(name.into(), value.into());
    }

    /// Look up a parameter by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate parameters in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Read a numeric parameter, falling back to `default` when absent.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::InvalidParameter`] if the value is not
    /// numeric or not finite.
    pub fn float(&self, name: &str, default: f64) -> Result<f64, OperationError> {
        let Some(value) = self.0.get(name) else {
            return Ok(default);
        };
        let number = value.as_f64().ok_or_else(|| {
            OperationError::invalid(name, format!("expected a number, got {}", value.type_name()))
        })?;
        if !number.is_finite() {
            return Err(OperationError::invalid(name, "must be finite"));
        }
        Ok(number)
    }

    /// Read a numeric parameter and check it lies in `range`.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::InvalidParameter`] if the value is not
    /// numeric or falls outside `range`.
    pub fn float_in(
        &self,
        name: &str,
        default: f64,
        range: RangeInclusive<f64>,
    ) -> Result<f64, OperationError> {
        let number = self.float(name, default)?;
        if range.contains(&number) {
            Ok(number)
        } else {
            Err(OperationError::invalid(
                name,
                format!(
                    "{number} is outside [{}, {}]",
                    range.start(),
                    range.end()
                ),
            ))
        }
    }

    /// Read a boolean parameter, falling back to `default` when absent.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::InvalidParameter`] if the value is not a
    /// boolean.
    pub fn flag(&self, name: &str, default: bool) -> Result<bool, OperationError> {
        self.0.get(name).map_or(Ok(default), |value| {
            value.as_bool().ok_or_else(|| {
                OperationError::invalid(
                    name,
                    format!("expected a bool, got {}", value.type_name()),
                )
            })
        })
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Errors raised while constructing or applying a single operation.
///
/// These never escape a render: the render engine catches them at the
/// operation boundary and keeps the previous stage's image.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OperationError {
    /// No factory is registered under this kind.
    #[error("unknown operation kind: {0}")]
    UnknownKind(String),

    /// A parameter is missing a usable value.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The operation cannot handle this pixel layout.
    #[error("{kind} does not support {color:?} images")]
    UnsupportedImage {
        /// Operation kind.
        kind: String,
        /// Offending colour type.
        color: image::ColorType,
    },

    /// A stored record could not be read as `{kind, params}`.
    #[error("malformed pipeline record: {0}")]
    MalformedRecord(String),

    /// The kernel itself failed.
    #[error("{kind} failed: {reason}")]
    Failed {
        /// Operation kind.
        kind: String,
        /// Failure description.
        reason: String,
    },
}

impl OperationError {
    /// Shorthand for [`OperationError::InvalidParameter`].
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for [`OperationError::UnsupportedImage`].
    pub fn unsupported(kind: impl Into<String>, color: image::ColorType) -> Self {
        Self::UnsupportedImage {
            kind: kind.into(),
            color,
        }
    }
}

/// Errors raised by pipeline, history, proxy, and persistence calls.
///
/// Input-absent conditions (no image, empty pipeline, empty undo stack)
/// are not errors; those calls return empty or placeholder values.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A command referenced a stage that does not exist.
    #[error("operation index {index} is out of range for a pipeline of {len} operations")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Pipeline length at the time of the request.
        len: usize,
    },

    /// Proxy quality factor outside `(0.1, 1.0]`.
    #[error("quality factor {0} is outside (0.1, 1.0]")]
    InvalidQuality(f64),

    /// Building an operation failed.
    #[error(transparent)]
    Operation(#[from] OperationError),

    /// Pipeline records could not be encoded or decoded.
    #[error("failed to (de)serialize pipeline records: {0}")]
    Serialization(#[from] serde_json::Error),
}
