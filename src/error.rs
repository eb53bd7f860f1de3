use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, SpectrumError>;

/// Every failure a spectrum, spectral coordinate or spectral WCS can raise.
///
/// All variants are produced at the point of violation; nothing is retried
/// and no partially-built value is ever returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpectrumError {
    /// Unknown or conflicting construction input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A unit string could not be parsed, or the unit is not legal here.
    #[error("invalid unit '{unit}': {reason}")]
    InvalidUnit { unit: String, reason: String },

    /// A unit was required but none could be resolved.
    #[error("missing unit: {0}")]
    MissingUnit(String),

    /// Two units are not convertible into each other.
    #[error("unit mismatch: {0}")]
    UnitMismatch(String),

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// The lookup table contains duplicate dispersion values.
    #[error("the lookup table does not describe a unique transformation")]
    NonBijective,

    /// The lookup table is neither strictly increasing nor strictly decreasing.
    #[error("the lookup table is not monotonic; inversion would be ambiguous")]
    NonMonotonic,

    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// A FITS keyword needed to rebuild a dispersion solution is absent.
    #[error("necessary keywords ({0}) missing - can not reconstruct WCS")]
    MissingKeyword(String),

    #[error("index {index} is out of bounds for axis of length {len}")]
    IndexOutOfBounds { index: isize, len: usize },
}

impl SpectrumError {
    pub(crate) fn invalid_unit(unit: impl Into<String>, reason: impl Into<String>) -> Self {
        SpectrumError::InvalidUnit {
            unit: unit.into(),
            reason: reason.into(),
        }
    }
}
