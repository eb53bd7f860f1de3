//! Spectral world coordinate systems: pixel index <-> dispersion value.
//!
//! ```text
//!   pixel index ──evaluate──▶ dispersion value
//!        ▲                          │
//!        └─────────invert───────────┘
//! ```
//!
//! Two solutions exist: a tabulated [`LookupWcs`] and an affine
//! [`LinearWcs`], which can also be read from and written to FITS keywords.

mod header;
mod linear;
mod lookup;

use std::ops::Range;

use ndarray::{ArrayBase, ArrayD, Data, Dimension};

pub use header::FitsHeader;
pub use linear::LinearWcs;
pub use lookup::{InterpolationKind, LookupWcs};

use crate::error::{Result, SpectrumError};
use crate::units::{MaybeQuantity, Quantity, Unit};

/// Units a dispersion axis may be expressed in: pixel, velocity, length,
/// frequency or energy (anything equivalent to one of them).
pub fn valid_spectral_units() -> [Unit; 5] {
    [
        Unit::pixel(),
        Unit::km_per_s(),
        Unit::meter(),
        Unit::hertz(),
        Unit::erg(),
    ]
}

pub fn check_valid_unit(unit: &Unit) -> Result<()> {
    let valid = valid_spectral_units();
    if valid.iter().any(|v| unit.is_equivalent(v)) {
        return Ok(());
    }
    let names: Vec<String> = valid.iter().map(|u| u.to_string()).collect();
    Err(SpectrumError::invalid_unit(
        unit.to_string(),
        format!(
            "not recognized as a valid spectral unit. Valid units are: {}",
            names.join(", ")
        ),
    ))
}

// ---------------------------------------------------------------------------
// SpectralWcs – the closed set of dispersion solutions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum SpectralWcs {
    Lookup(LookupWcs),
    Linear(LinearWcs),
}

impl SpectralWcs {
    pub fn unit(&self) -> &Unit {
        match self {
            SpectralWcs::Lookup(w) => w.unit(),
            SpectralWcs::Linear(w) => w.unit(),
        }
    }

    pub fn evaluate<S, D>(&self, pixels: &ArrayBase<S, D>) -> Result<Quantity>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        match self {
            SpectralWcs::Lookup(w) => w.evaluate(pixels),
            SpectralWcs::Linear(w) => Ok(w.evaluate(pixels)),
        }
    }

    pub fn invert(&self, values: impl Into<MaybeQuantity>) -> Result<ArrayD<f64>> {
        match self {
            SpectralWcs::Lookup(w) => w.invert(values),
            SpectralWcs::Linear(w) => w.invert(values),
        }
    }

    /// Number of pixels a lookup table covers; linear solutions are unbounded.
    pub fn table_len(&self) -> Option<usize> {
        match self {
            SpectralWcs::Lookup(w) => Some(w.len()),
            SpectralWcs::Linear(_) => None,
        }
    }

    /// The `n + 1` dispersion values bounding `n` pixels.
    pub fn bin_edges(&self, n: usize) -> Quantity {
        match self {
            SpectralWcs::Lookup(w) => w.bin_edges(),
            SpectralWcs::Linear(w) => w.bin_edges(n),
        }
    }

    /// Rest value recorded with the solution, rest frequency first.
    pub fn rest_value(&self) -> Option<Quantity> {
        match self {
            SpectralWcs::Linear(w) => w
                .rest_frequency()
                .map(|hz| Quantity::scalar(hz, Unit::hertz()))
                .or_else(|| {
                    w.rest_wavelength()
                        .map(|m| Quantity::scalar(m, Unit::meter()))
                }),
            SpectralWcs::Lookup(_) => None,
        }
    }

    /// The solution for pixels `range`, re-indexed from zero.
    pub(crate) fn slice(&self, range: Range<usize>) -> Result<SpectralWcs> {
        match self {
            SpectralWcs::Lookup(w) => w.slice(range.start, range.end).map(SpectralWcs::Lookup),
            SpectralWcs::Linear(w) => Ok(SpectralWcs::Linear(w.shifted(range.start))),
        }
    }
}

impl From<LookupWcs> for SpectralWcs {
    fn from(w: LookupWcs) -> Self {
        SpectralWcs::Lookup(w)
    }
}

impl From<LinearWcs> for SpectralWcs {
    fn from(w: LinearWcs) -> Self {
        SpectralWcs::Linear(w)
    }
}
