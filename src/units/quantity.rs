use std::fmt;

use ndarray::{arr0, Array, ArrayD, Dimension};

use super::equivalencies::{spectral_convert, spectral_density_convert};
use super::unit::Unit;
use crate::error::{Result, SpectrumError};

// ---------------------------------------------------------------------------
// Quantity – an array tagged with a unit
// ---------------------------------------------------------------------------

/// A numeric array of any rank together with its physical unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Quantity {
    value: ArrayD<f64>,
    unit: Unit,
}

impl Quantity {
    pub fn new<D: Dimension>(value: Array<f64, D>, unit: Unit) -> Self {
        Quantity {
            value: value.into_dyn(),
            unit,
        }
    }

    pub fn from_vec(values: Vec<f64>, unit: Unit) -> Self {
        Quantity::new(ndarray::Array1::from(values), unit)
    }

    /// A rank-0 quantity.
    pub fn scalar(value: f64, unit: Unit) -> Self {
        Quantity::new(arr0(value), unit)
    }

    pub fn value(&self) -> &ArrayD<f64> {
        &self.value
    }

    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    pub fn into_parts(self) -> (ArrayD<f64>, Unit) {
        (self.value, self.unit)
    }

    pub fn shape(&self) -> &[usize] {
        self.value.shape()
    }

    pub fn ndim(&self) -> usize {
        self.value.ndim()
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn is_scalar(&self) -> bool {
        self.value.ndim() == 0
    }

    pub fn first(&self) -> Option<f64> {
        self.value.iter().next().copied()
    }

    pub fn last(&self) -> Option<f64> {
        self.value.iter().last().copied()
    }

    pub fn mean(&self) -> Option<f64> {
        self.value.mean()
    }

    /// The single value of a size-1 quantity, whatever its rank.
    pub fn as_scalar(&self) -> Option<f64> {
        (self.value.len() == 1).then(|| self.value.iter().copied().next()).flatten()
    }

    /// Plain conversion between units of the same dimensions.
    pub fn to(&self, unit: &Unit) -> Result<Quantity> {
        let factor = self.unit.conversion_factor(unit)?;
        Ok(Quantity {
            value: self.value.mapv(|v| v * factor),
            unit: unit.clone(),
        })
    }

    pub fn to_value(&self, unit: &Unit) -> Result<ArrayD<f64>> {
        self.to(unit).map(|q| q.value)
    }

    /// Conversion through the wavelength/frequency/energy/wavenumber graph.
    pub fn to_spectral(&self, unit: &Unit) -> Result<Quantity> {
        Ok(Quantity {
            value: spectral_convert(&self.value, &self.unit, unit)?,
            unit: unit.clone(),
        })
    }

    /// Convert a flux density between per-wavelength, per-frequency,
    /// per-energy and per-wavenumber forms at the given spectral axis.
    pub fn to_spectral_density(&self, unit: &Unit, spectral_axis: &Quantity) -> Result<Quantity> {
        Ok(Quantity {
            value: spectral_density_convert(
                &self.value,
                &self.unit,
                unit,
                &spectral_axis.value,
                &spectral_axis.unit,
            )?,
            unit: unit.clone(),
        })
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}

// ---------------------------------------------------------------------------
// MaybeQuantity – values that may or may not carry a unit
// ---------------------------------------------------------------------------

/// Input that is either a bare number/array or a unit-tagged quantity.
#[derive(Debug, Clone, PartialEq)]
pub enum MaybeQuantity {
    Bare(ArrayD<f64>),
    Tagged(Quantity),
}

impl MaybeQuantity {
    pub fn unit(&self) -> Option<&Unit> {
        match self {
            MaybeQuantity::Bare(_) => None,
            MaybeQuantity::Tagged(q) => Some(q.unit()),
        }
    }

    pub fn values(&self) -> &ArrayD<f64> {
        match self {
            MaybeQuantity::Bare(v) => v,
            MaybeQuantity::Tagged(q) => q.value(),
        }
    }

    /// Tag bare values with `unit`, or convert tagged values into it.
    pub fn into_quantity(self, unit: &Unit) -> Result<Quantity> {
        match self {
            MaybeQuantity::Bare(v) => Ok(Quantity {
                value: v,
                unit: unit.clone(),
            }),
            MaybeQuantity::Tagged(q) => q.to(unit),
        }
    }

    /// The single value of a size-1 input, failing for anything larger.
    pub(crate) fn expect_scalar(&self, what: &str) -> Result<f64> {
        let values = self.values();
        match values.len() {
            1 => Ok(values.iter().copied().next().unwrap_or(f64::NAN)),
            n => Err(SpectrumError::InvalidArgument(format!(
                "{what} must be a scalar, got {n} values"
            ))),
        }
    }
}

impl From<f64> for MaybeQuantity {
    fn from(v: f64) -> Self {
        MaybeQuantity::Bare(arr0(v).into_dyn())
    }
}

impl From<Vec<f64>> for MaybeQuantity {
    fn from(v: Vec<f64>) -> Self {
        MaybeQuantity::Bare(ndarray::Array1::from(v).into_dyn())
    }
}

impl From<ArrayD<f64>> for MaybeQuantity {
    fn from(v: ArrayD<f64>) -> Self {
        MaybeQuantity::Bare(v)
    }
}

impl From<Quantity> for MaybeQuantity {
    fn from(q: Quantity) -> Self {
        MaybeQuantity::Tagged(q)
    }
}

impl From<&Quantity> for MaybeQuantity {
    fn from(q: &Quantity) -> Self {
        MaybeQuantity::Tagged(q.clone())
    }
}
