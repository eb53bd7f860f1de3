use std::ops::{Add, Div, Mul, Sub};

use ndarray::{arr0, ArrayD};

use super::spectrum1d::Spectrum1D;
use crate::error::{Result, SpectrumError};
use crate::nddata::{ArithmeticOp, NdData};
use crate::units::{Quantity, Unit};

/// Right-hand side of spectrum arithmetic.
#[derive(Debug, Clone)]
pub enum Operand {
    Spectrum(Box<Spectrum1D>),
    NdData(NdData),
    Quantity(Quantity),
    Scalar(f64),
    Array(ArrayD<f64>),
}

impl From<Spectrum1D> for Operand {
    fn from(s: Spectrum1D) -> Self {
        Operand::Spectrum(Box::new(s))
    }
}

impl From<&Spectrum1D> for Operand {
    fn from(s: &Spectrum1D) -> Self {
        Operand::Spectrum(Box::new(s.clone()))
    }
}

impl From<NdData> for Operand {
    fn from(d: NdData) -> Self {
        Operand::NdData(d)
    }
}

impl From<Quantity> for Operand {
    fn from(q: Quantity) -> Self {
        Operand::Quantity(q)
    }
}

impl From<f64> for Operand {
    fn from(v: f64) -> Self {
        Operand::Scalar(v)
    }
}

impl From<ArrayD<f64>> for Operand {
    fn from(a: ArrayD<f64>) -> Self {
        Operand::Array(a)
    }
}

impl Spectrum1D {
    /// `self op other`, propagating uncertainty, mask, metadata and WCS.
    ///
    /// Operands without their own container are coerced first: for addition
    /// and subtraction bare values take this spectrum's unit and quantities
    /// are converted into it; for multiplication and division bare values
    /// are dimensionless. The result keeps this spectrum's spectral axis,
    /// unless this spectrum is a scalar and `other` is a full spectrum.
    pub fn arithmetic(&self, op: ArithmeticOp, other: impl Into<Operand>) -> Result<Spectrum1D> {
        let additive = matches!(op, ArithmeticOp::Add | ArithmeticOp::Subtract);
        let own_unit = self.unit().cloned().unwrap_or_else(Unit::dimensionless);
        let bare_unit = if additive { own_unit.clone() } else { Unit::dimensionless() };

        let (rhs, rhs_axis) = match other.into() {
            Operand::Spectrum(s) => {
                let s = *s;
                (s.data, Some(s.spectral_axis))
            }
            Operand::NdData(d) => (d, None),
            Operand::Quantity(q) => {
                let q = if additive { q.to(&own_unit)? } else { q };
                let (value, unit) = q.into_parts();
                (NdData::new(value).with_unit(Some(unit)), None)
            }
            Operand::Scalar(v) => (NdData::new(arr0(v)).with_unit(Some(bare_unit)), None),
            Operand::Array(a) => (NdData::new(a).with_unit(Some(bare_unit)), None),
        };

        let data = self.data.arithmetic(op, &rhs)?;
        let coord = match rhs_axis {
            Some(axis) if self.is_scalar() => axis,
            _ => self.spectral_axis.clone(),
        };
        if let Some(&last) = data.shape().last() {
            if last != coord.len() {
                return Err(SpectrumError::ShapeMismatch(format!(
                    "result has {last} spectral pixels but the spectral axis has {}",
                    coord.len()
                )));
            }
        }
        Ok(Spectrum1D::from_parts(data, coord))
    }
}

macro_rules! spectrum_op {
    ($trait:ident, $method:ident, $op:expr) => {
        impl<T: Into<Operand>> $trait<T> for &Spectrum1D {
            type Output = Result<Spectrum1D>;

            fn $method(self, rhs: T) -> Self::Output {
                self.arithmetic($op, rhs)
            }
        }

        impl<T: Into<Operand>> $trait<T> for Spectrum1D {
            type Output = Result<Spectrum1D>;

            fn $method(self, rhs: T) -> Self::Output {
                self.arithmetic($op, rhs)
            }
        }
    };
}

spectrum_op!(Add, add, ArithmeticOp::Add);
spectrum_op!(Sub, sub, ArithmeticOp::Subtract);
spectrum_op!(Mul, mul, ArithmeticOp::Multiply);
spectrum_op!(Div, div, ArithmeticOp::Divide);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nddata::StdDevUncertainty;
    use crate::spectra::SpectrumArgs;
    use ndarray::array;

    fn spectrum(values: Vec<f64>) -> Spectrum1D {
        let n = values.len();
        SpectrumArgs::new(Quantity::from_vec(values, Unit::jansky()))
            .spectral_axis(Quantity::from_vec(
                (0..n).map(|i| 5000.0 + i as f64).collect(),
                Unit::angstrom(),
            ))
            .uncertainty(StdDevUncertainty::new(ndarray::Array1::from_elem(n, 0.3)))
            .build()
            .unwrap()
    }

    #[test]
    fn spectra_add_with_uncertainty() {
        let a = spectrum(vec![1.0, 2.0]);
        let b = spectrum(vec![10.0, 20.0]);
        let sum = (&a + &b).unwrap();
        assert_eq!(sum.flux_values(), &array![11.0, 22.0].into_dyn());
        assert_eq!(sum.unit(), Some(&Unit::jansky()));
        let sigma = sum.uncertainty().unwrap().array();
        assert!((sigma[[0]] - (0.18f64).sqrt()).abs() < 1e-12);
        assert_eq!(sum.spectral_axis(), a.spectral_axis());
    }

    #[test]
    fn bare_numbers_take_the_flux_unit_when_adding() {
        let a = spectrum(vec![1.0, 2.0]);
        let shifted = (&a - 1.0).unwrap();
        assert_eq!(shifted.flux_values(), &array![0.0, 1.0].into_dyn());
        assert_eq!(shifted.unit(), Some(&Unit::jansky()));
    }

    #[test]
    fn quantities_are_converted_when_adding() {
        let a = spectrum(vec![1.0, 2.0]);
        let sum = (&a + Quantity::scalar(500.0, Unit::parse("mJy").unwrap())).unwrap();
        assert!((sum.flux_values()[[1]] - 2.5).abs() < 1e-12);
        assert!(matches!(
            &a + Quantity::scalar(1.0, Unit::angstrom()),
            Err(SpectrumError::UnitMismatch(_))
        ));
    }

    #[test]
    fn scaling_keeps_the_unit_and_scales_uncertainty() {
        let a = spectrum(vec![1.0, 2.0]);
        let doubled = (a * 2.0).unwrap();
        assert_eq!(doubled.unit(), Some(&Unit::jansky()));
        assert_eq!(doubled.flux_values(), &array![2.0, 4.0].into_dyn());
        assert!((doubled.uncertainty().unwrap().array()[[0]] - 0.6).abs() < 1e-12);
    }

    #[test]
    fn dividing_by_a_quantity_composes_units() {
        let a = spectrum(vec![2.0, 4.0]);
        let ratio = (&a / Quantity::scalar(2.0, Unit::jansky())).unwrap();
        assert!(ratio.unit().unwrap().is_dimensionless());
        assert_eq!(ratio.flux_values(), &array![1.0, 2.0].into_dyn());
    }

    #[test]
    fn mismatched_lengths_fail_cleanly() {
        let a = spectrum(vec![1.0, 2.0]);
        let b = spectrum(vec![1.0, 2.0, 3.0]);
        assert!(matches!(&a + &b, Err(SpectrumError::ShapeMismatch(_))));
    }
}
