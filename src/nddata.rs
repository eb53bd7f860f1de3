//! A generic n-dimensional data container with unit, uncertainty, mask,
//! metadata and an optional spectral WCS, plus arithmetic that propagates
//! all of them.

use std::ops::Range;

use ndarray::{Array, ArrayD, Axis, Dimension, IxDyn, Slice};

use crate::data::model::Meta;
use crate::error::{Result, SpectrumError};
use crate::units::Unit;
use crate::wcs::SpectralWcs;

// ---------------------------------------------------------------------------
// StdDevUncertainty
// ---------------------------------------------------------------------------

/// One-sigma uncertainties, element-wise. Without its own unit the
/// uncertainty is expressed in the unit of the data it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct StdDevUncertainty {
    array: ArrayD<f64>,
    unit: Option<Unit>,
}

impl StdDevUncertainty {
    pub fn new<D: Dimension>(array: Array<f64, D>) -> Self {
        StdDevUncertainty {
            array: array.into_dyn(),
            unit: None,
        }
    }

    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    pub fn array(&self) -> &ArrayD<f64> {
        &self.array
    }

    pub fn unit(&self) -> Option<&Unit> {
        self.unit.as_ref()
    }

    pub fn shape(&self) -> &[usize] {
        self.array.shape()
    }

    /// Values expressed in `target`, reading a missing unit as `parent`.
    fn values_in(&self, parent: &Unit, target: &Unit) -> Result<ArrayD<f64>> {
        let own = self.unit.as_ref().unwrap_or(parent);
        let factor = own.conversion_factor(target)?;
        Ok(self.array.mapv(|v| v * factor))
    }

    fn map_array(&self, f: impl FnOnce(&ArrayD<f64>) -> ArrayD<f64>) -> Self {
        StdDevUncertainty {
            array: f(&self.array),
            unit: self.unit.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// NdData
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

/// Data array plus everything that travels with it.
///
/// Every derived value (slices, arithmetic results) owns fresh copies of all
/// buffers.
#[derive(Debug, Clone, PartialEq)]
pub struct NdData {
    data: ArrayD<f64>,
    unit: Option<Unit>,
    uncertainty: Option<StdDevUncertainty>,
    mask: Option<ArrayD<bool>>,
    meta: Meta,
    wcs: Option<SpectralWcs>,
}

impl NdData {
    pub fn new<D: Dimension>(data: Array<f64, D>) -> Self {
        NdData {
            data: data.into_dyn(),
            unit: None,
            uncertainty: None,
            mask: None,
            meta: Meta::new(),
            wcs: None,
        }
    }

    pub fn with_unit(mut self, unit: Option<Unit>) -> Self {
        self.unit = unit;
        self
    }

    pub fn with_uncertainty(mut self, uncertainty: Option<StdDevUncertainty>) -> Self {
        self.uncertainty = uncertainty;
        self
    }

    pub fn with_mask(mut self, mask: Option<ArrayD<bool>>) -> Self {
        self.mask = mask;
        self
    }

    pub fn with_meta(mut self, meta: Meta) -> Self {
        self.meta = meta;
        self
    }

    pub fn with_wcs(mut self, wcs: Option<SpectralWcs>) -> Self {
        self.wcs = wcs;
        self
    }

    pub fn data(&self) -> &ArrayD<f64> {
        &self.data
    }

    pub fn unit(&self) -> Option<&Unit> {
        self.unit.as_ref()
    }

    pub fn uncertainty(&self) -> Option<&StdDevUncertainty> {
        self.uncertainty.as_ref()
    }

    pub fn mask(&self) -> Option<&ArrayD<bool>> {
        self.mask.as_ref()
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    pub fn wcs(&self) -> Option<&SpectralWcs> {
        self.wcs.as_ref()
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    // -- slicing --

    /// Drop the first axis by selecting `index` along it.
    pub fn index_first_axis(&self, index: usize) -> Result<NdData> {
        let len = self.data.shape().first().copied().unwrap_or(0);
        if index >= len {
            return Err(SpectrumError::IndexOutOfBounds {
                index: index as isize,
                len,
            });
        }
        Ok(NdData {
            data: self.data.index_axis(Axis(0), index).to_owned(),
            unit: self.unit.clone(),
            uncertainty: self
                .uncertainty
                .as_ref()
                .map(|u| u.map_array(|a| a.index_axis(Axis(0), index).to_owned())),
            mask: self
                .mask
                .as_ref()
                .map(|m| m.index_axis(Axis(0), index).to_owned()),
            meta: self.meta.clone(),
            wcs: self.wcs.clone(),
        })
    }

    /// Keep `range` along `axis`. Slicing the last axis also slices the WCS.
    pub fn slice_axis(&self, axis: usize, range: Range<usize>) -> Result<NdData> {
        let len = self.data.shape().get(axis).copied().ok_or_else(|| {
            SpectrumError::InvalidArgument(format!(
                "axis {axis} does not exist for {} dimensional data",
                self.data.ndim()
            ))
        })?;
        if range.start > range.end || range.end > len {
            return Err(SpectrumError::IndexOutOfBounds {
                index: range.end as isize,
                len,
            });
        }
        let slice = Slice::from(range.clone());
        let wcs = match &self.wcs {
            Some(wcs) if axis + 1 == self.data.ndim() => Some(wcs.slice(range)?),
            other => other.clone(),
        };
        Ok(NdData {
            data: self.data.slice_axis(Axis(axis), slice).to_owned(),
            unit: self.unit.clone(),
            uncertainty: self
                .uncertainty
                .as_ref()
                .map(|u| u.map_array(|a| a.slice_axis(Axis(axis), slice).to_owned())),
            mask: self
                .mask
                .as_ref()
                .map(|m| m.slice_axis(Axis(axis), slice).to_owned()),
            meta: self.meta.clone(),
            wcs,
        })
    }

    // -- arithmetic --

    pub fn add(&self, other: &NdData) -> Result<NdData> {
        self.arithmetic(ArithmeticOp::Add, other)
    }

    pub fn subtract(&self, other: &NdData) -> Result<NdData> {
        self.arithmetic(ArithmeticOp::Subtract, other)
    }

    pub fn multiply(&self, other: &NdData) -> Result<NdData> {
        self.arithmetic(ArithmeticOp::Multiply, other)
    }

    pub fn divide(&self, other: &NdData) -> Result<NdData> {
        self.arithmetic(ArithmeticOp::Divide, other)
    }

    /// Element-wise `self op other` with broadcasting.
    ///
    /// Add/subtract express `other` in this unit; multiply/divide compose
    /// units. Uncertainties are propagated to first order assuming no
    /// correlation; masks are OR-ed; metadata and WCS come from `self` when
    /// present, else from `other`.
    pub fn arithmetic(&self, op: ArithmeticOp, other: &NdData) -> Result<NdData> {
        let shape = broadcast_shape(self.shape(), other.shape()).ok_or_else(|| {
            SpectrumError::ShapeMismatch(format!(
                "operands could not be broadcast together with shapes {:?} {:?}",
                self.shape(),
                other.shape()
            ))
        })?;

        let dimensionless = Unit::dimensionless();
        let left_unit = self.unit.as_ref().unwrap_or(&dimensionless);
        let right_unit = other.unit.as_ref().unwrap_or(&dimensionless);

        let (rhs, rhs_unit, result_unit) = match op {
            ArithmeticOp::Add | ArithmeticOp::Subtract => {
                let factor = right_unit.conversion_factor(left_unit)?;
                (other.data.mapv(|v| v * factor), left_unit.clone(), left_unit.clone())
            }
            ArithmeticOp::Multiply => (other.data.clone(), right_unit.clone(), left_unit.try_mul(right_unit)?),
            ArithmeticOp::Divide => (other.data.clone(), right_unit.clone(), left_unit.try_div(right_unit)?),
        };

        let lhs = &self.data;
        let data = match op {
            ArithmeticOp::Add => lhs + &rhs,
            ArithmeticOp::Subtract => lhs - &rhs,
            ArithmeticOp::Multiply => lhs * &rhs,
            ArithmeticOp::Divide => lhs / &rhs,
        };

        let left_sigma = match &self.uncertainty {
            Some(u) => Some(u.values_in(left_unit, left_unit)?),
            None => None,
        };
        let right_sigma = match &other.uncertainty {
            Some(u) => Some(u.values_in(right_unit, &rhs_unit)?),
            None => None,
        };
        let uncertainty = match (left_sigma, right_sigma) {
            (None, None) => None,
            (sa, sb) => {
                let sa = sa.unwrap_or_else(|| ArrayD::zeros(lhs.raw_dim()));
                let sb = sb.unwrap_or_else(|| ArrayD::zeros(rhs.raw_dim()));
                check_shape(&sa, lhs.shape(), "left uncertainty")?;
                check_shape(&sb, rhs.shape(), "right uncertainty")?;
                Some(StdDevUncertainty::new(propagate(op, lhs, &rhs, &sa, &sb)))
            }
        };

        let mask = match (&self.mask, &other.mask) {
            (None, None) => None,
            (Some(a), Some(b)) => {
                check_shape(a, lhs.shape(), "left mask")?;
                check_shape(b, rhs.shape(), "right mask")?;
                Some(a | b)
            }
            (Some(m), None) | (None, Some(m)) => Some(
                m.broadcast(IxDyn(&shape))
                    .ok_or_else(|| {
                        SpectrumError::ShapeMismatch(format!(
                            "mask of shape {:?} does not broadcast to {shape:?}",
                            m.shape()
                        ))
                    })?
                    .to_owned(),
            ),
        };

        let unit = match (&self.unit, &other.unit) {
            (None, None) => None,
            _ => Some(result_unit),
        };
        let meta = if self.meta.is_empty() {
            other.meta.clone()
        } else {
            self.meta.clone()
        };

        Ok(NdData {
            data,
            unit,
            uncertainty,
            mask,
            meta,
            wcs: self.wcs.clone().or_else(|| other.wcs.clone()),
        })
    }
}

fn check_shape<T>(array: &ArrayD<T>, expected: &[usize], what: &str) -> Result<()> {
    if array.shape() == expected {
        Ok(())
    } else {
        Err(SpectrumError::ShapeMismatch(format!(
            "{what} has shape {:?}, expected {expected:?}",
            array.shape()
        )))
    }
}

/// First-order propagation of uncorrelated standard deviations.
fn propagate(
    op: ArithmeticOp,
    a: &ArrayD<f64>,
    b: &ArrayD<f64>,
    sa: &ArrayD<f64>,
    sb: &ArrayD<f64>,
) -> ArrayD<f64> {
    let (x, y) = match op {
        ArithmeticOp::Add | ArithmeticOp::Subtract => (sa.clone(), sb.clone()),
        ArithmeticOp::Multiply => (sa * b, a * sb),
        ArithmeticOp::Divide => (sa / b, &(a * sb) / &(b * b)),
    };
    (&(&x * &x) + &(&y * &y)).mapv(f64::sqrt)
}

/// Numpy broadcasting: align trailing axes; each pair must match or be 1.
pub(crate) fn broadcast_shape(a: &[usize], b: &[usize]) -> Option<Vec<usize>> {
    let n = a.len().max(b.len());
    let dim = |s: &[usize], i: usize| -> usize {
        let offset = n - s.len();
        if i < offset {
            1
        } else {
            s[i - offset]
        }
    };
    (0..n)
        .map(|i| {
            let (da, db) = (dim(a, i), dim(b, i));
            if da == db || db == 1 {
                Some(da)
            } else if da == 1 {
                Some(db)
            } else {
                None
            }
        })
        .collect()
}
