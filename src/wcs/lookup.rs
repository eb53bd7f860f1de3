use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, ArrayBase, ArrayD, Data, Dimension};

use super::check_valid_unit;
use crate::error::{Result, SpectrumError};
use crate::units::{MaybeQuantity, Quantity, Unit};

// ---------------------------------------------------------------------------
// InterpolationKind
// ---------------------------------------------------------------------------

/// How a lookup table is interpolated between its anchor pixels.
///
/// Every scipy-style kind is accepted at construction; only `Linear` can be
/// evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterpolationKind {
    #[default]
    Linear,
    Nearest,
    Zero,
    SLinear,
    Quadratic,
    Cubic,
}

impl FromStr for InterpolationKind {
    type Err = SpectrumError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(InterpolationKind::Linear),
            "nearest" => Ok(InterpolationKind::Nearest),
            "zero" => Ok(InterpolationKind::Zero),
            "slinear" => Ok(InterpolationKind::SLinear),
            "quadratic" => Ok(InterpolationKind::Quadratic),
            "cubic" => Ok(InterpolationKind::Cubic),
            other => Err(SpectrumError::InvalidArgument(format!(
                "unknown interpolation kind '{other}'"
            ))),
        }
    }
}

impl fmt::Display for InterpolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InterpolationKind::Linear => "linear",
            InterpolationKind::Nearest => "nearest",
            InterpolationKind::Zero => "zero",
            InterpolationKind::SLinear => "slinear",
            InterpolationKind::Quadratic => "quadratic",
            InterpolationKind::Cubic => "cubic",
        };
        write!(f, "{name}")
    }
}

// ---------------------------------------------------------------------------
// LookupWcs
// ---------------------------------------------------------------------------

/// A tabulated dispersion solution: entry `i` is the dispersion value at
/// pixel `i`.
///
/// The table is strictly monotonic (increasing or decreasing), which makes
/// the pixel <-> value mapping a bijection that both directions can
/// interpolate.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupWcs {
    table: Array1<f64>,
    unit: Unit,
    kind: InterpolationKind,
    pixel_index: Array1<f64>,
}

impl LookupWcs {
    /// Build a lookup transform.
    ///
    /// A bare table needs an explicit `unit`; a tagged one is converted into
    /// `unit` when both are given.
    pub fn new(
        table: impl Into<MaybeQuantity>,
        unit: Option<Unit>,
        kind: InterpolationKind,
    ) -> Result<Self> {
        let table = table.into();
        let unit = match (unit, table.unit()) {
            (Some(unit), _) => unit,
            (None, Some(unit)) => unit.clone(),
            (None, None) => {
                return Err(SpectrumError::MissingUnit(
                    "lookup table must have a unit or units must be specified".into(),
                ))
            }
        };
        check_valid_unit(&unit)?;

        let values = table.into_quantity(&unit)?.into_parts().0;
        if values.ndim() != 1 {
            return Err(SpectrumError::InvalidArgument(format!(
                "lookup table must be one-dimensional, got {} dimensions",
                values.ndim()
            )));
        }
        let table = values
            .into_dimensionality::<ndarray::Ix1>()
            .map_err(|e| SpectrumError::InvalidArgument(e.to_string()))?;
        if table.is_empty() {
            return Err(SpectrumError::InvalidArgument(
                "lookup table must contain at least one value".into(),
            ));
        }

        check_bijective(&table)?;

        let pixel_index = Array1::from_iter((0..table.len()).map(|i| i as f64));
        Ok(LookupWcs {
            table,
            unit,
            kind,
            pixel_index,
        })
    }

    /// Lookup transform over a unit-tagged table with linear interpolation.
    pub fn from_quantity(table: Quantity) -> Result<Self> {
        LookupWcs::new(table, None, InterpolationKind::Linear)
    }

    pub fn table(&self) -> Quantity {
        Quantity::new(self.table.clone(), self.unit.clone())
    }

    pub fn table_values(&self) -> &Array1<f64> {
        &self.table
    }

    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    pub fn kind(&self) -> InterpolationKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    fn is_descending(&self) -> bool {
        self.table.len() > 1 && self.table[0] > self.table[1]
    }

    fn require_linear(&self) -> Result<()> {
        match self.kind {
            InterpolationKind::Linear => Ok(()),
            other => Err(SpectrumError::NotImplemented(format!(
                "interpolation type {other} is not implemented"
            ))),
        }
    }

    /// Pixel indices -> dispersion values. Indices outside `[0, N-1]` give NaN.
    pub fn evaluate<S, D>(&self, pixels: &ArrayBase<S, D>) -> Result<Quantity>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        self.require_linear()?;
        let (Some(xp), Some(fp)) = (self.pixel_index.as_slice(), self.table.as_slice()) else {
            return Err(SpectrumError::InvalidArgument("lookup table is not contiguous".into()));
        };
        let values = pixels.mapv(|p| interp(p, xp, fp)).into_dyn();
        Ok(Quantity::new(values, self.unit.clone()))
    }

    /// Dispersion values -> pixel indices. Bare values are read in the table
    /// unit; values outside the table range give NaN.
    pub fn invert(&self, values: impl Into<MaybeQuantity>) -> Result<ArrayD<f64>> {
        self.require_linear()?;
        let values = values.into().into_quantity(&self.unit)?.into_parts().0;

        let mut xp = self.table.to_vec();
        let mut fp = self.pixel_index.to_vec();
        if self.is_descending() {
            xp.reverse();
            fp.reverse();
        }
        Ok(values.mapv(|v| interp(v, &xp, &fp)))
    }

    /// Pixel boundaries: midpoints between neighbours, half a step beyond the
    /// outermost entries.
    pub fn bin_edges(&self) -> Quantity {
        let t = &self.table;
        let n = t.len();
        let mut edges = Vec::with_capacity(n + 1);
        if n == 1 {
            edges.extend([t[0], t[0]]);
        } else {
            edges.push(t[0] - (t[1] - t[0]) / 2.0);
            edges.extend(t.windows(2).into_iter().map(|w| (w[0] + w[1]) / 2.0));
            edges.push(t[n - 1] + (t[n - 1] - t[n - 2]) / 2.0);
        }
        Quantity::from_vec(edges, self.unit.clone())
    }

    /// The sub-table covering pixels `start..end`.
    pub(crate) fn slice(&self, start: usize, end: usize) -> Result<LookupWcs> {
        let table = self.table.slice(ndarray::s![start..end]).to_owned();
        LookupWcs::new(Quantity::new(table, self.unit.clone()), None, self.kind)
    }
}

/// Reject duplicates first, then anything that is not strictly monotonic.
fn check_bijective(table: &Array1<f64>) -> Result<()> {
    let mut sorted = table.to_vec();
    sorted.sort_by(f64::total_cmp);
    if sorted.windows(2).any(|w| w[0] == w[1]) {
        return Err(SpectrumError::NonBijective);
    }
    let increasing = table.windows(2).into_iter().all(|w| w[0] < w[1]);
    let decreasing = table.windows(2).into_iter().all(|w| w[0] > w[1]);
    if !(increasing || decreasing) {
        return Err(SpectrumError::NonMonotonic);
    }
    Ok(())
}

/// Piecewise-linear interpolation over ascending `xp`, NaN outside its range.
fn interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    let n = xp.len();
    if n == 0 || x.is_nan() || x < xp[0] || x > xp[n - 1] {
        return f64::NAN;
    }
    let j = xp.partition_point(|&v| v <= x);
    if j >= n {
        return fp[n - 1];
    }
    let i = j - 1;
    let t = (x - xp[i]) / (xp[j] - xp[i]);
    fp[i] + t * (fp[j] - fp[i])
}
