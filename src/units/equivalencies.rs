use ndarray::ArrayD;

use super::constants::{PLANCK, SPEED_OF_LIGHT};
use super::unit::{Dimensions, PhysicalType, Unit};
use crate::error::{Result, SpectrumError};

// ---------------------------------------------------------------------------
// Spectral equivalence: wavelength <-> frequency <-> energy <-> wavenumber
// ---------------------------------------------------------------------------

/// Members of the spectral equivalence graph. Every member is a power law of
/// frequency, so all conversions go through Hz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SpectralKind {
    Length,
    Frequency,
    Energy,
    Wavenumber,
}

impl SpectralKind {
    pub(crate) fn of(unit: &Unit) -> Option<Self> {
        match unit.physical_type() {
            PhysicalType::Length => Some(SpectralKind::Length),
            PhysicalType::Frequency => Some(SpectralKind::Frequency),
            PhysicalType::Energy => Some(SpectralKind::Energy),
            PhysicalType::Wavenumber => Some(SpectralKind::Wavenumber),
            _ => None,
        }
    }

    fn dims(self) -> Dimensions {
        match self {
            SpectralKind::Length => Dimensions::LENGTH,
            SpectralKind::Frequency => Dimensions::FREQUENCY,
            SpectralKind::Energy => Dimensions::ENERGY,
            SpectralKind::Wavenumber => Dimensions::WAVENUMBER,
        }
    }

    /// SI value of this kind -> frequency in Hz.
    pub(crate) fn to_hz(self, si: f64) -> f64 {
        match self {
            SpectralKind::Length => SPEED_OF_LIGHT / si,
            SpectralKind::Frequency => si,
            SpectralKind::Energy => si / PLANCK,
            SpectralKind::Wavenumber => si * SPEED_OF_LIGHT,
        }
    }

    /// Frequency in Hz -> SI value of this kind.
    pub(crate) fn from_hz(self, hz: f64) -> f64 {
        match self {
            SpectralKind::Length => SPEED_OF_LIGHT / hz,
            SpectralKind::Frequency => hz,
            SpectralKind::Energy => hz * PLANCK,
            SpectralKind::Wavenumber => hz / SPEED_OF_LIGHT,
        }
    }

    /// The kind `x` for which `unit` is a flux density per unit `x`.
    fn density_of(unit: &Unit) -> Option<Self> {
        [
            SpectralKind::Length,
            SpectralKind::Frequency,
            SpectralKind::Energy,
            SpectralKind::Wavenumber,
        ]
        .into_iter()
        .find(|kind| unit.dims().checked_mul(kind.dims()) == Some(Dimensions::IRRADIANCE))
    }
}

fn not_spectral(from: &Unit, to: &Unit) -> SpectrumError {
    SpectrumError::UnitMismatch(format!(
        "'{from}' ({}) and '{to}' ({}) are not convertible, even with spectral equivalencies",
        from.physical_type(),
        to.physical_type()
    ))
}

/// Convert spectral coordinates between any two members of the equivalence
/// graph, or between equivalent units of the same member.
pub fn spectral_convert(values: &ArrayD<f64>, from: &Unit, to: &Unit) -> Result<ArrayD<f64>> {
    if from.is_equivalent(to) {
        let factor = from.conversion_factor(to)?;
        return Ok(values.mapv(|v| v * factor));
    }
    let (src, dst) = match (SpectralKind::of(from), SpectralKind::of(to)) {
        (Some(src), Some(dst)) => (src, dst),
        _ => return Err(not_spectral(from, to)),
    };
    let (from_scale, to_scale) = (from.scale(), to.scale());
    Ok(values.mapv(|v| dst.from_hz(src.to_hz(v * from_scale)) / to_scale))
}

// ---------------------------------------------------------------------------
// Spectral flux density: F_x <-> F_y evaluated on a spectral axis
// ---------------------------------------------------------------------------

/// Convert a flux density per unit `x` into one per unit `y`.
///
/// `F_y = F_x * |dx/dy|`; every kind is `a * nu^(+-1)`, which reduces the
/// Jacobian to `x / y` in SI. The spectral axis runs along the last flux axis.
pub fn spectral_density_convert(
    flux: &ArrayD<f64>,
    from: &Unit,
    to: &Unit,
    axis_values: &ArrayD<f64>,
    axis_unit: &Unit,
) -> Result<ArrayD<f64>> {
    if from.is_equivalent(to) {
        let factor = from.conversion_factor(to)?;
        return Ok(flux.mapv(|v| v * factor));
    }
    let (src, dst) = match (SpectralKind::density_of(from), SpectralKind::density_of(to)) {
        (Some(src), Some(dst)) => (src, dst),
        _ => return Err(not_spectral(from, to)),
    };
    let axis_kind = SpectralKind::of(axis_unit).ok_or_else(|| {
        SpectrumError::UnitMismatch(format!(
            "spectral density conversion needs a wavelength, frequency, energy or wavenumber axis, got '{axis_unit}'"
        ))
    })?;

    let last = flux.shape().last().copied().unwrap_or(1);
    if axis_values.len() != last {
        return Err(SpectrumError::ShapeMismatch(format!(
            "spectral axis ({}) and the last flux axis ({last}) lengths must be the same",
            axis_values.len()
        )));
    }

    let axis_scale = axis_unit.scale();
    let jacobian = axis_values
        .iter()
        .map(|&v| {
            let hz = axis_kind.to_hz(v * axis_scale);
            src.from_hz(hz) / dst.from_hz(hz)
        })
        .collect::<Vec<f64>>();
    let jacobian = ndarray::Array1::from(jacobian).into_dyn();

    let scale = from.scale() / to.scale();
    Ok((flux * &jacobian).mapv(|v| v * scale))
}
