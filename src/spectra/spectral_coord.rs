use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use log::info;
use ndarray::Ix1;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpectrumError};
use crate::units::constants::SPEED_OF_LIGHT;
use crate::units::{MaybeQuantity, Quantity, Unit};

// ---------------------------------------------------------------------------
// DopplerConvention
// ---------------------------------------------------------------------------

/// Convention used to turn a dispersion value into a line-of-sight velocity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DopplerConvention {
    #[serde(rename = "doppler_relativistic", alias = "relativistic")]
    Relativistic,
    #[serde(rename = "doppler_optical", alias = "optical")]
    Optical,
    #[serde(rename = "doppler_radio", alias = "radio")]
    Radio,
}

impl DopplerConvention {
    /// Velocity in m/s of frequency `nu` relative to `rest`, both in Hz.
    fn velocity(self, nu: f64, rest: f64) -> f64 {
        let c = SPEED_OF_LIGHT;
        match self {
            DopplerConvention::Radio => c * (rest - nu) / rest,
            DopplerConvention::Optical => c * (rest - nu) / nu,
            DopplerConvention::Relativistic => {
                c * (rest * rest - nu * nu) / (rest * rest + nu * nu)
            }
        }
    }
}

impl FromStr for DopplerConvention {
    type Err = SpectrumError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "doppler_relativistic" | "relativistic" => Ok(DopplerConvention::Relativistic),
            "doppler_optical" | "optical" => Ok(DopplerConvention::Optical),
            "doppler_radio" | "radio" => Ok(DopplerConvention::Radio),
            other => Err(SpectrumError::InvalidArgument(format!(
                "unknown velocity convention '{other}', expected one of doppler_relativistic, doppler_optical, doppler_radio"
            ))),
        }
    }
}

impl fmt::Display for DopplerConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DopplerConvention::Relativistic => "doppler_relativistic",
            DopplerConvention::Optical => "doppler_optical",
            DopplerConvention::Radio => "doppler_radio",
        };
        write!(f, "{name}")
    }
}

// ---------------------------------------------------------------------------
// SpectralCoord
// ---------------------------------------------------------------------------

/// The dispersion values of a spectrum plus its velocity frame.
///
/// Radial velocity is the only stored frame state; redshift is always
/// computed from it as `v / c`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralCoord {
    values: Quantity,
    radial_velocity: Quantity,
    rest_value: Quantity,
    doppler_convention: Option<DopplerConvention>,
}

impl SpectralCoord {
    /// Wrap a one-dimensional quantity. Radial velocity starts at `0 km/s`
    /// and the rest value at `0 Angstrom`.
    pub fn new(values: Quantity) -> Result<Self> {
        if values.ndim() != 1 {
            return Err(SpectrumError::InvalidArgument(format!(
                "spectral axis must be one-dimensional, got {} dimensions",
                values.ndim()
            )));
        }
        Ok(SpectralCoord {
            values,
            radial_velocity: Quantity::scalar(0.0, Unit::km_per_s()),
            rest_value: Quantity::scalar(0.0, Unit::angstrom()),
            doppler_convention: None,
        })
    }

    pub fn with_radial_velocity(mut self, radial_velocity: Quantity) -> Result<Self> {
        self.set_radial_velocity(radial_velocity)?;
        Ok(self)
    }

    pub fn with_redshift(mut self, redshift: impl Into<MaybeQuantity>) -> Result<Self> {
        self.set_redshift(redshift)?;
        Ok(self)
    }

    pub fn with_rest_value(mut self, rest_value: impl Into<MaybeQuantity>) -> Result<Self> {
        self.set_rest_value(rest_value)?;
        Ok(self)
    }

    pub fn with_doppler_convention(mut self, convention: Option<DopplerConvention>) -> Self {
        self.doppler_convention = convention;
        self
    }

    pub fn values(&self) -> &Quantity {
        &self.values
    }

    pub fn unit(&self) -> &Unit {
        self.values.unit()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn radial_velocity(&self) -> &Quantity {
        &self.radial_velocity
    }

    pub fn set_radial_velocity(&mut self, radial_velocity: Quantity) -> Result<()> {
        if !radial_velocity.unit().is_equivalent(&Unit::km_per_s()) {
            return Err(SpectrumError::UnitMismatch(format!(
                "radial_velocity must be a velocity, got '{}'",
                radial_velocity.unit()
            )));
        }
        self.radial_velocity = radial_velocity;
        Ok(())
    }

    /// Dimensionless `v / c`, same shape as the radial velocity.
    pub fn redshift(&self) -> Quantity {
        let factor = self
            .radial_velocity
            .unit()
            .conversion_factor(&Unit::meter_per_second())
            .unwrap_or(1.0);
        Quantity::new(
            self.radial_velocity
                .value()
                .mapv(|v| v * factor / SPEED_OF_LIGHT),
            Unit::dimensionless(),
        )
    }

    /// Store `z * c` as the radial velocity (in km/s).
    pub fn set_redshift(&mut self, redshift: impl Into<MaybeQuantity>) -> Result<()> {
        let z = redshift.into().into_quantity(&Unit::dimensionless())?;
        let km_s = SPEED_OF_LIGHT / 1000.0;
        self.radial_velocity = Quantity::new(z.value().mapv(|z| z * km_s), Unit::km_per_s());
        Ok(())
    }

    pub fn rest_value(&self) -> &Quantity {
        &self.rest_value
    }

    /// Bare values take the unit of the axis; tagged values must be a
    /// wavelength or a frequency.
    pub fn set_rest_value(&mut self, rest_value: impl Into<MaybeQuantity>) -> Result<()> {
        self.rest_value = match rest_value.into() {
            MaybeQuantity::Bare(v) => {
                info!(
                    "No unit information provided with rest value. Assuming units of spectral axis ('{}').",
                    self.values.unit()
                );
                Quantity::new(v, self.values.unit().clone())
            }
            MaybeQuantity::Tagged(q) => {
                let unit = q.unit();
                if !unit.is_equivalent(&Unit::angstrom()) && !unit.is_equivalent(&Unit::hertz()) {
                    return Err(SpectrumError::UnitMismatch(format!(
                        "rest value must be wavelength or frequency equivalent, got '{unit}'"
                    )));
                }
                q
            }
        };
        Ok(())
    }

    pub fn doppler_convention(&self) -> Option<DopplerConvention> {
        self.doppler_convention
    }

    // -- spectral views --

    pub fn to_spectral(&self, unit: &Unit) -> Result<Quantity> {
        self.values.to_spectral(unit)
    }

    pub fn wavelength(&self) -> Result<Quantity> {
        self.to_spectral(&Unit::angstrom())
    }

    pub fn frequency(&self) -> Result<Quantity> {
        self.to_spectral(&Unit::gigahertz())
    }

    pub fn energy(&self) -> Result<Quantity> {
        self.to_spectral(&Unit::electronvolt())
    }

    /// The axis as line-of-sight velocities (km/s) relative to the rest value.
    pub fn to_velocity(&self) -> Result<Quantity> {
        let convention = self.doppler_convention.ok_or_else(|| {
            SpectrumError::InvalidArgument(
                "a velocity convention must be set to compute velocities".into(),
            )
        })?;
        let rest = self
            .rest_value
            .to_spectral(&Unit::hertz())?
            .as_scalar()
            .ok_or_else(|| SpectrumError::InvalidArgument("rest value must be a scalar".into()))?;
        if rest == 0.0 || !rest.is_finite() {
            return Err(SpectrumError::InvalidArgument(
                "a non-zero rest value must be set to compute velocities".into(),
            ));
        }
        let nu = self.values.to_spectral(&Unit::hertz())?;
        Quantity::new(
            nu.value().mapv(|v| convention.velocity(v, rest)),
            Unit::meter_per_second(),
        )
        .to(&Unit::km_per_s())
    }

    // -- derived copies --

    /// The same frame over pixels `range` of the axis.
    pub(crate) fn slice(&self, range: Range<usize>) -> Result<SpectralCoord> {
        let values = self
            .values
            .value()
            .view()
            .into_dimensionality::<Ix1>()
            .map_err(|e| SpectrumError::InvalidArgument(e.to_string()))?;
        if range.end > values.len() {
            return Err(SpectrumError::IndexOutOfBounds {
                index: range.end as isize,
                len: values.len(),
            });
        }
        Ok(SpectralCoord {
            values: Quantity::new(
                values.slice(ndarray::s![range]).to_owned(),
                self.values.unit().clone(),
            ),
            ..self.clone()
        })
    }
}
