use ndarray::{Array1, ArrayBase, ArrayD, Data, Dimension};
use serde::{Deserialize, Serialize};

use super::check_valid_unit;
use crate::error::{Result, SpectrumError};
use crate::units::{MaybeQuantity, Quantity, Unit};

/// An affine dispersion solution:
/// `value(p) = dispersion0 + dispersion_delta * (p - pixel_index)`.
///
/// `pixel_index` is zero-based. Both scalars share `unit`.
///
/// Deserialization goes through [`LinearWcs::new`], so a stored solution is
/// validated exactly like a freshly built one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LinearWcsRecord", into = "LinearWcsRecord")]
pub struct LinearWcs {
    pub(super) dispersion0: f64,
    pub(super) dispersion_delta: f64,
    pub(super) pixel_index: f64,
    pub(super) unit: Unit,
    /// Rest frequency in Hz, when the solution came with one.
    pub(super) rest_frequency: Option<f64>,
    /// Rest wavelength in m, when the solution came with one.
    pub(super) rest_wavelength: Option<f64>,
}

/// Serialized form of [`LinearWcs`].
#[derive(Serialize, Deserialize)]
struct LinearWcsRecord {
    dispersion0: f64,
    dispersion_delta: f64,
    pixel_index: f64,
    unit: Unit,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rest_frequency: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rest_wavelength: Option<f64>,
}

impl TryFrom<LinearWcsRecord> for LinearWcs {
    type Error = SpectrumError;

    fn try_from(record: LinearWcsRecord) -> Result<Self> {
        let mut wcs = LinearWcs::new(
            record.dispersion0,
            record.dispersion_delta,
            record.pixel_index,
            Some(record.unit),
        )?;
        wcs.rest_frequency = record.rest_frequency.filter(|v| *v != 0.0);
        wcs.rest_wavelength = record.rest_wavelength.filter(|v| *v != 0.0);
        Ok(wcs)
    }
}

impl From<LinearWcs> for LinearWcsRecord {
    fn from(wcs: LinearWcs) -> Self {
        LinearWcsRecord {
            dispersion0: wcs.dispersion0,
            dispersion_delta: wcs.dispersion_delta,
            pixel_index: wcs.pixel_index,
            unit: wcs.unit,
            rest_frequency: wcs.rest_frequency,
            rest_wavelength: wcs.rest_wavelength,
        }
    }
}

impl LinearWcs {
    /// Build a linear transform.
    ///
    /// The unit is `unit` if given, otherwise whichever of `dispersion0` or
    /// `dispersion_delta` carries one; both scalars are converted into it.
    pub fn new(
        dispersion0: impl Into<MaybeQuantity>,
        dispersion_delta: impl Into<MaybeQuantity>,
        pixel_index: f64,
        unit: Option<Unit>,
    ) -> Result<Self> {
        let dispersion0 = dispersion0.into();
        let dispersion_delta = dispersion_delta.into();

        let unit = unit
            .or_else(|| dispersion0.unit().cloned())
            .or_else(|| dispersion_delta.unit().cloned())
            .ok_or_else(|| {
                SpectrumError::MissingUnit(
                    "neither a unit nor a unit-tagged dispersion0/dispersion_delta was given".into(),
                )
            })?;
        check_valid_unit(&unit)?;

        dispersion0.expect_scalar("dispersion0")?;
        dispersion_delta.expect_scalar("dispersion_delta")?;
        let d0 = dispersion0.into_quantity(&unit)?.as_scalar().unwrap_or(f64::NAN);
        let delta = dispersion_delta.into_quantity(&unit)?.as_scalar().unwrap_or(f64::NAN);

        if delta == 0.0 || !delta.is_finite() {
            return Err(SpectrumError::InvalidArgument(format!(
                "dispersion_delta must be finite and non-zero, got {delta}"
            )));
        }
        if !d0.is_finite() || !pixel_index.is_finite() {
            return Err(SpectrumError::InvalidArgument(
                "dispersion0 and pixel_index must be finite".into(),
            ));
        }

        Ok(LinearWcs {
            dispersion0: d0,
            dispersion_delta: delta,
            pixel_index,
            unit,
            rest_frequency: None,
            rest_wavelength: None,
        })
    }

    pub fn dispersion0(&self) -> f64 {
        self.dispersion0
    }

    pub fn dispersion_delta(&self) -> f64 {
        self.dispersion_delta
    }

    pub fn pixel_index(&self) -> f64 {
        self.pixel_index
    }

    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    pub fn rest_frequency(&self) -> Option<f64> {
        self.rest_frequency
    }

    pub fn rest_wavelength(&self) -> Option<f64> {
        self.rest_wavelength
    }

    pub fn with_rest_frequency(mut self, hz: f64) -> Self {
        self.rest_frequency = Some(hz);
        self
    }

    pub fn with_rest_wavelength(mut self, meters: f64) -> Self {
        self.rest_wavelength = Some(meters);
        self
    }

    pub fn evaluate_pixel(&self, pixel: f64) -> f64 {
        self.dispersion0 + self.dispersion_delta * (pixel - self.pixel_index)
    }

    pub fn evaluate<S, D>(&self, pixels: &ArrayBase<S, D>) -> Quantity
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        Quantity::new(pixels.mapv(|p| self.evaluate_pixel(p)), self.unit.clone())
    }

    /// Dispersion values -> exact pixel indices. The input must carry a unit.
    pub fn invert(&self, values: impl Into<MaybeQuantity>) -> Result<ArrayD<f64>> {
        let quantity = match values.into() {
            MaybeQuantity::Tagged(q) => q,
            MaybeQuantity::Bare(_) => {
                return Err(SpectrumError::MissingUnit(
                    "must give a dispersion value with a valid unit (e.g. 5 Angstrom)".into(),
                ))
            }
        };
        let values = quantity.to_value(&self.unit)?;
        Ok(values.mapv(|v| (v - self.dispersion0) / self.dispersion_delta + self.pixel_index))
    }

    /// Values at the `n + 1` boundaries of `n` pixels.
    pub fn bin_edges(&self, n: usize) -> Quantity {
        let edges = Array1::from_iter((0..=n).map(|i| i as f64 - 0.5));
        self.evaluate(&edges)
    }

    /// The same solution re-anchored so that pixel `start` becomes pixel 0.
    pub(crate) fn shifted(&self, start: usize) -> LinearWcs {
        LinearWcs {
            pixel_index: self.pixel_index - start as f64,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn evaluates_the_affine_formula() {
        let wcs = LinearWcs::new(4000.0, 2.0, 0.0, Some(Unit::angstrom())).unwrap();
        let out = wcs.evaluate(&array![0.0, 500.0]);
        assert_eq!(out.value()[[0]], 4000.0);
        assert_eq!(out.value()[[1]], 5000.0);
    }

    #[test]
    fn invert_needs_a_unit() {
        let wcs = LinearWcs::new(4000.0, 2.0, 0.0, Some(Unit::angstrom())).unwrap();
        assert!(matches!(wcs.invert(5000.0), Err(SpectrumError::MissingUnit(_))));
        let px = wcs.invert(Quantity::scalar(500.0, Unit::nanometer())).unwrap();
        let px = px.iter().next().copied().unwrap();
        assert!((px - 500.0).abs() < 1e-9);
        assert!(matches!(
            wcs.invert(Quantity::scalar(1.0, Unit::hertz())),
            Err(SpectrumError::UnitMismatch(_))
        ));
    }

    #[test]
    fn unit_is_inferred_from_a_tagged_scalar() {
        let wcs = LinearWcs::new(Quantity::scalar(400.0, Unit::nanometer()), 0.2, 10.0, None).unwrap();
        assert_eq!(wcs.unit(), &Unit::nanometer());
        let wcs = LinearWcs::new(4000.0, Quantity::scalar(0.2, Unit::nanometer()), 0.0, None).unwrap();
        assert_eq!(wcs.unit(), &Unit::nanometer());
        assert!(matches!(
            LinearWcs::new(4000.0, 2.0, 0.0, None),
            Err(SpectrumError::MissingUnit(_))
        ));
    }

    #[test]
    fn scalars_are_converted_into_the_explicit_unit() {
        let wcs = LinearWcs::new(
            Quantity::scalar(400.0, Unit::nanometer()),
            Quantity::scalar(0.2, Unit::nanometer()),
            0.0,
            Some(Unit::angstrom()),
        )
        .unwrap();
        assert!((wcs.dispersion0() - 4000.0).abs() < 1e-9);
        assert!((wcs.dispersion_delta() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn zero_delta_is_rejected() {
        assert!(matches!(
            LinearWcs::new(4000.0, 0.0, 0.0, Some(Unit::angstrom())),
            Err(SpectrumError::InvalidArgument(_))
        ));
    }

    #[test]
    fn non_spectral_units_are_rejected() {
        assert!(matches!(
            LinearWcs::new(1.0, 1.0, 0.0, Some(Unit::jansky())),
            Err(SpectrumError::InvalidUnit { .. })
        ));
    }

    #[test]
    fn round_trips_pixels() {
        let wcs = LinearWcs::new(1.2e9, -3.5e4, 17.0, Some(Unit::hertz())).unwrap();
        let pixels = array![-3.0, 0.0, 17.0, 250.5, 4096.0];
        let back = wcs.invert(wcs.evaluate(&pixels)).unwrap();
        for (p, b) in pixels.iter().zip(back.iter()) {
            assert!((p - b).abs() < 1e-6, "{p} != {b}");
        }
    }

    #[test]
    fn deserializing_validates_the_solution() {
        let wcs = LinearWcs::new(4000.0, 2.0, 0.0, Some(Unit::angstrom()))
            .unwrap()
            .with_rest_frequency(1.42e9);
        let json = serde_json::to_string(&wcs).unwrap();
        let back: LinearWcs = serde_json::from_str(&json).unwrap();
        assert_eq!(back, wcs);

        let flat = r#"{"dispersion0":4000.0,"dispersion_delta":0.0,"pixel_index":0.0,"unit":"Angstrom"}"#;
        assert!(serde_json::from_str::<LinearWcs>(flat).is_err());
        let flux_unit = r#"{"dispersion0":1.0,"dispersion_delta":1.0,"pixel_index":0.0,"unit":"Jy"}"#;
        assert!(serde_json::from_str::<LinearWcs>(flux_unit).is_err());
    }

    #[test]
    fn bin_edges_are_half_pixel_offsets() {
        let wcs = LinearWcs::new(10.0, 1.0, 0.0, Some(Unit::angstrom())).unwrap();
        let edges = wcs.bin_edges(2);
        assert_eq!(edges.value().as_slice().unwrap(), &[9.5, 10.5, 11.5]);
    }
}
