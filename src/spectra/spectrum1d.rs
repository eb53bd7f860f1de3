use std::ops::Range;
use std::sync::OnceLock;

use log::{debug, warn};
use ndarray::{Array1, ArrayD, Axis, IxDyn, Slice};

use super::spectral_coord::{DopplerConvention, SpectralCoord};
use crate::data::model::Meta;
use crate::error::{Result, SpectrumError};
use crate::nddata::{broadcast_shape, NdData, StdDevUncertainty};
use crate::units::{MaybeQuantity, Quantity, Unit};
use crate::wcs::{check_valid_unit, LinearWcs, LookupWcs, SpectralWcs};

// ---------------------------------------------------------------------------
// Construction arguments
// ---------------------------------------------------------------------------

/// A spectral axis given either as plain values or as a complete coordinate
/// (values plus velocity frame).
#[derive(Debug, Clone, PartialEq)]
pub enum SpectralAxis {
    Values(Quantity),
    Coord(SpectralCoord),
}

impl From<Quantity> for SpectralAxis {
    fn from(q: Quantity) -> Self {
        SpectralAxis::Values(q)
    }
}

impl From<SpectralCoord> for SpectralAxis {
    fn from(c: SpectralCoord) -> Self {
        SpectralAxis::Coord(c)
    }
}

/// Everything a [`Spectrum1D`] can be built from.
///
/// Fields are public so that [`Spectrum1D::copy_with`] callers can replace or
/// clear any of them; the builder methods cover the common cases.
#[derive(Debug, Clone, Default)]
pub struct SpectrumArgs {
    pub flux: Option<MaybeQuantity>,
    pub spectral_axis: Option<SpectralAxis>,
    pub wcs: Option<SpectralWcs>,
    pub velocity_convention: Option<DopplerConvention>,
    pub rest_value: Option<MaybeQuantity>,
    pub redshift: Option<MaybeQuantity>,
    pub radial_velocity: Option<Quantity>,
    pub uncertainty: Option<StdDevUncertainty>,
    pub mask: Option<ArrayD<bool>>,
    pub meta: Meta,
    pub unit: Option<Unit>,
}

impl SpectrumArgs {
    pub fn new(flux: impl Into<MaybeQuantity>) -> Self {
        SpectrumArgs {
            flux: Some(flux.into()),
            ..Default::default()
        }
    }

    pub fn spectral_axis(mut self, axis: impl Into<SpectralAxis>) -> Self {
        self.spectral_axis = Some(axis.into());
        self
    }

    pub fn wcs(mut self, wcs: impl Into<SpectralWcs>) -> Self {
        self.wcs = Some(wcs.into());
        self
    }

    pub fn velocity_convention(mut self, convention: DopplerConvention) -> Self {
        self.velocity_convention = Some(convention);
        self
    }

    pub fn rest_value(mut self, rest_value: impl Into<MaybeQuantity>) -> Self {
        self.rest_value = Some(rest_value.into());
        self
    }

    pub fn redshift(mut self, redshift: impl Into<MaybeQuantity>) -> Self {
        self.redshift = Some(redshift.into());
        self
    }

    pub fn radial_velocity(mut self, radial_velocity: Quantity) -> Self {
        self.radial_velocity = Some(radial_velocity);
        self
    }

    pub fn uncertainty(mut self, uncertainty: StdDevUncertainty) -> Self {
        self.uncertainty = Some(uncertainty);
        self
    }

    pub fn mask(mut self, mask: ArrayD<bool>) -> Self {
        self.mask = Some(mask);
        self
    }

    pub fn meta(mut self, meta: Meta) -> Self {
        self.meta = meta;
        self
    }

    pub fn unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    pub fn build(self) -> Result<Spectrum1D> {
        Spectrum1D::new(self)
    }
}

/// Position along the first axis of a spectrum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AxisIndex {
    /// A single position; negative values count from the end.
    At(isize),
    Range(Range<usize>),
}

impl From<isize> for AxisIndex {
    fn from(i: isize) -> Self {
        AxisIndex::At(i)
    }
}

impl From<i32> for AxisIndex {
    fn from(i: i32) -> Self {
        AxisIndex::At(i as isize)
    }
}

impl From<usize> for AxisIndex {
    fn from(i: usize) -> Self {
        AxisIndex::At(i as isize)
    }
}

impl From<Range<usize>> for AxisIndex {
    fn from(r: Range<usize>) -> Self {
        AxisIndex::Range(r)
    }
}

// ---------------------------------------------------------------------------
// Spectrum1D
// ---------------------------------------------------------------------------

/// One or more spectra sharing a single spectral axis.
///
/// The flux may have any rank; its last axis runs along the spectral axis.
/// The array container ([`NdData`]) holds flux, unit, uncertainty, mask,
/// metadata and WCS; the [`SpectralCoord`] holds dispersion values and the
/// velocity frame.
#[derive(Clone)]
pub struct Spectrum1D {
    pub(super) data: NdData,
    pub(super) spectral_axis: SpectralCoord,
    bin_edges: OnceLock<Quantity>,
}

impl Spectrum1D {
    /// Validate `args` and build a spectrum.
    ///
    /// * Without `spectral_axis` or `wcs` the axis is the pixel index.
    /// * With only a `wcs`, the axis is the WCS evaluated at every pixel.
    /// * With a `spectral_axis` a lookup WCS is built from it, unless a `wcs`
    ///   is given as well, in which case both are kept.
    ///
    /// A bare scalar flux yields a minimal spectrum that skips every axis
    /// check; bare arrays are rejected.
    pub fn new(args: SpectrumArgs) -> Result<Self> {
        let SpectrumArgs {
            flux,
            spectral_axis,
            wcs,
            velocity_convention,
            rest_value,
            redshift,
            radial_velocity,
            uncertainty,
            mask,
            meta,
            unit,
        } = args;

        if redshift.is_some() && radial_velocity.is_some() {
            return Err(SpectrumError::InvalidArgument(
                "cannot set both radial_velocity and redshift at the same time".into(),
            ));
        }
        let frame = Frame {
            convention: velocity_convention,
            rest_value,
            redshift,
            radial_velocity,
        };

        let flux = match flux {
            None => return Err(SpectrumError::InvalidArgument("flux is required".into())),
            Some(MaybeQuantity::Bare(value)) if value.ndim() == 0 => {
                if wcs.is_some() {
                    warn!("a scalar flux has no pixel axis; ignoring the supplied WCS");
                }
                let data = NdData::new(value)
                    .with_unit(unit)
                    .with_uncertainty(uncertainty)
                    .with_mask(mask)
                    .with_meta(meta);
                return Spectrum1D::minimal(data, spectral_axis, frame);
            }
            Some(MaybeQuantity::Bare(_)) => {
                return Err(SpectrumError::InvalidArgument(
                    "flux must be a unit-tagged quantity".into(),
                ))
            }
            Some(MaybeQuantity::Tagged(q)) => q,
        };

        let flux = if flux.is_scalar() {
            let (value, unit) = flux.into_parts();
            let value = value
                .into_shape(IxDyn(&[1]))
                .map_err(|e| SpectrumError::ShapeMismatch(e.to_string()))?;
            Quantity::new(value, unit)
        } else {
            flux
        };
        let flux = match &unit {
            Some(unit) => flux.to(unit)?,
            None => flux,
        };
        let (values, flux_unit) = flux.into_parts();
        let n = values.shape().last().copied().unwrap_or(1);

        let (mut coord, wcs, prebuilt) = match (spectral_axis, wcs) {
            (Some(axis), wcs) => {
                let (coord, prebuilt) = match axis {
                    SpectralAxis::Values(q) => (SpectralCoord::new(q)?, false),
                    SpectralAxis::Coord(c) => (c, true),
                };
                check_valid_unit(coord.unit())?;
                if coord.len() != n {
                    return Err(SpectrumError::ShapeMismatch(format!(
                        "Spectral axis ({}) and the last flux axis ({n}) lengths must be the same",
                        coord.len()
                    )));
                }
                let wcs = match wcs {
                    Some(wcs) => {
                        if !coord.unit().is_equivalent(wcs.unit()) {
                            return Err(SpectrumError::UnitMismatch(format!(
                                "spectral axis unit '{}' does not match the WCS unit '{}'",
                                coord.unit(),
                                wcs.unit()
                            )));
                        }
                        debug!("spectral axis given with a WCS; keeping both");
                        wcs
                    }
                    None => LookupWcs::from_quantity(coord.values().clone())?.into(),
                };
                (coord, wcs, prebuilt)
            }
            (None, Some(wcs)) => {
                let values = wcs.evaluate(&pixel_indices(n))?;
                (SpectralCoord::new(values)?, wcs, false)
            }
            (None, None) => {
                let wcs: SpectralWcs = LinearWcs::new(0.0, 1.0, 0.0, Some(Unit::pixel()))?.into();
                let values = wcs.evaluate(&pixel_indices(n))?;
                (SpectralCoord::new(values)?, wcs, false)
            }
        };
        if let Some(len) = wcs.table_len() {
            if len != n {
                return Err(SpectrumError::ShapeMismatch(format!(
                    "lookup WCS ({len}) and the last flux axis ({n}) lengths must be the same"
                )));
            }
        }

        let default_rest = (!prebuilt).then(|| wcs.rest_value()).flatten();
        frame.apply(&mut coord, default_rest)?;

        if let Some(u) = &uncertainty {
            if u.shape() != values.shape() {
                return Err(SpectrumError::ShapeMismatch(format!(
                    "Flux axis ({:?}) and uncertainty ({:?}) shapes must be the same",
                    values.shape(),
                    u.shape()
                )));
            }
        }
        if let Some(m) = &mask {
            if m.shape() != values.shape() {
                return Err(SpectrumError::ShapeMismatch(format!(
                    "Flux axis ({:?}) and mask ({:?}) shapes must be the same",
                    values.shape(),
                    m.shape()
                )));
            }
        }
        check_radial_velocity_shape(coord.radial_velocity(), values.shape())?;

        debug!(
            "built spectrum of shape {:?} over {} {} values",
            values.shape(),
            coord.len(),
            coord.unit()
        );
        let data = NdData::new(values)
            .with_unit(Some(flux_unit))
            .with_uncertainty(uncertainty)
            .with_mask(mask)
            .with_meta(meta)
            .with_wcs(Some(wcs));
        Ok(Spectrum1D::from_parts(data, coord))
    }

    /// Flux against a spectral axis, nothing else.
    pub fn from_flux_and_axis(flux: Quantity, spectral_axis: Quantity) -> Result<Self> {
        SpectrumArgs::new(flux).spectral_axis(spectral_axis).build()
    }

    /// Container around a rank-0 flux: one pixel, no axis validation.
    fn minimal(data: NdData, spectral_axis: Option<SpectralAxis>, frame: Frame) -> Result<Self> {
        let mut coord = match spectral_axis {
            Some(SpectralAxis::Coord(c)) => c,
            Some(SpectralAxis::Values(q)) => SpectralCoord::new(q)?,
            None => SpectralCoord::new(Quantity::from_vec(vec![0.0], Unit::pixel()))?,
        };
        check_valid_unit(coord.unit())?;
        frame.apply(&mut coord, None)?;
        Ok(Spectrum1D::from_parts(data, coord))
    }

    /// Copy-construction from already consistent parts.
    pub(crate) fn from_parts(data: NdData, spectral_axis: SpectralCoord) -> Self {
        Spectrum1D {
            data,
            spectral_axis,
            bin_edges: OnceLock::new(),
        }
    }

    /// The arguments that rebuild this spectrum unchanged.
    fn to_args(&self) -> SpectrumArgs {
        let flux = if self.is_scalar() {
            MaybeQuantity::Bare(self.data.data().clone())
        } else {
            MaybeQuantity::Tagged(self.flux())
        };
        SpectrumArgs {
            flux: Some(flux),
            spectral_axis: Some(SpectralAxis::Coord(self.spectral_axis.clone())),
            wcs: self.data.wcs().cloned(),
            uncertainty: self.data.uncertainty().cloned(),
            mask: self.data.mask().cloned(),
            meta: self.data.meta().clone(),
            unit: self.data.unit().cloned(),
            ..Default::default()
        }
    }

    /// An independent copy with any arguments replaced by `overrides`.
    ///
    /// ```ignore
    /// let rescaled = spectrum.copy_with(|args| SpectrumArgs { mask: None, ..args })?;
    /// ```
    pub fn copy_with(&self, overrides: impl FnOnce(SpectrumArgs) -> SpectrumArgs) -> Result<Self> {
        Spectrum1D::new(overrides(self.to_args()))
    }

    // -- accessors --

    pub fn flux(&self) -> Quantity {
        Quantity::new(
            self.data.data().clone(),
            self.data.unit().cloned().unwrap_or_else(Unit::dimensionless),
        )
    }

    pub fn flux_values(&self) -> &ArrayD<f64> {
        self.data.data()
    }

    pub fn unit(&self) -> Option<&Unit> {
        self.data.unit()
    }

    pub fn spectral_axis(&self) -> &SpectralCoord {
        &self.spectral_axis
    }

    pub fn spectral_axis_unit(&self) -> &Unit {
        self.spectral_axis.unit()
    }

    pub fn uncertainty(&self) -> Option<&StdDevUncertainty> {
        self.data.uncertainty()
    }

    pub fn mask(&self) -> Option<&ArrayD<bool>> {
        self.data.mask()
    }

    pub fn meta(&self) -> &Meta {
        self.data.meta()
    }

    pub fn meta_mut(&mut self) -> &mut Meta {
        self.data.meta_mut()
    }

    pub fn wcs(&self) -> Option<&SpectralWcs> {
        self.data.wcs()
    }

    pub fn nddata(&self) -> &NdData {
        &self.data
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    /// True for the minimal, rank-0 container.
    pub fn is_scalar(&self) -> bool {
        self.data.ndim() == 0
    }

    pub fn velocity_convention(&self) -> Option<DopplerConvention> {
        self.spectral_axis.doppler_convention()
    }

    pub fn rest_value(&self) -> &Quantity {
        self.spectral_axis.rest_value()
    }

    /// Dispersion values at pixel boundaries, computed once.
    pub fn bin_edges(&self) -> &Quantity {
        self.bin_edges.get_or_init(|| {
            let n = self.spectral_axis.len();
            match self.data.wcs() {
                Some(wcs) => wcs.bin_edges(n),
                None => Quantity::from_vec(
                    (0..=n).map(|i| i as f64 - 0.5).collect(),
                    Unit::pixel(),
                ),
            }
        })
    }

    // -- velocity frame --

    pub fn radial_velocity(&self) -> &Quantity {
        self.spectral_axis.radial_velocity()
    }

    pub fn redshift(&self) -> Quantity {
        self.spectral_axis.redshift()
    }

    pub fn set_radial_velocity(&mut self, radial_velocity: Quantity) -> Result<()> {
        let mut coord = self.spectral_axis.clone();
        coord.set_radial_velocity(radial_velocity)?;
        check_radial_velocity_shape(coord.radial_velocity(), self.shape())?;
        self.spectral_axis = coord;
        Ok(())
    }

    pub fn set_redshift(&mut self, redshift: impl Into<MaybeQuantity>) -> Result<()> {
        let mut coord = self.spectral_axis.clone();
        coord.set_redshift(redshift)?;
        check_radial_velocity_shape(coord.radial_velocity(), self.shape())?;
        self.spectral_axis = coord;
        Ok(())
    }

    // -- indexing --

    /// Index the first axis.
    ///
    /// For stacked spectra this picks rows and keeps the whole spectral axis;
    /// for a single spectrum it picks pixels and slices the spectral axis and
    /// WCS with them. A single position in a single spectrum yields a
    /// length-1 spectrum.
    pub fn item(&self, index: impl Into<AxisIndex>) -> Result<Spectrum1D> {
        let index = index.into();
        match self.ndim() {
            0 => Err(SpectrumError::InvalidArgument(
                "a scalar spectrum cannot be indexed".into(),
            )),
            1 => {
                let range = resolve(index, self.spectral_axis.len())?;
                let data = self.data.slice_axis(0, range.clone())?;
                let coord = self.spectral_axis.slice(range)?;
                Ok(Spectrum1D::from_parts(data, coord))
            }
            _ => {
                let rows = self.shape()[0];
                let (data, selection) = match index {
                    AxisIndex::At(i) => {
                        let i = normalize(i, rows)?;
                        (self.data.index_first_axis(i)?, RowSelection::One(i))
                    }
                    range @ AxisIndex::Range(_) => {
                        let r = resolve(range, rows)?;
                        (self.data.slice_axis(0, r.clone())?, RowSelection::Many(r))
                    }
                };
                let coord = self.rows_frame(&selection, rows)?;
                let unit = data.unit().cloned().unwrap_or_else(Unit::dimensionless);
                let flux = Quantity::new(data.data().clone(), unit);
                self.copy_with(|args| SpectrumArgs {
                    flux: Some(flux.into()),
                    spectral_axis: Some(coord.into()),
                    uncertainty: data.uncertainty().cloned(),
                    mask: data.mask().cloned(),
                    ..args
                })
            }
        }
    }

    /// The spectral coordinate with its radial velocity cut down to the
    /// selected rows.
    ///
    /// Only a radial velocity spanning every leading flux axis has a first
    /// axis that lines up with the rows. Anything shorter broadcasts against
    /// the trailing leading axes and is kept whole.
    fn rows_frame(&self, selection: &RowSelection, rows: usize) -> Result<SpectralCoord> {
        let rv = self.spectral_axis.radial_velocity();
        if rv.ndim() == 0 || rv.ndim() != self.ndim() - 1 {
            return Ok(self.spectral_axis.clone());
        }
        let values = rv.value();
        let picked = match (selection, values.shape()[0]) {
            (RowSelection::One(i), n) if n == rows => values.index_axis(Axis(0), *i).to_owned(),
            (RowSelection::One(_), 1) => values.index_axis(Axis(0), 0).to_owned(),
            (RowSelection::Many(r), n) if n == rows => {
                values.slice_axis(Axis(0), Slice::from(r.clone())).to_owned()
            }
            _ => return Ok(self.spectral_axis.clone()),
        };
        self.spectral_axis
            .clone()
            .with_radial_velocity(Quantity::new(picked, rv.unit().clone()))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Velocity-frame arguments, applied after the axis is known.
struct Frame {
    convention: Option<DopplerConvention>,
    rest_value: Option<MaybeQuantity>,
    redshift: Option<MaybeQuantity>,
    radial_velocity: Option<Quantity>,
}

impl Frame {
    fn apply(self, coord: &mut SpectralCoord, default_rest: Option<Quantity>) -> Result<()> {
        if self.convention.is_some() {
            *coord = coord.clone().with_doppler_convention(self.convention);
        }
        match (self.rest_value, default_rest) {
            (Some(rest), _) => coord.set_rest_value(rest)?,
            (None, Some(rest)) => coord.set_rest_value(rest)?,
            (None, None) => {}
        }
        if let Some(z) = self.redshift {
            coord.set_redshift(z)?;
        }
        if let Some(rv) = self.radial_velocity {
            coord.set_radial_velocity(rv)?;
        }
        Ok(())
    }
}

enum RowSelection {
    One(usize),
    Many(Range<usize>),
}

fn pixel_indices(n: usize) -> Array1<f64> {
    Array1::from_iter((0..n).map(|i| i as f64))
}

fn normalize(index: isize, len: usize) -> Result<usize> {
    let resolved = if index < 0 { index + len as isize } else { index };
    if resolved < 0 || resolved as usize >= len {
        return Err(SpectrumError::IndexOutOfBounds { index, len });
    }
    Ok(resolved as usize)
}

/// A non-empty range within `0..len`.
fn resolve(index: AxisIndex, len: usize) -> Result<Range<usize>> {
    match index {
        AxisIndex::At(i) => {
            let i = normalize(i, len)?;
            Ok(i..i + 1)
        }
        AxisIndex::Range(r) => {
            if r.end > len {
                return Err(SpectrumError::IndexOutOfBounds {
                    index: r.end as isize,
                    len,
                });
            }
            if r.start >= r.end {
                return Err(SpectrumError::InvalidArgument(format!(
                    "empty selection {}..{}",
                    r.start, r.end
                )));
            }
            Ok(r)
        }
    }
}

/// Radial velocities must broadcast against every axis but the spectral one.
fn check_radial_velocity_shape(radial_velocity: &Quantity, flux_shape: &[usize]) -> Result<()> {
    let leading = &flux_shape[..flux_shape.len().saturating_sub(1)];
    match broadcast_shape(radial_velocity.shape(), leading) {
        Some(_) => Ok(()),
        None => Err(SpectrumError::ShapeMismatch(format!(
            "radial_velocity or redshift of shape {:?} is not compatible with flux of shape {flux_shape:?}",
            radial_velocity.shape()
        ))),
    }
}

impl PartialEq for Spectrum1D {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data && self.spectral_axis == other.spectral_axis
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn flambda() -> Unit {
        Unit::parse("erg / (s cm2 Angstrom)").unwrap()
    }

    fn spectrum() -> Spectrum1D {
        Spectrum1D::from_flux_and_axis(
            Quantity::from_vec(vec![1.0, 2.0, 3.0, 4.0], flambda()),
            Quantity::from_vec(vec![4000.0, 4500.0, 5000.0, 5500.0], Unit::angstrom()),
        )
        .unwrap()
    }

    #[test]
    fn spectral_axis_builds_a_lookup_wcs() {
        let s = spectrum();
        assert_eq!(s.shape(), &[4]);
        assert!(matches!(s.wcs(), Some(SpectralWcs::Lookup(_))));
        assert_eq!(s.spectral_axis().values().last(), Some(5500.0));
        assert_eq!(s.redshift().as_scalar(), Some(0.0));
        assert_eq!(s.rest_value().as_scalar(), Some(0.0));
    }

    #[test]
    fn flux_alone_gets_a_pixel_axis() {
        let s = SpectrumArgs::new(Quantity::from_vec(vec![5.0, 6.0, 7.0], Unit::jansky()))
            .build()
            .unwrap();
        assert_eq!(s.spectral_axis_unit(), &Unit::pixel());
        assert_eq!(s.spectral_axis().values().value(), &array![0.0, 1.0, 2.0].into_dyn());
    }

    #[test]
    fn wcs_alone_is_evaluated_per_pixel() {
        let wcs = LinearWcs::new(6000.0, 2.5, 0.0, Some(Unit::angstrom()))
            .unwrap()
            .with_rest_frequency(4.5e14);
        let s = SpectrumArgs::new(Quantity::from_vec(vec![1.0, 1.0, 1.0], Unit::jansky()))
            .wcs(wcs)
            .build()
            .unwrap();
        assert_eq!(s.spectral_axis().values().value(), &array![6000.0, 6002.5, 6005.0].into_dyn());
        assert_eq!(s.rest_value().unit(), &Unit::hertz());
        assert_eq!(s.rest_value().as_scalar(), Some(4.5e14));
    }

    #[test]
    fn redshift_and_radial_velocity_conflict() {
        let err = SpectrumArgs::new(Quantity::from_vec(vec![1.0], Unit::jansky()))
            .redshift(0.1)
            .radial_velocity(Quantity::scalar(3e4, Unit::km_per_s()))
            .build()
            .unwrap_err();
        assert!(matches!(err, SpectrumError::InvalidArgument(_)));
    }

    #[test]
    fn axis_length_must_match_flux() {
        let err = Spectrum1D::from_flux_and_axis(
            Quantity::from_vec(vec![1.0, 2.0, 3.0], Unit::jansky()),
            Quantity::from_vec(vec![1.0, 2.0], Unit::angstrom()),
        )
        .unwrap_err();
        assert!(matches!(err, SpectrumError::ShapeMismatch(_)));
    }

    #[test]
    fn flux_must_carry_a_unit_unless_scalar() {
        let err = SpectrumArgs::new(vec![1.0, 2.0]).build().unwrap_err();
        assert!(matches!(err, SpectrumError::InvalidArgument(_)));

        let s = SpectrumArgs::new(2.0).build().unwrap();
        assert!(s.is_scalar());
        assert!(s.wcs().is_none());
        assert_eq!(s.spectral_axis().len(), 1);
    }

    #[test]
    fn scalar_quantity_is_promoted() {
        let s = SpectrumArgs::new(Quantity::scalar(3.0, Unit::jansky())).build().unwrap();
        assert_eq!(s.shape(), &[1]);
    }

    #[test]
    fn explicit_unit_converts_the_flux() {
        let s = SpectrumArgs::new(Quantity::from_vec(vec![1.0, 2.0], Unit::jansky()))
            .unit(Unit::parse("mJy").unwrap())
            .build()
            .unwrap();
        assert!((s.flux_values()[[1]] - 2000.0).abs() < 1e-9);
        let err = SpectrumArgs::new(Quantity::from_vec(vec![1.0], Unit::jansky()))
            .unit(Unit::angstrom())
            .build()
            .unwrap_err();
        assert!(matches!(err, SpectrumError::UnitMismatch(_)));
    }

    #[test]
    fn uncertainty_and_mask_shapes_are_checked() {
        let flux = Quantity::from_vec(vec![1.0, 2.0, 3.0], Unit::jansky());
        let err = SpectrumArgs::new(flux.clone())
            .uncertainty(StdDevUncertainty::new(array![0.1, 0.1]))
            .build()
            .unwrap_err();
        assert!(matches!(err, SpectrumError::ShapeMismatch(_)));
        let err = SpectrumArgs::new(flux)
            .mask(array![true].into_dyn())
            .build()
            .unwrap_err();
        assert!(matches!(err, SpectrumError::ShapeMismatch(_)));
    }

    #[test]
    fn lookup_wcs_length_is_checked() {
        let wcs = LookupWcs::from_quantity(Quantity::from_vec(vec![1.0, 2.0], Unit::angstrom())).unwrap();
        let err = SpectrumArgs::new(Quantity::from_vec(vec![1.0, 2.0, 3.0], Unit::jansky()))
            .wcs(wcs)
            .build()
            .unwrap_err();
        assert!(matches!(err, SpectrumError::ShapeMismatch(_)));
    }

    #[test]
    fn indexing_a_single_spectrum_slices_the_axis() {
        let s = spectrum();
        let px = s.item(AxisIndex::At(-1)).unwrap();
        assert_eq!(px.shape(), &[1]);
        assert_eq!(px.spectral_axis().values().first(), Some(5500.0));
        let mid = s.item(1..3).unwrap();
        assert_eq!(mid.flux_values(), &array![2.0, 3.0].into_dyn());
        assert_eq!(mid.wcs().and_then(|w| w.table_len()), Some(2));
        assert!(matches!(
            s.item(AxisIndex::At(4)),
            Err(SpectrumError::IndexOutOfBounds { index: 4, len: 4 })
        ));
    }

    #[test]
    fn indexing_stacked_spectra_keeps_the_axis() {
        let s = Spectrum1D::from_flux_and_axis(
            Quantity::new(array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]], Unit::jansky()),
            Quantity::from_vec(vec![1.0, 2.0, 3.0], Unit::micron()),
        )
        .unwrap();
        let row = s.item(AxisIndex::At(1)).unwrap();
        assert_eq!(row.flux_values(), &array![4.0, 5.0, 6.0].into_dyn());
        assert_eq!(row.spectral_axis(), s.spectral_axis());
        assert_eq!(s.flux_values()[[1, 0]], 4.0);
    }

    #[test]
    fn per_row_radial_velocity_follows_the_rows() {
        let s = SpectrumArgs::new(Quantity::new(array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]], Unit::jansky()))
            .radial_velocity(Quantity::from_vec(vec![10.0, 20.0, 30.0], Unit::km_per_s()))
            .build()
            .unwrap();
        let row = s.item(AxisIndex::At(2)).unwrap();
        assert_eq!(row.radial_velocity().as_scalar(), Some(30.0));
        let rows = s.item(0..2).unwrap();
        assert_eq!(rows.radial_velocity().value(), &array![10.0, 20.0].into_dyn());
    }

    #[test]
    fn spectral_axis_unit_is_validated_next_to_a_wcs() {
        let wcs = LinearWcs::new(6000.0, 1.0, 0.0, Some(Unit::angstrom())).unwrap();
        let err = SpectrumArgs::new(Quantity::from_vec(vec![1.0, 2.0, 3.0], Unit::jansky()))
            .spectral_axis(Quantity::from_vec(vec![1.0, 2.0, 3.0], Unit::jansky()))
            .wcs(wcs.clone())
            .build()
            .unwrap_err();
        assert!(matches!(err, SpectrumError::InvalidUnit { .. }));

        let err = SpectrumArgs::new(Quantity::from_vec(vec![1.0, 2.0, 3.0], Unit::jansky()))
            .spectral_axis(Quantity::from_vec(vec![1.0, 2.0, 3.0], Unit::gigahertz()))
            .wcs(wcs.clone())
            .build()
            .unwrap_err();
        assert!(matches!(err, SpectrumError::UnitMismatch(_)));

        let ok = SpectrumArgs::new(Quantity::from_vec(vec![1.0, 2.0, 3.0], Unit::jansky()))
            .spectral_axis(Quantity::from_vec(vec![600.0, 600.1, 600.2], Unit::nanometer()))
            .wcs(wcs)
            .build()
            .unwrap();
        assert_eq!(ok.spectral_axis_unit(), &Unit::nanometer());
    }

    #[test]
    fn scalar_flux_rejects_a_non_spectral_axis() {
        let err = SpectrumArgs::new(2.0)
            .spectral_axis(Quantity::from_vec(vec![1.0], Unit::jansky()))
            .build()
            .unwrap_err();
        assert!(matches!(err, SpectrumError::InvalidUnit { .. }));
    }

    #[test]
    fn radial_velocity_on_an_inner_axis_is_kept_whole() {
        let s = SpectrumArgs::new(Quantity::new(ArrayD::ones(IxDyn(&[2, 2, 3])), Unit::jansky()))
            .radial_velocity(Quantity::from_vec(vec![10.0, 20.0], Unit::km_per_s()))
            .build()
            .unwrap();
        let plane = s.item(AxisIndex::At(0)).unwrap();
        assert_eq!(plane.shape(), &[2, 3]);
        assert_eq!(plane.radial_velocity().value(), &array![10.0, 20.0].into_dyn());
    }

    #[test]
    fn radial_velocity_per_plane_and_row_is_sliced_by_plane() {
        let rv = Quantity::new(array![[10.0, 20.0], [30.0, 40.0]], Unit::km_per_s());
        let s = SpectrumArgs::new(Quantity::new(ArrayD::ones(IxDyn(&[2, 2, 3])), Unit::jansky()))
            .radial_velocity(rv)
            .build()
            .unwrap();
        let plane = s.item(AxisIndex::At(1)).unwrap();
        assert_eq!(plane.radial_velocity().value(), &array![30.0, 40.0].into_dyn());
        let planes = s.item(0..1).unwrap();
        assert_eq!(planes.radial_velocity().shape(), &[1, 2]);
    }

    #[test]
    fn radial_velocity_shape_is_checked_on_set() {
        let mut s = SpectrumArgs::new(Quantity::new(array![[1.0, 2.0], [3.0, 4.0]], Unit::jansky()))
            .build()
            .unwrap();
        s.set_redshift(vec![0.1, 0.2]).unwrap();
        let err = s.set_redshift(vec![0.1, 0.2, 0.3]).unwrap_err();
        assert!(matches!(err, SpectrumError::ShapeMismatch(_)));
        assert_eq!(s.redshift().len(), 2);
    }

    #[test]
    fn copy_with_no_overrides_is_equal_but_independent() {
        let s = spectrum();
        let mut copy = s.copy_with(|args| args).unwrap();
        assert_eq!(copy, s);
        copy.set_redshift(1.0).unwrap();
        assert_eq!(s.redshift().as_scalar(), Some(0.0));
    }

    #[test]
    fn bin_edges_come_from_the_wcs() {
        let edges = spectrum().bin_edges().clone();
        assert_eq!(edges.value(), &array![3750.0, 4250.0, 4750.0, 5250.0, 5750.0].into_dyn());
    }
}
