//! Containers for astronomical spectra.
//!
//! A [`Spectrum1D`] binds a flux array to a spectral axis (wavelength,
//! frequency, energy, velocity or pixel), carries units, uncertainty, mask,
//! metadata and a radial-velocity frame, and maps pixels to dispersion values
//! through a [`SpectralWcs`].

pub mod data;
pub mod error;
pub mod nddata;
pub mod spectra;
pub mod units;
pub mod wcs;

pub use data::loader::{load_file, LoaderConfig};
pub use data::model::{Meta, MetadataValue};
pub use error::{Result, SpectrumError};
pub use nddata::{ArithmeticOp, NdData, StdDevUncertainty};
pub use spectra::{
    AxisIndex, DopplerConvention, OneDSpectrum, Operand, SpectralAxis, SpectralCoord, Spectrum1D,
    SpectrumArgs,
};
pub use units::{MaybeQuantity, Quantity, Unit};
pub use wcs::{FitsHeader, InterpolationKind, LinearWcs, LookupWcs, SpectralWcs};
