//! Spectrum containers.
//!
//! ```text
//!   flux (Quantity) ──┐
//!                     ├──▶ Spectrum1D ──▶ frequency / wavelength / energy
//!   spectral axis ────┤      │  │            photon_flux / velocity
//!   or SpectralWcs ───┘      │  └──▶ item(), copy_with()
//!                            └─────▶ + - * /  (uncertainty propagated)
//! ```

mod arithmetic;
mod display;
mod mixin;
mod spectral_coord;
mod spectrum1d;

pub use arithmetic::Operand;
pub use mixin::OneDSpectrum;
pub use spectral_coord::{DopplerConvention, SpectralCoord};
pub use spectrum1d::{AxisIndex, SpectralAxis, Spectrum1D, SpectrumArgs};
