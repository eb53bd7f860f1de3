//! Physical units and unit-tagged arrays.
//!
//! Covers what the spectrum containers need: parsing astropy/FITS unit
//! strings, dimensional conversion, the spectral equivalence graph
//! (wavelength, frequency, energy, wavenumber) and spectral flux density
//! conversion.

mod equivalencies;
mod quantity;
mod unit;

pub use equivalencies::{spectral_convert, spectral_density_convert};
pub use quantity::{MaybeQuantity, Quantity};
pub use unit::{Dimensions, PhysicalType, Unit};

pub mod constants {
    /// Speed of light in vacuum, m / s.
    pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;
    /// Planck constant, J s.
    pub const PLANCK: f64 = 6.626_070_15e-34;
}
