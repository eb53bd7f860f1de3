use crate::error::Result;
use crate::units::{Quantity, Unit};

use super::spectral_coord::SpectralCoord;
use super::spectrum1d::Spectrum1D;

/// Derived spectral quantities for anything that pairs a flux with a
/// spectral axis.
pub trait OneDSpectrum {
    fn spectral_axis(&self) -> &SpectralCoord;

    fn flux(&self) -> Quantity;

    /// Spectral axis in GHz.
    fn frequency(&self) -> Result<Quantity> {
        self.spectral_axis().frequency()
    }

    /// Spectral axis in Angstrom.
    fn wavelength(&self) -> Result<Quantity> {
        self.spectral_axis().wavelength()
    }

    /// Spectral axis in eV.
    fn energy(&self) -> Result<Quantity> {
        self.spectral_axis().energy()
    }

    /// Spectral axis as Doppler velocities in km/s.
    fn velocity(&self) -> Result<Quantity> {
        self.spectral_axis().to_velocity()
    }

    /// Photon flux density in `photon / (cm2 s <spectral axis unit>)`.
    ///
    /// The flux is first expressed as `W / (cm2 <axis unit>)` and then divided
    /// by the energy per photon at each spectral position.
    fn photon_flux(&self) -> Result<Quantity> {
        let axis = self.spectral_axis().values();
        let per_area = Unit::centimeter().powi(-2)?;
        let target = Unit::watt().try_mul(&per_area)?.try_div(axis.unit())?;
        let density = self.flux().to_spectral_density(&target, axis)?;

        let energy = self.energy()?;
        let per_photon = energy.unit().try_div(&Unit::photon())?;
        let photons = Quantity::new(
            density.value() / energy.value(),
            density.unit().try_div(&per_photon)?,
        );

        let rate = Unit::photon().try_mul(&per_area)?.try_div(&Unit::second())?;
        photons.to(&rate.try_div(axis.unit())?)
    }
}

impl OneDSpectrum for Spectrum1D {
    fn spectral_axis(&self) -> &SpectralCoord {
        Spectrum1D::spectral_axis(self)
    }

    fn flux(&self) -> Quantity {
        Spectrum1D::flux(self)
    }
}
