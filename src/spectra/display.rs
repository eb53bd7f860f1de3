use std::fmt;

use crate::units::Unit;

use super::spectrum1d::Spectrum1D;

/// Five significant digits, switching to exponent notation for very large or
/// small magnitudes and always keeping one decimal in fixed notation
/// (`4000.0`, `2.5`, `1.2346e+05`).
fn format_significant(v: f64) -> String {
    if v.is_nan() {
        return "nan".into();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf".into() } else { "-inf".into() };
    }
    if v == 0.0 {
        return if v.is_sign_negative() { "-0.0".into() } else { "0.0".into() };
    }

    let sci = format!("{v:.4e}");
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };
    if !(-4..5).contains(&exp) {
        let sign = if exp < 0 { '-' } else { '+' };
        return format!("{}e{sign}{:02}", trim_zeros(mantissa), exp.abs());
    }

    let decimals = (4 - exp).max(0) as usize;
    let fixed = format!("{v:.decimals$}");
    let trimmed = trim_zeros(&fixed);
    if trimmed.contains('.') {
        trimmed.to_string()
    } else {
        format!("{trimmed}.0")
    }
}

fn trim_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

fn with_unit(v: f64, unit: &Unit) -> String {
    let unit = unit.to_string();
    if unit.is_empty() {
        format_significant(v)
    } else {
        format!("{} {unit}", format_significant(v))
    }
}

/// `label: [ first, ..., last ],  mean=...` for one run of values.
fn array_summary(label: &str, values: &[f64], unit: &Unit) -> String {
    let label = format!("{label}:");
    match values {
        [] => format!("{label:17} [ ],  mean= n/a"),
        [only] => format!(
            "{label:17} [ {} ],  mean={}",
            with_unit(*only, unit),
            with_unit(*only, unit)
        ),
        [first, .., last] => {
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            format!(
                "{label:17} [ {}, ..., {} ],  mean={}",
                with_unit(*first, unit),
                with_unit(*last, unit),
                with_unit(mean, unit)
            )
        }
    }
}

impl fmt::Display for Spectrum1D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flux = self.flux();
        if self.is_scalar() {
            let value = flux.first().unwrap_or(f64::NAN);
            return write!(f, "Spectrum1D (length=1)\nflux:   {}", with_unit(value, flux.unit()));
        }

        writeln!(f, "Spectrum1D (length={})", self.spectral_axis().len())?;
        if flux.ndim() > 1 {
            for (i, row) in flux.value().outer_iter().enumerate() {
                let row: Vec<f64> = row.iter().copied().collect();
                writeln!(f, "{}", array_summary(&format!("flux{i:2}"), &row, flux.unit()))?;
            }
        } else {
            let values: Vec<f64> = flux.value().iter().copied().collect();
            writeln!(f, "{}", array_summary("flux", &values, flux.unit()))?;
        }

        let axis = self.spectral_axis().values();
        let axis_values: Vec<f64> = axis.value().iter().copied().collect();
        write!(f, "{}", array_summary("spectral axis", &axis_values, axis.unit()))?;

        if let Some(u) = self.uncertainty() {
            let sigma = u.array();
            if let (Some(first), Some(last)) = (sigma.iter().next(), sigma.iter().last()) {
                write!(
                    f,
                    "\nuncertainty:      [ {}, ..., {} ]",
                    format_significant(*first),
                    format_significant(*last)
                )?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Spectrum1D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Spectrum1D(flux=<Quantity {}>, spectral_axis=<SpectralCoord {}>",
            self.flux(),
            self.spectral_axis().values()
        )?;
        if let Some(u) = self.uncertainty() {
            write!(f, ", uncertainty=StdDevUncertainty({})", u.array())?;
        }
        write!(f, ")>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nddata::StdDevUncertainty;
    use crate::spectra::SpectrumArgs;
    use crate::units::Quantity;
    use ndarray::array;

    #[test]
    fn significant_digits_follow_general_format() {
        assert_eq!(format_significant(4000.0), "4000.0");
        assert_eq!(format_significant(2.5), "2.5");
        assert_eq!(format_significant(6562.8), "6562.8");
        assert_eq!(format_significant(123456.0), "1.2346e+05");
        assert_eq!(format_significant(0.0001), "0.0001");
        assert_eq!(format_significant(0.00001), "1e-05");
        assert_eq!(format_significant(-3.14159265), "-3.1416");
    }

    #[test]
    fn summary_lists_flux_and_axis() {
        let s = SpectrumArgs::new(Quantity::from_vec(vec![1.0, 2.0, 3.0, 4.0], Unit::jansky()))
            .spectral_axis(Quantity::from_vec(
                vec![4000.0, 4500.0, 5000.0, 5500.0],
                Unit::angstrom(),
            ))
            .uncertainty(StdDevUncertainty::new(array![0.1, 0.2, 0.3, 0.4]))
            .build()
            .unwrap();
        let text = s.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Spectrum1D (length=4)");
        assert_eq!(lines[1], "flux:             [ 1.0 Jy, ..., 4.0 Jy ],  mean=2.5 Jy");
        assert_eq!(
            lines[2],
            "spectral axis:    [ 4000.0 Angstrom, ..., 5500.0 Angstrom ],  mean=4750.0 Angstrom"
        );
        assert_eq!(lines[3], "uncertainty:      [ 0.1, ..., 0.4 ]");
    }

    #[test]
    fn stacked_spectra_get_one_line_each() {
        let s = SpectrumArgs::new(Quantity::new(array![[1.0, 2.0], [3.0, 4.0]], Unit::jansky()))
            .build()
            .unwrap();
        let text = s.to_string();
        assert!(text.contains("flux 0:"));
        assert!(text.contains("flux 1:"));
    }

    #[test]
    fn scalar_spectrum_renders_its_value() {
        let s = SpectrumArgs::new(2.0).build().unwrap();
        assert_eq!(s.to_string(), "Spectrum1D (length=1)\nflux:   2.0");
        assert!(format!("{s:?}").starts_with("<Spectrum1D(flux="));
    }
}
