use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};

use super::linear::LinearWcs;
use crate::data::model::MetadataValue;
use crate::error::{Result, SpectrumError};
use crate::units::Unit;

// ---------------------------------------------------------------------------
// FitsHeader – keyword/value cards
// ---------------------------------------------------------------------------

/// A minimal FITS header: keywords are case-insensitive and stored upper-case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, MetadataValue>", into = "BTreeMap<String, MetadataValue>")]
pub struct FitsHeader {
    cards: BTreeMap<String, MetadataValue>,
}

impl FitsHeader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.cards.get(&key.to_ascii_uppercase())
    }

    pub fn insert(&mut self, key: &str, value: impl Into<MetadataValue>) -> Option<MetadataValue> {
        self.cards.insert(key.to_ascii_uppercase(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<MetadataValue> {
        self.cards.remove(&key.to_ascii_uppercase())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.cards.contains_key(&key.to_ascii_uppercase())
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MetadataValue)> {
        self.cards.iter()
    }

    /// Numeric value of `key`; `Ok(None)` when absent.
    fn number(&self, key: &str) -> Result<Option<f64>> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => value.as_f64().map(Some).ok_or_else(|| {
                SpectrumError::InvalidArgument(format!("keyword {key} is not numeric: {value}"))
            }),
        }
    }
}

impl From<BTreeMap<String, MetadataValue>> for FitsHeader {
    fn from(cards: BTreeMap<String, MetadataValue>) -> Self {
        cards.into_iter().collect()
    }
}

impl From<FitsHeader> for BTreeMap<String, MetadataValue> {
    fn from(header: FitsHeader) -> Self {
        header.cards
    }
}

impl<K: AsRef<str>, V: Into<MetadataValue>> FromIterator<(K, V)> for FitsHeader {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut header = FitsHeader::new();
        for (key, value) in iter {
            header.insert(key.as_ref(), value);
        }
        header
    }
}

// ---------------------------------------------------------------------------
// Linear dispersion keywords
// ---------------------------------------------------------------------------

impl LinearWcs {
    /// Rebuild a linear solution from the dispersion keywords of axis `axis`
    /// (1-based): `CDELTn` (else `CDn_n`), `CRVALn`, `CRPIXn` and `CUNITn`.
    ///
    /// An explicit `unit` overrides `CUNITn`. `RESTFRQ`/`RESTFREQ` (Hz) and
    /// `RESTWAV` (m) are carried along when present.
    pub fn from_fits_header(header: &FitsHeader, unit: Option<Unit>, axis: usize) -> Result<Self> {
        let unit = match unit {
            Some(unit) => unit,
            None => match header.get(&format!("CUNIT{axis}")) {
                Some(MetadataValue::String(s)) => Unit::parse(s)?,
                _ => {
                    return Err(SpectrumError::MissingUnit(format!(
                        "no unit was specified and CUNIT{axis} did not contain unit information"
                    )))
                }
            },
        };

        let cdelt = match header.number(&format!("CDELT{axis}"))? {
            Some(v) => v,
            None => header
                .number(&format!("CD{axis}_{axis}"))?
                .ok_or_else(|| SpectrumError::MissingKeyword("CDELT or CD".into()))?,
        };
        let (crpix, crval) = match (
            header.number(&format!("CRPIX{axis}"))?,
            header.number(&format!("CRVAL{axis}"))?,
        ) {
            (Some(crpix), Some(crval)) => (crpix, crval),
            _ => return Err(SpectrumError::MissingKeyword("CRPIX, CRVAL".into())),
        };

        debug!("linear WCS from header: CRVAL{axis}={crval} CRPIX{axis}={crpix} CDELT{axis}={cdelt} unit={unit}");
        let mut wcs = LinearWcs::new(crval, cdelt, crpix - 1.0, Some(unit))?;

        let rest_frequency = match header.number("RESTFRQ")? {
            Some(v) => Some(v),
            None => header.number("RESTFREQ")?,
        };
        wcs.rest_frequency = rest_frequency.filter(|v| *v != 0.0);
        wcs.rest_wavelength = header.number("RESTWAV")?.filter(|v| *v != 0.0);
        Ok(wcs)
    }

    /// Write this solution back as `CRVALn`, 1-based `CRPIXn`, `CDELTn` and
    /// `CUNITn`, plus the rest value keywords when set.
    pub fn to_fits_header(&self, header: &mut FitsHeader, axis: usize) {
        header.insert(&format!("CRVAL{axis}"), self.dispersion0);
        header.insert(&format!("CRPIX{axis}"), self.pixel_index + 1.0);
        header.insert(&format!("CDELT{axis}"), self.dispersion_delta);
        header.insert(&format!("CUNIT{axis}"), self.unit.to_string());
        if let Some(hz) = self.rest_frequency {
            header.insert("RESTFRQ", hz);
        }
        if let Some(m) = self.rest_wavelength {
            header.insert("RESTWAV", m);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> FitsHeader {
        [
            ("CRVAL1", MetadataValue::Float(5000.0)),
            ("CRPIX1", MetadataValue::Integer(1)),
            ("CDELT1", MetadataValue::Float(1.5)),
            ("CUNIT1", MetadataValue::from("Angstrom")),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn keywords_are_case_insensitive() {
        let mut h = FitsHeader::new();
        h.insert("crval1", 1.0);
        assert!(h.contains_key("CRVAL1"));
        assert_eq!(h.get("Crval1"), Some(&MetadataValue::Float(1.0)));
    }

    #[test]
    fn builds_from_cdelt_keywords() {
        let wcs = LinearWcs::from_fits_header(&header(), None, 1).unwrap();
        assert_eq!(wcs.pixel_index(), 0.0);
        assert_eq!(wcs.evaluate_pixel(0.0), 5000.0);
        assert_eq!(wcs.evaluate_pixel(2.0), 5003.0);
        assert_eq!(wcs.unit(), &Unit::angstrom());
    }

    #[test]
    fn falls_back_to_cd_matrix() {
        let mut h = header();
        h.remove("CDELT1");
        h.insert("CD1_1", 2.5);
        let wcs = LinearWcs::from_fits_header(&h, None, 1).unwrap();
        assert_eq!(wcs.dispersion_delta(), 2.5);
    }

    #[test]
    fn explicit_unit_overrides_cunit() {
        let wcs = LinearWcs::from_fits_header(&header(), Some(Unit::nanometer()), 1).unwrap();
        assert_eq!(wcs.unit(), &Unit::nanometer());
        assert_eq!(wcs.dispersion0(), 5000.0);
    }

    #[test]
    fn missing_keywords_are_reported() {
        let mut h = header();
        h.remove("CDELT1");
        assert_eq!(
            LinearWcs::from_fits_header(&h, None, 1).unwrap_err(),
            SpectrumError::MissingKeyword("CDELT or CD".into())
        );

        let mut h = header();
        h.remove("CRPIX1");
        assert_eq!(
            LinearWcs::from_fits_header(&h, None, 1).unwrap_err(),
            SpectrumError::MissingKeyword("CRPIX, CRVAL".into())
        );

        let mut h = header();
        h.remove("CUNIT1");
        assert!(matches!(
            LinearWcs::from_fits_header(&h, None, 1),
            Err(SpectrumError::MissingUnit(_))
        ));
    }

    #[test]
    fn reads_other_axis_numbers() {
        let h: FitsHeader = [
            ("CRVAL3", MetadataValue::Float(1.4e9)),
            ("CRPIX3", MetadataValue::Float(10.0)),
            ("CDELT3", MetadataValue::Float(1e5)),
            ("CUNIT3", MetadataValue::from("Hz")),
            ("RESTFRQ", MetadataValue::Float(1.420405752e9)),
        ]
        .into_iter()
        .collect();
        let wcs = LinearWcs::from_fits_header(&h, None, 3).unwrap();
        assert_eq!(wcs.pixel_index(), 9.0);
        assert_eq!(wcs.rest_frequency(), Some(1.420405752e9));
    }

    #[test]
    fn header_round_trip() {
        let wcs = LinearWcs::from_fits_header(&header(), None, 1)
            .unwrap()
            .with_rest_wavelength(6.5628e-7);
        let mut out = FitsHeader::new();
        wcs.to_fits_header(&mut out, 1);
        assert_eq!(out.get("CRPIX1"), Some(&MetadataValue::Float(1.0)));
        assert_eq!(out.get("CUNIT1"), Some(&MetadataValue::from("Angstrom")));
        let again = LinearWcs::from_fits_header(&out, None, 1).unwrap();
        assert_eq!(again, wcs);
    }

    #[test]
    fn header_serde_normalises_keys() {
        let h: FitsHeader = serde_json::from_str(r#"{"crval1": 5000.0, "cunit1": "AA"}"#).unwrap();
        assert!(h.contains_key("CRVAL1"));
        assert_eq!(h.get("CUNIT1").and_then(|v| v.as_str()), Some("AA"));
    }
}
