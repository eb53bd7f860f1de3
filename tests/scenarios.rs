use ndarray::{array, Array1};
use rusty_spectra::units::constants::SPEED_OF_LIGHT;
use rusty_spectra::{
    AxisIndex, FitsHeader, InterpolationKind, LinearWcs, LookupWcs, MetadataValue, OneDSpectrum,
    Quantity, Spectrum1D, SpectrumArgs, SpectrumError, Unit,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn flambda() -> Unit {
    Unit::parse("erg/s/cm^2/AA").expect("valid unit")
}

fn sample_spectrum() -> Spectrum1D {
    Spectrum1D::from_flux_and_axis(
        Quantity::from_vec(vec![1.0, 2.0, 3.0, 4.0], flambda()),
        Quantity::from_vec(vec![4000.0, 4500.0, 5000.0, 5500.0], Unit::angstrom()),
    )
    .expect("consistent inputs")
}

#[test]
fn wavelength_axis_converts_to_frequency() {
    init_logging();
    let spectrum = sample_spectrum();

    let wavelength = spectrum.wavelength().unwrap();
    assert_eq!(wavelength.value(), &array![4000.0, 4500.0, 5000.0, 5500.0].into_dyn());

    let frequency = spectrum.frequency().unwrap();
    for (nu, lambda) in frequency.value().iter().zip([4000.0, 4500.0, 5000.0, 5500.0]) {
        let expected = SPEED_OF_LIGHT / (lambda * 1e-10) / 1e9;
        assert!((nu - expected).abs() / expected < 1e-12);
    }
    let nu = frequency.value();
    assert!(nu[[0]] > nu[[1]] && nu[[1]] > nu[[2]] && nu[[2]] > nu[[3]]);
}

#[test]
fn linear_wcs_evaluates_and_inverts() {
    let wcs = LinearWcs::new(4000.0, 2.0, 0.0, Some(Unit::angstrom())).unwrap();
    assert_eq!(wcs.evaluate(&array![500.0]).value()[[0]], 5000.0);
    let px = wcs.invert(Quantity::scalar(5000.0, Unit::angstrom())).unwrap();
    assert!((px.iter().next().copied().unwrap() - 500.0).abs() < 1e-9);
}

#[test]
fn redshift_and_radial_velocity_are_exclusive() {
    let err = SpectrumArgs::new(Quantity::from_vec(vec![1.0, 2.0], flambda()))
        .redshift(0.1)
        .radial_velocity(Quantity::scalar(3e4, Unit::km_per_s()))
        .build()
        .unwrap_err();
    assert!(matches!(err, SpectrumError::InvalidArgument(_)));
}

#[test]
fn indexing_stacked_spectra_returns_an_independent_row() {
    let spectrum = Spectrum1D::from_flux_and_axis(
        Quantity::new(array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]], Unit::jansky()),
        Quantity::from_vec(vec![5000.0, 5001.0, 5002.0], Unit::angstrom()),
    )
    .unwrap();

    let mut row = spectrum.item(AxisIndex::At(1)).unwrap();
    assert_eq!(row.shape(), &[3]);
    assert_eq!(row.flux(), Quantity::from_vec(vec![4.0, 5.0, 6.0], Unit::jansky()));
    assert_eq!(row.spectral_axis(), spectrum.spectral_axis());

    row.set_redshift(0.2).unwrap();
    row.meta_mut().insert("note".into(), MetadataValue::from("edited"));
    assert_eq!(spectrum.redshift().as_scalar(), Some(0.0));
    assert!(spectrum.meta().is_empty());
    assert_eq!(spectrum.flux_values()[[1, 0]], 4.0);
}

#[test]
fn linear_wcs_from_fits_keywords() {
    let header: FitsHeader = [
        ("CRVAL1", MetadataValue::Float(5000.0)),
        ("CRPIX1", MetadataValue::Integer(1)),
        ("CDELT1", MetadataValue::Float(1.5)),
        ("CUNIT1", MetadataValue::from("Angstrom")),
    ]
    .into_iter()
    .collect();
    let wcs = LinearWcs::from_fits_header(&header, None, 1).unwrap();
    let value = wcs.evaluate(&array![0.0]);
    assert_eq!(value.value()[[0]], 5000.0);
    assert_eq!(value.unit(), &Unit::angstrom());

    let mut out = FitsHeader::new();
    wcs.to_fits_header(&mut out, 1);
    assert_eq!(out.get("CRPIX1").and_then(|v| v.as_f64()), Some(1.0));
    assert_eq!(out.get("CDELT1").and_then(|v| v.as_f64()), Some(1.5));
}

#[test]
fn linear_round_trip_is_exact() {
    let wcs = LinearWcs::new(
        Quantity::scalar(1.42e9, Unit::hertz()),
        Quantity::scalar(-1.2e4, Unit::hertz()),
        512.0,
        None,
    )
    .unwrap();
    let pixels = Array1::from_iter((0..1024).map(|i| i as f64 * 0.75 - 10.0));
    let back = wcs.invert(wcs.evaluate(&pixels)).unwrap();
    for (p, b) in pixels.iter().zip(back.iter()) {
        assert!((p - b).abs() < 1e-6);
    }
}

#[test]
fn lookup_round_trip_within_range_and_nan_outside() {
    let table = vec![1.0, 1.5, 2.5, 4.0, 6.0, 9.0];
    let wcs = LookupWcs::new(table, Some(Unit::micron()), InterpolationKind::Linear).unwrap();
    let pixels = Array1::from_iter((0..=50).map(|i| i as f64 * 0.1));
    let back = wcs.invert(wcs.evaluate(&pixels).unwrap()).unwrap();
    for (p, b) in pixels.iter().zip(back.iter()) {
        assert!((p - b).abs() < 1e-9, "{p} -> {b}");
    }
    let outside = wcs.evaluate(&array![-1.0, 5.5]).unwrap();
    assert!(outside.value().iter().all(|v| v.is_nan()));
}

#[test]
fn duplicate_lookup_values_are_rejected() {
    for table in [vec![1.0, 1.0], vec![3.0, 2.0, 3.0], vec![5.0, 6.0, 7.0, 7.0]] {
        let err = LookupWcs::new(table, Some(Unit::angstrom()), InterpolationKind::Linear).unwrap_err();
        assert_eq!(err, SpectrumError::NonBijective);
    }
}

#[test]
fn axis_length_always_matches_flux() {
    for n in 1..6 {
        let err = Spectrum1D::from_flux_and_axis(
            Quantity::from_vec(vec![1.0; n], Unit::jansky()),
            Quantity::from_vec((0..n + 1).map(|i| 4000.0 + i as f64).collect(), Unit::angstrom()),
        )
        .unwrap_err();
        assert!(matches!(err, SpectrumError::ShapeMismatch(_)));

        let ok = Spectrum1D::from_flux_and_axis(
            Quantity::from_vec(vec![1.0; n], Unit::jansky()),
            Quantity::from_vec((0..n).map(|i| 4000.0 + i as f64).collect(), Unit::angstrom()),
        )
        .unwrap();
        assert_eq!(ok.spectral_axis().len(), *ok.shape().last().unwrap());
    }
}

#[test]
fn redshift_tracks_radial_velocity() {
    let mut spectrum = sample_spectrum();
    for z in [0.0, 0.01, 0.5, 2.0] {
        spectrum.set_redshift(z).unwrap();
        let v = spectrum.radial_velocity().to(&Unit::meter_per_second()).unwrap();
        let ratio = v.as_scalar().unwrap() / SPEED_OF_LIGHT;
        assert!((spectrum.redshift().as_scalar().unwrap() - ratio).abs() < 1e-12);
        assert!((ratio - z).abs() < 1e-12);
    }
    spectrum
        .set_radial_velocity(Quantity::scalar(1500.0, Unit::km_per_s()))
        .unwrap();
    assert!((spectrum.redshift().as_scalar().unwrap() - 1.5e6 / SPEED_OF_LIGHT).abs() < 1e-12);
    assert!(matches!(
        spectrum.set_radial_velocity(Quantity::scalar(1.0, Unit::hertz())),
        Err(SpectrumError::UnitMismatch(_))
    ));
}

#[test]
fn copy_with_is_a_deep_equal_copy() {
    let spectrum = SpectrumArgs::new(Quantity::from_vec(vec![1.0, 2.0, 3.0], Unit::jansky()))
        .wcs(LinearWcs::new(6000.0, 1.0, 0.0, Some(Unit::angstrom())).unwrap())
        .redshift(0.05)
        .build()
        .unwrap();
    let mut copy = spectrum.copy_with(|args| args).unwrap();
    assert_eq!(copy, spectrum);

    copy.meta_mut().insert("changed".into(), MetadataValue::Bool(true));
    copy.set_redshift(0.3).unwrap();
    assert_ne!(copy, spectrum);
    assert!((spectrum.redshift().as_scalar().unwrap() - 0.05).abs() < 1e-12);
}

#[test]
fn copy_with_replaces_fields() {
    let spectrum = sample_spectrum();
    let doubled = spectrum
        .copy_with(|args| SpectrumArgs {
            flux: Some(Quantity::from_vec(vec![2.0, 4.0, 6.0, 8.0], flambda()).into()),
            ..args
        })
        .unwrap();
    assert_eq!(doubled.flux_values()[[3]], 8.0);
    assert_eq!(doubled.spectral_axis(), spectrum.spectral_axis());
}

#[test]
fn velocity_uses_the_rest_value() {
    let spectrum = SpectrumArgs::new(Quantity::from_vec(vec![1.0, 1.0, 1.0], Unit::jansky()))
        .spectral_axis(Quantity::from_vec(vec![6550.0, 6562.8, 6575.0], Unit::angstrom()))
        .velocity_convention("doppler_optical".parse().unwrap())
        .rest_value(6562.8)
        .build()
        .unwrap();
    let v = spectrum.velocity().unwrap();
    assert!(v.value()[[1]].abs() < 1e-6);
    let expected = SPEED_OF_LIGHT / 1000.0 * (6575.0 / 6562.8 - 1.0);
    assert!((v.value()[[2]] - expected).abs() < 1e-6);
}

#[test]
fn arithmetic_keeps_the_spectral_axis() {
    let a = sample_spectrum();
    let b = sample_spectrum();
    let diff = (&a - &b).unwrap();
    assert!(diff.flux_values().iter().all(|v| *v == 0.0));
    assert_eq!(diff.spectral_axis(), a.spectral_axis());
    let scaled = (&a * 0.5).unwrap();
    assert_eq!(scaled.flux_values()[[3]], 2.0);
    assert_eq!(scaled.unit(), a.unit());
}
