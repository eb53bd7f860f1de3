use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, Float64Builder, Int64Array, ListBuilder, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use log::info;
use parquet::arrow::ArrowWriter;

use rusty_spectra::{load_file, LoaderConfig, OneDSpectrum};

/// Rest wavelengths (Angstrom) of the lines drawn into every spectrum.
const LINES: [(&str, f64); 4] = [
    ("H-beta", 4861.3),
    ("[O III]", 5006.8),
    ("H-alpha", 6562.8),
    ("[N II]", 6583.5),
];

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

/// Continuum plus redshifted emission lines, with Gaussian noise.
fn generate_spectrum(
    wavelengths: &[f64],
    redshift: f64,
    strengths: &[f64],
    noise_level: f64,
    rng: &mut SimpleRng,
) -> Vec<f64> {
    wavelengths
        .iter()
        .map(|&wl| {
            let continuum = 1.0 + 2e-4 * (wl - 4000.0);
            let lines: f64 = LINES
                .iter()
                .zip(strengths)
                .map(|(&(_, rest), &amp)| gaussian(wl, rest * (1.0 + redshift), 3.0, amp))
                .sum();
            continuum + lines + rng.gauss(0.0, noise_level)
        })
        .collect()
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn list_column(rows: &[Vec<f64>]) -> arrow::array::ListArray {
    let mut builder = ListBuilder::new(Float64Builder::new());
    for row in rows {
        builder.values().append_slice(row);
        builder.append(true);
    }
    builder.finish()
}

fn main() -> Result<()> {
    env_logger::init();
    let mut rng = SimpleRng::new(42);

    // 4000 → 7998 Angstrom, step 2
    let wavelengths: Vec<f64> = (0..2000).map(|i| 4000.0 + i as f64 * 2.0).collect();

    let objects: [(&str, f64, [f64; 4]); 3] = [
        ("NGC 1068", 0.0038, [2.0, 6.0, 8.0, 3.0]),
        ("Mrk 231", 0.0422, [1.5, 0.8, 9.0, 2.5]),
        ("3C 273", 0.1583, [4.0, 1.0, 12.0, 1.0]),
    ];
    let exposures_per_object = 4;

    let mut all_axis: Vec<Vec<f64>> = Vec::new();
    let mut all_flux: Vec<Vec<f64>> = Vec::new();
    let mut all_sigma: Vec<Vec<f64>> = Vec::new();
    let mut all_object: Vec<&str> = Vec::new();
    let mut all_redshift: Vec<f64> = Vec::new();
    let mut all_exposure: Vec<i64> = Vec::new();

    let mut exposure_id: i64 = 0;
    for &(name, redshift, strengths) in &objects {
        for k in 0..exposures_per_object {
            let noise = 0.02 * (1.0 + k as f64);
            all_flux.push(generate_spectrum(&wavelengths, redshift, &strengths, noise, &mut rng));
            all_sigma.push(vec![noise; wavelengths.len()]);
            all_axis.push(wavelengths.clone());
            all_object.push(name);
            all_redshift.push(redshift);
            all_exposure.push(exposure_id);
            exposure_id += 1;
        }
    }

    let item = || Arc::new(Field::new("item", DataType::Float64, true));
    let schema = Arc::new(Schema::new(vec![
        Field::new("spectral_axis", DataType::List(item()), false),
        Field::new("flux", DataType::List(item()), false),
        Field::new("uncertainty", DataType::List(item()), true),
        Field::new("object", DataType::Utf8, false),
        Field::new("redshift", DataType::Float64, false),
        Field::new("exposure_id", DataType::Int64, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(list_column(&all_axis)),
            Arc::new(list_column(&all_flux)),
            Arc::new(list_column(&all_sigma)),
            Arc::new(StringArray::from(all_object)),
            Arc::new(Float64Array::from(all_redshift)),
            Arc::new(Int64Array::from(all_exposure)),
        ],
    )
    .context("building record batch")?;

    let preview = batch.project(&[3, 4, 5]).context("projecting metadata columns")?;
    info!(
        "per-spectrum metadata:\n{}",
        pretty_format_batches(&[preview.slice(0, 4)]).context("formatting preview")?
    );

    // Write Parquet
    let output_path = Path::new("sample_spectra.parquet");
    let file = std::fs::File::create(output_path).context("creating output file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing record batch")?;
    writer.close().context("closing parquet writer")?;

    // Read the file back through the library as a sanity check.
    let spectra = load_file(output_path, &LoaderConfig::default())?;
    if let Some(first) = spectra.first() {
        let freq = first.frequency()?;
        info!(
            "first spectrum spans {:.3}..{:.3} GHz at z={:.4}",
            freq.last().unwrap_or(f64::NAN),
            freq.first().unwrap_or(f64::NAN),
            first.redshift().as_scalar().unwrap_or(f64::NAN)
        );
    }

    println!(
        "Wrote {} spectra ({} wavelengths each) to {}",
        spectra.len(),
        wavelengths.len(),
        output_path.display()
    );
    Ok(())
}
