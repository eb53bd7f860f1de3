use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{
    Array, AsArray, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array,
    LargeListArray, ListArray, StringArray,
};
use arrow::datatypes::DataType;
use log::{debug, info};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::model::{Meta, MetadataValue};
use crate::nddata::StdDevUncertainty;
use crate::spectra::{DopplerConvention, Spectrum1D, SpectrumArgs};
use crate::units::{Quantity, Unit};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Column names and units used when turning table rows into spectra.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub spectral_axis_column: String,
    pub flux_column: String,
    pub uncertainty_column: String,
    pub spectral_axis_unit: String,
    pub flux_unit: String,
    pub velocity_convention: Option<DopplerConvention>,
    /// Rest value in the spectral axis unit.
    pub rest_value: Option<f64>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig {
            spectral_axis_column: "spectral_axis".into(),
            flux_column: "flux".into(),
            uncertainty_column: "uncertainty".into(),
            spectral_axis_unit: "Angstrom".into(),
            flux_unit: "erg / (s cm2 Angstrom)".into(),
            velocity_convention: None,
            rest_value: None,
        }
    }
}

impl LoaderConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading loader config {}", path.display()))?;
        serde_json::from_str(&text).context("parsing loader config")
    }

    fn is_data_column(&self, name: &str) -> bool {
        name == self.spectral_axis_column
            || name == self.flux_column
            || name == self.uncertainty_column
    }
}

/// Units parsed once per file.
struct RowBuilder<'a> {
    config: &'a LoaderConfig,
    axis_unit: Unit,
    flux_unit: Unit,
}

impl<'a> RowBuilder<'a> {
    fn new(config: &'a LoaderConfig) -> Result<Self> {
        Ok(RowBuilder {
            config,
            axis_unit: Unit::parse(&config.spectral_axis_unit)
                .context("parsing spectral axis unit")?,
            flux_unit: Unit::parse(&config.flux_unit).context("parsing flux unit")?,
        })
    }

    /// One table row -> one spectrum. `redshift` and `radial_velocity`
    /// (km/s) metadata entries become the spectrum's velocity frame.
    fn build(
        &self,
        row: usize,
        axis: Vec<f64>,
        flux: Vec<f64>,
        uncertainty: Option<Vec<f64>>,
        mut meta: Meta,
    ) -> Result<Spectrum1D> {
        let cfg = self.config;
        if axis.len() != flux.len() {
            bail!(
                "Row {row}: {} has {} values but {} has {}",
                cfg.spectral_axis_column,
                axis.len(),
                cfg.flux_column,
                flux.len()
            );
        }

        let n = flux.len();
        let mut args = SpectrumArgs::new(Quantity::from_vec(flux, self.flux_unit.clone()))
            .spectral_axis(Quantity::from_vec(axis, self.axis_unit.clone()));
        if let Some(sigma) = uncertainty {
            if sigma.len() != n {
                bail!(
                    "Row {row}: {} has {} values but {} has {n}",
                    cfg.uncertainty_column,
                    sigma.len(),
                    cfg.flux_column
                );
            }
            args = args.uncertainty(StdDevUncertainty::new(ndarray::Array1::from(sigma)));
        }
        if let Some(convention) = cfg.velocity_convention {
            args = args.velocity_convention(convention);
        }
        if let Some(rest) = cfg.rest_value {
            args = args.rest_value(Quantity::scalar(rest, self.axis_unit.clone()));
        }
        if let Some(z) = meta.remove("redshift").and_then(|v| v.as_f64()) {
            args = args.redshift(z);
        }
        if let Some(v) = meta.remove("radial_velocity").and_then(|v| v.as_f64()) {
            args = args.radial_velocity(Quantity::scalar(v, Unit::km_per_s()));
        }

        args.meta(meta)
            .build()
            .with_context(|| format!("Row {row}: building spectrum"))
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load spectra from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – list columns for the spectral axis, flux and (optionally) uncertainty
/// * `.json`    – `[{ "spectral_axis": [...], "flux": [...], ...meta }, ...]`
/// * `.csv`     – the same columns holding semicolon-separated floats
pub fn load_file(path: &Path, config: &LoaderConfig) -> Result<Vec<Spectrum1D>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let builder = RowBuilder::new(config)?;
    let spectra = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path, &builder),
        "json" => load_json(path, &builder),
        "csv" => load_csv(path, &builder),
        other => bail!("Unsupported file extension: .{other}"),
    }?;
    info!("loaded {} spectra from {}", spectra.len(), path.display());
    Ok(spectra)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON (`df.to_json(orient='records')`):
///
/// ```json
/// [
///   {
///     "spectral_axis": [6500.0, 6501.0, ...],
///     "flux":          [0.12,   0.14,   ...],
///     "uncertainty":   [0.01,   0.01,   ...],
///     "object": "NGC 1068",
///     "redshift": 0.0038
///   },
///   ...
/// ]
/// ```
fn load_json(path: &Path, builder: &RowBuilder) -> Result<Vec<Spectrum1D>> {
    let cfg = builder.config;
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut spectra = Vec::with_capacity(records.len());

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        let axis = json_array_to_f64(obj.get(&cfg.spectral_axis_column), i, &cfg.spectral_axis_column)?;
        let flux = json_array_to_f64(obj.get(&cfg.flux_column), i, &cfg.flux_column)?;
        let uncertainty = match obj.get(&cfg.uncertainty_column) {
            None | Some(JsonValue::Null) => None,
            some => Some(json_array_to_f64(some, i, &cfg.uncertainty_column)?),
        };

        let metadata: Meta = obj
            .iter()
            .filter(|(key, _)| !cfg.is_data_column(key))
            .map(|(key, val)| (key.clone(), MetadataValue::from(val.clone())))
            .collect();

        spectra.push(builder.build(i, axis, flux, uncertainty, metadata)?);
    }

    Ok(spectra)
}

fn json_array_to_f64(val: Option<&JsonValue>, row: usize, col: &str) -> Result<Vec<f64>> {
    let arr = val
        .and_then(|v| v.as_array())
        .with_context(|| format!("Row {row}: missing or invalid '{col}' array"))?;

    arr.iter()
        .enumerate()
        .map(|(j, v)| {
            v.as_f64()
                .with_context(|| format!("Row {row}, {col}[{j}]: not a number"))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names. The spectral axis, flux and
/// uncertainty columns contain semicolon-separated floats:
///   `"6500.0;6501.0;6502.0"`, `"0.12;0.14;0.11"`
/// All other columns are treated as metadata.
fn load_csv(path: &Path, builder: &RowBuilder) -> Result<Vec<Spectrum1D>> {
    let cfg = builder.config;
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let column = |name: &str| headers.iter().position(|h| h == name);
    let axis_idx = column(&cfg.spectral_axis_column)
        .with_context(|| format!("CSV missing '{}' column", cfg.spectral_axis_column))?;
    let flux_idx = column(&cfg.flux_column)
        .with_context(|| format!("CSV missing '{}' column", cfg.flux_column))?;
    let sigma_idx = column(&cfg.uncertainty_column);

    let mut spectra = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;

        let axis = parse_semicolon_floats(
            record.get(axis_idx).unwrap_or(""),
            row_no,
            &cfg.spectral_axis_column,
        )?;
        let flux = parse_semicolon_floats(record.get(flux_idx).unwrap_or(""), row_no, &cfg.flux_column)?;
        let uncertainty = match sigma_idx.and_then(|i| record.get(i)) {
            None | Some("") => None,
            Some(cell) => Some(parse_semicolon_floats(cell, row_no, &cfg.uncertainty_column)?),
        };

        let metadata: Meta = record
            .iter()
            .zip(&headers)
            .filter(|(_, name)| !cfg.is_data_column(name))
            .map(|(value, name)| (name.clone(), guess_metadata_type(value)))
            .collect();

        spectra.push(builder.build(row_no, axis, flux, uncertainty, metadata)?);
    }

    Ok(spectra)
}

fn parse_semicolon_floats(s: &str, row: usize, col: &str) -> Result<Vec<f64>> {
    s.split(';')
        .enumerate()
        .map(|(j, tok)| {
            tok.trim()
                .parse::<f64>()
                .with_context(|| format!("Row {row}, {col}[{j}]: '{tok}' is not a number"))
        })
        .collect()
}

fn guess_metadata_type(s: &str) -> MetadataValue {
    if s.is_empty() {
        return MetadataValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return MetadataValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return MetadataValue::Float(f);
    }
    if s == "true" || s == "false" {
        return MetadataValue::Bool(s == "true");
    }
    MetadataValue::String(s.to_string())
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file of spectra.
///
/// Expected schema:
/// - spectral axis / flux: List<Float64|Float32> or LargeList of the same
/// - uncertainty: optional list column, nulls allowed
/// - Any other columns are treated as metadata (strings, ints, floats, bools)
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path, builder: &RowBuilder) -> Result<Vec<Spectrum1D>> {
    let cfg = builder.config;
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?
        .build()
        .context("building parquet reader")?;

    let mut spectra = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();
        debug!("parquet batch with {} rows", batch.num_rows());

        let index_of = |name: &str| {
            schema
                .index_of(name)
                .map_err(|_| anyhow::anyhow!("Parquet file missing '{name}' column"))
        };
        let axis_col = batch.column(index_of(&cfg.spectral_axis_column)?);
        let flux_col = batch.column(index_of(&cfg.flux_column)?);
        let sigma_col = schema
            .index_of(&cfg.uncertainty_column)
            .ok()
            .map(|i| batch.column(i));

        let meta_cols: Vec<(usize, String)> = schema
            .fields()
            .iter()
            .enumerate()
            .filter(|(_, f)| !cfg.is_data_column(f.name()))
            .map(|(i, f)| (i, f.name().clone()))
            .collect();

        for row in 0..batch.num_rows() {
            let row_no = spectra.len();
            let axis = extract_f64_list(axis_col, row)
                .with_context(|| format!("Row {row_no}: failed to read '{}'", cfg.spectral_axis_column))?;
            let flux = extract_f64_list(flux_col, row)
                .with_context(|| format!("Row {row_no}: failed to read '{}'", cfg.flux_column))?;
            let uncertainty = match sigma_col {
                Some(col) if !col.is_null(row) => Some(
                    extract_f64_list(col, row)
                        .with_context(|| format!("Row {row_no}: failed to read '{}'", cfg.uncertainty_column))?,
                ),
                _ => None,
            };

            let metadata: Meta = meta_cols
                .iter()
                .map(|(col_idx, col_name)| {
                    (col_name.clone(), extract_metadata_value(batch.column(*col_idx), row))
                })
                .collect();

            spectra.push(builder.build(row_no, axis, flux, uncertainty, metadata)?);
        }
    }

    Ok(spectra)
}

// -- Parquet / Arrow helpers --

/// Extract a `Vec<f64>` from a List or LargeList column at the given row.
fn extract_f64_list(col: &Arc<dyn Array>, row: usize) -> Result<Vec<f64>> {
    if col.is_null(row) {
        bail!("null value in list column");
    }

    let values_array = match col.data_type() {
        DataType::List(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<ListArray>()
                .context("expected ListArray")?;
            list_arr.value(row)
        }
        DataType::LargeList(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<LargeListArray>()
                .context("expected LargeListArray")?;
            list_arr.value(row)
        }
        other => bail!("Expected List or LargeList column, got {other:?}"),
    };

    // The inner array can be Float64 or Float32
    if let Some(f64_arr) = values_array.as_any().downcast_ref::<Float64Array>() {
        Ok(f64_arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    } else if let Some(f32_arr) = values_array.as_any().downcast_ref::<Float32Array>() {
        Ok(f32_arr.iter().map(|v| v.unwrap_or(f32::NAN) as f64).collect())
    } else {
        bail!(
            "List inner type is {:?}, expected Float64 or Float32",
            values_array.data_type()
        )
    }
}

/// Extract a single metadata value from an Arrow column at a given row.
fn extract_metadata_value(col: &Arc<dyn Array>, row: usize) -> MetadataValue {
    if col.is_null(row) {
        return MetadataValue::Null;
    }
    let any = col.as_any();
    let value = match col.data_type() {
        DataType::Utf8 => any
            .downcast_ref::<StringArray>()
            .map(|s| MetadataValue::String(s.value(row).to_string())),
        DataType::LargeUtf8 => Some(MetadataValue::String(
            col.as_string::<i64>().value(row).to_string(),
        )),
        DataType::Int32 => any
            .downcast_ref::<Int32Array>()
            .map(|a| MetadataValue::Integer(a.value(row) as i64)),
        DataType::Int64 => any
            .downcast_ref::<Int64Array>()
            .map(|a| MetadataValue::Integer(a.value(row))),
        DataType::Float32 => any
            .downcast_ref::<Float32Array>()
            .map(|a| MetadataValue::Float(a.value(row) as f64)),
        DataType::Float64 => any
            .downcast_ref::<Float64Array>()
            .map(|a| MetadataValue::Float(a.value(row))),
        DataType::Boolean => any
            .downcast_ref::<BooleanArray>()
            .map(|a| MetadataValue::Bool(a.value(row))),
        _ => None,
    };
    value.unwrap_or_else(|| MetadataValue::String(format!("{:?}", col.data_type())))
}
