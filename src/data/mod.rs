/// Data layer: metadata values and tabular spectrum loading.
///
/// Architecture:
/// ```text
///  .parquet / .json / .csv
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file + LoaderConfig → Vec<Spectrum1D>
///   └──────────┘
///        │  non-data columns
///        ▼
///   ┌──────────┐
///   │  model    │  MetadataValue, Meta
///   └──────────┘
/// ```

pub mod loader;
pub mod model;
