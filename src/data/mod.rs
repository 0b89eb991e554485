/// Data layer: core types, loading, preparation and filtering.
///
/// Architecture:
/// ```text
///  .csv / .tsv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → RawListing rows (schema checked)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ pipeline  │  manufacturer, categories, peer-group imputation, drop
///   └──────────┘
///        │
///        ▼
///   ┌──────────────┐
///   │ ListingTable  │  immutable, shared as Arc
///   └──────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  year range / multiselect → row indices
///   └──────────┘
/// ```

pub mod error;
pub mod filter;
pub mod loader;
pub mod model;
pub mod pipeline;
pub mod stats;
