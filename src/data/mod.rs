/// Data layer: core types, loading, and grouping.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet upload
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse bytes → Dataset
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ Dataset   │  Vec<Column>, inferred numeric / categorical kind
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ aggregate  │  group x, sum / count y → bars
///   └───────────┘
/// ```

pub mod aggregate;
pub mod loader;
pub mod model;
