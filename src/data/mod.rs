/// Data layer: core types, loading, filtering and trace preparation.
///
/// Architecture:
/// ```text
///   seg_annotated_raw.fif
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  dispatch by extension → fiff::read_raw
///   └──────────┘
///        │
///        ▼
///   ┌────────────┐
///   │ RawSegment │  MeasInfo, calibrated samples, Annotations
///   └────────────┘
///        │
///        ├──► filter   channel-type / description predicates → visible indices
///        ├──► window   visible time span → plot-ready points
///        └──► export   annotations → CSV
/// ```

pub mod export;
pub mod fiff;
pub mod filter;
pub mod loader;
pub mod model;
pub mod window;
