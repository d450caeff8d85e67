//! Data layer: report model, loading, filtering, pivoting and comparison.
//!
//! Architecture:
//! ```text
//!  OSPI .txt (remote, per year) / local .txt .tsv .csv .parquet
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse report → Dataset
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  filter   │  grade / subject / SBA / groups → Selection
//!   └──────────┘
//!        │                         │
//!        ▼                         ▼
//!   ┌──────────┐             ┌──────────┐
//!   │  select   │ one group  │  pivot    │  school × (value, group)
//!   └──────────┘             └──────────┘
//!                                  │
//!                                  ▼
//!                            ┌──────────┐
//!                            │ compare   │  two columns → ChartSink
//!                            └──────────┘
//!                                  │
//!                                  ▼
//!                            ┌──────────┐
//!                            │ export    │  csv / json / parquet
//!                            └──────────┘
//! ```

pub mod compare;
pub mod error;
pub mod export;
pub mod filter;
pub mod loader;
pub mod model;
pub mod pivot;
pub mod select;
