//! Herd Sequencer - sequence construction for dairy-herd sensor data.
//!
//! This library turns activity and temperature tables (one column per cow
//! plus a herd `Group mean` column) into fixed-shape windows and next-step
//! targets ready for a sequence model.
//!
//! # Guarantees
//!
//! - **Chronological**: tables are strictly ordered with unique timestamps
//! - **Aligned**: every window carries its own timestamps and target row
//! - **Deterministic**: the same table always yields the same windows
//! - **Traceable**: every run is counted in the audit log
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Herd Sequencer                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │   Loader    │──▶│ Preprocess  │──▶│  Windowing  │       │
//! │  │   (CSV)     │   │ (clean/scale)│  │ (len select)│       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │         │                 │                  │              │
//! │         ▼                 ▼                  ▼              │
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │ Herd Views  │   │    Audit    │   │   Export    │       │
//! │  │ (per cow)   │   │     Log     │   │   (.npy)    │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use herd_sequencer::{audit, Config, SequencePipeline};
//!
//! let pipeline = SequencePipeline::new(Config::default(), audit::create_shared_log());
//! let output = pipeline.run("activity.csv", None).expect("Failed to sequence table");
//! println!("{} windows of length {}", output.windows.len(), output.windows.length());
//! ```

pub mod audit;
pub mod config;
pub mod core;
pub mod export;
pub mod herd;
pub mod pipeline;
pub mod preprocess;
pub mod table;

// Re-export key types at crate root for convenience
pub use audit::{AuditLog, AuditStats, SharedAuditLog};
pub use config::{Config, ConfigError};
pub use core::{
    make_windows, select_length, LengthBounds, LengthSelection, SequenceError, SequenceWindow,
    WindowSet,
};
pub use export::{export_windows, load_exported, ExportError, ExportMetadata, ExportSummary};
pub use herd::{
    cow_view, health_thresholds, trend, week_numbers, CowId, HealthStatus, HealthThresholds,
    LinearTrend, GROUP_MEAN_COLUMN,
};
pub use pipeline::{PipelineError, PipelineOutput, SequencePipeline};
pub use preprocess::{PreprocessReport, PreprocessSettings, Preprocessor};
pub use table::{load_csv, RawTable, TableError, TimeSeriesTable, Timestamp};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
