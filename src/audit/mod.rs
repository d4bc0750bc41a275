//! Audit module for the herd sequencer.
//!
//! This module counts what each run did to the data (rows loaded, values
//! filled, outliers capped, windows built) so results can be traced back.

pub mod log;

// Re-export commonly used types
pub use log::{
    create_shared_log, create_shared_log_with_persistence, AuditLog, AuditStats, SharedAuditLog,
};
