//! Run audit log.
//!
//! Counters are atomic so a single log can be shared between the loader,
//! the preprocessor and the exporter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Cumulative processing statistics.
#[derive(Debug)]
pub struct AuditLog {
    /// Number of table rows loaded
    rows_loaded: AtomicU64,
    /// Number of duplicate rows dropped
    duplicates_removed: AtomicU64,
    /// Number of missing cells filled
    values_interpolated: AtomicU64,
    /// Number of outliers replaced by the column median
    outliers_capped: AtomicU64,
    /// Number of windows built
    windows_built: AtomicU64,
    /// Number of window sets exported
    exports_written: AtomicU64,
    /// Start of the current run
    run_start: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl AuditLog {
    /// Create a new audit log.
    pub fn new() -> Self {
        Self {
            rows_loaded: AtomicU64::new(0),
            duplicates_removed: AtomicU64::new(0),
            values_interpolated: AtomicU64::new(0),
            outliers_capped: AtomicU64::new(0),
            windows_built: AtomicU64::new(0),
            exports_written: AtomicU64::new(0),
            run_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create an audit log backed by a JSON file, resuming its counts.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut log = Self::new();
        log.persist_path = Some(path);

        if let Err(e) = log.load() {
            tracing::warn!("Could not load previous audit stats: {e}");
        }

        log
    }

    pub fn record_rows_loaded(&self, count: u64) {
        self.rows_loaded.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_duplicates_removed(&self, count: u64) {
        self.duplicates_removed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_values_interpolated(&self, count: u64) {
        self.values_interpolated.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_outliers_capped(&self, count: u64) {
        self.outliers_capped.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_windows_built(&self, count: u64) {
        self.windows_built.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_export(&self) {
        self.exports_written.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn stats(&self) -> AuditStats {
        AuditStats {
            rows_loaded: self.rows_loaded.load(Ordering::Relaxed),
            duplicates_removed: self.duplicates_removed.load(Ordering::Relaxed),
            values_interpolated: self.values_interpolated.load(Ordering::Relaxed),
            outliers_capped: self.outliers_capped.load(Ordering::Relaxed),
            windows_built: self.windows_built.load(Ordering::Relaxed),
            exports_written: self.exports_written.load(Ordering::Relaxed),
            run_start: self.run_start,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Processing Statistics:\n\
             - Rows loaded: {}\n\
             - Duplicate rows removed: {}\n\
             - Missing values interpolated: {}\n\
             - Outliers capped: {}\n\
             - Windows built: {}\n\
             - Exports written: {}",
            stats.rows_loaded,
            stats.duplicates_removed,
            stats.values_interpolated,
            stats.outliers_capped,
            stats.windows_built,
            stats.exports_written
        )
    }

    /// Save stats to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.stats();
            let persisted = PersistedStats {
                rows_loaded: stats.rows_loaded,
                duplicates_removed: stats.duplicates_removed,
                values_interpolated: stats.values_interpolated,
                outliers_capped: stats.outliers_capped,
                windows_built: stats.windows_built,
                exports_written: stats.exports_written,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;
            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.rows_loaded
                    .store(persisted.rows_loaded, Ordering::Relaxed);
                self.duplicates_removed
                    .store(persisted.duplicates_removed, Ordering::Relaxed);
                self.values_interpolated
                    .store(persisted.values_interpolated, Ordering::Relaxed);
                self.outliers_capped
                    .store(persisted.outliers_capped, Ordering::Relaxed);
                self.windows_built
                    .store(persisted.windows_built, Ordering::Relaxed);
                self.exports_written
                    .store(persisted.exports_written, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    /// Reset all counters.
    pub fn reset(&self) {
        self.rows_loaded.store(0, Ordering::Relaxed);
        self.duplicates_removed.store(0, Ordering::Relaxed);
        self.values_interpolated.store(0, Ordering::Relaxed);
        self.outliers_capped.store(0, Ordering::Relaxed);
        self.windows_built.store(0, Ordering::Relaxed);
        self.exports_written.store(0, Ordering::Relaxed);
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of audit statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditStats {
    pub rows_loaded: u64,
    pub duplicates_removed: u64,
    pub values_interpolated: u64,
    pub outliers_capped: u64,
    pub windows_built: u64,
    pub exports_written: u64,
    pub run_start: DateTime<Utc>,
}

/// Stats format for persistence.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    rows_loaded: u64,
    duplicates_removed: u64,
    values_interpolated: u64,
    outliers_capped: u64,
    windows_built: u64,
    exports_written: u64,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared audit log.
pub type SharedAuditLog = Arc<AuditLog>;

/// Create a new shared audit log.
pub fn create_shared_log() -> SharedAuditLog {
    Arc::new(AuditLog::new())
}

/// Create a new shared audit log with persistence.
pub fn create_shared_log_with_persistence(path: PathBuf) -> SharedAuditLog {
    Arc::new(AuditLog::with_persistence(path))
}
