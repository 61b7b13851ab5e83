//! In-memory record store.
//!
//! The store owns one immutable `Snapshot` behind an `Arc`. A refresh builds
//! a complete new snapshot and swaps the pointer; readers that already hold
//! the old `Arc` keep a consistent view. A failed refresh leaves the
//! previous snapshot in place.
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::error::DataLoadError;
use crate::filter;
use crate::loader::{normalize_bytes, LoadReport};
use crate::source::DataSource;
use crate::types::{CourseRecord, FilterOptions, FilterSpec};

/// Default time after which a snapshot is considered stale.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub records: Vec<CourseRecord>,
    /// Passthrough column names, aligned with `CourseRecord::extra`.
    pub extra_columns: Vec<String>,
    pub report: LoadReport,
    pub loaded_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn filter_options(&self) -> FilterOptions {
        filter::filter_options(&self.records)
    }

    /// The filter that selects everything, as a fresh dashboard would.
    pub fn default_filter(&self) -> FilterSpec {
        filter::default_spec(&self.filter_options())
    }
}

pub struct RecordStore {
    source: Box<dyn DataSource>,
    ttl: Duration,
    current: RwLock<Arc<Snapshot>>,
}

impl RecordStore {
    /// Build the first snapshot. Without it there is nothing to serve, so
    /// any failure here is returned.
    pub fn load(source: Box<dyn DataSource>, ttl: Duration) -> Result<Self, DataLoadError> {
        let snapshot = build_snapshot(source.as_ref())?;
        Ok(Self {
            source,
            ttl,
            current: RwLock::new(Arc::new(snapshot)),
        })
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last_refresh(&self) -> DateTime<Utc> {
        self.snapshot().loaded_at
    }

    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        (now - self.last_refresh())
            .to_std()
            .map(|elapsed| elapsed >= self.ttl)
            .unwrap_or(false)
    }

    /// Re-fetch and swap in a new snapshot. On error the current snapshot
    /// keeps serving and the error is handed back to the caller.
    pub fn refresh(&self) -> Result<Arc<Snapshot>, DataLoadError> {
        match build_snapshot(self.source.as_ref()) {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                *self.current.write().unwrap_or_else(PoisonError::into_inner) = snapshot.clone();
                Ok(snapshot)
            }
            Err(e) => {
                warn!(source = %self.source.describe(), error = %e, "refresh failed, keeping previous snapshot");
                Err(e)
            }
        }
    }

    /// Refresh only when the snapshot is older than the TTL. Returns whether
    /// a new snapshot was installed.
    pub fn refresh_if_stale(&self, now: DateTime<Utc>) -> Result<bool, DataLoadError> {
        if !self.is_stale(now) {
            return Ok(false);
        }
        self.refresh().map(|_| true)
    }
}

fn build_snapshot(source: &dyn DataSource) -> Result<Snapshot, DataLoadError> {
    let bytes = source.fetch()?;
    let table = normalize_bytes(&bytes)?;
    info!(source = %source.describe(), rows = table.records.len(), "snapshot built");
    Ok(Snapshot {
        records: table.records,
        extra_columns: table.extra_columns,
        report: table.report,
        loaded_at: Utc::now(),
    })
}
