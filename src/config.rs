use crate::bounds::{MAX_HORIZON_DAYS, MAX_OCCURRENCES};
use crate::persistence::{PersistenceError, PersistenceResult};
#[cfg(feature = "sqlite")]
use crate::{persistence::sqlite::SqliteOccurrenceStore, planner::SchedulePlanner};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};
#[cfg(feature = "sqlite")]
use std::sync::Arc;
use std::time::Duration;

pub const CONFIG_ENV: &str = "CLEANING_SCHEDULE_CONFIG";
pub const DATABASE_ENV: &str = "CLEANING_SCHEDULE_DB";
pub const HTTP_ADDR_ENV: &str = "CLEANING_SCHEDULE_HTTP_ADDR";
pub const TIMEOUT_ENV: &str = "CLEANING_SCHEDULE_TIMEOUT_MS";

/// Runtime settings shared by the binaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// SQLite file. `None` keeps everything in memory.
    pub database_path: Option<PathBuf>,
    pub http_addr: String,
    pub persist_timeout_ms: u64,
    pub default_horizon_days: u32,
    pub default_occurrence_limit: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            http_addr: "0.0.0.0:3000".to_string(),
            persist_timeout_ms: 10_000,
            default_horizon_days: 30,
            default_occurrence_limit: 10,
        }
    }
}

impl SchedulerConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> PersistenceResult<Self> {
        let file = File::open(path)?;
        let config: SchedulerConfig = serde_json::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    /// The JSON file named by `CLEANING_SCHEDULE_CONFIG` (or the defaults),
    /// overridden by the other `CLEANING_SCHEDULE_*` variables.
    pub fn from_env() -> PersistenceResult<Self> {
        let base = match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::from_json_file(path)?,
            Err(_) => Self::default(),
        };
        base.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `CLEANING_SCHEDULE_*` overrides read through `lookup`.
    pub fn with_overrides<F>(mut self, lookup: F) -> PersistenceResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(DATABASE_ENV).filter(|value| !value.trim().is_empty()) {
            self.database_path = Some(PathBuf::from(path));
        }
        if let Some(addr) = lookup(HTTP_ADDR_ENV).filter(|value| !value.trim().is_empty()) {
            self.http_addr = addr;
        }
        if let Some(raw) = lookup(TIMEOUT_ENV) {
            self.persist_timeout_ms = raw.trim().parse().map_err(|_| {
                PersistenceError::InvalidData(format!("{TIMEOUT_ENV} must be milliseconds, got '{raw}'"))
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn persist_timeout(&self) -> Duration {
        Duration::from_millis(self.persist_timeout_ms)
    }

    #[cfg(feature = "sqlite")]
    pub fn open_store(&self) -> PersistenceResult<SqliteOccurrenceStore> {
        match &self.database_path {
            Some(path) => SqliteOccurrenceStore::new(path),
            None => SqliteOccurrenceStore::open_in_memory(),
        }
    }

    /// Planner over the configured SQLite store.
    #[cfg(feature = "sqlite")]
    pub fn planner(&self) -> PersistenceResult<SchedulePlanner> {
        let store = self.open_store()?;
        Ok(SchedulePlanner::new(Arc::new(store)).with_timeout(self.persist_timeout()))
    }

    fn validate(&self) -> PersistenceResult<()> {
        if self.persist_timeout_ms == 0 {
            return Err(PersistenceError::InvalidData(
                "persist_timeout_ms must be positive".into(),
            ));
        }
        if !(1..=MAX_HORIZON_DAYS).contains(&self.default_horizon_days) {
            return Err(PersistenceError::InvalidData(format!(
                "default_horizon_days must be between 1 and {MAX_HORIZON_DAYS}"
            )));
        }
        if !(1..=MAX_OCCURRENCES).contains(&self.default_occurrence_limit) {
            return Err(PersistenceError::InvalidData(format!(
                "default_occurrence_limit must be between 1 and {MAX_OCCURRENCES}"
            )));
        }
        Ok(())
    }
}
