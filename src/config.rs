//! Engine configuration file support.
//!
//! This module provides utilities for reading the scheduling engine
//! settings (class capacity, business timezone, billing cycle) from TOML
//! configuration files or the environment.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::db::repository::RepositoryError;
use rust_decimal::Decimal;

/// Engine settings loaded from `studio.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default)]
    pub scheduling: SchedulingSettings,
    #[serde(default)]
    pub billing: BillingSettings,
}

/// Scheduling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingSettings {
    /// Business-wide class capacity, applied to every occurrence.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// IANA timezone name used to resolve template wall-clock times.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

/// Billing cycle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingSettings {
    /// Day of month on which a new cycle starts (1..=31).
    #[serde(default = "default_due_day")]
    pub due_day: u32,
    /// Cycle length in days; divisor of the pro-rata daily rate.
    #[serde(default = "default_validity_days")]
    pub validity_days: u32,
    /// Flat recurring fee per cycle.
    #[serde(default = "default_monthly_fee")]
    pub monthly_fee: Decimal,
}

fn default_capacity() -> usize {
    10
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_due_day() -> u32 {
    5
}

fn default_validity_days() -> u32 {
    30
}

fn default_monthly_fee() -> Decimal {
    Decimal::ZERO
}

impl Default for SchedulingSettings {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            timezone: default_timezone(),
        }
    }
}

impl Default for BillingSettings {
    fn default() -> Self {
        Self {
            due_day: default_due_day(),
            validity_days: default_validity_days(),
            monthly_fee: default_monthly_fee(),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            scheduling: SchedulingSettings::default(),
            billing: BillingSettings::default(),
        }
    }
}

impl EngineSettings {
    /// Load engine settings from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    /// * `Ok(EngineSettings)` if successful
    /// * `Err(RepositoryError)` if file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RepositoryError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            RepositoryError::configuration(format!("Failed to read config file: {}", e))
        })?;

        let settings: EngineSettings = toml::from_str(&content).map_err(|e| {
            RepositoryError::configuration(format!("Failed to parse config file: {}", e))
        })?;

        settings.validate()?;
        Ok(settings)
    }

    /// Load engine settings from the default location.
    ///
    /// Searches for `studio.toml` in:
    /// 1. Current directory
    /// 2. Parent directory
    ///
    /// Falls back to defaults when no file is found.
    pub fn from_default_location() -> Result<Self, RepositoryError> {
        let search_paths = vec![
            PathBuf::from("studio.toml"),
            PathBuf::from("../studio.toml"),
        ];

        for path in search_paths {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Resolve the configured timezone name.
    pub fn timezone(&self) -> Result<chrono_tz::Tz, RepositoryError> {
        chrono_tz::Tz::from_str(&self.scheduling.timezone).map_err(|_| {
            RepositoryError::configuration(format!(
                "Unknown timezone: {}",
                self.scheduling.timezone
            ))
        })
    }

    /// Validate settings values.
    pub fn validate(&self) -> Result<(), RepositoryError> {
        if self.scheduling.capacity == 0 {
            return Err(RepositoryError::configuration(
                "scheduling.capacity must be at least 1",
            ));
        }
        if !(1..=31).contains(&self.billing.due_day) {
            return Err(RepositoryError::configuration(format!(
                "billing.due_day must be within 1..=31, got {}",
                self.billing.due_day
            )));
        }
        if self.billing.validity_days == 0 {
            return Err(RepositoryError::configuration(
                "billing.validity_days must be positive",
            ));
        }
        self.timezone()?;
        Ok(())
    }
}
