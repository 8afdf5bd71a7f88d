//! Study configuration (TOML).
//!
//! ```toml
//! [data]
//! tickers = ["SPY", "QQQ", "TLT"]
//! start_date = "2010-01-01"
//! end_date = "2024-12-31"
//!
//! [battery]
//! alpha = 0.05
//! min_observations = 8
//!
//! [rolling]
//! window = 252
//! parallel = true
//!
//! [trim]
//! fraction = 0.01
//!
//! [portfolio]
//! weights = { SPY = 0.6, TLT = 0.4 }
//! ```
//!
//! Every section and field has a default. `[portfolio]` without weights
//! means equal weights over all tickers.

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use normlab_core::normality::{BatteryConfig, DEFAULT_ALPHA, DEFAULT_MIN_OBSERVATIONS};
use normlab_core::portfolio::Weights;
use normlab_core::rolling::{RollingConfig, DEFAULT_WINDOW};
use normlab_core::trim::{DEFAULT_FRACTION, MAX_FRACTION};

/// Content hash of a study configuration.
pub type RunId = String;

/// Smallest sample the battery can be configured to test.
pub const MIN_BATTERY_OBSERVATIONS: usize = 3;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("invalid TOML: {0}")]
    Parse(String),

    #[error("no tickers configured")]
    EmptyTickers,

    #[error("ticker '{0}' is listed more than once")]
    DuplicateTicker(String),

    #[error("start_date {start} must be before end_date {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("alpha must be in (0, 1), got {0}")]
    InvalidAlpha(f64),

    #[error("min_observations must be at least {MIN_BATTERY_OBSERVATIONS}, got {0}")]
    MinObservationsTooSmall(usize),

    #[error("rolling window {window} is smaller than min_observations {min_observations}")]
    WindowTooSmall { window: usize, min_observations: usize },

    #[error("trim fraction must be in [0, 0.5), got {0}")]
    InvalidTrimFraction(f64),

    #[error("portfolio weight for '{0}', which is not a configured ticker")]
    UnknownWeightAsset(String),

    #[error("portfolio weight for '{asset}' is not finite: {weight}")]
    NonFiniteWeight { asset: String, weight: f64 },
}

/// A complete study: which prices, which tests, which transforms.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyConfig {
    pub data: DataSection,
    pub battery: BatterySection,
    pub rolling: RollingSection,
    pub trim: TrimSection,
    pub portfolio: PortfolioSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSection {
    pub tickers: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            tickers: Vec::new(),
            start_date: NaiveDate::from_ymd_opt(2010, 1, 1).unwrap_or_default(),
            end_date: chrono::Utc::now().date_naive(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatterySection {
    pub alpha: f64,
    pub min_observations: usize,
}

impl Default for BatterySection {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            min_observations: DEFAULT_MIN_OBSERVATIONS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RollingSection {
    pub window: usize,
    pub parallel: bool,
}

impl Default for RollingSection {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            parallel: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrimSection {
    pub fraction: f64,
}

impl Default for TrimSection {
    fn default() -> Self {
        Self {
            fraction: DEFAULT_FRACTION,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PortfolioSection {
    /// `None` means equal weights over every ticker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weights: Option<Weights>,
}

impl StudyConfig {
    /// Parse and validate a TOML study.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: StudyConfig = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    /// Minimal study over `tickers` with every other field at its default.
    pub fn for_tickers(tickers: Vec<String>, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            data: DataSection {
                tickers,
                start_date,
                end_date,
            },
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let data = &self.data;
        if data.tickers.is_empty() {
            return Err(ConfigError::EmptyTickers);
        }
        for (i, t) in data.tickers.iter().enumerate() {
            if data.tickers[..i].contains(t) {
                return Err(ConfigError::DuplicateTicker(t.clone()));
            }
        }
        if data.start_date >= data.end_date {
            return Err(ConfigError::InvalidDateRange {
                start: data.start_date,
                end: data.end_date,
            });
        }

        let alpha = self.battery.alpha;
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(ConfigError::InvalidAlpha(alpha));
        }
        let min_observations = self.battery.min_observations;
        if min_observations < MIN_BATTERY_OBSERVATIONS {
            return Err(ConfigError::MinObservationsTooSmall(min_observations));
        }
        if self.rolling.window < min_observations {
            return Err(ConfigError::WindowTooSmall {
                window: self.rolling.window,
                min_observations,
            });
        }

        let f = self.trim.fraction;
        if !(0.0..MAX_FRACTION).contains(&f) {
            return Err(ConfigError::InvalidTrimFraction(f));
        }

        if let Some(weights) = &self.portfolio.weights {
            for (asset, &weight) in weights {
                if !data.tickers.contains(asset) {
                    return Err(ConfigError::UnknownWeightAsset(asset.clone()));
                }
                if !weight.is_finite() {
                    return Err(ConfigError::NonFiniteWeight {
                        asset: asset.clone(),
                        weight,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn battery_config(&self) -> BatteryConfig {
        BatteryConfig {
            alpha: self.battery.alpha,
            min_observations: self.battery.min_observations,
        }
    }

    pub fn rolling_config(&self) -> RollingConfig {
        RollingConfig::new(self.rolling.window, self.battery_config()).with_parallelism(self.rolling.parallel)
    }

    /// BLAKE3 of the canonical JSON form.
    ///
    /// Field order is fixed by the struct definitions and weights are a
    /// `BTreeMap`, so equal configs always hash equal.
    pub fn run_id(&self) -> RunId {
        // Plain data with string keys; serialization has no failure path.
        let json = serde_json::to_vec(self).unwrap_or_default();
        blake3::hash(&json).to_hex().to_string()
    }

    /// First 12 hex digits of the run id, for display.
    pub fn short_run_id(&self) -> String {
        self.run_id()[..12].to_string()
    }
}
