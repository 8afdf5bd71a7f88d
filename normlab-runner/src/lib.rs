//! NormLab Runner: studies on top of `normlab-core`.
//!
//! - TOML study configuration with validation and content-hash run ids
//! - Price loading with cache, download and synthetic fallback
//! - Study orchestration (full and trimmed batteries, rolling scan,
//!   portfolio)
//! - Artifact export and text/markdown rendering

pub mod config;
pub mod data_loader;
pub mod reporting;
pub mod study;

pub use config::{ConfigError, RunId, StudyConfig};
pub use data_loader::{load_prices, LoadError, LoadOptions, LoadedPrices};
pub use reporting::{save_artifacts, ArtifactPaths, RunManifest};
pub use study::{
    battery_by_asset, portfolio_battery, run_study, summarize_rolling, AssetBattery, PortfolioReport,
    RollingSummary, StudyError, StudyReport,
};
