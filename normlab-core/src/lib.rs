//! NormLab Core: normality analysis of financial log-returns.
//!
//! - Domain types: price/return series and date-aligned tables
//! - Log-return transform
//! - Normality battery (Shapiro–Wilk, Anderson–Darling, Jarque–Bera,
//!   Kolmogorov–Smirnov) with an explicit accept rule
//! - Rolling-window scanner
//! - Two-sided winsorization
//! - Weighted portfolio aggregation
//! - Price data layer (Yahoo provider, CSV import, Parquet cache)
//!
//! The statistical modules are pure functions over slices and tables. Only
//! `data` touches the network or the filesystem.

pub mod data;
pub mod domain;
pub mod normality;
pub mod portfolio;
pub mod returns;
pub mod rolling;
pub mod trim;

pub use domain::{PriceSeries, PriceTable, ReturnSeries, ReturnTable};
pub use normality::{run_battery, BatteryConfig, NormalityResult, NormalityTest};
pub use rolling::{scan_series, scan_table, RollingConfig, RollingResultSet, WindowResult};
