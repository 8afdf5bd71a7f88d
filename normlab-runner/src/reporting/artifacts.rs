//! Study artifacts on disk.
//!
//! Layout under the output directory:
//! - `{run_id}/manifest.json`: config, run id, dataset hash, time, sources
//! - `{run_id}/battery.csv`: one row per asset and variant, portfolio last
//! - `{run_id}/rolling.csv`: one row per window
//! - `{run_id}/report.md`

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use normlab_core::data::DataSource;
use normlab_core::normality::NormalityResult;
use normlab_core::portfolio::PORTFOLIO_ASSET;

use super::markdown::render_markdown;
use crate::config::StudyConfig;
use crate::study::StudyReport;

#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub run_dir: PathBuf,
    pub manifest: PathBuf,
    pub battery_csv: PathBuf,
    pub rolling_csv: PathBuf,
    pub report_markdown: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub dataset_hash: String,
    pub synthetic: bool,
    pub sources: BTreeMap<String, DataSource>,
    pub observations: usize,
    pub windows: usize,
    pub config: StudyConfig,
}

impl RunManifest {
    fn from_report(report: &StudyReport) -> Self {
        Self {
            run_id: report.run_id.clone(),
            generated_at: report.generated_at,
            dataset_hash: report.dataset_hash.clone(),
            synthetic: report.synthetic,
            sources: report.sources.clone(),
            observations: report.observations,
            windows: report.rolling.len(),
            config: report.config.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct BatteryRow<'a> {
    asset: &'a str,
    variant: &'a str,
    n: usize,
    p_shapiro: f64,
    p_anderson: f64,
    p_jarque_bera: f64,
    p_ks: f64,
    stat_shapiro: f64,
    stat_anderson: f64,
    stat_jarque_bera: f64,
    stat_ks: f64,
    accept: bool,
}

impl<'a> BatteryRow<'a> {
    fn new(asset: &'a str, variant: &'a str, r: &NormalityResult) -> Self {
        Self {
            asset,
            variant,
            n: r.n,
            p_shapiro: r.p_values.shapiro,
            p_anderson: r.p_values.anderson,
            p_jarque_bera: r.p_values.jarque_bera,
            p_ks: r.p_values.ks,
            stat_shapiro: r.statistics.shapiro,
            stat_anderson: r.statistics.anderson,
            stat_jarque_bera: r.statistics.jarque_bera,
            stat_ks: r.statistics.ks,
            accept: r.accept,
        }
    }
}

#[derive(Debug, Serialize)]
struct RollingRow<'a> {
    asset: &'a str,
    window_end: NaiveDate,
    end_index: usize,
    n: usize,
    p_shapiro: f64,
    p_anderson: f64,
    p_jarque_bera: f64,
    p_ks: f64,
    accept: bool,
}

fn write_manifest(path: &Path, report: &StudyReport) -> Result<()> {
    let json = serde_json::to_string_pretty(&RunManifest::from_report(report))
        .context("Failed to serialize run manifest")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write manifest to {}", path.display()))?;
    Ok(())
}

fn write_battery_csv(path: &Path, report: &StudyReport) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("Failed to create {}", path.display()))?;
    for a in &report.assets {
        writer.serialize(BatteryRow::new(&a.asset, "full", &a.full))?;
        if let Some(t) = &a.trimmed {
            writer.serialize(BatteryRow::new(&a.asset, "trimmed", t))?;
        }
    }
    writer.serialize(BatteryRow::new(PORTFOLIO_ASSET, "full", &report.portfolio.full))?;
    writer.serialize(BatteryRow::new(PORTFOLIO_ASSET, "trimmed", &report.portfolio.trimmed))?;
    writer.flush().with_context(|| format!("Failed to flush {}", path.display()))?;
    Ok(())
}

fn write_rolling_csv(path: &Path, report: &StudyReport) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("Failed to create {}", path.display()))?;
    for w in report.rolling.iter() {
        let p = &w.result.p_values;
        writer.serialize(RollingRow {
            asset: &w.asset,
            window_end: w.window_end,
            end_index: w.end_index,
            n: w.result.n,
            p_shapiro: p.shapiro,
            p_anderson: p.anderson,
            p_jarque_bera: p.jarque_bera,
            p_ks: p.ks,
            accept: w.result.accept,
        })?;
    }
    writer.flush().with_context(|| format!("Failed to flush {}", path.display()))?;
    Ok(())
}

/// Write every artifact of `report` under `output_dir/{run_id}/`.
///
/// An existing run directory is overwritten file by file.
pub fn save_artifacts(report: &StudyReport, output_dir: &Path) -> Result<ArtifactPaths> {
    let run_dir = output_dir.join(&report.run_id);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("Failed to create run artifact directory {}", run_dir.display()))?;

    let paths = ArtifactPaths {
        manifest: run_dir.join("manifest.json"),
        battery_csv: run_dir.join("battery.csv"),
        rolling_csv: run_dir.join("rolling.csv"),
        report_markdown: run_dir.join("report.md"),
        run_dir,
    };

    write_manifest(&paths.manifest, report)?;
    write_battery_csv(&paths.battery_csv, report)?;
    write_rolling_csv(&paths.rolling_csv, report)?;
    std::fs::write(&paths.report_markdown, render_markdown(report))
        .with_context(|| format!("Failed to write {}", paths.report_markdown.display()))?;

    tracing::info!(dir = %paths.run_dir.display(), "artifacts saved");
    Ok(paths)
}
