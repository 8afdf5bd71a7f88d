//! Fixed-width text tables for the terminal.

use std::fmt::Write;

use normlab_core::normality::NormalityResult;
use normlab_core::rolling::RollingResultSet;

use crate::study::{AssetBattery, RollingSummary};

/// Four decimals, or `NaN`.
pub fn format_p(p: f64) -> String {
    if p.is_nan() {
        "NaN".to_string()
    } else {
        format!("{p:.4}")
    }
}

fn verdict(result: &NormalityResult) -> &'static str {
    if result.is_degenerate() {
        "too few"
    } else if result.accept {
        "normal"
    } else {
        "reject"
    }
}

const BATTERY_HEADER: &str = "Asset      Variant   n      Shapiro   Anderson  JB        KS        Verdict";

fn battery_row(out: &mut String, asset: &str, variant: &str, r: &NormalityResult) {
    let p = &r.p_values;
    let _ = writeln!(
        out,
        "{:<10} {:<9} {:<6} {:<9} {:<9} {:<9} {:<9} {}",
        asset,
        variant,
        r.n,
        format_p(p.shapiro),
        format_p(p.anderson),
        format_p(p.jarque_bera),
        format_p(p.ks),
        verdict(r)
    );
}

/// One row per asset and variant with the four p-values and the verdict.
pub fn render_battery_table(rows: &[AssetBattery]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{BATTERY_HEADER}");
    let _ = writeln!(out, "{}", "-".repeat(BATTERY_HEADER.len()));
    for row in rows {
        battery_row(&mut out, &row.asset, "full", &row.full);
        if let Some(trimmed) = &row.trimmed {
            battery_row(&mut out, &row.asset, "trimmed", trimmed);
        }
    }
    out
}

pub fn render_rolling_summary(summaries: &[RollingSummary]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<10} {:>8} {:>8} {:>8} {:>12} {:>12}",
        "Asset", "Windows", "Normal", "Rate", "First", "Last"
    );
    let _ = writeln!(out, "{}", "-".repeat(63));
    for s in summaries {
        let rate = if s.acceptance_rate.is_nan() {
            "n/a".to_string()
        } else {
            format!("{:.1}%", s.acceptance_rate * 100.0)
        };
        let date = |d: Option<chrono::NaiveDate>| d.map_or_else(|| "-".to_string(), |d| d.to_string());
        let _ = writeln!(
            out,
            "{:<10} {:>8} {:>8} {:>8} {:>12} {:>12}",
            s.asset,
            s.windows,
            s.normal_windows,
            rate,
            date(s.first_normal_end),
            date(s.last_normal_end)
        );
    }
    out
}

/// One line per window. With `normal_only` only accepted windows are shown.
pub fn render_windows(set: &RollingResultSet, normal_only: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<10} {:<12} {:>6} {:>5}  {:<9} {:<9} {:<9} {:<9} {}",
        "Asset", "Window end", "Index", "n", "Shapiro", "Anderson", "JB", "KS", "Verdict"
    );
    for w in set.iter().filter(|w| !normal_only || w.is_normal()) {
        let p = &w.result.p_values;
        let _ = writeln!(
            out,
            "{:<10} {:<12} {:>6} {:>5}  {:<9} {:<9} {:<9} {:<9} {}",
            w.asset,
            w.window_end,
            w.end_index,
            w.result.n,
            format_p(p.shapiro),
            format_p(p.anderson),
            format_p(p.jarque_bera),
            format_p(p.ks),
            verdict(&w.result)
        );
    }
    out
}
