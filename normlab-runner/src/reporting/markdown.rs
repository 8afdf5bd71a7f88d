//! Markdown study report.

use std::fmt::Write;

use normlab_core::normality::NormalityResult;

use super::text::format_p;
use crate::study::StudyReport;

fn battery_line(out: &mut String, label: &str, variant: &str, r: &NormalityResult) {
    let p = &r.p_values;
    let _ = writeln!(
        out,
        "| {label} | {variant} | {} | {} | {} | {} | {} | {} |",
        r.n,
        format_p(p.shapiro),
        format_p(p.anderson),
        format_p(p.jarque_bera),
        format_p(p.ks),
        if r.accept { "normal" } else { "reject" }
    );
}

pub fn render_markdown(report: &StudyReport) -> String {
    let config = &report.config;
    let mut out = String::new();

    let _ = writeln!(out, "# NormLab Study Report\n");
    let _ = writeln!(out, "Run ID: `{}`\n", report.run_id);
    let _ = writeln!(out, "- Generated: {}", report.generated_at.format("%Y-%m-%d %H:%M:%S UTC"));
    let _ = writeln!(out, "- Tickers: {}", config.data.tickers.join(", "));
    if let (Some(first), Some(last)) = (report.first_date, report.last_date) {
        let _ = writeln!(out, "- Returns: {first} to {last} ({} rows)", report.observations);
    }
    let _ = writeln!(
        out,
        "- Battery: alpha {}, at least {} observations",
        config.battery.alpha, config.battery.min_observations
    );
    let _ = writeln!(out, "- Rolling window: {}", config.rolling.window);
    let _ = writeln!(out, "- Trim fraction: {}", config.trim.fraction);
    let _ = writeln!(out, "- Dataset hash: `{}`", report.dataset_hash);
    if report.synthetic {
        let _ = writeln!(out, "\n> **Warning:** some prices are synthetic.");
    }

    let _ = writeln!(out, "\n## Full-sample battery\n");
    let _ = writeln!(out, "| Asset | Variant | n | Shapiro | Anderson | JB | KS | Verdict |");
    let _ = writeln!(out, "|-------|---------|---|---------|----------|----|----|---------|");
    for a in &report.assets {
        battery_line(&mut out, &a.asset, "full", &a.full);
        if let Some(t) = &a.trimmed {
            battery_line(&mut out, &a.asset, "trimmed", t);
        }
    }

    let _ = writeln!(out, "\n## Rolling windows\n");
    let _ = writeln!(out, "| Asset | Windows | Normal | Rate | First normal | Last normal |");
    let _ = writeln!(out, "|-------|---------|--------|------|--------------|-------------|");
    for s in &report.rolling_summaries {
        let rate = if s.acceptance_rate.is_nan() {
            "n/a".to_string()
        } else {
            format!("{:.1}%", s.acceptance_rate * 100.0)
        };
        let date = |d: Option<chrono::NaiveDate>| d.map_or_else(|| "-".to_string(), |d| d.to_string());
        let _ = writeln!(
            out,
            "| {} | {} | {} | {rate} | {} | {} |",
            s.asset,
            s.windows,
            s.normal_windows,
            date(s.first_normal_end),
            date(s.last_normal_end)
        );
    }

    let portfolio = &report.portfolio;
    let _ = writeln!(out, "\n## Portfolio\n");
    let weights: Vec<String> = portfolio.weights.iter().map(|(a, w)| format!("{a} {w:.4}")).collect();
    let label = if portfolio.equal_weighted { " (equal)" } else { "" };
    let _ = writeln!(out, "Weights{label}: {}\n", weights.join(", "));
    let _ = writeln!(out, "| Series | Variant | n | Shapiro | Anderson | JB | KS | Verdict |");
    let _ = writeln!(out, "|--------|---------|---|---------|----------|----|----|---------|");
    battery_line(&mut out, "portfolio", "full", &portfolio.full);
    battery_line(&mut out, "portfolio", "trimmed", &portfolio.trimmed);

    out
}
