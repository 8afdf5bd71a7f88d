//! NormLab CLI: normality analysis of daily log-returns.
//!
//! Commands:
//! - `download` fetches prices from Yahoo Finance into the Parquet cache
//! - `test` runs the normality battery per symbol
//! - `rolling` scans rolling windows
//! - `portfolio` tests a weighted portfolio
//! - `study` runs a TOML study and writes artifacts
//! - `import` stores a CSV of closes in the cache
//! - `cache status` / `cache clean` inspect and prune the cache

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use normlab_core::data::{
    clean_bars, download_symbols, import_csv, DownloadProgress, LogProgress, ParquetCache, PriceProvider,
    YahooProvider,
};
use normlab_core::normality::BatteryConfig;
use normlab_core::portfolio::{Weights, PORTFOLIO_ASSET};
use normlab_core::returns::table_returns;
use normlab_core::rolling::{scan_table, RollingConfig, DEFAULT_WINDOW};
use normlab_core::trim::DEFAULT_FRACTION;
use normlab_runner::reporting::{render_battery_table, render_rolling_summary, render_windows};
use normlab_runner::{
    battery_by_asset, load_prices, portfolio_battery, run_study, save_artifacts, summarize_rolling, AssetBattery,
    LoadOptions, LoadedPrices, StudyConfig,
};

#[derive(Parser)]
#[command(name = "normlab", version, about = "NormLab: how normal are daily log-returns?")]
struct Cli {
    /// More log output (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Where prices come from and for which dates.
#[derive(Args, Clone)]
struct DataArgs {
    /// Start date (YYYY-MM-DD). Defaults to 10 years ago.
    #[arg(long)]
    start: Option<NaiveDate>,

    /// End date (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Offline mode: no network access.
    #[arg(long, default_value_t = false)]
    offline: bool,

    /// Use synthetic prices when real data is unavailable.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Cache directory.
    #[arg(long, default_value = "data")]
    cache_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Download daily prices from Yahoo Finance into the cache.
    Download {
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Start date (YYYY-MM-DD). Defaults to 10 years ago.
        #[arg(long)]
        start: Option<NaiveDate>,

        /// End date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Re-download even if cached.
        #[arg(long, default_value_t = false)]
        force: bool,

        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,
    },
    /// Run the normality battery on each symbol's full sample.
    Test {
        #[arg(required = true)]
        symbols: Vec<String>,

        #[arg(long, default_value_t = 0.05)]
        alpha: f64,

        /// Also test the sample winsorized at this fraction per tail.
        #[arg(long)]
        trim: Option<f64>,

        #[command(flatten)]
        data: DataArgs,
    },
    /// Scan rolling windows and list each window's verdict.
    Rolling {
        #[arg(required = true)]
        symbols: Vec<String>,

        #[arg(long, default_value_t = DEFAULT_WINDOW)]
        window: usize,

        #[arg(long, default_value_t = 0.05)]
        alpha: f64,

        /// Only list windows that pass every test.
        #[arg(long, default_value_t = false)]
        normal_only: bool,

        /// Evaluate windows on one thread.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        #[command(flatten)]
        data: DataArgs,
    },
    /// Test a weighted portfolio of the symbols' returns.
    Portfolio {
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Weights as SYM=W,SYM=W. Defaults to equal weights.
        #[arg(long)]
        weights: Option<String>,

        #[arg(long, default_value_t = 0.05)]
        alpha: f64,

        /// Winsorization fraction for the trimmed variant.
        #[arg(long, default_value_t = DEFAULT_FRACTION)]
        trim: f64,

        #[command(flatten)]
        data: DataArgs,
    },
    /// Run a full study from a TOML file and write artifacts.
    Study {
        #[arg(long)]
        config: PathBuf,

        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        #[arg(long, default_value_t = false)]
        offline: bool,

        #[arg(long, default_value_t = false)]
        synthetic: bool,

        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,
    },
    /// Store a `date,close[,adj_close]` CSV in the cache.
    Import {
        symbol: String,

        file: PathBuf,

        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,
    },
    /// Cache management.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// List cached symbols with their date ranges.
    Status {
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,
    },
    /// Remove cached symbols.
    Clean {
        /// Symbols to remove. With --all, every cached symbol.
        symbols: Vec<String>,

        #[arg(long, default_value_t = false)]
        all: bool,

        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,

        /// Actually delete (without this flag, only previews).
        #[arg(long, default_value_t = false)]
        confirm: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Download {
            symbols,
            start,
            end,
            force,
            cache_dir,
        } => run_download(&symbols, start, end, force, &cache_dir),
        Commands::Test {
            symbols,
            alpha,
            trim,
            data,
        } => run_test(&symbols, alpha, trim, &data),
        Commands::Rolling {
            symbols,
            window,
            alpha,
            normal_only,
            sequential,
            data,
        } => run_rolling(&symbols, window, alpha, normal_only, !sequential, &data),
        Commands::Portfolio {
            symbols,
            weights,
            alpha,
            trim,
            data,
        } => run_portfolio(&symbols, weights.as_deref(), alpha, trim, &data),
        Commands::Study {
            config,
            output_dir,
            offline,
            synthetic,
            cache_dir,
        } => run_study_cmd(&config, &output_dir, offline, synthetic, &cache_dir),
        Commands::Import {
            symbol,
            file,
            cache_dir,
        } => run_import(&symbol, &file, &cache_dir),
        Commands::Cache { action } => match action {
            CacheAction::Status { cache_dir } => run_cache_status(&cache_dir),
            CacheAction::Clean {
                symbols,
                all,
                cache_dir,
                confirm,
            } => run_cache_clean(&symbols, all, &cache_dir, confirm),
        },
    }
}

/// Logs go to stderr so tables on stdout stay clean.
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn default_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<(NaiveDate, NaiveDate)> {
    let end = end.unwrap_or_else(|| chrono::Local::now().date_naive());
    let start = start.unwrap_or_else(|| end - chrono::Duration::days(365 * 10));
    if start >= end {
        bail!("--start {start} must be before --end {end}");
    }
    Ok((start, end))
}

fn check_alpha(alpha: f64) -> Result<()> {
    if !(alpha > 0.0 && alpha < 1.0) {
        bail!("--alpha must be in (0, 1), got {alpha}");
    }
    Ok(())
}

fn check_trim(fraction: f64) -> Result<()> {
    if !(0.0..0.5).contains(&fraction) {
        bail!("--trim must be in [0, 0.5), got {fraction}");
    }
    Ok(())
}

fn load(
    symbols: &[String],
    start: NaiveDate,
    end: NaiveDate,
    offline: bool,
    synthetic: bool,
    cache_dir: &Path,
) -> Result<LoadedPrices> {
    tracing::debug!(%start, %end, offline, synthetic, "loading prices");
    let cache = ParquetCache::new(cache_dir);
    let provider = if offline {
        None
    } else {
        Some(YahooProvider::new().context("Failed to set up the Yahoo Finance client")?)
    };
    let opts = LoadOptions {
        start,
        end,
        offline,
        synthetic,
        force: false,
    };
    let loaded = load_prices(
        symbols,
        &cache,
        provider.as_ref().map(|p| p as &dyn PriceProvider),
        Some(&LogProgress as &dyn DownloadProgress),
        &opts,
    )?;
    if loaded.synthetic {
        println!("WARNING: results use SYNTHETIC prices");
    }
    Ok(loaded)
}

fn load_data(symbols: &[String], data: &DataArgs) -> Result<LoadedPrices> {
    let (start, end) = default_range(data.start, data.end)?;
    load(symbols, start, end, data.offline, data.synthetic, &data.cache_dir)
}

fn run_download(
    symbols: &[String],
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    force: bool,
    cache_dir: &Path,
) -> Result<()> {
    let (start, end) = default_range(start, end)?;
    let provider = YahooProvider::new().context("Failed to set up the Yahoo Finance client")?;
    let cache = ParquetCache::new(cache_dir);

    let summary = download_symbols(&provider, &cache, symbols, start, end, force, &LogProgress);
    println!(
        "Downloaded {} of {} symbol(s) ({} already cached)",
        summary.succeeded - summary.skipped,
        summary.total,
        summary.skipped
    );
    if !summary.all_succeeded() {
        for (symbol, err) in &summary.errors {
            eprintln!("Error for {symbol}: {err}");
        }
        bail!("{} of {} downloads failed", summary.failed, summary.total);
    }
    Ok(())
}

fn run_test(symbols: &[String], alpha: f64, trim: Option<f64>, data: &DataArgs) -> Result<()> {
    check_alpha(alpha)?;
    if let Some(f) = trim {
        check_trim(f)?;
    }
    let loaded = load_data(symbols, data)?;
    let returns = table_returns(&loaded.table);
    let battery = BatteryConfig::default().with_alpha(alpha);

    let rows = battery_by_asset(&returns, &battery, trim, true);
    println!();
    print!("{}", render_battery_table(&rows));
    println!();
    println!("A sample is normal when every p-value exceeds alpha = {alpha}.");
    Ok(())
}

fn run_rolling(
    symbols: &[String],
    window: usize,
    alpha: f64,
    normal_only: bool,
    parallel: bool,
    data: &DataArgs,
) -> Result<()> {
    check_alpha(alpha)?;
    if window == 0 {
        bail!("--window must be positive");
    }
    let loaded = load_data(symbols, data)?;
    let returns = table_returns(&loaded.table);
    let config = RollingConfig::new(window, BatteryConfig::default().with_alpha(alpha)).with_parallelism(parallel);

    let set = scan_table(&returns, &config);
    println!();
    print!("{}", render_windows(&set, normal_only));
    println!();
    print!("{}", render_rolling_summary(&summarize_rolling(&set)));
    Ok(())
}

/// Parse `SYM=W,SYM=W`.
fn parse_weights(text: &str) -> Result<Weights> {
    let mut weights = Weights::new();
    for pair in text.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let Some((symbol, weight)) = pair.split_once('=') else {
            bail!("weight '{pair}' is not SYM=W");
        };
        let weight: f64 = weight
            .trim()
            .parse()
            .with_context(|| format!("weight for '{}' is not a number", symbol.trim()))?;
        if !weight.is_finite() {
            bail!("weight for '{}' is not finite", symbol.trim());
        }
        weights.insert(symbol.trim().to_string(), weight);
    }
    if weights.is_empty() {
        bail!("--weights given but empty");
    }
    Ok(weights)
}

fn run_portfolio(symbols: &[String], weights: Option<&str>, alpha: f64, trim: f64, data: &DataArgs) -> Result<()> {
    check_alpha(alpha)?;
    check_trim(trim)?;
    let weights = weights.map(parse_weights).transpose()?;
    if let Some(w) = &weights {
        if let Some(unknown) = w.keys().find(|s| !symbols.contains(*s)) {
            bail!("weight given for '{unknown}', which is not among the symbols");
        }
    }

    let loaded = load_data(symbols, data)?;
    let returns = table_returns(&loaded.table);
    let report = portfolio_battery(&returns, weights.as_ref(), &BatteryConfig::default().with_alpha(alpha), trim)?;

    println!();
    let label = if report.equal_weighted { "equal weights" } else { "weights" };
    let listed: Vec<String> = report.weights.iter().map(|(a, w)| format!("{a}={w:.4}")).collect();
    println!("Portfolio ({label}): {}", listed.join(", "));
    println!();
    let row = AssetBattery {
        asset: PORTFOLIO_ASSET.to_string(),
        full: report.full,
        trimmed: Some(report.trimmed),
    };
    print!("{}", render_battery_table(std::slice::from_ref(&row)));
    Ok(())
}

fn run_study_cmd(config_path: &Path, output_dir: &Path, offline: bool, synthetic: bool, cache_dir: &Path) -> Result<()> {
    let config = StudyConfig::from_file(config_path)
        .with_context(|| format!("Failed to load study config {}", config_path.display()))?;
    let loaded = load(
        &config.data.tickers,
        config.data.start_date,
        config.data.end_date,
        offline,
        synthetic,
        cache_dir,
    )?;

    let report = run_study(&config, &loaded)?;

    println!();
    println!("=== Study {} ===", config.short_run_id());
    println!(
        "Returns: {} rows, {} to {}",
        report.observations,
        report.first_date.map_or_else(|| "-".into(), |d| d.to_string()),
        report.last_date.map_or_else(|| "-".into(), |d| d.to_string())
    );
    println!();
    print!("{}", render_battery_table(&report.assets));
    println!();
    print!("{}", render_rolling_summary(&report.rolling_summaries));
    println!();
    let portfolio = AssetBattery {
        asset: PORTFOLIO_ASSET.to_string(),
        full: report.portfolio.full,
        trimmed: Some(report.portfolio.trimmed),
    };
    print!("{}", render_battery_table(std::slice::from_ref(&portfolio)));

    let paths = save_artifacts(&report, output_dir)?;
    println!();
    println!("Artifacts saved to: {}", paths.run_dir.display());
    Ok(())
}

fn run_import(symbol: &str, file: &Path, cache_dir: &Path) -> Result<()> {
    let fetched = import_csv(symbol, file).with_context(|| format!("Failed to import {}", file.display()))?;
    let (bars, report) = clean_bars(fetched.bars);
    if !report.is_clean() {
        tracing::warn!(
            symbol,
            duplicates = report.duplicates_dropped,
            missing = report.missing_prices,
            non_positive = report.non_positive_prices,
            "imported data needed cleaning"
        );
    }
    let cache = ParquetCache::new(cache_dir);
    let meta = cache
        .write(symbol, &bars, fetched.source)
        .with_context(|| format!("Failed to cache {symbol}"))?;
    println!(
        "Imported {symbol}: {} bars, {} to {}",
        meta.bar_count, meta.start_date, meta.end_date
    );
    Ok(())
}

fn run_cache_status(cache_dir: &Path) -> Result<()> {
    let cache = ParquetCache::new(cache_dir);
    let symbols = cache.symbols();
    if symbols.is_empty() {
        println!("Cache is empty: {}", cache_dir.display());
        return Ok(());
    }

    println!("Cache: {}", cache_dir.display());
    println!("Symbols: {}", symbols.len());
    println!();
    println!("{:<8} {:<25} {:>8}", "Symbol", "Date Range", "Bars");
    println!("{}", "-".repeat(43));
    for status in cache.status(&symbols) {
        let range = match (status.start_date, status.end_date) {
            (Some(s), Some(e)) => format!("{s} to {e}"),
            _ => "(no meta)".to_string(),
        };
        let bars = status.bar_count.map_or_else(|| "-".to_string(), |n| n.to_string());
        println!("{:<8} {:<25} {:>8}", status.symbol, range, bars);
    }
    Ok(())
}

fn run_cache_clean(symbols: &[String], all: bool, cache_dir: &Path, confirm: bool) -> Result<()> {
    let cache = ParquetCache::new(cache_dir);
    let targets: Vec<String> = if all {
        cache.symbols()
    } else if symbols.is_empty() {
        bail!("name the symbols to remove, or pass --all");
    } else {
        symbols.to_vec()
    };

    if targets.is_empty() {
        println!("Nothing to remove.");
        return Ok(());
    }

    println!("Removing {} symbol(s): {}", targets.len(), targets.join(", "));
    if !confirm {
        println!();
        println!("Dry run: pass --confirm to actually delete.");
        return Ok(());
    }

    let mut removed = 0;
    for symbol in &targets {
        if cache
            .remove(symbol)
            .with_context(|| format!("Failed to remove {symbol} from the cache"))?
        {
            println!("Removed: {symbol}");
            removed += 1;
        } else {
            println!("Not cached: {symbol}");
        }
    }
    println!("Done. Removed {removed} symbol(s).");
    Ok(())
}
