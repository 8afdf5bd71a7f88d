//! Study configuration from TOML.
//!
//! 1. A complete file parses into the documented values
//! 2. Missing sections fall back to defaults
//! 3. Invalid values are rejected with the matching error
//! 4. Files on disk round-trip through `from_file`

use chrono::NaiveDate;
use normlab_runner::{ConfigError, StudyConfig};

const FULL: &str = r#"
[data]
tickers = ["SPY", "QQQ", "TLT"]
start_date = "2010-01-01"
end_date = "2024-12-31"

[battery]
alpha = 0.01
min_observations = 20

[rolling]
window = 126
parallel = false

[trim]
fraction = 0.025

[portfolio]
weights = { SPY = 0.6, TLT = 0.4 }
"#;

#[test]
fn full_config_parses() {
    let c = StudyConfig::from_toml_str(FULL).unwrap();
    assert_eq!(c.data.tickers, vec!["SPY", "QQQ", "TLT"]);
    assert_eq!(c.data.start_date, NaiveDate::from_ymd_opt(2010, 1, 1).unwrap());
    assert_eq!(c.data.end_date, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
    assert_eq!(c.battery.alpha, 0.01);
    assert_eq!(c.battery.min_observations, 20);
    assert_eq!(c.rolling.window, 126);
    assert!(!c.rolling.parallel);
    assert_eq!(c.trim.fraction, 0.025);

    let weights = c.portfolio.weights.as_ref().unwrap();
    assert_eq!(weights.len(), 2);
    assert_eq!(weights["SPY"], 0.6);
    assert_eq!(weights["TLT"], 0.4);
}

#[test]
fn omitted_sections_use_defaults() {
    let c = StudyConfig::from_toml_str(
        r#"
[data]
tickers = ["SPY"]
start_date = "2015-01-01"
end_date = "2020-01-01"
"#,
    )
    .unwrap();
    assert_eq!(c.battery.alpha, 0.05);
    assert_eq!(c.battery.min_observations, 8);
    assert_eq!(c.rolling.window, 252);
    assert!(c.rolling.parallel);
    assert_eq!(c.trim.fraction, 0.01);
    assert!(c.portfolio.weights.is_none());
}

#[test]
fn partial_sections_fill_in_the_rest() {
    let c = StudyConfig::from_toml_str(
        r#"
[data]
tickers = ["SPY"]
start_date = "2015-01-01"
end_date = "2020-01-01"

[battery]
alpha = 0.1

[rolling]
parallel = false
"#,
    )
    .unwrap();
    assert_eq!(c.battery.alpha, 0.1);
    assert_eq!(c.battery.min_observations, 8);
    assert_eq!(c.rolling.window, 252);
}

#[test]
fn invalid_values_are_rejected() {
    let no_tickers = "[data]\nstart_date = \"2015-01-01\"\nend_date = \"2020-01-01\"\n";
    assert!(matches!(StudyConfig::from_toml_str(no_tickers), Err(ConfigError::EmptyTickers)));

    let reversed = "[data]\ntickers = [\"SPY\"]\nstart_date = \"2020-01-01\"\nend_date = \"2015-01-01\"\n";
    assert!(matches!(
        StudyConfig::from_toml_str(reversed),
        Err(ConfigError::InvalidDateRange { .. })
    ));

    let unknown_weight = FULL.replace("TLT = 0.4", "IWM = 0.4");
    assert!(matches!(
        StudyConfig::from_toml_str(&unknown_weight),
        Err(ConfigError::UnknownWeightAsset(a)) if a == "IWM"
    ));

    let small_window = FULL.replace("window = 126", "window = 10");
    assert!(matches!(
        StudyConfig::from_toml_str(&small_window),
        Err(ConfigError::WindowTooSmall { window: 10, min_observations: 20 })
    ));

    let big_trim = FULL.replace("fraction = 0.025", "fraction = 0.5");
    assert!(matches!(
        StudyConfig::from_toml_str(&big_trim),
        Err(ConfigError::InvalidTrimFraction(_))
    ));

    assert!(matches!(StudyConfig::from_toml_str("[data\n"), Err(ConfigError::Parse(_))));
    assert!(matches!(
        StudyConfig::from_toml_str("[data]\ntickers = \"SPY\"\n"),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn from_file_reads_and_validates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("study.toml");
    std::fs::write(&path, FULL).unwrap();
    let c = StudyConfig::from_file(&path).unwrap();
    assert_eq!(c.data.tickers.len(), 3);

    let missing = dir.path().join("missing.toml");
    assert!(matches!(StudyConfig::from_file(&missing), Err(ConfigError::Io { .. })));
}

#[test]
fn run_id_ignores_formatting() {
    let a = StudyConfig::from_toml_str(FULL).unwrap();
    let reformatted = FULL.replace("weights = { SPY = 0.6, TLT = 0.4 }", "weights = { TLT = 0.4, SPY = 0.6 }");
    let b = StudyConfig::from_toml_str(&reformatted).unwrap();
    assert_eq!(a.run_id(), b.run_id());
}
