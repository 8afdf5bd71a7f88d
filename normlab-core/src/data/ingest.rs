//! Bar hygiene between a provider and the rest of the pipeline.
//!
//! Providers may return bars out of order, with repeated dates, or with
//! missing and non-positive closes. Ingest sorts, drops duplicate dates
//! (first occurrence wins) and keeps bad prices as NaN so they turn into NaN
//! returns rather than silently shifting the date axis.

use super::provider::RawBar;
use crate::domain::PriceSeries;

/// What ingest changed or flagged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub input_rows: usize,
    pub duplicates_dropped: usize,
    pub was_unsorted: bool,
    /// Rows kept with a NaN price because the close was missing.
    pub missing_prices: usize,
    /// Rows kept with a NaN price because the close was zero or negative.
    pub non_positive_prices: usize,
}

impl IngestReport {
    pub fn is_clean(&self) -> bool {
        self.duplicates_dropped == 0 && self.missing_prices == 0 && self.non_positive_prices == 0
    }
}

/// Sort and de-duplicate bars.
pub fn clean_bars(mut bars: Vec<RawBar>) -> (Vec<RawBar>, IngestReport) {
    let mut report = IngestReport {
        input_rows: bars.len(),
        was_unsorted: bars.windows(2).any(|w| w[1].date < w[0].date),
        ..IngestReport::default()
    };

    // Stable sort keeps the first occurrence of a date in front.
    bars.sort_by_key(|b| b.date);
    let before = bars.len();
    bars.dedup_by_key(|b| b.date);
    report.duplicates_dropped = before - bars.len();

    for bar in &bars {
        let p = bar.price();
        if p.is_nan() {
            report.missing_prices += 1;
        } else if p <= 0.0 {
            report.non_positive_prices += 1;
        }
    }
    (bars, report)
}

/// Build the price series of one symbol from raw bars.
///
/// Each bar contributes its adjusted close when finite, else its close.
/// Non-positive prices become NaN.
pub fn to_price_series(symbol: &str, bars: Vec<RawBar>) -> (PriceSeries, IngestReport) {
    let (bars, report) = clean_bars(bars);
    if !report.is_clean() {
        tracing::warn!(
            symbol,
            duplicates = report.duplicates_dropped,
            missing = report.missing_prices,
            non_positive = report.non_positive_prices,
            "price data needed cleaning"
        );
    }

    let dates = bars.iter().map(|b| b.date).collect();
    let prices = bars
        .iter()
        .map(|b| {
            let p = b.price();
            if p > 0.0 {
                p
            } else {
                f64::NAN
            }
        })
        .collect();
    (PriceSeries::new(symbol, dates, prices), report)
}
