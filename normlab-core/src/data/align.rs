//! Put several price series on one date axis.
//!
//! The axis is the union of all dates. An asset without a price on a date
//! gets NaN there; nothing is forward-filled, so gaps become NaN returns.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;

use crate::domain::{PriceSeries, PriceTable};

/// Align series into a table. Column order follows `series`.
pub fn align_series(series: &[PriceSeries]) -> PriceTable {
    let dates: Vec<NaiveDate> = series
        .iter()
        .flat_map(|s| s.dates.iter().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut table = PriceTable::new(dates);
    for s in series {
        let by_date: HashMap<NaiveDate, f64> = s.dates.iter().copied().zip(s.prices.iter().copied()).collect();
        let column = table
            .dates
            .iter()
            .map(|d| by_date.get(d).copied().unwrap_or(f64::NAN))
            .collect();
        table.push_column(s.asset.clone(), column);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn missing_dates_are_nan() {
        let spy = PriceSeries::new("SPY", vec![d(2), d(3), d(4)], vec![100.0, 101.0, 102.0]);
        let qqq = PriceSeries::new("QQQ", vec![d(2), d(4)], vec![200.0, 202.0]);
        let t = align_series(&[spy, qqq]);

        assert_eq!(t.dates, vec![d(2), d(3), d(4)]);
        assert_eq!(t.assets, vec!["SPY", "QQQ"]);
        assert_eq!(t.column("SPY").unwrap()[1], 101.0);
        assert!(t.column("QQQ").unwrap()[1].is_nan());
        assert_eq!(t.column("QQQ").unwrap()[2], 202.0);
    }

    #[test]
    fn union_covers_disjoint_histories() {
        let a = PriceSeries::new("A", vec![d(2)], vec![1.0]);
        let b = PriceSeries::new("B", vec![d(5)], vec![2.0]);
        let t = align_series(&[a, b]);
        assert_eq!(t.len(), 2);
        assert!(t.column("A").unwrap()[1].is_nan());
        assert!(t.column("B").unwrap()[0].is_nan());
    }

    #[test]
    fn empty_input_gives_empty_table() {
        let t = align_series(&[]);
        assert!(t.is_empty());
        assert_eq!(t.asset_count(), 0);
    }
}
