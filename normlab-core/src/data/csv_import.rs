//! Import daily closes from CSV.
//!
//! Expected header: `date,close` with an optional `adj_close` column. Dates
//! are ISO `YYYY-MM-DD`. Empty price cells are read as missing.

use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;

use super::provider::{DataError, DataSource, FetchResult, RawBar};

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: NaiveDate,
    close: Option<f64>,
    #[serde(default)]
    adj_close: Option<f64>,
}

/// Parse CSV bars from any reader.
pub fn read_bars<R: Read>(reader: R) -> Result<Vec<RawBar>, DataError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut bars = Vec::new();
    for (line, row) in rdr.deserialize::<CsvRow>().enumerate() {
        let row = row.map_err(|e| DataError::CsvError(format!("row {}: {e}", line + 1)))?;
        let mut bar = RawBar::close_only(row.date, row.close.unwrap_or(f64::NAN));
        bar.adj_close = row.adj_close.unwrap_or(f64::NAN);
        bars.push(bar);
    }
    Ok(bars)
}

/// Load one symbol's bars from a CSV file.
pub fn import_csv(symbol: &str, path: &Path) -> Result<FetchResult, DataError> {
    let file = std::fs::File::open(path)
        .map_err(|e| DataError::CsvError(format!("cannot open {}: {e}", path.display())))?;
    let bars = read_bars(file)?;
    if bars.is_empty() {
        return Err(DataError::EmptySeries {
            symbol: symbol.to_string(),
        });
    }
    tracing::debug!(symbol, rows = bars.len(), path = %path.display(), "imported csv");
    Ok(FetchResult {
        symbol: symbol.to_string(),
        bars,
        source: DataSource::CsvImport,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_close_only() {
        let data = "date,close\n2024-01-02,100.5\n2024-01-03,101\n";
        let bars = read_bars(data.as_bytes()).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1].close, 101.0);
        assert!(bars[1].adj_close.is_nan());
        assert_eq!(bars[1].price(), 101.0);
    }

    #[test]
    fn reads_adjusted_close_and_blanks() {
        let data = "date,close,adj_close\n2024-01-02,100,99\n2024-01-03,,\n";
        let bars = read_bars(data.as_bytes()).unwrap();
        assert_eq!(bars[0].price(), 99.0);
        assert!(bars[1].price().is_nan());
    }

    #[test]
    fn bad_date_is_an_error() {
        let data = "date,close\n02/01/2024,100\n";
        let err = read_bars(data.as_bytes()).unwrap_err();
        assert!(matches!(err, DataError::CsvError(_)));
    }
}
