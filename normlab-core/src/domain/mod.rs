//! Domain types: price/return series and aligned multi-asset tables.

pub mod series;
pub mod table;

pub use series::{PriceSeries, ReturnSeries};
pub use table::{AlignedTable, PriceTable, ReturnTable};
