use crate::models::calendar::TradingDateEntry;
use crate::errors::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Base trait for trading calendar sources
#[async_trait]
pub trait CalendarSource {
    /// Name of the source, used in logs
    fn source_name(&self) -> &'static str;

    /// Fetch the trading status of every calendar day in [start, end]
    /// Returns entries in ascending date order, one per day
    async fn fetch_trade_dates(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<TradingDateEntry>>;
}
