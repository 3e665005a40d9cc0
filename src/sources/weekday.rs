use crate::errors::{Result, CalendarError};
use crate::models::calendar::TradingDateEntry;
use crate::sources::base::CalendarSource;
use crate::util::parse_date;
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Weekday};
use log::info;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// 离线日历源：周一至周五为交易日，节假日除外
pub struct WeekdayCalendarSource {
    holidays: BTreeSet<NaiveDate>,
}

impl WeekdayCalendarSource {
    pub fn new<I: IntoIterator<Item = NaiveDate>>(holidays: I) -> Self {
        Self {
            holidays: holidays.into_iter().collect(),
        }
    }

    /// 从 JSON 数组文件加载节假日，例如 ["2025-01-01", "2025-01-28"]
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            CalendarError::DataSource(format!("cannot read holiday file {}: {}", path.display(), e))
        })?;
        let raw: Vec<String> = serde_json::from_str(&text)?;

        let mut holidays = BTreeSet::new();
        for day in &raw {
            let date = parse_date(day).map_err(|_| {
                CalendarError::DataSource(format!("invalid holiday {} in {}", day, path.display()))
            })?;
            holidays.insert(date);
        }

        info!("Loaded {} holidays from {}", holidays.len(), path.display());
        Ok(Self { holidays })
    }

    pub fn is_open(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.holidays.contains(&date)
    }
}

#[async_trait]
impl CalendarSource for WeekdayCalendarSource {
    fn source_name(&self) -> &'static str {
        "weekday"
    }

    async fn fetch_trade_dates(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<TradingDateEntry>> {
        if start > end {
            return Err(CalendarError::InvalidRange { start, end });
        }

        Ok(start
            .iter_days()
            .take_while(|d| *d <= end)
            .map(|d| TradingDateEntry::new(d, self.is_open(d)))
            .collect())
    }
}
