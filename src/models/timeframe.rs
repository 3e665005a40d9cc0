use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::errors::CalendarError;

/// 分析周期
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Recent,
    Quarter,
    HalfYear,
    Year,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Recent => "recent",
            Period::Quarter => "quarter",
            Period::HalfYear => "half_year",
            Period::Year => "year",
        }
    }

    /// 按自然月回溯的月数，recent 按天数回溯
    pub fn months_back(&self) -> Option<u32> {
        match self {
            Period::Recent => None,
            Period::Quarter => Some(3),
            Period::HalfYear => Some(6),
            Period::Year => Some(12),
        }
    }
}

impl FromStr for Period {
    type Err = CalendarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "recent" => Ok(Period::Recent),
            "quarter" => Ok(Period::Quarter),
            "half_year" => Ok(Period::HalfYear),
            "year" => Ok(Period::Year),
            other => Err(CalendarError::InvalidPeriod(other.to_string())),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 市场分析时间范围
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Timeframe {
    pub label: Period,
    pub anchor_date: NaiveDate,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Timeframe {
    /// 中文月份区间描述，例如 "2024年3月-6月"、"2023年12月-2024年6月"
    pub fn range_label(&self) -> String {
        let (start, end) = (self.start_date, self.end_date);
        if start.year() != end.year() {
            format!("{}年{}月-{}年{}月", start.year(), start.month(), end.year(), end.month())
        } else if start.month() != end.month() {
            format!("{}年{}月-{}月", start.year(), start.month(), end.month())
        } else {
            format!("{}年{}月", start.year(), start.month())
        }
    }
}
