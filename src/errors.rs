use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CalendarError {
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("Invalid period: {0} (expected one of recent, quarter, half_year, year)")]
    InvalidPeriod(String),

    #[error("Invalid stock code: {0}")]
    InvalidCode(String),

    #[error("Ambiguous stock code: {0} (exchange cannot be inferred from the leading digit)")]
    AmbiguousCode(String),

    #[error("No trading day found {direction} {date} within {max_days} days")]
    NoTradingDayFound {
        date: NaiveDate,
        direction: &'static str,
        max_days: u32,
    },

    #[error("Data source error: {0}")]
    DataSource(String),

    #[error("Date {0} is not covered by the calendar cache")]
    NotCovered(NaiveDate),
}

impl CalendarError {
    /// 错误类别，工具边界据此返回结构化失败
    pub fn kind(&self) -> &'static str {
        match self {
            CalendarError::InvalidDate(_) => "invalid_date",
            CalendarError::InvalidRange { .. } => "invalid_range",
            CalendarError::InvalidPeriod(_) => "invalid_period",
            CalendarError::InvalidCode(_) => "invalid_code",
            CalendarError::AmbiguousCode(_) => "ambiguous_code",
            CalendarError::NoTradingDayFound { .. } => "no_trading_day_found",
            CalendarError::DataSource(_) => "data_source",
            CalendarError::NotCovered(_) => "not_covered",
        }
    }
}

pub type Result<T> = std::result::Result<T, CalendarError>;

// 超时、连接失败和响应体解码失败都归为数据源错误
impl From<reqwest::Error> for CalendarError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            CalendarError::DataSource(format!("request timed out: {}", e))
        } else {
            CalendarError::DataSource(format!("HTTP request error: {}", e))
        }
    }
}

impl From<serde_json::Error> for CalendarError {
    fn from(e: serde_json::Error) -> Self {
        CalendarError::DataSource(format!("JSON parsing error: {}", e))
    }
}

/// 工具调用失败时返回给调用方的结构
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ToolFailure {
    pub kind: &'static str,
    pub message: String,
}

impl From<&CalendarError> for ToolFailure {
    fn from(e: &CalendarError) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}
