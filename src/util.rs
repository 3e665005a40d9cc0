use chrono::{Days, Local, NaiveDate, Utc};
use chrono_tz::Tz;
use crate::errors::{Result, CalendarError};

const DATE_FORMAT: &str = "%Y-%m-%d";

// 日期转换工具
pub fn parse_date(date_str: &str) -> Result<NaiveDate> {
    let trimmed = date_str.trim();
    // chrono 接受不补零的月日和超过4位的年份，这里要求严格的 YYYY-MM-DD
    let well_formed = trimmed.len() == 10
        && trimmed.bytes().enumerate().all(|(i, b)| match i {
            4 | 7 => b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !well_formed {
        return Err(CalendarError::InvalidDate(format!(
            "{} (expected YYYY-MM-DD)", date_str
        )));
    }
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .map_err(|e| CalendarError::InvalidDate(format!("{}: {}", date_str, e)))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// 日期偏移，溢出时返回 InvalidDate
pub fn shift_days(date: NaiveDate, days: i64) -> Result<NaiveDate> {
    let shifted = if days >= 0 {
        date.checked_add_days(Days::new(days as u64))
    } else {
        date.checked_sub_days(Days::new(days.unsigned_abs()))
    };
    shifted.ok_or_else(|| {
        CalendarError::InvalidDate(format!("{} shifted by {} days is out of range", date, days))
    })
}

/// 两个日期之间（含端点）的天数
pub fn days_inclusive(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

/// 提供"今天"的时钟
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// 系统时钟，可指定交易所时区
pub struct SystemClock {
    timezone: Option<Tz>,
}

impl SystemClock {
    pub fn new(timezone: Option<Tz>) -> Self {
        Self { timezone }
    }
}

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        match self.timezone {
            Some(tz) => Utc::now().with_timezone(&tz).date_naive(),
            None => Local::now().date_naive(),
        }
    }
}

/// 固定日期时钟
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
