use chrono::NaiveDate;
use serde::Serialize;

use crate::errors::{Result, CalendarError};
use crate::util::days_inclusive;

/// 单日交易状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TradingDateEntry {
    pub date: NaiveDate,
    pub is_trading: bool,
}

impl TradingDateEntry {
    pub fn new(date: NaiveDate, is_trading: bool) -> Self {
        Self { date, is_trading }
    }
}

/// 连续覆盖 [start, end] 每一天的交易日历片段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarCacheRange {
    start: NaiveDate,
    end: NaiveDate,
    entries: Vec<TradingDateEntry>,
}

impl CalendarCacheRange {
    /// 校验 entries 恰好逐日覆盖 [start, end]
    pub fn new(start: NaiveDate, end: NaiveDate, entries: Vec<TradingDateEntry>) -> Result<Self> {
        validate_coverage(start, end, &entries)?;
        Ok(Self { start, end, entries })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn entries(&self) -> &[TradingDateEntry] {
        &self.entries
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn get(&self, date: NaiveDate) -> Option<&TradingDateEntry> {
        if !self.contains(date) {
            return None;
        }
        self.entries.get((date - self.start).num_days() as usize)
    }

    /// 相交或首尾相接
    pub fn touches(&self, other: &CalendarCacheRange) -> bool {
        let after_end = self.end.succ_opt();
        other.start <= after_end.unwrap_or(self.end) && self.start <= other.end.succ_opt().unwrap_or(other.end)
    }

    /// 合并另一个相交或相邻且起点不早于本片段的片段
    pub(crate) fn absorb(&mut self, other: CalendarCacheRange) {
        if other.end <= self.end {
            return;
        }
        self.entries
            .extend(other.entries.into_iter().filter(|e| e.date > self.end));
        self.end = other.end;
    }
}

/// 检查数据源返回的记录是否按日期升序、无缺口、无重复地覆盖整个区间
pub fn validate_coverage(start: NaiveDate, end: NaiveDate, entries: &[TradingDateEntry]) -> Result<()> {
    if start > end {
        return Err(CalendarError::InvalidRange { start, end });
    }
    let expected = days_inclusive(start, end) as usize;
    if entries.len() != expected {
        return Err(CalendarError::DataSource(format!(
            "expected {} calendar days for {}..{}, got {}",
            expected, start, end, entries.len()
        )));
    }
    let mut day = start;
    for entry in entries {
        if entry.date != day {
            return Err(CalendarError::DataSource(format!(
                "calendar out of order or with gaps: expected {}, got {}",
                day, entry.date
            )));
        }
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    Ok(())
}
