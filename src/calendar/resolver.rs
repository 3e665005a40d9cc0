use crate::calendar::cache::CalendarCache;
use crate::config::Config;
use crate::errors::{Result, CalendarError};
use crate::util::{shift_days, Clock};
use chrono::NaiveDate;
use log::{debug, info, warn};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Backward,
    Forward,
}

impl Direction {
    fn step(&self) -> i64 {
        match self {
            Direction::Backward => -1,
            Direction::Forward => 1,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Direction::Backward => "before",
            Direction::Forward => "after",
        }
    }
}

/// 逐级扩大的搜索窗口，最后一个窗口等于 max_days
pub(crate) fn search_windows(initial: u32, factor: u32, max_days: u32) -> Vec<u32> {
    let max_days = max_days.max(1);
    let factor = factor.max(2);
    let mut window = initial.clamp(1, max_days);
    let mut windows = vec![window];
    while window < max_days {
        window = window.saturating_mul(factor).min(max_days);
        windows.push(window);
    }
    windows
}

/// 交易日解析器
pub struct TradingDayResolver {
    cache: Arc<CalendarCache>,
    clock: Arc<dyn Clock>,
    lookaround_days: u32,
    search_windows: Vec<u32>,
    max_search_days: u32,
}

impl TradingDayResolver {
    pub fn new(cache: Arc<CalendarCache>, clock: Arc<dyn Clock>, config: &Config) -> Self {
        Self {
            cache,
            clock,
            lookaround_days: config.lookaround_days,
            search_windows: search_windows(
                config.initial_search_window_days,
                config.window_growth_factor,
                config.max_search_days,
            ),
            max_search_days: config.max_search_days.max(1),
        }
    }

    pub fn cache(&self) -> &Arc<CalendarCache> {
        &self.cache
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub async fn is_trading_day(&self, date: NaiveDate) -> Result<bool> {
        // 顺带缓存前后几天，供后续查询复用
        let look = self.lookaround_days as i64;
        let start = shift_days(date, -look)?;
        let end = shift_days(date, look)?;
        match self.cache.ensure_covered(start, end).await {
            Ok(()) => {}
            // 数据源可能尚未发布前后几天（如年末的次年日历），退回只查当天
            Err(CalendarError::DataSource(reason)) => {
                warn!("预取 {}..{} 失败，改为只查询 {}: {}", start, end, date, reason);
                self.cache.ensure_covered(date, date).await?;
            }
            Err(e) => return Err(e),
        }
        Ok(self.cache.lookup(date)?.is_trading)
    }

    /// 严格早于 date 的最近交易日
    pub async fn previous_trading_day(&self, date: NaiveDate) -> Result<NaiveDate> {
        self.search(date, Direction::Backward).await
    }

    /// 严格晚于 date 的最近交易日
    pub async fn next_trading_day(&self, date: NaiveDate) -> Result<NaiveDate> {
        self.search(date, Direction::Forward).await
    }

    /// 今天是交易日则返回今天，否则返回上一个交易日
    pub async fn latest_trading_date(&self) -> Result<NaiveDate> {
        let today = self.clock.today();
        let latest = if self.is_trading_day(today).await? {
            today
        } else {
            self.previous_trading_day(today).await?
        };
        info!("找到最新交易日: {} (今天 {})", latest, today);
        Ok(latest)
    }

    async fn search(&self, date: NaiveDate, direction: Direction) -> Result<NaiveDate> {
        let step = direction.step();
        let mut scanned = 0u32;

        for &window in &self.search_windows {
            let near = shift_days(date, step)?;
            let far = shift_days(date, step * window as i64)?;
            let (lo, hi) = if near <= far { (near, far) } else { (far, near) };
            self.cache.ensure_covered(lo, hi).await?;

            for offset in (scanned + 1)..=window {
                let day = shift_days(date, step * offset as i64)?;
                if self.cache.lookup(day)?.is_trading {
                    debug!("Trading day {} {}: {}", direction.label(), date, day);
                    return Ok(day);
                }
            }

            debug!("No trading day within {} days {} {}, widening", window, direction.label(), date);
            scanned = window;
        }

        Err(CalendarError::NoTradingDayFound {
            date,
            direction: direction.label(),
            max_days: self.max_search_days,
        })
    }
}
