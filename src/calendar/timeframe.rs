use crate::calendar::resolver::TradingDayResolver;
use crate::config::Config;
use crate::errors::{Result, CalendarError};
use crate::models::timeframe::{Period, Timeframe};
use crate::util::shift_days;
use chrono::{Months, NaiveDate};
use log::info;
use std::sync::Arc;

/// 根据周期和最新交易日推导分析时间范围
pub struct TimeframeDeriver {
    resolver: Arc<TradingDayResolver>,
    recent_window_days: u32,
}

impl TimeframeDeriver {
    pub fn new(resolver: Arc<TradingDayResolver>, config: &Config) -> Self {
        Self {
            resolver,
            recent_window_days: config.recent_window_days,
        }
    }

    pub async fn market_analysis_timeframe(&self, period: &str) -> Result<Timeframe> {
        // 先校验周期，非法输入不触发任何数据源请求
        let period: Period = period.parse()?;
        let anchor = self.resolver.latest_trading_date().await?;
        self.derive(period, anchor).await
    }

    /// 以给定锚点推导时间范围
    pub async fn derive(&self, period: Period, anchor: NaiveDate) -> Result<Timeframe> {
        let start_date = match period.months_back() {
            Some(months) => anchor.checked_sub_months(Months::new(months)).ok_or_else(|| {
                CalendarError::InvalidDate(format!("{} minus {} months is out of range", anchor, months))
            })?,
            None => {
                let offset = shift_days(anchor, -(self.recent_window_days as i64))?;
                if self.resolver.is_trading_day(offset).await? {
                    offset
                } else {
                    self.resolver.previous_trading_day(offset).await?
                }
            }
        };

        let timeframe = Timeframe {
            label: period,
            anchor_date: anchor,
            start_date,
            end_date: anchor,
        };
        info!(
            "生成的市场分析时间范围: {} {} (ISO: {} to {})",
            period,
            timeframe.range_label(),
            timeframe.start_date,
            timeframe.end_date
        );
        Ok(timeframe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::cache::CalendarCache;
    use crate::sources::weekday::WeekdayCalendarSource;
    use crate::util::FixedClock;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn deriver_at(today: NaiveDate) -> TimeframeDeriver {
        let mut holidays = vec![ymd(2025, 1, 1)];
        holidays.extend(ymd(2025, 1, 28).iter_days().take(8));
        let cache = Arc::new(CalendarCache::new(Arc::new(WeekdayCalendarSource::new(holidays))));
        let config = Config::new();
        let resolver = Arc::new(TradingDayResolver::new(cache, Arc::new(FixedClock(today)), &config));
        TimeframeDeriver::new(resolver, &config)
    }

    #[tokio::test]
    async fn test_quarter_uses_calendar_months() {
        let deriver = deriver_at(ymd(2024, 6, 15));
        let tf = deriver.derive(Period::Quarter, ymd(2024, 6, 15)).await.unwrap();
        assert_eq!(tf.start_date, ymd(2024, 3, 15));
        assert_eq!(tf.end_date, ymd(2024, 6, 15));
        assert_eq!(tf.anchor_date, ymd(2024, 6, 15));
        assert_eq!(tf.label, Period::Quarter);
    }

    #[tokio::test]
    async fn test_month_subtraction_clamps_day() {
        let deriver = deriver_at(ymd(2024, 8, 31));
        let tf = deriver.derive(Period::HalfYear, ymd(2024, 8, 31)).await.unwrap();
        assert_eq!(tf.start_date, ymd(2024, 2, 29));

        let tf = deriver.derive(Period::Year, ymd(2024, 2, 29)).await.unwrap();
        assert_eq!(tf.start_date, ymd(2023, 2, 28));

        let tf = deriver.derive(Period::Quarter, ymd(2024, 5, 31)).await.unwrap();
        assert_eq!(tf.start_date, ymd(2024, 2, 29));
    }

    #[tokio::test]
    async fn test_recent_lands_on_trading_day() {
        let deriver = deriver_at(ymd(2025, 3, 3));
        // 2月5日减30天为1月6日（周一）
        let tf = deriver.derive(Period::Recent, ymd(2025, 2, 5)).await.unwrap();
        assert_eq!(tf.start_date, ymd(2025, 1, 6));

        // 3月3日减30天为2月1日（春节休市），回退到1月27日
        let tf = deriver.derive(Period::Recent, ymd(2025, 3, 3)).await.unwrap();
        assert_eq!(tf.start_date, ymd(2025, 1, 27));
        assert_eq!(tf.end_date, ymd(2025, 3, 3));
    }

    #[tokio::test]
    async fn test_timeframe_anchored_on_latest_trading_day() {
        // 周六调用，锚点为周五
        let deriver = deriver_at(ymd(2025, 1, 4));
        let tf = deriver.market_analysis_timeframe("quarter").await.unwrap();
        assert_eq!(tf.anchor_date, ymd(2025, 1, 3));
        assert_eq!(tf.start_date, ymd(2024, 10, 3));
        assert_eq!(tf.end_date, ymd(2025, 1, 3));
    }

    #[tokio::test]
    async fn test_unknown_period_rejected() {
        let deriver = deriver_at(ymd(2025, 1, 4));
        let err = deriver.market_analysis_timeframe("decade").await.unwrap_err();
        assert!(matches!(err, CalendarError::InvalidPeriod(_)));
    }
}
