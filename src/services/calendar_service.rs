use crate::calendar::cache::CalendarCache;
use crate::calendar::resolver::TradingDayResolver;
use crate::calendar::timeframe::TimeframeDeriver;
use crate::config::Config;
use crate::errors::{CalendarError, Result};
use crate::models::calendar::TradingDateEntry;
use crate::models::timeframe::Timeframe;
use crate::normalizer;
use crate::sources::baostock::BaostockSource;
use crate::sources::base::CalendarSource;
use crate::util::{format_date, parse_date, Clock, SystemClock};
use log::info;
use std::sync::Arc;

/// get_trade_dates 未给出起始日期时使用
pub const DEFAULT_TRADE_DATES_START: &str = "2015-01-01";

/// 日期与代码工具服务，对外以 "YYYY-MM-DD" 字符串收发日期
pub struct CalendarService {
    resolver: Arc<TradingDayResolver>,
    timeframes: TimeframeDeriver,
}

impl CalendarService {
    /// 创建服务实例，缓存随服务一起创建和释放
    pub fn new(config: &Config, source: Arc<dyn CalendarSource + Send + Sync>, clock: Arc<dyn Clock>) -> Self {
        let cache = Arc::new(CalendarCache::new(source));
        let resolver = Arc::new(TradingDayResolver::new(cache, clock, config));
        let timeframes = TimeframeDeriver::new(resolver.clone(), config);
        Self { resolver, timeframes }
    }

    /// 使用 Baostock 数据源和系统时钟
    pub fn with_baostock(config: &Config) -> Result<Self> {
        let source = Arc::new(BaostockSource::new(config)?);
        let clock = Arc::new(SystemClock::new(config.timezone));
        Ok(Self::new(config, source, clock))
    }

    pub fn resolver(&self) -> &Arc<TradingDayResolver> {
        &self.resolver
    }

    pub async fn get_latest_trading_date(&self) -> Result<String> {
        info!("工具 'get_latest_trading_date' 已调用");
        let date = self.resolver.latest_trading_date().await?;
        Ok(format_date(date))
    }

    pub async fn is_trading_day(&self, date: &str) -> Result<bool> {
        info!("工具 'is_trading_day' 已调用 date={}", date);
        let date = parse_date(date)?;
        self.resolver.is_trading_day(date).await
    }

    pub async fn previous_trading_day(&self, date: &str) -> Result<String> {
        info!("工具 'previous_trading_day' 已调用 date={}", date);
        let date = parse_date(date)?;
        let previous = self.resolver.previous_trading_day(date).await?;
        Ok(format_date(previous))
    }

    pub async fn next_trading_day(&self, date: &str) -> Result<String> {
        info!("工具 'next_trading_day' 已调用 date={}", date);
        let date = parse_date(date)?;
        let next = self.resolver.next_trading_day(date).await?;
        Ok(format_date(next))
    }

    /// [start, end] 内逐日交易状态，start 缺省为 2015-01-01，end 缺省为今天
    pub async fn get_trade_dates(&self, start: Option<&str>, end: Option<&str>) -> Result<Vec<TradingDateEntry>> {
        info!(
            "工具 'get_trade_dates' 已为范围 {} 到 {} 调用",
            start.unwrap_or("默认"),
            end.unwrap_or("默认")
        );
        let start = parse_date(start.unwrap_or(DEFAULT_TRADE_DATES_START))?;
        let end = match end {
            Some(end) => parse_date(end)?,
            None => self.resolver.today(),
        };
        if start > end {
            return Err(CalendarError::InvalidRange { start, end });
        }

        let cache = self.resolver.cache();
        cache.ensure_covered(start, end).await?;
        let entries = cache.entries_between(start, end)?;
        info!("已成功检索 {} 天的交易日历", entries.len());
        Ok(entries)
    }

    /// period 缺省时为 "recent"
    pub async fn get_market_analysis_timeframe(&self, period: Option<&str>) -> Result<Timeframe> {
        let period = period.unwrap_or("recent");
        info!("工具 'get_market_analysis_timeframe' 已调用，周期={}", period);
        self.timeframes.market_analysis_timeframe(period).await
    }

    pub fn normalize_stock_code(&self, code: &str) -> Result<String> {
        info!("工具 'normalize_stock_code' 已使用输入={} 调用", code);
        Ok(normalizer::normalize(code)?.to_string())
    }
}
