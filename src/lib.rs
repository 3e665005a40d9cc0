// 公开导出的模块，供外部使用
pub mod models;
pub mod errors;
pub mod config;
pub mod calendar;
pub mod sources;
pub mod services;
pub mod normalizer;
pub mod util;

// 重新导出常用类型，方便使用
pub use models::calendar::{TradingDateEntry, CalendarCacheRange};
pub use models::stock::{Exchange, NormalizedCode};
pub use models::timeframe::{Period, Timeframe};
pub use calendar::cache::CalendarCache;
pub use calendar::resolver::TradingDayResolver;
pub use calendar::timeframe::TimeframeDeriver;
pub use services::calendar_service::CalendarService;
pub use sources::base::CalendarSource;
pub use config::Config;
pub use errors::{Result, CalendarError, ToolFailure};
