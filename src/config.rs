use chrono_tz::Tz;
use std::time::Duration;

pub struct Config {
    pub base_url: String,
    pub request_timeout: Duration,
    pub request_interval: Duration,
    pub timezone: Option<Tz>,       // None 表示使用系统本地时区
    pub lookaround_days: u32,
    pub initial_search_window_days: u32,
    pub window_growth_factor: u32,
    pub max_search_days: u32,
    pub recent_window_days: u32,
}

impl Config {
    pub fn new() -> Self {
        Self {
            base_url: "http://127.0.0.1:8650".to_string(),
            request_timeout: Duration::from_secs(30),
            request_interval: Duration::from_millis(500),
            timezone: None,
            lookaround_days: 7,
            initial_search_window_days: 30,
            window_growth_factor: 2,
            max_search_days: 366,
            recent_window_days: 30,
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_request_interval(mut self, interval: Duration) -> Self {
        self.request_interval = interval;
        self
    }

    pub fn with_timezone(mut self, tz: Tz) -> Self {
        self.timezone = Some(tz);
        self
    }

    pub fn with_lookaround_days(mut self, days: u32) -> Self {
        self.lookaround_days = days;
        self
    }

    pub fn with_initial_search_window_days(mut self, days: u32) -> Self {
        self.initial_search_window_days = days.max(1);
        self
    }

    // 增长因子小于2时窗口无法扩大
    pub fn with_window_growth_factor(mut self, factor: u32) -> Self {
        self.window_growth_factor = factor.max(2);
        self
    }

    pub fn with_max_search_days(mut self, days: u32) -> Self {
        self.max_search_days = days.max(1);
        self
    }

    pub fn with_recent_window_days(mut self, days: u32) -> Self {
        self.recent_window_days = days;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
