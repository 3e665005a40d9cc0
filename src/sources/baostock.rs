use crate::config::Config;
use crate::errors::{Result, CalendarError};
use crate::models::calendar::{validate_coverage, TradingDateEntry};
use crate::sources::base::CalendarSource;
use crate::util::{format_date, parse_date};
use async_trait::async_trait;
use chrono::NaiveDate;
use log::{debug, info, warn};
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Baostock 结果集
#[derive(Debug, Deserialize)]
struct ResultSet {
    error_code: String,
    #[serde(default)]
    error_msg: String,
    #[serde(default)]
    fields: Vec<String>,
    #[serde(default)]
    data: Vec<Vec<String>>,
}

/// 通过 HTTP 网关访问 Baostock 交易日历
pub struct BaostockSource {
    client: Client,
    base_url: String,
    request_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl BaostockSource {
    /// 创建新的 Baostock 日历源
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            request_interval: config.request_interval,
            last_request: Mutex::new(None),
        })
    }

    /// 等待请求频率限制
    async fn wait_for_rate_limit(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(time) = *last {
            let elapsed = time.elapsed();
            if elapsed < self.request_interval {
                let wait_time = self.request_interval - elapsed;
                debug!("等待 {:?} 以遵守频率限制", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }

    /// 把结果集行解析为交易日记录
    fn parse_rows(result: &ResultSet) -> Result<Vec<TradingDateEntry>> {
        if result.fields.is_empty() && result.data.iter().all(|row| row.len() < 2) {
            return Err(CalendarError::DataSource("result set has no usable columns".to_string()));
        }

        // 按字段名定位列，找不到时退回首列/末列
        let width = result.data.first().map(|row| row.len()).unwrap_or(result.fields.len());
        let day_col = result.fields.iter().position(|f| f == "calendar_date").unwrap_or(0);
        let flag_col = result
            .fields
            .iter()
            .position(|f| f == "is_trading_day")
            .unwrap_or(width.saturating_sub(1));

        if day_col == flag_col {
            return Err(CalendarError::DataSource(format!(
                "cannot locate date and flag columns in fields {:?}",
                result.fields
            )));
        }

        let mut entries = Vec::with_capacity(result.data.len());
        for row in &result.data {
            let (day, flag) = match (row.get(day_col), row.get(flag_col)) {
                (Some(day), Some(flag)) => (day, flag),
                _ => {
                    return Err(CalendarError::DataSource(format!("malformed row: {:?}", row)));
                }
            };

            let date = parse_date(day)
                .map_err(|_| CalendarError::DataSource(format!("malformed calendar date: {}", day)))?;
            let is_trading = match flag.trim() {
                "1" => true,
                "0" => false,
                other => {
                    return Err(CalendarError::DataSource(format!(
                        "unknown trading flag {} for {}",
                        other, day
                    )));
                }
            };

            entries.push(TradingDateEntry::new(date, is_trading));
        }

        Ok(entries)
    }
}

#[async_trait]
impl CalendarSource for BaostockSource {
    fn source_name(&self) -> &'static str {
        "baostock"
    }

    async fn fetch_trade_dates(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<TradingDateEntry>> {
        if start > end {
            return Err(CalendarError::InvalidRange { start, end });
        }

        let start_str = format_date(start);
        let end_str = format_date(end);
        info!("正在获取交易日，从 {} 到 {}", start_str, end_str);

        // 限制请求频率
        self.wait_for_rate_limit().await;

        let response = self.client
            .get(format!("{}/query_trade_dates", self.base_url))
            .query(&[
                ("start_date", start_str.as_str()),
                ("end_date", end_str.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CalendarError::DataSource(format!(
                "trade dates request failed: HTTP status {}",
                response.status()
            )));
        }

        let text = response.text().await?;
        let result: ResultSet = serde_json::from_str(&text)?;

        if result.error_code != "0" {
            warn!("Baostock API 错误 (交易日): {} (错误码: {})", result.error_msg, result.error_code);
            return Err(CalendarError::DataSource(format!(
                "Baostock error {}: {}",
                result.error_code, result.error_msg
            )));
        }

        if result.data.is_empty() {
            return Err(CalendarError::DataSource(format!(
                "no trade dates returned for {}..{}",
                start_str, end_str
            )));
        }

        let entries = Self::parse_rows(&result)?;
        validate_coverage(start, end, &entries)?;

        info!("已获取 {} 条交易日记录", entries.len());
        Ok(entries)
    }
}
