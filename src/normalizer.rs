//! 股票代码规范化。
//!
//! 接受 `sh.600000`、`600000.SH`、`600000sh`、`sh600000` 和裸的六位数字，
//! 统一输出 Baostock 使用的 `交易所.代码` 形式。裸代码的交易所由首位数字推断，
//! 推断规则见 [`LEADING_DIGIT_RULES`]。

use crate::errors::{Result, CalendarError};
use crate::models::stock::{Exchange, NormalizedCode};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::RangeInclusive;

/// 首位数字区间到交易所的映射
#[derive(Debug)]
pub struct LeadingDigitRule {
    pub digits: RangeInclusive<u8>,
    pub exchange: Exchange,
}

/// 裸代码推断表，未列出的首位数字（1、5、7）视为无法判断
pub static LEADING_DIGIT_RULES: &[LeadingDigitRule] = &[
    LeadingDigitRule { digits: b'0'..=b'0', exchange: Exchange::Sz },
    LeadingDigitRule { digits: b'2'..=b'3', exchange: Exchange::Sz },
    LeadingDigitRule { digits: b'4'..=b'4', exchange: Exchange::Bj },
    LeadingDigitRule { digits: b'6'..=b'6', exchange: Exchange::Sh },
    LeadingDigitRule { digits: b'8'..=b'8', exchange: Exchange::Bj },
    LeadingDigitRule { digits: b'9'..=b'9', exchange: Exchange::Sh },
];

static CANONICAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([a-z]+)\.([0-9]+)$").unwrap());
static SUFFIXED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([0-9]{6})\.?([a-z]+)$").unwrap());
static PREFIXED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([a-z]+)([0-9]{6})$").unwrap());
static BARE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{6}$").unwrap());

/// 按首位数字推断交易所
pub fn infer_exchange(digits: &str) -> Option<Exchange> {
    let first = *digits.as_bytes().first()?;
    LEADING_DIGIT_RULES
        .iter()
        .find(|rule| rule.digits.contains(&first))
        .map(|rule| rule.exchange)
}

fn exchange_for(marker: &str, input: &str) -> Result<Exchange> {
    Exchange::from_marker(marker).ok_or_else(|| {
        CalendarError::InvalidCode(format!("{} (unknown exchange marker '{}')", input, marker))
    })
}

pub fn normalize(code: &str) -> Result<NormalizedCode> {
    let raw = code.trim().to_lowercase();
    if raw.is_empty() {
        return Err(CalendarError::InvalidCode("empty code".to_string()));
    }

    let normalized = if let Some(caps) = CANONICAL.captures(&raw) {
        let exchange = exchange_for(&caps[1], code)?;
        let digits = &caps[2];
        if digits.len() != 6 {
            return Err(CalendarError::InvalidCode(format!(
                "{} (expected 6 digits, got {})",
                code,
                digits.len()
            )));
        }
        NormalizedCode::new(exchange, digits)
    } else if let Some(caps) = SUFFIXED.captures(&raw) {
        NormalizedCode::new(exchange_for(&caps[2], code)?, &caps[1])
    } else if let Some(caps) = PREFIXED.captures(&raw) {
        NormalizedCode::new(exchange_for(&caps[1], code)?, &caps[2])
    } else if BARE.is_match(&raw) {
        let exchange = infer_exchange(&raw)
            .ok_or_else(|| CalendarError::AmbiguousCode(code.trim().to_string()))?;
        NormalizedCode::new(exchange, &raw)
    } else {
        return Err(CalendarError::InvalidCode(format!(
            "{} (supported forms: sh.600000, 600000, 000001.SZ, sh600000)",
            code
        )));
    };

    debug!("Normalized stock code {} -> {}", code, normalized);
    Ok(normalized)
}
