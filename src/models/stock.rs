use serde::{Serialize, Serializer};
use std::fmt;

/// 交易所
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Exchange {
    /// 上海证券交易所
    Sh,
    /// 深圳证券交易所
    Sz,
    /// 北京证券交易所
    Bj,
}

impl Exchange {
    pub fn prefix(&self) -> &'static str {
        match self {
            Exchange::Sh => "sh",
            Exchange::Sz => "sz",
            Exchange::Bj => "bj",
        }
    }

    /// 按小写交易所标记查找（前缀和后缀共用）
    pub fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            "sh" => Some(Exchange::Sh),
            "sz" => Some(Exchange::Sz),
            "bj" => Some(Exchange::Bj),
            _ => None,
        }
    }
}

/// 规范化后的股票代码，形如 sh.600000
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedCode {
    exchange: Exchange,
    digits: String,
}

impl NormalizedCode {
    // 只能由规范化器构造
    pub(crate) fn new(exchange: Exchange, digits: &str) -> Self {
        Self {
            exchange,
            digits: digits.to_string(),
        }
    }

    pub fn exchange(&self) -> Exchange {
        self.exchange
    }

    pub fn exchange_prefix(&self) -> &'static str {
        self.exchange.prefix()
    }

    pub fn digits(&self) -> &str {
        &self.digits
    }
}

impl fmt::Display for NormalizedCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.exchange.prefix(), self.digits)
    }
}

impl Serialize for NormalizedCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
