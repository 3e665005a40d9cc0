pub mod cache;
pub mod resolver;
pub mod timeframe;
