pub mod calendar;
pub mod stock;
pub mod timeframe;
