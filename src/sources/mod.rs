pub mod base;
pub mod baostock;
pub mod weekday;
