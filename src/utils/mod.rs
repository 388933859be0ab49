//! 通用工具

pub mod logging;

pub use logging::truncate_text;
