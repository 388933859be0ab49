//! 调度层
//!
//! 文档级入口与分批并行调度，在工作流层之上合并结果。

pub mod batch_processor;
pub mod document_processor;

pub use batch_processor::{consolidate, BatchProcessor, Consolidated, ConsolidationError};
pub use document_processor::DocumentProcessor;
