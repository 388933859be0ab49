//! 工作流层
//!
//! 串起业务能力层与外部客户端，定义单 chunk 的处理流程。

pub mod chunk_flow;

pub use chunk_flow::{ChunkCtx, ChunkFlow};
