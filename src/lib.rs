//! # Extract Transactions
//!
//! 财务文档交易抽取流水线：上传的对账/汇款文档经 OCR 或本地解码
//! 还原成带页标记的文本，按页切分后分批并行交给办公室专属的抽取
//! 助手，响应解析成原始交易记录，按支票号聚合成"头 + 明细"结构，
//! 最终展平成下游落账用的有序行序列。
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 与领域无关的底层构件
//! - `TtlCache` - 带过期时间的并发缓存（助手查询结果）
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个概念
//! - `PageSplitter` - 按页标记切分文档
//! - `parse_transactions` - 从助手响应中还原交易数组
//! - `group_and_flatten` - 按支票号聚合并展平
//! - `AssistantRegistry` - 办公室助手解析与创建
//! - `FineTuningTrigger` - 后台 fine-tuning 触发器
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个 chunk"的完整处理流程
//! - `ChunkCtx` - 上下文封装（chunk 下标 + 文档信息）
//! - `ChunkFlow` - 流程编排（抽取 → 历史 → 解析 → 展平）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 分批并行调度与结果合并
//! - `orchestrator/document_processor` - 整份文档的处理入口
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{ExtractionClient, OcrClient};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::TtlCache;
pub use models::{ChunkOutcome, FlatTransaction, ProcessFileResult, RawTransaction};
pub use orchestrator::{BatchProcessor, DocumentProcessor};
pub use services::{group_and_flatten, parse_transactions, split_pages, AssistantRegistry};
pub use workflow::{ChunkCtx, ChunkFlow};
