//! 流水线结果模型
//!
//! `ChunkOutcome` 是单个 chunk 的处理结果，由分批调度器收集后按原始
//! 下标排序合并；`ProcessFileResult` 是整份文档处理完成后返回给调用方
//! 的统一信封，字段名沿用原始接口（PascalCase）。

use std::collections::HashMap;

use serde::Serialize;

use crate::models::transaction::FlatTransaction;

/// 命名子步骤 → 耗时（秒）
pub type TimingMap = HashMap<String, f64>;

/// 单个 chunk 的处理结果
///
/// 不变量：`success == false` 时 `transactions` 为空且 `error` 非空。
/// 通过 `ok` / `failed` 构造函数保证，不要手工拼字段。
#[derive(Debug, Clone)]
pub struct ChunkOutcome {
    /// 文档内的 chunk 下标（0 起，按切分顺序稳定分配）
    pub index: usize,
    /// 该 chunk 解析、分组、展平后的交易行
    pub transactions: Vec<FlatTransaction>,
    pub timing: TimingMap,
    pub success: bool,
    pub error: Option<String>,
}

impl ChunkOutcome {
    pub fn ok(index: usize, transactions: Vec<FlatTransaction>, timing: TimingMap) -> Self {
        Self {
            index,
            transactions,
            timing,
            success: true,
            error: None,
        }
    }

    pub fn failed(index: usize, error: String, timing: TimingMap) -> Self {
        Self {
            index,
            transactions: Vec::new(),
            timing,
            success: false,
            error: Some(error),
        }
    }
}

/// 文档处理成功时的结果载荷
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProcessSummary {
    pub assistant_id: String,
    pub chunks_processed: usize,
    pub total_transactions: usize,
    #[serde(rename = "TransaccionesAplanadas")]
    pub flattened_transactions: Vec<FlatTransaction>,
}

/// 整份文档的处理结果信封
///
/// 失败时：`error` 形如 `"Error procesando chunk N: <detail>"`（N 为 1 起），
/// `total_seconds` 为 -1，`result` 为空，`chunk_timings` 只包含按下标顺序
/// 处理到失败 chunk 为止的计时。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProcessFileResult {
    pub success: bool,
    pub error: Option<String>,
    pub total_seconds: i64,
    pub result: Option<ProcessSummary>,
    pub timings: TimingMap,
    pub chunk_timings: Vec<TimingMap>,
}

impl ProcessFileResult {
    pub fn failure(
        error: impl Into<String>,
        timings: TimingMap,
        chunk_timings: Vec<TimingMap>,
    ) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            total_seconds: -1,
            result: None,
            timings,
            chunk_timings,
        }
    }
}
