//! 抽取历史记录模型
//!
//! 每个 chunk 的输入/输出都会写入历史，供人工校验，也是周期性
//! fine-tuning 的训练语料来源。

use chrono::{DateTime, Utc};

/// 等待人工校验的初始状态
pub const STATUS_PENDING_VALIDATION: &str = "PendingUserValidation";

/// 一条待写入的抽取记录
#[derive(Debug, Clone)]
pub struct NewExtractionRecord {
    pub file_id: i32,
    pub file_name: String,
    pub office_id: i32,
    /// 发送给助手的 chunk 文本
    pub input_text: String,
    /// 助手的原始响应文本
    pub response_text: String,
    pub prompt_used: String,
    pub assistant_id: String,
    pub thread_id: String,
    pub run_id: String,
}

/// 已入库的抽取记录
#[derive(Debug, Clone)]
pub struct ExtractionRecord {
    pub id: u64,
    pub file_id: i32,
    pub file_name: String,
    pub office_id: i32,
    pub input_text: String,
    pub response_text: String,
    pub prompt_used: String,
    pub assistant_id: String,
    pub thread_id: String,
    pub run_id: String,
    pub status: String,
    /// 人工修正后的 JSON，fine-tuning 时优先于原始响应
    pub corrected_json: Option<String>,
    pub validated_by: Option<String>,
    pub validated_at: Option<DateTime<Utc>>,
    pub validation_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ExtractionRecord {
    /// 是否已经过人工校验
    pub fn is_validated(&self) -> bool {
        self.validated_at.is_some()
    }

    /// fine-tuning 训练时使用的最终响应
    pub fn final_response(&self) -> &str {
        match self.corrected_json.as_deref() {
            Some(corrected) if !corrected.is_empty() => corrected,
            _ => &self.response_text,
        }
    }
}
