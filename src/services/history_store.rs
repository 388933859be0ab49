//! 抽取历史存储 - 业务能力层
//!
//! 每个 chunk 的输入/输出写入历史，供人工校验和 fine-tuning 使用。
//! 真正的持久化在外部系统；这里只定义接口，附一个内存实现给
//! 二进制入口和测试用。

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::error::AppResult;
use crate::models::{ExtractionRecord, NewExtractionRecord, STATUS_PENDING_VALIDATION};

/// 抽取历史的读写接口
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// 写入一条待校验的抽取记录
    async fn record_extraction(&self, record: NewExtractionRecord) -> AppResult<()>;

    /// 统计某办公室已人工校验的记录数
    async fn count_validated(&self, office_id: i32) -> AppResult<u64>;

    /// 取出某办公室全部已校验记录（fine-tuning 语料）
    async fn validated_records(&self, office_id: i32) -> AppResult<Vec<ExtractionRecord>>;
}

/// 内存实现
#[derive(Default)]
pub struct InMemoryHistoryStore {
    records: Mutex<Vec<ExtractionRecord>>,
    next_id: AtomicU64,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 把某办公室最早的 n 条记录标记为已校验（测试/演示用）
    pub async fn mark_validated(&self, office_id: i32, count: usize, validated_by: &str) {
        let mut records = self.records.lock().await;
        let now = Utc::now();
        for record in records
            .iter_mut()
            .filter(|r| r.office_id == office_id && r.validated_at.is_none())
            .take(count)
        {
            record.status = "Validated".to_string();
            record.validated_by = Some(validated_by.to_string());
            record.validated_at = Some(now);
        }
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn record_extraction(&self, record: NewExtractionRecord) -> AppResult<()> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let stored = ExtractionRecord {
            id,
            file_id: record.file_id,
            file_name: record.file_name,
            office_id: record.office_id,
            input_text: record.input_text,
            response_text: record.response_text,
            prompt_used: record.prompt_used,
            assistant_id: record.assistant_id,
            thread_id: record.thread_id,
            run_id: record.run_id,
            status: STATUS_PENDING_VALIDATION.to_string(),
            corrected_json: None,
            validated_by: None,
            validated_at: None,
            validation_notes: None,
            created_at: Utc::now(),
        };
        self.records.lock().await.push(stored);
        Ok(())
    }

    async fn count_validated(&self, office_id: i32) -> AppResult<u64> {
        let records = self.records.lock().await;
        Ok(records
            .iter()
            .filter(|r| r.office_id == office_id && r.is_validated())
            .count() as u64)
    }

    async fn validated_records(&self, office_id: i32) -> AppResult<Vec<ExtractionRecord>> {
        let records = self.records.lock().await;
        Ok(records
            .iter()
            .filter(|r| r.office_id == office_id && r.is_validated())
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(office_id: i32) -> NewExtractionRecord {
        NewExtractionRecord {
            file_id: 0,
            file_name: "remesa.txt".to_string(),
            office_id,
            input_text: "pagina 1".to_string(),
            response_text: "[]".to_string(),
            prompt_used: "prompt".to_string(),
            assistant_id: "asst_1".to_string(),
            thread_id: "thread_1".to_string(),
            run_id: "run_1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_record_starts_pending() {
        let store = InMemoryHistoryStore::new();
        store.record_extraction(sample(7)).await.unwrap();
        assert_eq!(store.len().await, 1);
        assert_eq!(store.count_validated(7).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_count_validated_per_office() {
        let store = InMemoryHistoryStore::new();
        for _ in 0..3 {
            store.record_extraction(sample(7)).await.unwrap();
        }
        store.record_extraction(sample(8)).await.unwrap();

        store.mark_validated(7, 2, "auditor").await;

        assert_eq!(store.count_validated(7).await.unwrap(), 2);
        assert_eq!(store.count_validated(8).await.unwrap(), 0);
        assert_eq!(store.validated_records(7).await.unwrap().len(), 2);
    }
}
