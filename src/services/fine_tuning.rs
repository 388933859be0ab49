//! Fine-tuning 触发器 - 业务能力层
//!
//! 每个 chunk 处理完（无论成败）都投递一次检查请求。后台 worker
//! 串行消费：已校验记录数是阈值的正整数倍时，把全部已校验记录
//! 渲染成 chat 格式 JSONL，上传并创建 fine-tuning job。
//!
//! 触发器任何失败只记日志，绝不影响主流水线。

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::clients::FineTuningClient;
use crate::error::AppResult;
use crate::models::ExtractionRecord;
use crate::services::history_store::HistoryStore;
use crate::services::prompt_store::DEFAULT_EXTRACTION_PROMPT;

/// 把已校验记录渲染成 chat 格式 JSONL，一行一条
///
/// assistant 消息优先用人工修正后的 JSON。
pub fn render_jsonl(records: &[ExtractionRecord]) -> String {
    records
        .iter()
        .map(|record| {
            json!({
                "messages": [
                    { "role": "system", "content": DEFAULT_EXTRACTION_PROMPT },
                    { "role": "user", "content": record.input_text },
                    { "role": "assistant", "content": record.final_response() },
                ]
            })
            .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// 检查某办公室是否达到 fine-tuning 条件，达到就提交
///
/// 已校验数为 0 或不是阈值的倍数时什么都不做。计数与提交之间
/// 没有互斥，由单 worker 串行消费保证不并发重复提交。
pub async fn eligibility_check(
    history: &dyn HistoryStore,
    client: &dyn FineTuningClient,
    threshold: u64,
    office_id: i32,
) -> AppResult<Option<String>> {
    let validated = history.count_validated(office_id).await?;
    if validated == 0 || validated % threshold != 0 {
        debug!(
            "办公室 {} 已校验 {} 条，未到触发点（每 {} 条）",
            office_id, validated, threshold
        );
        return Ok(None);
    }

    info!(
        "🎯 办公室 {} 已校验 {} 条，开始 fine-tuning 提交",
        office_id, validated
    );

    let records = history.validated_records(office_id).await?;
    let jsonl = render_jsonl(&records);
    let file_name = format!(
        "fine_tuning_office_{}_{}.jsonl",
        office_id,
        Utc::now().format("%Y%m%d%H%M%S")
    );

    let file_id = client
        .upload_training_file(jsonl.into_bytes(), &file_name)
        .await?;
    let job_id = client.create_job(&file_id, office_id).await?;

    info!(
        "🚀 办公室 {} 的 fine-tuning job 已提交: {} ({} 条训练样本)",
        office_id,
        job_id,
        records.len()
    );
    Ok(Some(job_id))
}

/// 后台触发器：主流水线只管投递 office_id
pub struct FineTuningTrigger {
    tx: mpsc::UnboundedSender<i32>,
}

impl FineTuningTrigger {
    /// 启动后台 worker 并返回触发器句柄
    pub fn spawn(
        history: Arc<dyn HistoryStore>,
        client: Arc<dyn FineTuningClient>,
        threshold: u64,
    ) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<i32>();

        tokio::spawn(async move {
            while let Some(office_id) = rx.recv().await {
                match eligibility_check(history.as_ref(), client.as_ref(), threshold, office_id)
                    .await
                {
                    Ok(Some(job_id)) => {
                        info!("✅ fine-tuning job {} 已创建（办公室 {}）", job_id, office_id)
                    }
                    Ok(None) => {}
                    Err(e) => warn!("⚠️ 办公室 {} 的 fine-tuning 检查失败: {}", office_id, e),
                }
            }
        });

        Self { tx }
    }

    /// 投递一次检查请求（尽力而为）
    pub fn enqueue(&self, office_id: i32) {
        if self.tx.send(office_id).is_err() {
            warn!("⚠️ fine-tuning worker 已退出，检查请求被丢弃（办公室 {}）", office_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewExtractionRecord;
    use crate::services::history_store::InMemoryHistoryStore;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingClient {
        uploads: Mutex<Vec<(usize, String)>>,
        jobs: Mutex<Vec<(String, i32)>>,
    }

    #[async_trait::async_trait]
    impl FineTuningClient for RecordingClient {
        async fn upload_training_file(
            &self,
            content: Vec<u8>,
            file_name: &str,
        ) -> AppResult<String> {
            self.uploads
                .lock()
                .unwrap()
                .push((content.len(), file_name.to_string()));
            Ok("file_test".to_string())
        }

        async fn create_job(&self, file_id: &str, office_id: i32) -> AppResult<String> {
            self.jobs
                .lock()
                .unwrap()
                .push((file_id.to_string(), office_id));
            Ok("ftjob_test".to_string())
        }
    }

    fn record(office_id: i32, input: &str, response: &str) -> NewExtractionRecord {
        NewExtractionRecord {
            file_id: 0,
            file_name: "remesa.txt".to_string(),
            office_id,
            input_text: input.to_string(),
            response_text: response.to_string(),
            prompt_used: "prompt".to_string(),
            assistant_id: "asst_1".to_string(),
            thread_id: "thread_1".to_string(),
            run_id: "run_1".to_string(),
        }
    }

    async fn store_with_validated(office_id: i32, count: usize) -> InMemoryHistoryStore {
        let store = InMemoryHistoryStore::new();
        for i in 0..count {
            store
                .record_extraction(record(office_id, &format!("pagina {i}"), "[]"))
                .await
                .unwrap();
        }
        store.mark_validated(office_id, count, "auditor").await;
        store
    }

    #[tokio::test]
    async fn test_below_threshold_does_nothing() {
        let store = store_with_validated(7, 3).await;
        let client = RecordingClient::default();

        let job = eligibility_check(&store, &client, 50, 7).await.unwrap();

        assert!(job.is_none());
        assert!(client.uploads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_validated_does_nothing() {
        let store = InMemoryHistoryStore::new();
        let client = RecordingClient::default();

        let job = eligibility_check(&store, &client, 50, 7).await.unwrap();

        assert!(job.is_none());
        assert!(client.jobs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_exact_multiple_submits_job() {
        let store = store_with_validated(7, 4).await;
        let client = RecordingClient::default();

        let job = eligibility_check(&store, &client, 2, 7).await.unwrap();

        assert_eq!(job.as_deref(), Some("ftjob_test"));
        let uploads = client.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 1);
        assert!(uploads[0].1.starts_with("fine_tuning_office_7_"));
        assert!(uploads[0].1.ends_with(".jsonl"));
        assert_eq!(
            client.jobs.lock().unwrap()[0],
            ("file_test".to_string(), 7)
        );
    }

    #[tokio::test]
    async fn test_render_jsonl_prefers_corrected() {
        let store = store_with_validated(7, 1).await;
        let mut records = store.validated_records(7).await.unwrap();
        records[0].corrected_json = Some("[{\"corregido\":true}]".to_string());

        let jsonl = render_jsonl(&records);

        assert_eq!(jsonl.lines().count(), 1);
        let parsed: serde_json::Value = serde_json::from_str(&jsonl).unwrap();
        let messages = parsed["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[2]["content"], "[{\"corregido\":true}]");
    }

    #[tokio::test]
    async fn test_trigger_worker_consumes_queue() {
        let store = Arc::new(store_with_validated(7, 2).await);
        let client = Arc::new(RecordingClient::default());
        let trigger = FineTuningTrigger::spawn(store, client.clone(), 2);

        trigger.enqueue(7);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(client.jobs.lock().unwrap().len(), 1);
    }
}
