//! 单 chunk 处理流程 - 工作流层
//!
//! 一个 chunk 的完整生命周期：交给助手抽取 → 写入抽取历史（并投递
//! fine-tuning 检查）→ 解析响应 → 按支票号分组并展平。每个子步骤
//! 单独计时，任何一步失败都把该 chunk 标记为失败，错误在调度层
//! 合并时才决定整份文档的命运。

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info};

use crate::clients::ExtractionClient;
use crate::models::{ChunkOutcome, NewExtractionRecord, TimingMap};
use crate::services::fine_tuning::FineTuningTrigger;
use crate::services::history_store::HistoryStore;
use crate::services::response_parser::parse_transactions;
use crate::services::grouper::group_and_flatten;
use crate::utils::truncate_text;

/// 单个 chunk 的处理上下文
#[derive(Debug, Clone)]
pub struct ChunkCtx {
    /// 文档内下标（0 起）
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub office_id: i32,
    pub file_id: i32,
    pub file_name: String,
}

/// chunk 工作流：抽取 → 记录历史 → 解析 → 分组展平
pub struct ChunkFlow {
    extraction: Arc<dyn ExtractionClient>,
    history: Arc<dyn HistoryStore>,
    fine_tuning: Arc<FineTuningTrigger>,
}

impl ChunkFlow {
    pub fn new(
        extraction: Arc<dyn ExtractionClient>,
        history: Arc<dyn HistoryStore>,
        fine_tuning: Arc<FineTuningTrigger>,
    ) -> Self {
        Self {
            extraction,
            history,
            fine_tuning,
        }
    }

    /// 处理一个 chunk，永不 panic，失败以 `ChunkOutcome::failed` 返回
    pub async fn run(
        &self,
        chunk: &str,
        assistant_id: &str,
        prompt: &str,
        ctx: &ChunkCtx,
    ) -> ChunkOutcome {
        let mut timing = TimingMap::new();
        let position = ctx.chunk_index + 1;

        info!("📄 处理 chunk {}/{}", position, ctx.total_chunks);
        debug!("chunk 预览: {}", truncate_text(chunk, 120));

        // 1. 助手抽取
        let step = Instant::now();
        let response = match self
            .extraction
            .process_chunk(assistant_id, chunk, prompt)
            .await
        {
            Ok(response) => {
                timing.insert(
                    "ProcesarChunkConAsistente".to_string(),
                    step.elapsed().as_secs_f64(),
                );
                response
            }
            Err(e) => {
                error!("❌ chunk {} 抽取失败: {}", position, e);
                timing.insert("Error".to_string(), step.elapsed().as_secs_f64());
                return ChunkOutcome::failed(ctx.chunk_index, e.to_string(), timing);
            }
        };

        // 2. 写入抽取历史，成功后投递 fine-tuning 检查
        let step = Instant::now();
        let record = NewExtractionRecord {
            file_id: ctx.file_id,
            file_name: ctx.file_name.clone(),
            office_id: ctx.office_id,
            input_text: chunk.to_string(),
            response_text: response.raw_text.clone(),
            prompt_used: prompt.to_string(),
            assistant_id: assistant_id.to_string(),
            thread_id: response.thread_id.clone(),
            run_id: response.run_id.clone(),
        };
        if let Err(e) = self.history.record_extraction(record).await {
            error!("❌ chunk {} 历史写入失败: {}", position, e);
            timing.insert("Error".to_string(), step.elapsed().as_secs_f64());
            return ChunkOutcome::failed(ctx.chunk_index, e.to_string(), timing);
        }
        timing.insert(
            "AlmacenarExtraccionParaValidacion".to_string(),
            step.elapsed().as_secs_f64(),
        );
        self.fine_tuning.enqueue(ctx.office_id);

        // 3. 解析响应并分组展平
        let step = Instant::now();
        let transactions = match parse_transactions(&response.raw_text) {
            Ok(raw) => group_and_flatten(&raw),
            Err(e) => {
                error!("❌ chunk {} 解析失败: {}", position, e);
                timing.insert("Error".to_string(), step.elapsed().as_secs_f64());
                return ChunkOutcome::failed(ctx.chunk_index, e.to_string(), timing);
            }
        };
        timing.insert(
            "ExtraerTransaccionesDeRespuesta".to_string(),
            step.elapsed().as_secs_f64(),
        );

        let total: f64 = timing.values().sum();
        info!(
            "✅ chunk {} 完成，耗时 {:.2}s，{} 条交易行",
            position,
            total,
            transactions.len()
        );

        ChunkOutcome::ok(ctx.chunk_index, transactions, timing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{ChunkResponse, FineTuningClient};
    use crate::error::{AppResult, CollaboratorError};
    use crate::services::history_store::InMemoryHistoryStore;
    use async_trait::async_trait;

    struct CannedClient {
        reply: Option<String>,
    }

    #[async_trait]
    impl ExtractionClient for CannedClient {
        async fn process_chunk(
            &self,
            _assistant_id: &str,
            _chunk_text: &str,
            _prompt_text: &str,
        ) -> AppResult<ChunkResponse> {
            match &self.reply {
                Some(text) => Ok(ChunkResponse {
                    raw_text: text.clone(),
                    run_id: "run_1".to_string(),
                    thread_id: "thread_1".to_string(),
                }),
                None => Err(CollaboratorError::EmptyResponse.into()),
            }
        }
    }

    struct NoopFineTuning;

    #[async_trait]
    impl FineTuningClient for NoopFineTuning {
        async fn upload_training_file(
            &self,
            _content: Vec<u8>,
            _file_name: &str,
        ) -> AppResult<String> {
            Ok("file".to_string())
        }

        async fn create_job(&self, _file_id: &str, _office_id: i32) -> AppResult<String> {
            Ok("job".to_string())
        }
    }

    fn ctx() -> ChunkCtx {
        ChunkCtx {
            chunk_index: 0,
            total_chunks: 1,
            office_id: 7,
            file_id: 0,
            file_name: "remesa.txt".to_string(),
        }
    }

    fn flow(reply: Option<&str>, history: Arc<InMemoryHistoryStore>) -> ChunkFlow {
        let trigger = Arc::new(FineTuningTrigger::spawn(
            history.clone(),
            Arc::new(NoopFineTuning),
            50,
        ));
        ChunkFlow::new(
            Arc::new(CannedClient {
                reply: reply.map(|s| s.to_string()),
            }),
            history,
            trigger,
        )
    }

    #[tokio::test]
    async fn test_successful_chunk_records_history() {
        let history = Arc::new(InMemoryHistoryStore::new());
        let flow = flow(
            Some("```json\n[{\"check_number\": \"1001\", \"posted_amount\": 25.0}]\n```"),
            history.clone(),
        );

        let outcome = flow.run("pagina 1", "asst_1", "prompt", &ctx()).await;

        assert!(outcome.success);
        // 头 + 明细各一行
        assert_eq!(outcome.transactions.len(), 2);
        assert!(outcome.timing.contains_key("ProcesarChunkConAsistente"));
        assert!(outcome.timing.contains_key("ExtraerTransaccionesDeRespuesta"));
        assert_eq!(history.len().await, 1);
    }

    #[tokio::test]
    async fn test_extraction_failure_marks_chunk_failed() {
        let history = Arc::new(InMemoryHistoryStore::new());
        let flow = flow(None, history.clone());

        let outcome = flow.run("pagina 1", "asst_1", "prompt", &ctx()).await;

        assert!(!outcome.success);
        assert!(outcome.transactions.is_empty());
        assert!(outcome.timing.contains_key("Error"));
        assert!(history.is_empty().await);
    }

    #[tokio::test]
    async fn test_parse_failure_still_records_history() {
        let history = Arc::new(InMemoryHistoryStore::new());
        let flow = flow(Some("esto no es JSON"), history.clone());

        let outcome = flow.run("pagina 1", "asst_1", "prompt", &ctx()).await;

        assert!(!outcome.success);
        assert!(outcome.error.is_some());
        // 历史在解析之前已经写入
        assert_eq!(history.len().await, 1);
    }
}
