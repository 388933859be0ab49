//! 分批调度器 - 调度层
//!
//! 把 chunk 序列按 `min(batch_size, total)` 切成批次，批内每个 chunk
//! 一个独立任务并行跑，批与批之间停 100ms 给外部服务喘息（最后一批
//! 之后不停）。单个 chunk 失败不打断其余任务，合并时按原始下标排序，
//! 遇到第一个失败的 chunk 整体判负。

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{info, warn};

use crate::config::Config;
use crate::models::{ChunkOutcome, FlatTransaction, TimingMap};
use crate::workflow::{ChunkCtx, ChunkFlow};

/// 分批调度器
pub struct BatchProcessor {
    flow: Arc<ChunkFlow>,
    batch_size: usize,
    batch_pause: Duration,
    chunk_timeout: Duration,
}

impl BatchProcessor {
    pub fn new(flow: Arc<ChunkFlow>, config: &Config) -> Self {
        Self {
            flow,
            batch_size: config.batch_size,
            batch_pause: Duration::from_millis(config.batch_pause_ms),
            chunk_timeout: Duration::from_secs(config.chunk_timeout_secs),
        }
    }

    /// 覆盖单 chunk 超时（默认来自配置）
    pub fn with_chunk_timeout(mut self, timeout: Duration) -> Self {
        self.chunk_timeout = timeout;
        self
    }

    /// 并行处理全部 chunk，返回每个 chunk 的结果（未排序）
    pub async fn process_all(
        &self,
        chunks: &[String],
        assistant_id: &str,
        prompt: &str,
        office_id: i32,
        file_id: i32,
        file_name: &str,
    ) -> Vec<ChunkOutcome> {
        let total = chunks.len();
        if total == 0 {
            return Vec::new();
        }

        let batch_size = self.batch_size.min(total).max(1);
        let batch_count = total.div_ceil(batch_size);
        let assistant_id: Arc<str> = assistant_id.into();
        let prompt: Arc<str> = prompt.into();
        let file_name: Arc<str> = file_name.into();

        info!("🚀 开始并行处理 {} 个 chunk（每批 {} 个）", total, batch_size);

        let mut outcomes = Vec::with_capacity(total);

        for (batch_no, batch) in chunks.chunks(batch_size).enumerate() {
            let start = batch_no * batch_size;
            info!(
                "📦 处理批次 {}/{}: chunks {}-{}",
                batch_no + 1,
                batch_count,
                start + 1,
                start + batch.len()
            );

            let mut handles = Vec::with_capacity(batch.len());
            for (local, chunk) in batch.iter().enumerate() {
                let flow = self.flow.clone();
                let chunk = chunk.clone();
                let assistant_id = assistant_id.clone();
                let prompt = prompt.clone();
                let ctx = ChunkCtx {
                    chunk_index: start + local,
                    total_chunks: total,
                    office_id,
                    file_id,
                    file_name: file_name.to_string(),
                };
                // 单个 chunk 带整体超时，一个挂死的调用不会卡住整批
                let timeout = self.chunk_timeout;
                handles.push(tokio::spawn(async move {
                    let started = std::time::Instant::now();
                    match tokio::time::timeout(
                        timeout,
                        flow.run(&chunk, &assistant_id, &prompt, &ctx),
                    )
                    .await
                    {
                        Ok(outcome) => outcome,
                        Err(_) => {
                            let mut timing = TimingMap::new();
                            timing.insert("Error".to_string(), started.elapsed().as_secs_f64());
                            ChunkOutcome::failed(
                                ctx.chunk_index,
                                format!("Tiempo de espera agotado ({}s)", timeout.as_secs()),
                                timing,
                            )
                        }
                    }
                }));
            }

            for (local, joined) in join_all(handles).await.into_iter().enumerate() {
                let index = start + local;
                match joined {
                    Ok(outcome) => outcomes.push(outcome),
                    Err(e) => {
                        warn!("⚠️ chunk {} 的任务异常退出: {}", index + 1, e);
                        outcomes.push(ChunkOutcome::failed(
                            index,
                            format!("Tarea interrumpida: {e}"),
                            TimingMap::new(),
                        ));
                    }
                }
            }

            if start + batch_size < total {
                tokio::time::sleep(self.batch_pause).await;
            }
        }

        outcomes
    }
}

/// 合并后的文档级结果
#[derive(Debug)]
pub struct Consolidated {
    pub transactions: Vec<FlatTransaction>,
    /// 按 chunk 下标顺序的计时
    pub chunk_timings: Vec<TimingMap>,
}

/// 合并失败：第一个失败的 chunk（1 起）及截至该 chunk 的计时
#[derive(Debug)]
pub struct ConsolidationError {
    pub failed_chunk: usize,
    pub detail: String,
    pub chunk_timings: Vec<TimingMap>,
}

/// 按下标排序合并全部 chunk 结果
///
/// 第一个失败的 chunk 使整体判负，计时只保留到该 chunk 为止（含）。
pub fn consolidate(mut outcomes: Vec<ChunkOutcome>) -> Result<Consolidated, ConsolidationError> {
    outcomes.sort_by_key(|o| o.index);

    let mut transactions = Vec::new();
    let mut chunk_timings = Vec::new();

    for outcome in outcomes {
        chunk_timings.push(outcome.timing.clone());
        if !outcome.success {
            return Err(ConsolidationError {
                failed_chunk: outcome.index + 1,
                detail: outcome.error.unwrap_or_default(),
                chunk_timings,
            });
        }
        transactions.extend(outcome.transactions);
    }

    Ok(Consolidated {
        transactions,
        chunk_timings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{ChunkResponse, ExtractionClient, FineTuningClient};
    use crate::error::AppResult;
    use crate::models::{RawTransaction, TimingMap};
    use crate::services::fine_tuning::FineTuningTrigger;
    use crate::services::grouper::group_and_flatten;
    use crate::services::history_store::InMemoryHistoryStore;
    use async_trait::async_trait;

    fn rows(check: &str) -> Vec<FlatTransaction> {
        let raw = RawTransaction {
            check_number: Some(check.to_string()),
            posted_amount: Some(10.0),
            ..Default::default()
        };
        group_and_flatten(&[raw])
    }

    fn timing(key: &str) -> TimingMap {
        let mut t = TimingMap::new();
        t.insert(key.to_string(), 0.1);
        t
    }

    #[test]
    fn test_consolidate_orders_by_index() {
        let outcomes = vec![
            ChunkOutcome::ok(2, rows("3003"), timing("c")),
            ChunkOutcome::ok(0, rows("1001"), timing("a")),
            ChunkOutcome::ok(1, rows("2002"), timing("b")),
        ];

        let consolidated = consolidate(outcomes).unwrap();

        // 每个 chunk 贡献头 + 明细两行
        assert_eq!(consolidated.transactions.len(), 6);
        let first_header = consolidated.transactions[0].as_header().unwrap();
        assert_eq!(first_header.check_number.as_deref(), Some("1001"));
        assert!(consolidated.chunk_timings[0].contains_key("a"));
        assert!(consolidated.chunk_timings[2].contains_key("c"));
    }

    #[test]
    fn test_consolidate_stops_at_first_failure() {
        let outcomes = vec![
            ChunkOutcome::ok(0, rows("1001"), timing("a")),
            ChunkOutcome::failed(1, "timeout".to_string(), timing("Error")),
            ChunkOutcome::ok(2, rows("3003"), timing("c")),
        ];

        let err = consolidate(outcomes).unwrap_err();

        assert_eq!(err.failed_chunk, 2);
        assert_eq!(err.detail, "timeout");
        // 只保留到失败 chunk 为止的计时
        assert_eq!(err.chunk_timings.len(), 2);
    }

    #[test]
    fn test_consolidate_failure_ignores_later_arrival_order() {
        // 失败的 chunk 虽然最后到达，排序后仍然是第一个失败
        let outcomes = vec![
            ChunkOutcome::ok(1, rows("2002"), timing("b")),
            ChunkOutcome::failed(0, "boom".to_string(), timing("Error")),
        ];

        let err = consolidate(outcomes).unwrap_err();
        assert_eq!(err.failed_chunk, 1);
        assert_eq!(err.chunk_timings.len(), 1);
    }

    #[test]
    fn test_consolidate_empty_is_success() {
        let consolidated = consolidate(Vec::new()).unwrap();
        assert!(consolidated.transactions.is_empty());
        assert!(consolidated.chunk_timings.is_empty());
    }

    /// 含 "lenta" 的 chunk 故意睡过超时，其余立即返回
    struct SlowOnMarkerClient;

    #[async_trait]
    impl ExtractionClient for SlowOnMarkerClient {
        async fn process_chunk(
            &self,
            _assistant_id: &str,
            chunk_text: &str,
            _prompt_text: &str,
        ) -> AppResult<ChunkResponse> {
            if chunk_text.contains("lenta") {
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
            Ok(ChunkResponse {
                raw_text: "[{\"check_number\": \"1001\", \"posted_amount\": 10.0}]".to_string(),
                run_id: "run_1".to_string(),
                thread_id: "thread_1".to_string(),
            })
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

    #[tokio::test]
    async fn test_hung_chunk_times_out_without_stalling_batch() {
        let history = std::sync::Arc::new(InMemoryHistoryStore::new());
        let trigger = Arc::new(FineTuningTrigger::spawn(
            history.clone(),
            Arc::new(NoopFineTuning),
            50,
        ));
        let flow = Arc::new(ChunkFlow::new(
            Arc::new(SlowOnMarkerClient),
            history,
            trigger,
        ));
        let processor = BatchProcessor::new(flow, &Config::default())
            .with_chunk_timeout(Duration::from_millis(50));

        let chunks = vec![
            "pagina normal 1".to_string(),
            "pagina lenta".to_string(),
            "pagina normal 2".to_string(),
        ];
        let outcomes = processor
            .process_all(&chunks, "asst_1", "prompt", 7, 0, "remesa.txt")
            .await;

        assert_eq!(outcomes.len(), 3);

        let hung = outcomes.iter().find(|o| o.index == 1).unwrap();
        assert!(!hung.success);
        let error = hung.error.as_deref().unwrap();
        assert!(
            error.starts_with("Tiempo de espera agotado"),
            "错误信息不符: {error}"
        );
        assert!(hung.timing.contains_key("Error"));

        // 同批次的其余 chunk 正常完成
        for index in [0, 2] {
            let sibling = outcomes.iter().find(|o| o.index == index).unwrap();
            assert!(sibling.success, "chunk {index} 应该成功");
        }
    }
}
