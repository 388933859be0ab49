//! 文档处理器 - 调度层入口
//!
//! 整份文档的处理顺序：解析办公室助手 → 抽取文本（PDF 走 OCR）→
//! 按页切分 → 取提示词 → 分批并行处理 → 合并。每个阶段记入文档级
//! 计时表，任何阶段失败都返回统一的失败信封，不向调用方抛错。

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info};

use crate::clients::OcrClient;
use crate::models::{ProcessFileResult, ProcessSummary, TimingMap};
use crate::orchestrator::batch_processor::{consolidate, BatchProcessor};
use crate::services::file_text::{detect_file_type, extract_text, FileType};
use crate::services::prompt_store::{resolve_prompt, PromptStore};
use crate::services::provisioning::AssistantRegistry;
use crate::services::splitter::split_pages;

/// 文档处理器
pub struct DocumentProcessor {
    registry: Arc<AssistantRegistry>,
    prompts: Arc<dyn PromptStore>,
    ocr: Arc<dyn OcrClient>,
    batch: BatchProcessor,
}

impl DocumentProcessor {
    pub fn new(
        registry: Arc<AssistantRegistry>,
        prompts: Arc<dyn PromptStore>,
        ocr: Arc<dyn OcrClient>,
        batch: BatchProcessor,
    ) -> Self {
        Self {
            registry,
            prompts,
            ocr,
            batch,
        }
    }

    /// 处理一份上传的文档，返回统一的结果信封
    pub async fn process_document(
        &self,
        file_name: &str,
        content: &[u8],
        office_id: i32,
        user_id: i32,
    ) -> ProcessFileResult {
        let total_start = Instant::now();
        let mut timings = TimingMap::new();

        info!(
            "📥 收到文档: {} (办公室 {}, 用户 {}, {} 字节)",
            file_name,
            office_id,
            user_id,
            content.len()
        );

        // 1. 办公室助手（没有就创建）
        let step = Instant::now();
        let assistant = match self.registry.resolve(office_id).await {
            Ok(assistant) => {
                timings.insert("BuscarAsistente".to_string(), step.elapsed().as_secs_f64());
                assistant
            }
            Err(e) => {
                error!("❌ 办公室 {} 助手解析失败: {}", office_id, e);
                timings.insert("BuscarAsistente".to_string(), step.elapsed().as_secs_f64());
                return ProcessFileResult::failure(
                    format!("Error al crear asistente: {e}"),
                    timings,
                    Vec::new(),
                );
            }
        };

        // 2. 抽取文本，PDF 转交 OCR
        let text = if detect_file_type(file_name, content) == FileType::Pdf {
            info!("🔍 PDF 文件，转交 OCR 服务...");
            let step = Instant::now();
            match self.ocr.extract_pdf_text(content, file_name).await {
                Ok(text) => {
                    timings.insert("ProcesarPdfConOcr".to_string(), step.elapsed().as_secs_f64());
                    info!("✅ OCR 完成，{} 个字符", text.len());
                    text
                }
                Err(e) => {
                    error!("❌ OCR 失败: {}", e);
                    timings.insert("ProcesarPdfConOcr".to_string(), step.elapsed().as_secs_f64());
                    return ProcessFileResult::failure(e.to_string(), timings, Vec::new());
                }
            }
        } else {
            let step = Instant::now();
            match extract_text(file_name, content) {
                Ok(text) => {
                    timings.insert("ExtractTextContent".to_string(), step.elapsed().as_secs_f64());
                    text
                }
                Err(e) => {
                    error!("❌ 文本抽取失败: {}", e);
                    timings.insert("ExtractTextContent".to_string(), step.elapsed().as_secs_f64());
                    return ProcessFileResult::failure(e.to_string(), timings, Vec::new());
                }
            }
        };

        // 3. 按页切分
        let step = Instant::now();
        let chunks: Vec<String> = split_pages(&text).collect();
        timings.insert("DividirEnChunks".to_string(), step.elapsed().as_secs_f64());
        info!("📑 文档切分为 {} 个 chunk", chunks.len());

        // 4. 提示词（没有就建默认的）
        let step = Instant::now();
        let prompt = match resolve_prompt(self.prompts.as_ref(), office_id).await {
            Ok(prompt) => {
                timings.insert("ObtenerPrompt".to_string(), step.elapsed().as_secs_f64());
                prompt
            }
            Err(e) => {
                error!("❌ 提示词解析失败: {}", e);
                timings.insert("ObtenerPrompt".to_string(), step.elapsed().as_secs_f64());
                return ProcessFileResult::failure(e.to_string(), timings, Vec::new());
            }
        };

        // 5. 分批并行处理并合并
        let outcomes = self
            .batch
            .process_all(&chunks, &assistant.assistant_id, &prompt, office_id, 0, file_name)
            .await;

        let consolidated = match consolidate(outcomes) {
            Ok(consolidated) => consolidated,
            Err(e) => {
                return ProcessFileResult::failure(
                    format!("Error procesando chunk {}: {}", e.failed_chunk, e.detail),
                    timings,
                    e.chunk_timings,
                );
            }
        };

        let duration = total_start.elapsed();
        timings.insert("Total".to_string(), duration.as_secs_f64());

        info!(
            "🎯 文档处理完成: {} 个 chunk，{} 条展平交易行，耗时 {:.2}s",
            chunks.len(),
            consolidated.transactions.len(),
            duration.as_secs_f64()
        );

        ProcessFileResult {
            success: true,
            error: None,
            total_seconds: duration.as_secs() as i64,
            result: Some(ProcessSummary {
                assistant_id: assistant.assistant_id,
                chunks_processed: chunks.len(),
                total_transactions: consolidated.transactions.len(),
                flattened_transactions: consolidated.transactions,
            }),
            timings,
            chunk_timings: consolidated.chunk_timings,
        }
    }
}
