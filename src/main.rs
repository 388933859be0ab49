use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use extract_transactions::clients::{
    HttpOcrClient, OpenAiAssistantClient, OpenAiFineTuningClient,
};
use extract_transactions::config::Config;
use extract_transactions::orchestrator::{BatchProcessor, DocumentProcessor};
use extract_transactions::services::fine_tuning::FineTuningTrigger;
use extract_transactions::services::history_store::InMemoryHistoryStore;
use extract_transactions::services::prompt_store::InMemoryPromptStore;
use extract_transactions::services::provisioning::{AssistantRegistry, InMemoryAssistantDirectory};
use extract_transactions::utils::logging;
use extract_transactions::workflow::ChunkFlow;

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::from_env();

    // 初始化日志
    logging::init(config.verbose_logging);

    let mut args = std::env::args().skip(1);
    let (file_path, office_id) = match (args.next(), args.next()) {
        (Some(path), Some(office)) => {
            let office_id: i32 = office
                .parse()
                .with_context(|| format!("办公室编号无效: {office}"))?;
            (path, office_id)
        }
        _ => bail!("用法: extract_transactions <文件路径> <办公室编号> [用户编号]"),
    };
    let user_id: i32 = match args.next() {
        Some(user) => user
            .parse()
            .with_context(|| format!("用户编号无效: {user}"))?,
        None => 0,
    };

    let content = tokio::fs::read(&file_path)
        .await
        .with_context(|| format!("读取文件失败: {file_path}"))?;
    let file_name = std::path::Path::new(&file_path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or(file_path.clone());

    logging::log_startup(&file_name, office_id, config.batch_size);

    // 外部客户端
    let assistant_client = Arc::new(OpenAiAssistantClient::new(&config));
    let ocr_client = Arc::new(HttpOcrClient::new(&config));
    let fine_tuning_client = Arc::new(OpenAiFineTuningClient::new(&config));

    // 存储（独立运行时为内存实现）
    let history = Arc::new(InMemoryHistoryStore::new());
    let prompts = Arc::new(InMemoryPromptStore::new());
    let directory = Arc::new(InMemoryAssistantDirectory::new());

    let registry = Arc::new(AssistantRegistry::new(
        directory,
        assistant_client.clone(),
        config.default_model.clone(),
        Duration::from_secs(config.assistant_cache_ttl_secs),
    ));

    let trigger = Arc::new(FineTuningTrigger::spawn(
        history.clone(),
        fine_tuning_client,
        config.fine_tuning_threshold,
    ));
    let flow = Arc::new(ChunkFlow::new(assistant_client, history, trigger));
    let batch = BatchProcessor::new(flow, &config);

    let processor = DocumentProcessor::new(registry, prompts, ocr_client, batch);
    let result = processor
        .process_document(&file_name, &content, office_id, user_id)
        .await;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
