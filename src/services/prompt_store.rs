//! 提示词存储 - 业务能力层
//!
//! 每个办公室维护自己的抽取提示词，取最新一条；没有就自动建一条
//! 默认提示词并入库。持久化在外部系统，这里是接口 + 内存实现。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::info;

use crate::error::AppResult;

/// 自动建默认提示词时使用的内容
pub const DEFAULT_EXTRACTION_PROMPT: &str = "You are a medical billing data extraction specialist. \
Extract transaction data from financial documents and return valid JSON with these exact fields: \
patient_id, patient_name, insurance_company, check_amount, posted_amount, check_number, \
service_date, code, other_amount. Use null for missing values. \
Return array of objects for multiple transactions.";

/// 一条已入库的提示词
#[derive(Debug, Clone)]
pub struct StoredPrompt {
    pub name: String,
    pub description: String,
    pub content: String,
    pub office_id: i32,
    pub created_at: DateTime<Utc>,
}

/// 提示词的读写接口
#[async_trait]
pub trait PromptStore: Send + Sync {
    /// 某办公室最新的提示词
    async fn latest(&self, office_id: i32) -> AppResult<Option<StoredPrompt>>;

    async fn create(&self, prompt: StoredPrompt) -> AppResult<()>;
}

/// 取某办公室的提示词；没有就建默认的
pub async fn resolve_prompt(store: &dyn PromptStore, office_id: i32) -> AppResult<String> {
    if let Some(prompt) = store.latest(office_id).await? {
        return Ok(prompt.content);
    }

    let default_prompt = StoredPrompt {
        name: format!("Prompt por defecto - Oficina {office_id}"),
        description: "Prompt por defecto creado automáticamente para extracción de datos médicos"
            .to_string(),
        content: DEFAULT_EXTRACTION_PROMPT.to_string(),
        office_id,
        created_at: Utc::now(),
    };
    store.create(default_prompt.clone()).await?;
    info!("✅ 已为办公室 {} 创建默认提示词", office_id);

    Ok(default_prompt.content)
}

/// 内存实现
#[derive(Default)]
pub struct InMemoryPromptStore {
    prompts: Mutex<Vec<StoredPrompt>>,
}

impl InMemoryPromptStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PromptStore for InMemoryPromptStore {
    async fn latest(&self, office_id: i32) -> AppResult<Option<StoredPrompt>> {
        let prompts = self.prompts.lock().await;
        Ok(prompts
            .iter()
            .filter(|p| p.office_id == office_id)
            .max_by_key(|p| p.created_at)
            .cloned())
    }

    async fn create(&self, prompt: StoredPrompt) -> AppResult<()> {
        self.prompts.lock().await.push(prompt);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_creates_default_when_missing() {
        let store = InMemoryPromptStore::new();
        let content = resolve_prompt(&store, 7).await.unwrap();
        assert_eq!(content, DEFAULT_EXTRACTION_PROMPT);
        // 第二次直接命中入库的默认提示词
        assert!(store.latest(7).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_resolve_prefers_newest() {
        let store = InMemoryPromptStore::new();
        store
            .create(StoredPrompt {
                name: "viejo".to_string(),
                description: String::new(),
                content: "prompt viejo".to_string(),
                office_id: 7,
                created_at: Utc::now() - chrono::Duration::days(1),
            })
            .await
            .unwrap();
        store
            .create(StoredPrompt {
                name: "nuevo".to_string(),
                description: String::new(),
                content: "prompt nuevo".to_string(),
                office_id: 7,
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let content = resolve_prompt(&store, 7).await.unwrap();
        assert_eq!(content, "prompt nuevo");
    }

    #[tokio::test]
    async fn test_offices_are_isolated() {
        let store = InMemoryPromptStore::new();
        resolve_prompt(&store, 1).await.unwrap();
        assert!(store.latest(2).await.unwrap().is_none());
    }
}
