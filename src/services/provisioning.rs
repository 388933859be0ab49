//! 办公室助手注册表 - 业务能力层
//!
//! 解析办公室 → 助手的对应关系：先查缓存，再查目录，都没有就在
//! 外部服务上创建（先建 vector store 再建助手）并登记。创建失败是
//! 致命的：整份文档在切分之前就中止。
//!
//! 单份文档处理期间助手配置视为不可变，调度开始前 `resolve` 一次。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use crate::clients::AssistantAdmin;
use crate::error::{AppResult, ProvisioningError};
use crate::infrastructure::TtlCache;
use crate::models::OfficeAssistant;

/// 助手登记目录（外部持久化的接口）
#[async_trait]
pub trait AssistantDirectory: Send + Sync {
    async fn find_active(&self, office_id: i32) -> AppResult<Option<OfficeAssistant>>;

    async fn register(&self, assistant: OfficeAssistant) -> AppResult<()>;
}

/// 内存目录实现
#[derive(Default)]
pub struct InMemoryAssistantDirectory {
    assistants: Mutex<Vec<OfficeAssistant>>,
}

impl InMemoryAssistantDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AssistantDirectory for InMemoryAssistantDirectory {
    async fn find_active(&self, office_id: i32) -> AppResult<Option<OfficeAssistant>> {
        let assistants = self.assistants.lock().await;
        Ok(assistants
            .iter()
            .find(|a| a.office_id == office_id && a.active)
            .cloned())
    }

    async fn register(&self, assistant: OfficeAssistant) -> AppResult<()> {
        self.assistants.lock().await.push(assistant);
        Ok(())
    }
}

/// 办公室助手注册表
pub struct AssistantRegistry {
    directory: Arc<dyn AssistantDirectory>,
    admin: Arc<dyn AssistantAdmin>,
    cache: TtlCache<i32, OfficeAssistant>,
    default_model: String,
}

impl AssistantRegistry {
    pub fn new(
        directory: Arc<dyn AssistantDirectory>,
        admin: Arc<dyn AssistantAdmin>,
        default_model: String,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            directory,
            admin,
            cache: TtlCache::new(cache_ttl),
            default_model,
        }
    }

    /// 取某办公室的助手配置，没有就创建
    pub async fn resolve(&self, office_id: i32) -> Result<OfficeAssistant, ProvisioningError> {
        if let Some(assistant) = self.cache.get(&office_id) {
            return Ok(assistant);
        }

        let found = self
            .directory
            .find_active(office_id)
            .await
            .map_err(|e| ProvisioningError::CreateFailed {
                office_id,
                source: Box::new(e),
            })?;
        if let Some(assistant) = found {
            self.cache.insert(office_id, assistant.clone());
            return Ok(assistant);
        }

        let assistant = self.provision(office_id).await?;
        self.cache.insert(office_id, assistant.clone());
        Ok(assistant)
    }

    async fn provision(&self, office_id: i32) -> Result<OfficeAssistant, ProvisioningError> {
        let office_name = format!("Oficina_{office_id}");
        info!("🤖 办公室 {} 没有助手，开始创建...", office_id);

        let vector_store_id = self
            .admin
            .create_vector_store(office_id, &office_name)
            .await
            .map_err(|e| ProvisioningError::VectorStoreFailed {
                office_id,
                source: Box::new(e),
            })?;

        let assistant_id = self
            .admin
            .create_assistant(
                &office_name,
                "Sistema_General",
                &self.default_model,
                &vector_store_id,
            )
            .await
            .map_err(|e| ProvisioningError::CreateFailed {
                office_id,
                source: Box::new(e),
            })?;

        let assistant = OfficeAssistant {
            office_id,
            assistant_id,
            model_id: self.default_model.clone(),
            vector_store_id,
            active: true,
        };

        self.directory
            .register(assistant.clone())
            .await
            .map_err(|e| ProvisioningError::CreateFailed {
                office_id,
                source: Box::new(e),
            })?;

        info!(
            "✅ 办公室 {} 助手已创建: {}",
            office_id, assistant.assistant_id
        );
        Ok(assistant)
    }
}
