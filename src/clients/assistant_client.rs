//! 助手 API 客户端
//!
//! 封装外部抽取助手（Assistants v2）的调用：建 thread、发消息、跑 run、
//! 轮询直到完成、取回第一条助手回复。每个 chunk 用独立的 thread，
//! 避免并行处理时互相串话。
//!
//! `ExtractionClient` / `AssistantAdmin` 是流水线依赖的接口，测试里
//! 用内存实现替换。

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::Config;
use crate::error::{AppResult, CollaboratorError};

/// 一次抽取调用的结果
#[derive(Debug, Clone)]
pub struct ChunkResponse {
    /// 助手回复的原始文本（通常是包在 ```json 里的数组）
    pub raw_text: String,
    pub run_id: String,
    pub thread_id: String,
}

/// 抽取调用能力
#[async_trait]
pub trait ExtractionClient: Send + Sync {
    /// 把一个 chunk 交给指定助手处理，返回原始响应
    async fn process_chunk(
        &self,
        assistant_id: &str,
        chunk_text: &str,
        prompt_text: &str,
    ) -> AppResult<ChunkResponse>;
}

/// 助手资源管理能力（创建助手 / vector store）
#[async_trait]
pub trait AssistantAdmin: Send + Sync {
    async fn create_vector_store(&self, office_id: i32, office_name: &str) -> AppResult<String>;

    async fn create_assistant(
        &self,
        office_name: &str,
        source_software: &str,
        model: &str,
        vector_store_id: &str,
    ) -> AppResult<String>;
}

/// 基于 OpenAI Assistants v2 HTTP 接口的实现
pub struct OpenAiAssistantClient {
    http: reqwest::Client,
    api_key: String,
    api_base: String,
    run_timeout: Duration,
    poll_interval: Duration,
}

impl OpenAiAssistantClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: config.openai_api_key.clone(),
            api_base: config.openai_api_base.trim_end_matches('/').to_string(),
            run_timeout: Duration::from_secs(config.run_timeout_secs),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        }
    }

    async fn post_json(&self, path: &str, payload: Value) -> Result<Value, CollaboratorError> {
        let url = format!("{}/{}", self.api_base, path);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "assistants=v2")
            .json(&payload)
            .send()
            .await
            .map_err(|e| CollaboratorError::request_failed(path, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CollaboratorError::bad_status(path, status.as_u16(), body));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| CollaboratorError::request_failed(path, e))
    }

    async fn get_json(&self, path: &str) -> Result<Value, CollaboratorError> {
        let url = format!("{}/{}", self.api_base, path);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "assistants=v2")
            .send()
            .await
            .map_err(|e| CollaboratorError::request_failed(path, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CollaboratorError::bad_status(path, status.as_u16(), body));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| CollaboratorError::request_failed(path, e))
    }

    fn string_field(value: &Value, field: &str) -> Result<String, CollaboratorError> {
        value
            .get(field)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| CollaboratorError::missing_field(field))
    }

    /// 创建一个临时 thread
    async fn create_thread(&self) -> Result<String, CollaboratorError> {
        let response = self.post_json("threads", json!({})).await?;
        Self::string_field(&response, "id")
    }

    async fn send_message(&self, thread_id: &str, content: &str) -> Result<(), CollaboratorError> {
        self.post_json(
            &format!("threads/{thread_id}/messages"),
            json!({ "role": "user", "content": content }),
        )
        .await?;
        Ok(())
    }

    async fn start_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
    ) -> Result<String, CollaboratorError> {
        let response = self
            .post_json(
                &format!("threads/{thread_id}/runs"),
                json!({ "assistant_id": assistant_id }),
            )
            .await?;
        Self::string_field(&response, "id")
    }

    /// 轮询 run 状态直到完成或超时
    async fn wait_for_run(&self, thread_id: &str, run_id: &str) -> Result<(), CollaboratorError> {
        let deadline = tokio::time::Instant::now() + self.run_timeout;

        loop {
            let run = self
                .get_json(&format!("threads/{thread_id}/runs/{run_id}"))
                .await?;
            let status = run.get("status").and_then(|s| s.as_str()).unwrap_or("");

            match status {
                "completed" => return Ok(()),
                "failed" | "cancelled" | "expired" => {
                    return Err(CollaboratorError::RunFailed {
                        status: status.to_string(),
                    })
                }
                _ => {}
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(CollaboratorError::Timeout {
                    seconds: self.run_timeout.as_secs(),
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// 取回线程里第一条助手回复的文本内容
    async fn fetch_assistant_reply(&self, thread_id: &str) -> Result<String, CollaboratorError> {
        let response = self.get_json(&format!("threads/{thread_id}/messages")).await?;
        let messages = response
            .get("data")
            .and_then(|d| d.as_array())
            .ok_or_else(|| CollaboratorError::missing_field("data"))?;

        for message in messages {
            if message.get("role").and_then(|r| r.as_str()) != Some("assistant") {
                continue;
            }
            let parts = message
                .get("content")
                .and_then(|c| c.as_array())
                .cloned()
                .unwrap_or_default();
            for part in &parts {
                if part.get("type").and_then(|t| t.as_str()) == Some("text") {
                    if let Some(text) = part
                        .pointer("/text/value")
                        .and_then(|v| v.as_str())
                    {
                        return Ok(text.to_string());
                    }
                }
            }
        }

        Err(CollaboratorError::EmptyResponse)
    }
}

#[async_trait]
impl ExtractionClient for OpenAiAssistantClient {
    async fn process_chunk(
        &self,
        assistant_id: &str,
        chunk_text: &str,
        prompt_text: &str,
    ) -> AppResult<ChunkResponse> {
        // 每个 chunk 一个新 thread，并行时互不干扰
        let thread_id = self.create_thread().await?;
        debug!("thread {} 已创建", thread_id);

        let full_prompt = if prompt_text.is_empty() {
            format!("Procesa el siguiente contenido y extrae los datos relevantes en formato JSON:\n{chunk_text}")
        } else {
            format!("{prompt_text}\n\nProcesa el siguiente contenido:\n{chunk_text}")
        };

        self.send_message(&thread_id, &full_prompt).await?;
        let run_id = self.start_run(&thread_id, assistant_id).await?;
        self.wait_for_run(&thread_id, &run_id).await?;
        let raw_text = self.fetch_assistant_reply(&thread_id).await?;

        Ok(ChunkResponse {
            raw_text,
            run_id,
            thread_id,
        })
    }
}

#[async_trait]
impl AssistantAdmin for OpenAiAssistantClient {
    async fn create_vector_store(&self, office_id: i32, office_name: &str) -> AppResult<String> {
        let response = self
            .post_json(
                "vector_stores",
                json!({ "name": format!("VectorStore_Oficina_{office_id}_{office_name}") }),
            )
            .await?;
        Ok(Self::string_field(&response, "id")?)
    }

    async fn create_assistant(
        &self,
        office_name: &str,
        source_software: &str,
        model: &str,
        vector_store_id: &str,
    ) -> AppResult<String> {
        let instructions = format!(
            "Eres un sistema experto en la extracción de datos de documentos de la oficina {office_name}. \
             Los archivos que vas a procesar provienen del software {source_software}. \
             Debes devolver siempre un JSON estructurado, con un objeto por registro."
        );

        let payload = json!({
            "instructions": instructions,
            "name": format!("Asistente {office_name}"),
            "tools": [ { "type": "code_interpreter" }, { "type": "file_search" } ],
            "model": model,
            "tool_resources": {
                "file_search": { "vector_store_ids": [vector_store_id] }
            }
        });

        let response = self.post_json("assistants", payload).await?;
        Ok(Self::string_field(&response, "id")?)
    }
}
