//! Fine-tuning 服务客户端
//!
//! 上传 JSONL 训练文件并创建 fine-tuning job。只被后台触发器调用，
//! 任何错误在触发器里记日志吞掉，不进入主流水线。

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::info;

use crate::config::Config;
use crate::error::{AppResult, CollaboratorError};

/// fine-tuning 提交能力
#[async_trait]
pub trait FineTuningClient: Send + Sync {
    /// 上传训练文件，返回文件标识（等待处理完成后才返回）
    async fn upload_training_file(&self, content: Vec<u8>, file_name: &str) -> AppResult<String>;

    /// 基于已上传的文件创建 fine-tuning job，返回 job 标识
    async fn create_job(&self, file_id: &str, office_id: i32) -> AppResult<String>;
}

/// OpenAI fine-tuning HTTP 实现
pub struct OpenAiFineTuningClient {
    http: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
    processing_timeout: Duration,
}

impl OpenAiFineTuningClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: config.openai_api_key.clone(),
            api_base: config.openai_api_base.trim_end_matches('/').to_string(),
            model: config.fine_tuning_model.clone(),
            processing_timeout: Duration::from_secs(config.upload_timeout_secs),
        }
    }

    /// 轮询直到文件处理完成或超时
    ///
    /// 必须有上限：这个等待发生在串行的后台 worker 里，一次无限等待
    /// 会永久堵住所有办公室后续的触发检查。
    async fn wait_until_processed(&self, file_id: &str) -> Result<(), CollaboratorError> {
        let path = format!("files/{file_id}");
        let url = format!("{}/{}", self.api_base, path);
        let deadline = tokio::time::Instant::now() + self.processing_timeout;

        loop {
            let response = self
                .http
                .get(&url)
                .bearer_auth(&self.api_key)
                .send()
                .await
                .map_err(|e| CollaboratorError::request_failed(&path, e))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(CollaboratorError::bad_status(&path, status.as_u16(), body));
            }

            let body: Value = response
                .json()
                .await
                .map_err(|e| CollaboratorError::request_failed(&path, e))?;
            match body.get("status").and_then(|s| s.as_str()) {
                Some("processed") => return Ok(()),
                Some("error") => {
                    return Err(CollaboratorError::RunFailed {
                        status: "error".to_string(),
                    })
                }
                _ => {}
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(CollaboratorError::Timeout {
                    seconds: self.processing_timeout.as_secs(),
                });
            }
            tokio::time::sleep(Duration::from_millis(1000)).await;
        }
    }
}

#[async_trait]
impl FineTuningClient for OpenAiFineTuningClient {
    async fn upload_training_file(&self, content: Vec<u8>, file_name: &str) -> AppResult<String> {
        let path = "files";
        let url = format!("{}/{}", self.api_base, path);

        let part = reqwest::multipart::Part::bytes(content).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("purpose", "fine-tune");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| CollaboratorError::request_failed(path, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CollaboratorError::bad_status(path, status.as_u16(), body).into());
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| CollaboratorError::request_failed(path, e))?;
        let file_id = body
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| CollaboratorError::missing_field("id"))?
            .to_string();

        self.wait_until_processed(&file_id).await?;
        info!("📁 训练文件已上传并处理完成: {}", file_id);
        Ok(file_id)
    }

    async fn create_job(&self, file_id: &str, office_id: i32) -> AppResult<String> {
        let path = "fine_tuning/jobs";
        let url = format!("{}/{}", self.api_base, path);

        let payload = json!({
            "model": self.model,
            "training_file": file_id,
            "hyperparameters": { "n_epochs": 3 },
            "suffix": format!("office-{}-{}", office_id, Utc::now().format("%Y%m%d")),
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| CollaboratorError::request_failed(path, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CollaboratorError::bad_status(path, status.as_u16(), body).into());
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| CollaboratorError::request_failed(path, e))?;
        let job_id = body
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| CollaboratorError::missing_field("id"))?
            .to_string();

        info!("⚙️ fine-tuning job 已创建: {}", job_id);
        Ok(job_id)
    }
}
