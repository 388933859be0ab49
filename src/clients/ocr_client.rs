//! OCR 服务客户端
//!
//! PDF 文件交给外部 OCR 服务还原成带页标记的纯文本。上传 multipart，
//! 读取响应里的 `reconstructed_text` 字段。

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{AppResult, CollaboratorError};

/// PDF 文本抽取能力
#[async_trait]
pub trait OcrClient: Send + Sync {
    async fn extract_pdf_text(&self, file_bytes: &[u8], file_name: &str) -> AppResult<String>;
}

/// HTTP OCR 服务实现
pub struct HttpOcrClient {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpOcrClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: config.ocr_endpoint.clone(),
        }
    }
}

#[async_trait]
impl OcrClient for HttpOcrClient {
    async fn extract_pdf_text(&self, file_bytes: &[u8], file_name: &str) -> AppResult<String> {
        debug!(
            "发送 PDF 到 OCR 服务: {} ({} 字节)",
            file_name,
            file_bytes.len()
        );

        let part = reqwest::multipart::Part::bytes(file_bytes.to_vec())
            .file_name(file_name.to_string())
            .mime_str("application/pdf")
            .map_err(|e| CollaboratorError::request_failed(&self.endpoint, e))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| CollaboratorError::request_failed(&self.endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(
                CollaboratorError::bad_status(&self.endpoint, status.as_u16(), body).into(),
            );
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| CollaboratorError::request_failed(&self.endpoint, e))?;

        let text = body
            .get("reconstructed_text")
            .and_then(|t| t.as_str())
            .ok_or_else(|| CollaboratorError::missing_field("reconstructed_text"))?;

        info!("✅ OCR 完成，抽取 {} 字符", text.len());
        Ok(text.to_string())
    }
}
