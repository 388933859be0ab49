//! 应用程序错误类型
//!
//! 错误分类与传播策略：
//! - `Provisioning`：办公室没有可用助手且创建失败，整个文档处理在分块前中止
//! - `Parse`：助手响应无法解析为交易数组，该 chunk 致命失败
//! - `Collaborator`：外部服务（助手 API / OCR / 文件上传）调用失败，
//!   在 chunk 内部被捕获并转换为失败结果，不影响同批次的其他 chunk
//! - `File` / `Config`：进入流水线之前的本地错误
//!
//! 后台 fine-tuning 的错误只记日志，永远不会出现在这里。

use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 助手配置错误
    #[error("助手配置错误: {0}")]
    Provisioning(#[from] ProvisioningError),
    /// 响应解析错误
    #[error("解析错误: {0}")]
    Parse(#[from] ParseError),
    /// 外部服务调用错误
    #[error("外部服务错误: {0}")]
    Collaborator(#[from] CollaboratorError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 助手配置错误
#[derive(Debug, Error)]
pub enum ProvisioningError {
    /// 创建助手失败
    #[error("为办公室 {office_id} 创建助手失败: {source}")]
    CreateFailed {
        office_id: i32,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 创建 vector store 失败
    #[error("为办公室 {office_id} 创建 vector store 失败: {source}")]
    VectorStoreFailed {
        office_id: i32,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// 响应解析错误
///
/// 助手返回的文本无法还原成交易数组。携带原始 serde 错误作为上下文。
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON 反序列化失败（格式错误或形状不对）
    #[error("无法从响应中提取交易数组: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },
}

/// 外部服务调用错误
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// 网络请求失败
    #[error("请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// 服务返回错误状态码
    #[error("服务返回错误状态 ({endpoint}): {status} - {body}")]
    BadStatus {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// 响应缺少必需字段
    #[error("响应缺少字段: {field}")]
    MissingField { field: String },
    /// run 以非 completed 状态结束
    #[error("run 以状态 {status} 结束")]
    RunFailed { status: String },
    /// 等待结果超时
    #[error("等待结果超时 ({seconds}s)")]
    Timeout { seconds: u64 },
    /// 助手没有返回任何回复
    #[error("未找到助手的回复消息")]
    EmptyResponse,
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 文件内容不是有效文本
    #[error("文件内容无法按 UTF-8 解码: {path}")]
    InvalidEncoding { path: String },
    /// 不支持的文件类型
    #[error("不支持的文件类型: {detected}")]
    UnsupportedType { detected: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 必需的环境变量不存在
    #[error("环境变量 {name} 不存在")]
    MissingVar { name: String },
}

// ========== 便捷构造函数 ==========

impl CollaboratorError {
    pub fn request_failed(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        CollaboratorError::RequestFailed {
            endpoint: endpoint.into(),
            source,
        }
    }

    pub fn bad_status(endpoint: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        CollaboratorError::BadStatus {
            endpoint: endpoint.into(),
            status,
            body: body.into(),
        }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        CollaboratorError::MissingField {
            field: field.into(),
        }
    }
}

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
