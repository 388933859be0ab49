//! 外部服务客户端
//!
//! 流水线依赖的三个外部协作方：抽取助手 API、OCR 服务、fine-tuning
//! 服务。每个都以 trait 定义接口，附一个 HTTP 实现。

pub mod assistant_client;
pub mod fine_tuning_client;
pub mod ocr_client;

pub use assistant_client::{
    AssistantAdmin, ChunkResponse, ExtractionClient, OpenAiAssistantClient,
};
pub use fine_tuning_client::{FineTuningClient, OpenAiFineTuningClient};
pub use ocr_client::{HttpOcrClient, OcrClient};
