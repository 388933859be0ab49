//! 业务能力层
//!
//! 流水线用到的纯逻辑与领域能力：切分、解析、分组压平、文件识别、
//! 提示词与历史存储、助手注册表、fine-tuning 触发器。

pub mod file_text;
pub mod fine_tuning;
pub mod grouper;
pub mod history_store;
pub mod prompt_store;
pub mod provisioning;
pub mod response_parser;
pub mod splitter;

pub use file_text::{detect_file_type, extract_text, FileType};
pub use fine_tuning::{eligibility_check, render_jsonl, FineTuningTrigger};
pub use grouper::{flatten_groups, group_and_flatten, group_by_check, PAYMENT_TYPE_ID};
pub use history_store::{HistoryStore, InMemoryHistoryStore};
pub use prompt_store::{
    resolve_prompt, InMemoryPromptStore, PromptStore, StoredPrompt, DEFAULT_EXTRACTION_PROMPT,
};
pub use provisioning::{AssistantDirectory, AssistantRegistry, InMemoryAssistantDirectory};
pub use response_parser::parse_transactions;
pub use splitter::{split_pages, PageSplitter, PAGE_MARKER};
