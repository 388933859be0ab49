//! 响应解析器 - 业务能力层
//!
//! 助手的响应可能把 JSON 包在 markdown 代码块里，也可能整段就是
//! 裸 JSON。先找第一个 ```json ... ``` 围栏（非贪婪、跨行），找不到
//! 就把整段修剪后当作候选 JSON，反序列化为交易数组。
//!
//! 反序列化失败对该 chunk 是致命的：错误带着原始 serde 上下文向上
//! 传播，绝不静默跳过。

use std::sync::OnceLock;

use regex::Regex;

use crate::error::ParseError;
use crate::models::RawTransaction;

static JSON_BLOCK: OnceLock<Regex> = OnceLock::new();

fn json_block_regex() -> &'static Regex {
    JSON_BLOCK.get_or_init(|| {
        // 非贪婪匹配第一个围栏块，(?s) 让 . 匹配换行
        Regex::new(r"(?s)```json\s*(\[.*?\])\s*```").expect("正则表达式字面量必须合法")
    })
}

/// 从一段助手响应文本中解析交易数组
pub fn parse_transactions(response_text: &str) -> Result<Vec<RawTransaction>, ParseError> {
    let candidate = match json_block_regex().captures(response_text) {
        Some(caps) => caps
            .get(1)
            .map(|m| m.as_str())
            .unwrap_or_else(|| response_text.trim()),
        None => response_text.trim(),
    };

    serde_json::from_str::<Vec<RawTransaction>>(candidate)
        .map_err(|source| ParseError::InvalidJson { source })
}
