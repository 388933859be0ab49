/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 每批并发处理的 chunk 数量上限
    pub batch_size: usize,
    /// 批次之间的停顿（毫秒），限制对助手 API 的突发压力
    pub batch_pause_ms: u64,
    /// 等待 run 完成的超时（秒）
    pub run_timeout_secs: u64,
    /// run 状态轮询间隔（毫秒）
    pub poll_interval_ms: u64,
    /// 单个 chunk 的整体处理上限（秒），超时按失败处理
    pub chunk_timeout_secs: u64,
    /// 等待训练文件处理完成的上限（秒）
    pub upload_timeout_secs: u64,
    /// 触发 fine-tuning 的已验证记录阈值
    pub fine_tuning_threshold: u64,
    /// fine-tuning 使用的基础模型
    pub fine_tuning_model: String,
    /// 办公室助手的默认模型
    pub default_model: String,
    /// 办公室助手查询结果的缓存时间（秒）
    pub assistant_cache_ttl_secs: u64,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- OpenAI 配置 ---
    pub openai_api_key: String,
    pub openai_api_base: String,
    // --- OCR 服务配置 ---
    pub ocr_endpoint: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            batch_size: 5,
            batch_pause_ms: 100,
            run_timeout_secs: 90,
            poll_interval_ms: 500,
            chunk_timeout_secs: 120,
            upload_timeout_secs: 300,
            fine_tuning_threshold: 50,
            fine_tuning_model: "gpt-4.1-mini-2025-04-14".to_string(),
            default_model: "gpt-4o-mini".to_string(),
            assistant_cache_ttl_secs: 1800,
            verbose_logging: false,
            openai_api_key: String::new(),
            openai_api_base: "https://api.openai.com/v1".to_string(),
            ocr_endpoint: "http://localhost:8000/ocr".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            batch_size: std::env::var("BATCH_SIZE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.batch_size),
            batch_pause_ms: std::env::var("BATCH_PAUSE_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.batch_pause_ms),
            run_timeout_secs: std::env::var("RUN_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.run_timeout_secs),
            poll_interval_ms: std::env::var("POLL_INTERVAL_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.poll_interval_ms),
            chunk_timeout_secs: std::env::var("CHUNK_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.chunk_timeout_secs),
            upload_timeout_secs: std::env::var("UPLOAD_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.upload_timeout_secs),
            fine_tuning_threshold: std::env::var("FINE_TUNING_THRESHOLD").ok().and_then(|v| v.parse().ok()).unwrap_or(default.fine_tuning_threshold),
            fine_tuning_model: std::env::var("FINE_TUNING_MODEL").unwrap_or(default.fine_tuning_model),
            default_model: std::env::var("DEFAULT_MODEL").unwrap_or(default.default_model),
            assistant_cache_ttl_secs: std::env::var("ASSISTANT_CACHE_TTL_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.assistant_cache_ttl_secs),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            openai_api_key: std::env::var("OPENAI_API_KEY").unwrap_or(default.openai_api_key),
            openai_api_base: std::env::var("OPENAI_API_BASE").unwrap_or(default.openai_api_base),
            ocr_endpoint: std::env::var("OCR_ENDPOINT").unwrap_or(default.ocr_endpoint),
        }
    }
}
