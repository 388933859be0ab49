/// 日志工具模块
///
/// 提供日志初始化和输出的辅助函数
use tracing_subscriber::EnvFilter;

/// 初始化全局日志订阅者
///
/// # 参数
/// - `verbose`: 为 true 时默认级别为 debug，否则为 info；
///   `RUST_LOG` 环境变量优先
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录流水线启动信息
///
/// # 参数
/// - `file_name`: 文件名
/// - `office_id`: 办公室编号
/// - `batch_size`: 每批并发 chunk 数
pub fn log_startup(file_name: &str, office_id: i32, batch_size: usize) {
    tracing::info!("{}", "=".repeat(60));
    tracing::info!("🚀 文档抽取流水线启动");
    tracing::info!("📄 文件: {}", file_name);
    tracing::info!("🏢 办公室: {}", office_id);
    tracing::info!("📊 每批并发 chunk 数: {}", batch_size);
    tracing::info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
