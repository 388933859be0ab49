//! 办公室助手配置模型

/// 一个办公室对应的抽取助手
///
/// 在单份文档的处理期间视为不可变：分批调度开始前读取一次，
/// 之后不再变化。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfficeAssistant {
    pub office_id: i32,
    /// 外部助手 API 的助手标识
    pub assistant_id: String,
    /// 该办公室当前使用的模型
    pub model_id: String,
    /// 该办公室的 vector store 标识
    pub vector_store_id: String,
    pub active: bool,
}
