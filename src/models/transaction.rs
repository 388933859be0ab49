//! 交易数据模型
//!
//! `RawTransaction` 是助手从单页文本中抽取出来的原始记录，只存在于
//! "解析 → 分组" 之间。分组之后变成 `TransactionHeader`（按支票号聚合）
//! 和它独占的 `TransactionDetail` 列表，最后展平成 `FlatTransaction` 序列
//! 供调用方落账。
//!
//! 字段名与下游账务系统的线上格式保持一致（包括历史遗留的
//! `typeAdjusment` 拼写）。

use serde::{Deserialize, Serialize};

/// 助手抽取出的一条原始财务记录
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTransaction {
    #[serde(default)]
    pub patient_id: Option<String>,
    #[serde(default)]
    pub patient_name: Option<String>,
    #[serde(default)]
    pub insurance_company: Option<String>,
    #[serde(default)]
    pub check_amount: Option<f64>,
    #[serde(default)]
    pub payment_type: Option<String>,
    #[serde(default)]
    pub posted_amount: Option<f64>,
    #[serde(default)]
    pub check_number: Option<String>,
    #[serde(default)]
    pub service_date: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub other_amount: Option<f64>,
}

/// 一个支票/付款分组的头记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionHeader {
    pub id: Option<i32>,
    pub insurance: Option<String>,
    /// 明细金额之和，两位小数定点格式化，分组或展平时重新计算
    pub amount: Option<String>,
    pub check_number: Option<String>,
    pub is_active: bool,
    pub posted_by_lsi: bool,
    pub verify_total_amount: bool,
    /// 明细条数，始终等于 `details.len()`
    pub claim_number: usize,
    pub custom_color: CustomColor,
    pub eft_amount_difference: f64,
    pub check_amount_difference: f64,
    // 线上格式的历史拼写，不能改
    #[serde(rename = "typeAdjusment")]
    pub type_adjustment: String,
    pub is_day_ended_by_cash_poster: bool,
    pub payment_type_id: i32,
    pub payment_type_name: Option<String>,
    /// 在整个文档内的顺序（1 起），展平时分配
    pub order_in_list: usize,
    pub details: Vec<TransactionDetail>,
}

/// 支票分组内的一行明细
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDetail {
    pub id: Option<i32>,
    pub check_number: Option<String>,
    /// posted_amount，为零或缺失时退回 check_amount
    pub amount: f64,
    pub patient_name: Option<String>,
    pub cpdp_id: i32,
    pub flash_report_note: Option<String>,
    pub tipology_service_date: Option<String>,
    pub audit_is_mandatory: bool,
    pub audit_done: bool,
    pub max_date_penalty: bool,
    pub verify: bool,
    /// 分组内顺序（1 起）
    pub sub_order_in_list: usize,
    pub show_row: bool,
    pub remove_detail: bool,
    /// 每个分组恰好最后一条明细为 true
    pub last_row: bool,
}

/// 行显示颜色
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomColor {
    pub background: String,
    #[serde(rename = "textColor")]
    pub text_color: String,
}

impl Default for CustomColor {
    fn default() -> Self {
        Self {
            background: "#FFFFFF".to_string(),
            text_color: "#000000".to_string(),
        }
    }
}

/// 展平后的一行：头记录或明细
///
/// 用显式的和类型代替松散的字典，序列化形状与原始接口一致
/// （untagged，头和明细各自按字段展开）。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FlatTransaction {
    Header(TransactionHeader),
    Detail(TransactionDetail),
}

impl FlatTransaction {
    pub fn is_header(&self) -> bool {
        matches!(self, FlatTransaction::Header(_))
    }

    pub fn as_header(&self) -> Option<&TransactionHeader> {
        match self {
            FlatTransaction::Header(h) => Some(h),
            FlatTransaction::Detail(_) => None,
        }
    }

    pub fn as_detail(&self) -> Option<&TransactionDetail> {
        match self {
            FlatTransaction::Header(_) => None,
            FlatTransaction::Detail(d) => Some(d),
        }
    }
}
