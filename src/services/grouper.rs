//! 交易分组与展平 - 业务能力层
//!
//! 把解析出的原始记录按支票号聚合成"头 + 明细"结构，再展平成
//! 下游落账用的有序行序列：每个头记录后面紧跟它自己的全部明细。
//!
//! 分组规则：
//! - 支票号为空的记录直接丢弃（不归入默认组）
//! - 分组顺序按支票号在过滤后序列中首次出现的顺序，不排序
//! - 头记录的描述字段（保险公司、付款类型）取组内第一条记录

use std::collections::HashMap;

use crate::models::{
    CustomColor, FlatTransaction, RawTransaction, TransactionDetail, TransactionHeader,
};

/// 下游账务系统的固定付款类型编号
pub const PAYMENT_TYPE_ID: i32 = 1002;

/// 按支票号分组，保持首次出现顺序
pub fn group_by_check(transactions: &[RawTransaction]) -> Vec<TransactionHeader> {
    let mut key_order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<&RawTransaction>> = HashMap::new();

    for transaction in transactions {
        let key = match transaction.check_number.as_deref() {
            Some(k) if !k.is_empty() => k,
            _ => continue,
        };
        let members = groups.entry(key.to_string()).or_default();
        if members.is_empty() {
            key_order.push(key.to_string());
        }
        members.push(transaction);
    }

    key_order
        .iter()
        .map(|key| build_header(key, &groups[key]))
        .collect()
}

fn build_header(check_number: &str, members: &[&RawTransaction]) -> TransactionHeader {
    let first = members[0];

    let mut details: Vec<TransactionDetail> = members
        .iter()
        .enumerate()
        .map(|(i, t)| build_detail(t, i + 1))
        .collect();

    if let Some(last) = details.last_mut() {
        last.last_row = true;
    }

    TransactionHeader {
        id: None,
        insurance: first.insurance_company.clone(),
        amount: first.check_amount.map(|a| a.to_string()),
        check_number: Some(check_number.to_string()),
        is_active: true,
        posted_by_lsi: true,
        verify_total_amount: true,
        claim_number: details.len(),
        custom_color: CustomColor::default(),
        eft_amount_difference: 0.0,
        check_amount_difference: 0.0,
        type_adjustment: "payments".to_string(),
        is_day_ended_by_cash_poster: false,
        payment_type_id: PAYMENT_TYPE_ID,
        payment_type_name: first.payment_type.clone(),
        order_in_list: 1,
        details,
    }
}

fn build_detail(transaction: &RawTransaction, sub_order: usize) -> TransactionDetail {
    // Amount 用 posted_amount；为零或缺失时退回 check_amount
    let mut amount = transaction.posted_amount.unwrap_or(0.0);
    if amount == 0.0 {
        if let Some(check_amount) = transaction.check_amount {
            amount = check_amount;
        }
    }

    TransactionDetail {
        id: None,
        check_number: transaction.check_number.clone(),
        amount,
        patient_name: transaction.patient_name.clone(),
        cpdp_id: 0,
        flash_report_note: transaction.code.clone(),
        tipology_service_date: transaction.service_date.clone(),
        audit_is_mandatory: false,
        audit_done: false,
        max_date_penalty: false,
        verify: false,
        sub_order_in_list: sub_order,
        show_row: true,
        remove_detail: false,
        last_row: false,
    }
}

/// 展平分组结果：头记录后紧跟明细，重算顺序号和汇总字段
pub fn flatten_groups(groups: Vec<TransactionHeader>) -> Vec<FlatTransaction> {
    let mut flattened = Vec::new();

    for (group_index, mut header) in groups.into_iter().enumerate() {
        header.order_in_list = group_index + 1;
        header.claim_number = header.details.len();
        header.type_adjustment = "payments".to_string();
        header.posted_by_lsi = true;

        // 总金额 = 明细金额之和，两位小数定点格式
        let total: f64 = header.details.iter().map(|d| d.amount).sum();
        header.amount = Some(format!("{total:.2}"));

        let detail_count = header.details.len();
        for (i, detail) in header.details.iter_mut().enumerate() {
            detail.sub_order_in_list = i + 1;
            detail.last_row = i + 1 == detail_count;
        }

        let details = header.details.clone();
        flattened.push(FlatTransaction::Header(header));
        flattened.extend(details.into_iter().map(FlatTransaction::Detail));
    }

    flattened
}

/// 分组 + 展平，一个 chunk 解析完之后的完整后处理
pub fn group_and_flatten(transactions: &[RawTransaction]) -> Vec<FlatTransaction> {
    flatten_groups(group_by_check(transactions))
}
