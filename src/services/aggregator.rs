//! 平均值计算 - 业务能力层
//!
//! 两种口径并存：
//! - UE 内：按系数加权
//! - UE 之间：不加权的算术平均（UE 自身的系数不参与）

use crate::models::{GradeRecord, OverallResult};

/// UE 加权平均：只统计有成绩的评估；有效系数和为 0 时返回 `None`
pub fn compute_group_average(records: &[GradeRecord]) -> Option<f64> {
    let (weighted_sum, weight_sum) = records
        .iter()
        .filter_map(|r| r.note.map(|note| (note, f64::from(r.coefficient))))
        .fold((0.0, 0.0), |(sum, weights), (note, coef)| {
            (sum + note * coef, weights + coef)
        });

    if weight_sum == 0.0 {
        None
    } else {
        Some(weighted_sum / weight_sum)
    }
}

/// 总平均：忽略 `None`，对剩下的 UE 平均做算术平均；一个都没有时返回 `None`
pub fn compute_overall(group_averages: &[Option<f64>]) -> Option<OverallResult> {
    let counted: Vec<f64> = group_averages.iter().flatten().copied().collect();
    if counted.is_empty() {
        return None;
    }

    Some(OverallResult {
        average: counted.iter().sum::<f64>() / counted.len() as f64,
        counted_groups: counted.len(),
    })
}
