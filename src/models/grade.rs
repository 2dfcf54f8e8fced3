use serde::{Deserialize, Serialize};

use crate::infrastructure::NodeId;

/// 一条评估成绩
///
/// `note` 为 `None` 表示尚未评分（页面上显示为占位符）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradeRecord {
    pub note: Option<f64>,
    pub coefficient: u32,
}

impl GradeRecord {
    pub fn new(note: Option<f64>, coefficient: u32) -> Self {
        Self { note, coefficient }
    }
}

/// 一个 UE 及其评估
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    /// 标题首行清理后的文本
    pub identifier: String,
    /// 标题节点，修补器写入的位置
    pub header: NodeId,
    pub records: Vec<GradeRecord>,
    /// 加权平均；有效系数和为 0 时为 `None`
    pub average: Option<f64>,
}

/// 总平均：各 UE 平均的算术平均（不加权）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverallResult {
    pub average: f64,
    pub counted_groups: usize,
}
