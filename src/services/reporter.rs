//! 控制台报告服务 - 业务能力层
//!
//! 默认只有本次扫描确实写入了新的 UE 平均时才输出表格，避免页面自身的变化刷屏；
//! 离线模式只扫描一次，用 [`Reporter::always`] 每次都输出

use colored::Colorize;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use tracing::info;

use crate::models::{Group, OverallResult};
use crate::services::patcher::{format_average, PASS_THRESHOLD};

#[derive(Debug, Tabled)]
struct ReportRow {
    #[tabled(rename = "UE")]
    identifier: String,
    #[tabled(rename = "Moyenne")]
    average: String,
}

/// 报告输出
#[derive(Debug, Default)]
pub struct Reporter {
    always: bool,
}

impl Reporter {
    pub fn new() -> Self {
        Self { always: false }
    }

    /// 不论有没有新修补都输出
    pub fn always() -> Self {
        Self { always: true }
    }

    /// 这次扫描是否应当输出报告
    pub fn should_emit(&self, new_patches: usize) -> bool {
        self.always || new_patches > 0
    }

    /// UE 与平均的表格；没有平均的 UE 显示为 `-`
    pub fn render_table(&self, groups: &[Group]) -> String {
        let rows = groups.iter().map(|g| ReportRow {
            identifier: g.identifier.clone(),
            average: g.average.map(format_average).unwrap_or_else(|| "-".to_string()),
        });
        Table::new(rows).with(Style::rounded()).to_string()
    }

    /// 总平均一行，及格绿色、不及格红色
    pub fn render_overall(&self, overall: &OverallResult) -> String {
        let value = format_average(overall.average);
        let value = if overall.average >= PASS_THRESHOLD {
            value.green().bold()
        } else {
            value.red().bold()
        };
        format!(
            "📊 Moyenne générale : {} ({} UE)",
            value, overall.counted_groups
        )
    }

    /// 输出本次扫描的报告
    pub fn emit(&self, groups: &[Group], overall: Option<&OverallResult>, new_patches: usize) {
        if !self.should_emit(new_patches) {
            return;
        }
        info!("✓ 本次写入 {} 个 UE 平均\n{}", new_patches, self.render_table(groups));
        match overall {
            Some(overall) => info!("{}", self.render_overall(overall)),
            None => info!("没有可计入总平均的 UE"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::NodeId;

    #[test]
    fn test_table_lists_groups() {
        let groups = vec![
            Group {
                identifier: "UE 1.1".to_string(),
                header: NodeId(1),
                records: vec![],
                average: Some(40.0 / 3.0),
            },
            Group {
                identifier: "UE 1.2".to_string(),
                header: NodeId(2),
                records: vec![],
                average: None,
            },
        ];
        let table = Reporter::new().render_table(&groups);
        assert!(table.contains("UE 1.1"));
        assert!(table.contains("13.33"));
        assert!(table.contains("Moyenne"));
    }

    #[test]
    fn test_overall_line() {
        colored::control::set_override(false);
        let line = Reporter::new().render_overall(&OverallResult {
            average: 13.333,
            counted_groups: 1,
        });
        assert_eq!(line, "📊 Moyenne générale : 13.33 (1 UE)");
    }

    #[test]
    fn test_emit_policy() {
        assert!(!Reporter::new().should_emit(0));
        assert!(Reporter::new().should_emit(2));
        assert!(Reporter::always().should_emit(0));
    }
}
