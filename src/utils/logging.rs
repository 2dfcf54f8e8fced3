/// 日志工具模块
///
/// 提供日志格式化和输出的辅助函数
use tracing::info;

use crate::config::Config;

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 ScoDoc 成绩补全程序启动");
    info!(
        "启动时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!(
        "⏱️ 防抖延迟: {} ms | 首次扫描延迟: {} ms",
        config.debounce_ms, config.bootstrap_delay_ms
    );
    info!("{}", "=".repeat(60));
}

/// 记录程序结束信息
///
/// # 参数
/// - `scans`: 本次运行执行的扫描次数
pub fn log_shutdown(scans: usize) {
    info!("\n{}", "─".repeat(60));
    info!("👋 程序结束，共执行 {} 次扫描", scans);
    info!(
        "结束时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "─".repeat(60));
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("Évaluation", 4), "Éval...");
        assert_eq!(truncate_text("DS", 4), "DS");
    }
}
