use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult, ConfigError};

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 浏览器调试端口
    pub browser_debug_port: u16,
    /// 目标URL（找不到匹配页面时打开）
    pub target_url: String,
    /// 目标页面标题片段
    pub target_title: String,
    /// 是否启动无头浏览器而不是连接已有浏览器
    pub headless: bool,
    /// 无头模式下的浏览器可执行文件
    pub chrome_executable: Option<String>,
    /// 防抖延迟（毫秒）
    pub debounce_ms: u64,
    /// 启动后首次扫描的延迟（毫秒）
    pub bootstrap_delay_ms: u64,
    /// 扫描规则 TOML 文件
    pub profile_path: Option<String>,
    /// 离线快照文件（设置后不连接浏览器）
    pub snapshot_path: Option<String>,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browser_debug_port: 9222,
            target_url: "https://scodoc.example.org/ScoDoc/".to_string(),
            target_title: "Relevé".to_string(),
            headless: false,
            chrome_executable: None,
            debounce_ms: 500,
            bootstrap_delay_ms: 1000,
            profile_path: None,
            snapshot_path: None,
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            browser_debug_port: std::env::var("BROWSER_DEBUG_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.browser_debug_port),
            target_url: std::env::var("TARGET_URL").unwrap_or(default.target_url),
            target_title: std::env::var("TARGET_TITLE").unwrap_or(default.target_title),
            headless: std::env::var("HEADLESS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.headless),
            chrome_executable: std::env::var("CHROME_EXECUTABLE").ok().or(default.chrome_executable),
            debounce_ms: std::env::var("DEBOUNCE_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.debounce_ms),
            bootstrap_delay_ms: std::env::var("BOOTSTRAP_DELAY_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.bootstrap_delay_ms),
            profile_path: std::env::var("PROFILE_PATH").ok().or(default.profile_path),
            snapshot_path: std::env::var("SNAPSHOT_PATH").ok().or(default.snapshot_path),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
        }
    }

    /// 读取扫描规则：有 `profile_path` 时从 TOML 加载，否则使用默认规则
    pub fn load_profile(&self) -> AppResult<ScanProfile> {
        match &self.profile_path {
            Some(path) => ScanProfile::from_toml_file(Path::new(path)),
            None => Ok(ScanProfile::default()),
        }
    }
}

/// 扫描规则
///
/// 描述"在页面的哪里找 UE、哪里找评估、怎样识别奖励项"。
/// 页面结构不是契约，所有选择器和文本记号都集中在这里，便于调整。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanProfile {
    /// 宿主元素（通常带 shadow root）
    pub host_selector: String,
    /// UE 标题节点
    pub header_selector: String,
    /// 评估行节点
    pub item_selector: String,
    /// 评估行内的系数子节点
    pub coef_selector: Option<String>,
    /// 评估行内的成绩子节点
    pub note_selector: Option<String>,
    /// 奖励 UE 的 class
    pub bonus_class: String,
    /// UE 名称必须以此开头（不区分大小写）
    pub group_name_token: String,
    /// 未评分/待填充的占位符
    pub placeholder: String,
    /// 已修补标记属性
    pub marker_attribute: String,
    /// 总平均显示节点的 id
    pub summary_id: String,
}

impl Default for ScanProfile {
    fn default() -> Self {
        Self {
            host_selector: "releve-but".to_string(),
            header_selector: ".ue".to_string(),
            item_selector: ".eval".to_string(),
            coef_selector: Some(".coef".to_string()),
            note_selector: None,
            bonus_class: "bonus".to_string(),
            group_name_token: "UE".to_string(),
            placeholder: "~".to_string(),
            marker_attribute: "data-scodoc-patched".to_string(),
            summary_id: "scodoc-patcher-summary".to_string(),
        }
    }
}

impl ScanProfile {
    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|e| {
            AppError::Config(ConfigError::ProfileParseFailed {
                path: String::new(),
                source: Box::new(e),
            })
        })
    }

    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(ConfigError::ProfileReadFailed {
                path: path.display().to_string(),
                source: e,
            })
        })?;
        toml::from_str(&content).map_err(|e| {
            AppError::Config(ConfigError::ProfileParseFailed {
                path: path.display().to_string(),
                source: Box::new(e),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_profile_keeps_defaults() {
        let profile = ScanProfile::from_toml_str(
            r#"
            host_selector = "releve-dut"
            bonus_class = "ue-bonus"
            "#,
        )
        .unwrap();

        assert_eq!(profile.host_selector, "releve-dut");
        assert_eq!(profile.bonus_class, "ue-bonus");
        assert_eq!(profile.placeholder, "~");
        assert_eq!(profile.coef_selector.as_deref(), Some(".coef"));
    }

    #[test]
    fn test_invalid_profile_is_config_error() {
        let err = ScanProfile::from_toml_str("host_selector = 12").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_missing_profile_path_uses_default() {
        let config = Config::default();
        assert_eq!(config.load_profile().unwrap(), ScanProfile::default());
    }
}
