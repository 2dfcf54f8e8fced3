use thiserror::Error;

/// 应用程序错误类型
///
/// 只覆盖基础设施层面的失败（浏览器、配置、快照文件）。
/// 页面结构缺失、文本匹配失败等情况在核心流程里都是静默的空操作，不会走到这里。
#[derive(Debug, Error)]
pub enum AppError {
    /// 浏览器相关错误
    #[error("浏览器错误: {0}")]
    Browser(#[from] BrowserError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 快照文件错误
    #[error("快照错误: {0}")]
    Snapshot(#[from] SnapshotError),
}

/// 浏览器相关错误
#[derive(Debug, Error)]
pub enum BrowserError {
    /// 连接浏览器失败
    #[error("无法连接到浏览器 (端口: {port}): {source}")]
    ConnectionFailed {
        port: u16,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 创建页面失败
    #[error("创建页面失败: {source}")]
    PageCreationFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 导航失败
    #[error("导航到 {url} 失败: {source}")]
    NavigationFailed {
        url: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 执行脚本失败
    #[error("执行脚本失败: {source}")]
    ScriptExecutionFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 脚本返回值无法解析
    #[error("脚本返回值无法解析: {source}")]
    UnexpectedScriptResult {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 浏览器配置失败
    #[error("浏览器配置失败: {message}")]
    ConfigurationFailed { message: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 扫描规则文件读取失败
    #[error("无法读取扫描规则文件 {path}: {source}")]
    ProfileReadFailed {
        path: String,
        source: std::io::Error,
    },
    /// 扫描规则文件解析失败
    #[error("无法解析扫描规则 {path}: {source}")]
    ProfileParseFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 选择器语法错误
    #[error("无效的选择器 '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
    /// 正则表达式构建失败
    #[error("无效的匹配模式 '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },
}

/// 快照文件错误
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// 读取快照失败
    #[error("读取快照文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        source: std::io::Error,
    },
    /// 快照 JSON 解析失败
    #[error("快照 JSON 解析失败 ({path}): {source}")]
    JsonParseFailed {
        path: String,
        source: serde_json::Error,
    },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建浏览器连接错误
    pub fn browser_connection_failed(
        port: u16,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Browser(BrowserError::ConnectionFailed {
            port,
            source: Box::new(source),
        })
    }

    /// 创建选择器语法错误
    pub fn invalid_selector(selector: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Config(ConfigError::InvalidSelector {
            selector: selector.into(),
            reason: reason.into(),
        })
    }

    /// 创建匹配模式错误
    pub fn invalid_pattern(pattern: impl Into<String>, source: regex::Error) -> Self {
        AppError::Config(ConfigError::InvalidPattern {
            pattern: pattern.into(),
            source,
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
