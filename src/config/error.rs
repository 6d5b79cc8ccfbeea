// ==========================================
// 输液日间治疗排程系统 - 配置层错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 配置层错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件读取失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("配置解析失败: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("未知配置键: {0}")]
    UnknownKey(String),

    #[error("配置值错误 (key={key}): {message}")]
    InvalidValue { key: String, message: String },

    #[error("配置校验失败: {0}")]
    Validation(String),
}
