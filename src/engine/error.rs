// ==========================================
// 输液日间治疗排程系统 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 注: 产能耗尽 (无护士/无空位) 不是错误,走结果枚举
// ==========================================

use crate::config::ConfigError;
use crate::domain::staff::StaffId;
use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    // ===== 输入数据错误 =====
    #[error("药品不存在: {0}")]
    MedicationNotFound(String),

    #[error("药品未定义任何方案: {0}")]
    NoVariants(String),

    #[error("方案数据错误 (medication={medication_id}, occurrence={occurrence}): {message}")]
    InvalidVariant {
        medication_id: String,
        occurrence: u32,
        message: String,
    },

    #[error("护士不在当日排班中: {0}")]
    UnknownStaff(StaffId),

    // ===== 配置错误 =====
    #[error(transparent)]
    Config(#[from] ConfigError),

    // ===== 内部不变量 =====
    #[error("内部不变量被破坏: {0}")]
    InvariantViolation(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
