// ==========================================
// 输液日间治疗排程系统 - 配置层
// ==========================================
// 职责: 科室常量与评分权重,支持 JSON 加载与 key-value 覆写
// ==========================================

pub mod department_config;
pub mod error;
pub mod scoring_profile;

// 重导出核心配置
pub use department_config::{config_keys, DepartmentConfig};
pub use error::ConfigError;
pub use scoring_profile::{DistributorWeights, OptimizerWeights, ReportThresholds};
