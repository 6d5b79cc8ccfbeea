// ==========================================
// 输液日间治疗排程系统 - 核心库
// ==========================================
// 技术栈: Rust + serde + tracing
// 系统定位: 排程核心 (持久化/界面由调用方负责)
// 数据流: 药品目录 + 排班 -> 动作展开 -> {座位台账, 护士分配}
//         -> {单日优化, 周/批量分配} -> 提交结果 -> 负荷报表
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 配置层 - 科室配置与评分权重
pub mod config;

// 引擎层 - 排程规则
pub mod engine;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{ActionType, AssignmentMode, MedicationPriority};

// 领域实体
pub use domain::{
    DailyRoster, ExistingTreatment, ExpandedTreatment, GeneratedAction, Medication,
    MedicationCatalog, StaffId, StaffMember, TreatmentId, TreatmentPlacement, TreatmentRequest,
};

// 配置
pub use config::{DepartmentConfig, DistributorWeights, OptimizerWeights, ReportThresholds};

// 引擎
pub use engine::{
    ActionExpander, DayOptimizer, DayPlan, EngineError, OccupancyLedger, StaffScheduler,
    WeekDistributor, WorkloadReporter,
};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "输液日间治疗排程系统";
