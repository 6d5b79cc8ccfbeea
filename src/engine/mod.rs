// ==========================================
// 输液日间治疗排程系统 - 引擎层
// ==========================================
// 职责: 排程核心规则 (动作展开/座位/护士/优化/分配/报表)
// 红线: 同步单线程; 一日一次排程为独占单元,不可重入
// 红线: 产能耗尽走结果枚举,不走错误
// ==========================================

pub mod action_expander;
pub mod day_optimizer;
pub mod day_plan;
pub mod error;
pub mod occupancy;
pub mod staff_scheduler;
pub mod week_distributor;
pub mod workload_reporter;

// 重导出核心引擎
pub use action_expander::ActionExpander;
pub use day_optimizer::{DayOptimizationResult, DayOptimizer, DayScore};
pub use day_plan::{DayPlan, PlacementOutcome, RejectReason};
pub use error::{EngineError, EngineResult};
pub use occupancy::OccupancyLedger;
pub use staff_scheduler::{AssignOutcome, StaffAssignment, StaffAvailability, StaffScheduler, StaffStats};
pub use week_distributor::{
    DayContextInput, DaySummary, DistributionResult, SkipReason, SkippedUnit, WeekDistributor,
};
pub use workload_reporter::{
    AlertKind, AlertSeverity, SlotLoad, WorkloadAlert, WorkloadReport, WorkloadReporter,
};
