// ==========================================
// 输液日间治疗排程系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含引擎逻辑,不含存储逻辑
// ==========================================

pub mod medication;
pub mod staff;
pub mod time;
pub mod treatment;
pub mod types;

// 重导出核心类型
pub use medication::{ActionTemplate, Medication, MedicationCatalog, MedicationVariant, TimingBreakdown};
pub use staff::{DailyRoster, StaffId, StaffMember};
pub use time::{hm, minute_to_time, time_to_minute, Minute};
pub use treatment::{
    AssignedAction, ExistingTreatment, ExpandedTreatment, GeneratedAction, ScheduledTask,
    TreatmentId, TreatmentPlacement, TreatmentRequest,
};
pub use types::{ActionType, AssignmentMode, MedicationPriority};
