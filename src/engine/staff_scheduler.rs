// ==========================================
// 输液日间治疗排程系统 - 护士分配引擎
// ==========================================
// 红线: 正常路径下同一护士任务不重叠, 两次上针间隔 >= 准备间隔
// 红线: 强制兜底可放宽重叠,但必须在结果中标记 FORCED
// ==========================================
// 职责: 为上针/巡视/拔针等护理动作分配护士
// 输入: 科室配置 + 当日排班 (+ 可选协调护士)
// 输出: StaffAssignment / NoStaffAvailable
// ==========================================
// 注: 调度器状态仅在单日单次排程内有效,
//     服务化部署时必须按日串行调用
// ==========================================

mod availability;
mod scheduler;
mod outcome;


pub use availability::{StaffAvailability, StaffStats};
pub use scheduler::StaffScheduler;
pub use outcome::{AssignOutcome, StaffAssignment};
