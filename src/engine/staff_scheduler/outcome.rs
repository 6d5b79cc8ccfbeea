use crate::domain::staff::StaffId;
use crate::domain::time::Minute;
use crate::domain::types::{ActionType, AssignmentMode};
use serde::{Deserialize, Serialize};

/// 一次成功的护士分配
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffAssignment {
    pub staff_id: StaffId,
    pub staff_name: String,
    pub action_type: ActionType,
    pub start: Minute,
    pub end: Minute,
    pub mode: AssignmentMode,
}

impl StaffAssignment {
    pub fn is_forced(&self) -> bool {
        self.mode == AssignmentMode::Forced
    }
}

/// 分配结果
///
/// `NoStaffAvailable` 是正常的产能耗尽信号,不是错误
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AssignOutcome {
    Assigned(StaffAssignment),
    NoStaffAvailable,
}

impl AssignOutcome {
    pub fn assignment(&self) -> Option<&StaffAssignment> {
        match self {
            AssignOutcome::Assigned(a) => Some(a),
            AssignOutcome::NoStaffAvailable => None,
        }
    }

    pub fn into_assignment(self) -> Option<StaffAssignment> {
        match self {
            AssignOutcome::Assigned(a) => Some(a),
            AssignOutcome::NoStaffAvailable => None,
        }
    }

    pub fn is_assigned(&self) -> bool {
        matches!(self, AssignOutcome::Assigned(_))
    }
}
