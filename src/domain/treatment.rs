// ==========================================
// 输液日间治疗排程系统 - 治疗/任务领域模型
// ==========================================
// 职责: 动作展开结果、护士任务、治疗落位记录
// 红线: 治疗时长 = max(offset + duration), 不是求和
// ==========================================

use crate::domain::staff::StaffId;
use crate::domain::time::{minute_to_time, Minute};
use crate::domain::types::{ActionType, AssignmentMode};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==========================================
// TreatmentId - 治疗标识
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TreatmentId(pub Uuid);

impl TreatmentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// 由业务键派生的稳定标识 (UUID v5): 相同输入得到相同 id
    pub fn derived(key: &str) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes()))
    }
}

impl Default for TreatmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TreatmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ==========================================
// GeneratedAction - 展开后的动作
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedAction {
    pub name: String,
    #[serde(rename = "type")]
    pub action_type: ActionType,
    /// 占用时段 (分钟)
    pub duration: Minute,
    /// 相对治疗开始的偏移
    pub offset: Minute,
    /// 护士实际耗时 (计入工作量), None 时取 duration
    #[serde(default)]
    pub actual_duration: Option<Minute>,
    /// 相对输液开始的偏移 (仅输液中任务)
    #[serde(default)]
    pub offset_from_infusion_start: Option<Minute>,
    pub requires_nurse: bool,
}

impl GeneratedAction {
    pub fn end_offset(&self) -> Minute {
        self.offset + self.duration
    }

    /// 计入护士工作量的分钟数
    pub fn workload_minutes(&self) -> Minute {
        self.actual_duration.unwrap_or(self.duration)
    }
}

// ==========================================
// ExpandedTreatment - 动作展开结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandedTreatment {
    pub medication_id: String,
    pub occurrence: u32,
    pub actions: Vec<GeneratedAction>,
    /// 是否计入座位占用 (皮下注射为 false)
    pub counts_toward_seats: bool,
}

impl ExpandedTreatment {
    /// 治疗墙钟时长 = 所有动作 offset+duration 的最大值
    pub fn total_duration(&self) -> Minute {
        self.actions
            .iter()
            .map(GeneratedAction::end_offset)
            .max()
            .unwrap_or(0)
    }

    pub fn infusion(&self) -> Option<&GeneratedAction> {
        self.actions
            .iter()
            .find(|a| a.action_type == ActionType::Infusion)
    }

    pub fn setup(&self) -> Option<&GeneratedAction> {
        self.actions
            .iter()
            .find(|a| a.action_type == ActionType::Setup)
    }
}

// ==========================================
// ScheduledTask - 护士任务台账条目
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledTask {
    pub staff_id: StaffId,
    pub start: Minute,
    pub end: Minute,
    #[serde(rename = "type")]
    pub action_type: ActionType,
    #[serde(default = "default_mode")]
    pub mode: AssignmentMode,
}

fn default_mode() -> AssignmentMode {
    AssignmentMode::Clean
}

// ==========================================
// AssignedAction - 已分配护士的动作
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedAction {
    pub name: String,
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub duration: Minute,
    /// 解析后的偏移 (已计入上针延迟)
    pub offset: Minute,
    pub start: Minute,
    #[serde(default)]
    pub staff_id: Option<StaffId>,
    #[serde(default)]
    pub staff_name: Option<String>,
    #[serde(default)]
    pub mode: Option<AssignmentMode>,
}

impl AssignedAction {
    pub fn end(&self) -> Minute {
        self.start + self.duration
    }
}

// ==========================================
// TreatmentPlacement - 治疗落位 (对外输出)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreatmentPlacement {
    pub treatment_id: TreatmentId,
    pub medication_id: String,
    pub occurrence: u32,
    pub date: NaiveDate,
    /// 治疗开始 (分钟)
    pub start: Minute,
    pub total_duration: Minute,
    pub counts_toward_seats: bool,
    pub actions: Vec<AssignedAction>,
}

impl TreatmentPlacement {
    pub fn start_time(&self) -> NaiveTime {
        minute_to_time(self.start)
    }

    pub fn end(&self) -> Minute {
        self.start + self.total_duration
    }

    /// 是否存在兜底分配
    pub fn has_forced_assignment(&self) -> bool {
        self.forced_count() > 0
    }

    pub fn forced_count(&self) -> usize {
        self.actions
            .iter()
            .filter(|a| a.mode == Some(AssignmentMode::Forced))
            .count()
    }
}

// ==========================================
// TreatmentRequest - 批量排程请求
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreatmentRequest {
    pub medication_id: String,
    pub occurrence: u32,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

// ==========================================
// ExistingTreatment - 已落位治疗 (日优化输入)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistingTreatment {
    pub treatment_id: TreatmentId,
    pub medication_id: String,
    pub occurrence: u32,
    pub start: Minute,
}
