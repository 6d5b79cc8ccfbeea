// ==========================================
// 输液日间治疗排程系统 - 护士排班领域模型
// ==========================================
// 来源: 外部排班快照 (只读,按值传入)
// 主键: StaffId (UUID); 外部排班未带 id 时按姓名派生 (UUID v5)
// ==========================================

use crate::domain::time::Minute;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==========================================
// StaffId - 护士标识
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaffId(pub Uuid);

impl StaffId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// 按姓名派生的稳定标识: 同名同 id
    pub fn from_name(name: &str) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()))
    }
}

impl Default for StaffId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StaffId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ==========================================
// StaffMember - 排班条目
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StaffMemberRecord")]
pub struct StaffMember {
    pub id: StaffId,
    pub name: String,
    /// 当日最多可负责的患者 (上针) 数
    pub max_patients: u32,
    /// 下班时间: 开科后的分钟数 (None = 到闭科)
    #[serde(default)]
    pub max_work_time: Option<Minute>,
}

/// 外部排班条目 (id 可缺省)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StaffMemberRecord {
    #[serde(default)]
    id: Option<StaffId>,
    name: String,
    max_patients: u32,
    #[serde(default)]
    max_work_time: Option<Minute>,
}

impl From<StaffMemberRecord> for StaffMember {
    fn from(record: StaffMemberRecord) -> Self {
        Self {
            id: record.id.unwrap_or_else(|| StaffId::from_name(&record.name)),
            name: record.name,
            max_patients: record.max_patients,
            max_work_time: record.max_work_time,
        }
    }
}

impl StaffMember {
    pub fn new(name: &str, max_patients: u32) -> Self {
        Self {
            id: StaffId::new(),
            name: name.to_string(),
            max_patients,
            max_work_time: None,
        }
    }

    pub fn with_max_work_time(mut self, minutes_after_opening: Minute) -> Self {
        self.max_work_time = Some(minutes_after_opening);
        self
    }
}

// ==========================================
// DailyRoster - 单日排班
// ==========================================
// coordinator: 当日协调护士;若不在 staff 中则注入,否则就地提升
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRoster {
    pub date: NaiveDate,
    pub staff: Vec<StaffMember>,
    #[serde(default)]
    pub coordinator: Option<StaffMember>,
}

impl DailyRoster {
    pub fn new(date: NaiveDate, staff: Vec<StaffMember>) -> Self {
        Self {
            date,
            staff,
            coordinator: None,
        }
    }

    pub fn with_coordinator(mut self, coordinator: StaffMember) -> Self {
        self.coordinator = Some(coordinator);
        self
    }
}
