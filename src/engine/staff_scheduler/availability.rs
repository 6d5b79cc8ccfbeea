use crate::config::DepartmentConfig;
use crate::domain::staff::{StaffId, StaffMember};
use crate::domain::time::Minute;
use serde::{Deserialize, Serialize};

// ==========================================
// StaffAvailability - 护士当日运行态
// ==========================================
// 生命周期: 调度器构造时创建,每次分配修改,单次排程结束后丢弃
#[derive(Debug, Clone, PartialEq)]
pub struct StaffAvailability {
    pub member: StaffMember,
    pub is_coordinator: bool,
    /// 生效的患者上限 (协调护士取较小值)
    pub max_patients: u32,
    pub total_workload: Minute,
    pub setup_count: u32,
    pub last_setup_time: Option<Minute>,
    pub busy_until: Minute,
    /// 仅协调护士: 全天工作量上限
    pub max_workload_minutes: Option<Minute>,
}

impl StaffAvailability {
    pub fn new(member: StaffMember, opening_minute: Minute) -> Self {
        let max_patients = member.max_patients;
        Self {
            member,
            is_coordinator: false,
            max_patients,
            total_workload: 0,
            setup_count: 0,
            last_setup_time: None,
            busy_until: opening_minute,
            max_workload_minutes: None,
        }
    }

    /// 提升为协调护士: 降低患者上限 + 设定工作量上限
    pub fn promote_to_coordinator(&mut self, config: &DepartmentConfig) {
        self.is_coordinator = true;
        self.max_patients = self.max_patients.min(config.coordinator_max_patients);
        self.max_workload_minutes = Some(config.coordinator_max_workload());
    }

    pub fn id(&self) -> StaffId {
        self.member.id
    }

    pub fn name(&self) -> &str {
        &self.member.name
    }

    /// 上针利用率 = setup_count / max_patients
    pub fn utilization(&self) -> f64 {
        if self.max_patients == 0 {
            return f64::INFINITY;
        }
        self.setup_count as f64 / self.max_patients as f64
    }

    /// 下班时刻 (当日分钟), 无下班时间时为闭科
    pub fn work_cutoff(&self, config: &DepartmentConfig) -> Minute {
        match self.member.max_work_time {
            Some(minutes) => (config.opening_minute + minutes).min(config.closing_minute),
            None => config.closing_minute,
        }
    }

    pub fn workload_allows(&self, additional: Minute) -> bool {
        match self.max_workload_minutes {
            Some(limit) => self.total_workload + additional <= limit,
            None => true,
        }
    }

    pub fn has_setup_capacity(&self) -> bool {
        self.setup_count < self.max_patients
    }

    pub fn record(&mut self, start: Minute, end: Minute, workload: Minute, is_setup: bool) {
        self.total_workload += workload;
        self.busy_until = self.busy_until.max(end);
        if is_setup {
            self.setup_count += 1;
            self.last_setup_time = Some(self.last_setup_time.map_or(start, |t| t.max(start)));
        }
    }

    pub fn stats(&self) -> StaffStats {
        StaffStats {
            staff_id: self.id(),
            name: self.member.name.clone(),
            is_coordinator: self.is_coordinator,
            setup_count: self.setup_count,
            max_patients: self.max_patients,
            total_workload: self.total_workload,
            utilization: if self.max_patients == 0 { 0.0 } else { self.utilization() },
        }
    }
}

// ==========================================
// StaffStats - 护士负荷统计 (对外)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffStats {
    pub staff_id: StaffId,
    pub name: String,
    pub is_coordinator: bool,
    pub setup_count: u32,
    pub max_patients: u32,
    pub total_workload: Minute,
    pub utilization: f64,
}
