// ==========================================
// 测试数据构建器 - 用于集成测试
// ==========================================

use chrono::NaiveDate;
use infusion_aps::domain::medication::{ActionTemplate, Medication, MedicationVariant, TimingBreakdown};
use infusion_aps::domain::staff::{DailyRoster, StaffMember};
use infusion_aps::domain::time::Minute;
use infusion_aps::domain::treatment::TreatmentRequest;
use infusion_aps::domain::types::MedicationPriority;
use infusion_aps::engine::DayContextInput;
use infusion_aps::MedicationCatalog;

// ==========================================
// Medication 构建器
// ==========================================

pub struct MedicationBuilder {
    id: String,
    category: String,
    priority: MedicationPriority,
    check_interval: Option<Minute>,
    pc_switch_interval: Option<Minute>,
    pc_switch_duration: Option<Minute>,
    variants: Vec<MedicationVariant>,
}

impl MedicationBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            category: "chemo".to_string(),
            priority: MedicationPriority::Normal,
            check_interval: None,
            pc_switch_interval: None,
            pc_switch_duration: None,
            variants: Vec::new(),
        }
    }

    pub fn low_priority(mut self) -> Self {
        self.priority = MedicationPriority::Low;
        self
    }

    pub fn check_every(mut self, minutes: Minute) -> Self {
        self.check_interval = Some(minutes);
        self
    }

    pub fn pc_switch(mut self, interval: Minute, duration: Minute) -> Self {
        self.pc_switch_interval = Some(interval);
        self.pc_switch_duration = Some(duration);
        self
    }

    /// 按输液分钟数定义某次疗程
    pub fn infusion(mut self, occurrence: u32, minutes: Minute) -> Self {
        self.variants.push(MedicationVariant {
            occurrence,
            timing: Some(TimingBreakdown {
                infusion_minutes: minutes,
                ..Default::default()
            }),
            actions: vec![],
        });
        self
    }

    /// 按显式动作模板定义某次疗程
    pub fn templates(mut self, occurrence: u32, actions: Vec<ActionTemplate>) -> Self {
        self.variants.push(MedicationVariant {
            occurrence,
            timing: None,
            actions,
        });
        self
    }

    pub fn build(self) -> Medication {
        Medication {
            name: format!("{} (test)", self.id),
            id: self.id,
            category: self.category,
            priority: self.priority,
            check_interval: self.check_interval,
            pc_switch_interval: self.pc_switch_interval,
            pc_switch_duration: self.pc_switch_duration,
            variants: self.variants,
        }
    }
}

/// 常用目录: 175 分钟输液 / 60 分钟输液带巡视 / 30 分钟短输液 / 皮下注射 / 低优先级长输液
pub fn standard_catalog() -> MedicationCatalog {
    MedicationCatalog::new(vec![
        MedicationBuilder::new("RITUX").infusion(1, 175).infusion(2, 90).build(),
        MedicationBuilder::new("IRON").infusion(1, 60).check_every(30).build(),
        MedicationBuilder::new("HYDRA").infusion(1, 30).build(),
        MedicationBuilder::new("SC").infusion(1, 0).build(),
        MedicationBuilder::new("IVIG").infusion(1, 240).low_priority().build(),
    ])
}

// ==========================================
// 排班构建器
// ==========================================

pub fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
}

pub fn roster(day: u32, names: &[&str], max_patients: u32) -> DailyRoster {
    DailyRoster::new(
        date(day),
        names
            .iter()
            .map(|n| StaffMember::new(n, max_patients))
            .collect(),
    )
}

pub fn week(days: &[u32], names: &[&str]) -> Vec<DayContextInput> {
    days.iter()
        .map(|&d| DayContextInput::new(roster(d, names, 10)))
        .collect()
}

pub fn request(medication_id: &str, occurrence: u32, quantity: u32) -> TreatmentRequest {
    TreatmentRequest {
        medication_id: medication_id.to_string(),
        occurrence,
        quantity,
    }
}
