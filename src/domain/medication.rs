// ==========================================
// 输液日间治疗排程系统 - 药品目录领域模型
// ==========================================
// 来源: 外部目录快照 (只读)
// 用途: 动作展开的输入
// ==========================================

use crate::domain::types::{ActionType, MedicationPriority};
use crate::domain::time::Minute;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// ActionTemplate - 显式动作模板
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionTemplate {
    pub name: String,
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub duration: Minute,
    /// 相对治疗开始的偏移 (分钟)
    #[serde(default)]
    pub offset: Minute,
    /// 是否需要护士执行
    #[serde(default)]
    pub is_nurse_action: bool,
}

// ==========================================
// TimingBreakdown - 时长分解
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingBreakdown {
    pub infusion_minutes: Minute,
    /// 护士实际上针耗时 (不改变 15 分钟的上针时段)
    #[serde(default)]
    pub nurse_setup_minutes: Option<Minute>,
    #[serde(default)]
    pub observation_minutes: Minute,
    #[serde(default)]
    pub flush_minutes: Minute,
}

// ==========================================
// MedicationVariant - 按治疗次数区分的方案
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationVariant {
    /// 适用的治疗次数 (第 1/3/7 次...)
    pub occurrence: u32,
    #[serde(default)]
    pub timing: Option<TimingBreakdown>,
    #[serde(default)]
    pub actions: Vec<ActionTemplate>,
}

impl MedicationVariant {
    pub fn has_templates(&self) -> bool {
        !self.actions.is_empty()
    }
}

// ==========================================
// Medication - 药品
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub priority: MedicationPriority,
    #[serde(default)]
    pub check_interval: Option<Minute>,
    #[serde(default)]
    pub pc_switch_interval: Option<Minute>,
    #[serde(default)]
    pub pc_switch_duration: Option<Minute>,
    pub variants: Vec<MedicationVariant>,
}

impl Medication {
    /// 解析治疗次数对应的方案
    ///
    /// 规则:
    /// 1) 取 occurrence <= 请求次数 中最大的一个 (平台期沿用)
    /// 2) 都大于请求次数时,取最小的一个
    pub fn resolve_variant(&self, occurrence: u32) -> Option<&MedicationVariant> {
        self.variants
            .iter()
            .filter(|v| v.occurrence <= occurrence)
            .max_by_key(|v| v.occurrence)
            .or_else(|| self.variants.iter().min_by_key(|v| v.occurrence))
    }
}

// ==========================================
// MedicationCatalog - 药品目录
// ==========================================
// BTreeMap 保证遍历顺序稳定
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MedicationCatalog {
    medications: BTreeMap<String, Medication>,
}

impl MedicationCatalog {
    pub fn new(medications: Vec<Medication>) -> Self {
        Self {
            medications: medications.into_iter().map(|m| (m.id.clone(), m)).collect(),
        }
    }

    pub fn get(&self, medication_id: &str) -> Option<&Medication> {
        self.medications.get(medication_id)
    }

    pub fn insert(&mut self, medication: Medication) {
        self.medications.insert(medication.id.clone(), medication);
    }

    pub fn len(&self) -> usize {
        self.medications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.medications.is_empty()
    }
}
