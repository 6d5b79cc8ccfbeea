// ==========================================
// 输液日间治疗排程系统 - 动作展开引擎
// ==========================================
// 职责: (药品, 治疗次数) -> 有序护理动作序列
// 输入: 药品目录快照 + 科室配置
// 输出: ExpandedTreatment
// 红线: 纯函数,相同输入必须得到相同输出
// ==========================================

use crate::config::DepartmentConfig;
use crate::domain::medication::{ActionTemplate, Medication, MedicationCatalog, TimingBreakdown};
use crate::domain::time::{overlaps, Minute};
use crate::domain::treatment::{ExpandedTreatment, GeneratedAction};
use crate::domain::types::ActionType;
use crate::engine::error::{EngineError, EngineResult};
use tracing::debug;

// ==========================================
// ActionExpander - 动作展开引擎
// ==========================================
pub struct ActionExpander<'a> {
    catalog: &'a MedicationCatalog,
    config: &'a DepartmentConfig,
}

impl<'a> ActionExpander<'a> {
    pub fn new(catalog: &'a MedicationCatalog, config: &'a DepartmentConfig) -> Self {
        Self { catalog, config }
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 展开动作 (规划路径)
    ///
    /// 与 `expand_actions_full` 的区别: 默认过滤 protocol_check,
    /// 除非配置 `keep_protocol_check = true`。该类型是否弃用待产品确认。
    pub fn expand_actions(&self, medication_id: &str, occurrence: u32) -> EngineResult<ExpandedTreatment> {
        let mut expanded = self.expand_actions_full(medication_id, occurrence)?;
        if !self.config.keep_protocol_check {
            expanded
                .actions
                .retain(|a| a.action_type != ActionType::ProtocolCheck);
        }
        Ok(expanded)
    }

    /// 展开动作 (完整路径,保留全部模板类型)
    pub fn expand_actions_full(
        &self,
        medication_id: &str,
        occurrence: u32,
    ) -> EngineResult<ExpandedTreatment> {
        let medication = self
            .catalog
            .get(medication_id)
            .ok_or_else(|| EngineError::MedicationNotFound(medication_id.to_string()))?;

        let variant = medication
            .resolve_variant(occurrence)
            .ok_or_else(|| EngineError::NoVariants(medication_id.to_string()))?;

        let expanded = if variant.has_templates() {
            self.from_templates(medication, occurrence, &variant.actions)?
        } else {
            let timing = variant.timing.clone().unwrap_or_default();
            self.from_timing(medication, occurrence, &timing)?
        };

        debug!(
            medication_id = %medication_id,
            occurrence = occurrence,
            resolved_occurrence = variant.occurrence,
            actions = expanded.actions.len(),
            total_duration = expanded.total_duration(),
            "动作展开完成"
        );

        Ok(expanded)
    }

    // ==========================================
    // 显式模板
    // ==========================================

    fn from_templates(
        &self,
        medication: &Medication,
        occurrence: u32,
        templates: &[ActionTemplate],
    ) -> EngineResult<ExpandedTreatment> {
        let mut sorted: Vec<&ActionTemplate> = templates.iter().collect();
        // 稳定排序: 同 offset 保持模板原顺序
        sorted.sort_by_key(|t| t.offset);

        let infusion_count = sorted
            .iter()
            .filter(|t| t.action_type == ActionType::Infusion)
            .count();
        if infusion_count > 1 {
            return Err(invalid_variant(medication, occurrence, "模板包含多个输液动作"));
        }
        if let Some(bad) = sorted.iter().find(|t| t.duration < 0 || t.offset < 0) {
            return Err(invalid_variant(
                medication,
                occurrence,
                &format!("动作 {} 的时长/偏移为负数", bad.name),
            ));
        }

        let infusion_window = sorted
            .iter()
            .find(|t| t.action_type == ActionType::Infusion)
            .map(|t| (t.offset, t.offset + t.duration));

        let actions: Vec<GeneratedAction> = sorted
            .into_iter()
            .map(|t| {
                let action_type = match (t.action_type, t.is_nurse_action) {
                    (ActionType::Custom, true) => ActionType::CustomNurse,
                    (other, _) => other,
                };
                let offset_from_infusion_start = match infusion_window {
                    Some((start, end))
                        if action_type != ActionType::Infusion && t.offset >= start && t.offset < end =>
                    {
                        Some(t.offset - start)
                    }
                    _ => None,
                };
                GeneratedAction {
                    name: t.name.clone(),
                    action_type,
                    duration: t.duration,
                    offset: t.offset,
                    actual_duration: None,
                    offset_from_infusion_start,
                    requires_nurse: t.is_nurse_action || action_type.requires_nurse(),
                }
            })
            .collect();

        Ok(ExpandedTreatment {
            medication_id: medication.id.clone(),
            occurrence,
            counts_toward_seats: infusion_window.is_some(),
            actions,
        })
    }

    // ==========================================
    // 时长分解合成
    // ==========================================

    /// 按时长分解合成动作
    ///
    /// 顺序: 上针 -> 输液 (期间巡视/血制品更换) -> 冲管 -> 拔针 -> 观察
    /// 输液时长为 0 视为皮下注射: 仅注射 + 可选观察,不计座位
    fn from_timing(
        &self,
        medication: &Medication,
        occurrence: u32,
        timing: &TimingBreakdown,
    ) -> EngineResult<ExpandedTreatment> {
        if timing.infusion_minutes < 0 || timing.observation_minutes < 0 || timing.flush_minutes < 0 {
            return Err(invalid_variant(medication, occurrence, "时长分解包含负数"));
        }

        let cfg = self.config;
        let mut actions = Vec::new();

        if timing.infusion_minutes == 0 {
            actions.push(nurse_action(
                "Injection",
                ActionType::Setup,
                0,
                cfg.injection_minutes,
                timing.nurse_setup_minutes,
            ));
            if timing.observation_minutes > 0 {
                actions.push(passive_action(
                    "Observation",
                    ActionType::Observation,
                    cfg.injection_minutes,
                    timing.observation_minutes,
                ));
            }
            return Ok(ExpandedTreatment {
                medication_id: medication.id.clone(),
                occurrence,
                actions,
                counts_toward_seats: false,
            });
        }

        let infusion = timing.infusion_minutes;
        let infusion_start = cfg.setup_minutes;

        actions.push(nurse_action(
            "Setup",
            ActionType::Setup,
            0,
            cfg.setup_minutes,
            timing.nurse_setup_minutes,
        ));
        actions.push(passive_action("Infusion", ActionType::Infusion, infusion_start, infusion));

        // 输液中任务 (相对输液开始)
        let pc_windows = self.pc_switch_windows(medication, infusion);
        let mut in_infusion: Vec<GeneratedAction> = Vec::new();
        for &(at, duration) in &pc_windows {
            let mut action = nurse_action("PC switch", ActionType::PcSwitch, infusion_start + at, duration, None);
            action.offset_from_infusion_start = Some(at);
            in_infusion.push(action);
        }
        for at in self.check_offsets(medication, infusion, &pc_windows) {
            let mut action = nurse_action("Check", ActionType::Check, infusion_start + at, cfg.check_minutes, None);
            action.offset_from_infusion_start = Some(at);
            in_infusion.push(action);
        }
        in_infusion.sort_by_key(|a| a.offset);
        actions.extend(in_infusion);

        let mut cursor = infusion_start + infusion;
        if timing.flush_minutes > 0 {
            actions.push(passive_action("Flush", ActionType::Flush, cursor, timing.flush_minutes));
            cursor += timing.flush_minutes;
        }
        actions.push(nurse_action("Removal", ActionType::Removal, cursor, cfg.removal_minutes, None));
        cursor += cfg.removal_minutes;
        if timing.observation_minutes > 0 {
            actions.push(passive_action(
                "Observation",
                ActionType::Observation,
                cursor,
                timing.observation_minutes,
            ));
        }

        Ok(ExpandedTreatment {
            medication_id: medication.id.clone(),
            occurrence,
            actions,
            counts_toward_seats: true,
        })
    }

    /// 血制品更换窗口 (相对输液开始的偏移, 时长)
    fn pc_switch_windows(&self, medication: &Medication, infusion: Minute) -> Vec<(Minute, Minute)> {
        let interval = match medication.pc_switch_interval {
            Some(i) if i > 0 => i,
            _ => return Vec::new(),
        };
        let duration = medication
            .pc_switch_duration
            .filter(|d| *d > 0)
            .unwrap_or(self.config.default_pc_switch_minutes);

        let mut windows = Vec::new();
        let mut at = interval;
        while at + duration <= infusion {
            windows.push((at, duration));
            at += interval;
        }
        windows
    }

    /// 巡视偏移 (相对输液开始)
    ///
    /// 跳过: 拔针前最后 15 分钟内 / 与血制品更换窗口重叠
    fn check_offsets(
        &self,
        medication: &Medication,
        infusion: Minute,
        pc_windows: &[(Minute, Minute)],
    ) -> Vec<Minute> {
        let interval = match medication.check_interval {
            Some(i) if i > 0 => i,
            _ => return Vec::new(),
        };
        let check = self.config.check_minutes;
        let last_allowed_end = infusion - self.config.final_check_exclusion_minutes;

        let mut offsets = Vec::new();
        let mut at = interval;
        while at + check <= last_allowed_end {
            let clashes = pc_windows
                .iter()
                .any(|&(pc_at, pc_duration)| overlaps(at, at + check, pc_at, pc_at + pc_duration));
            if !clashes {
                offsets.push(at);
            }
            at += interval;
        }
        offsets
    }
}

fn nurse_action(
    name: &str,
    action_type: ActionType,
    offset: Minute,
    duration: Minute,
    actual_duration: Option<Minute>,
) -> GeneratedAction {
    GeneratedAction {
        name: name.to_string(),
        action_type,
        duration,
        offset,
        actual_duration,
        offset_from_infusion_start: None,
        requires_nurse: true,
    }
}

fn passive_action(name: &str, action_type: ActionType, offset: Minute, duration: Minute) -> GeneratedAction {
    GeneratedAction {
        name: name.to_string(),
        action_type,
        duration,
        offset,
        actual_duration: None,
        offset_from_infusion_start: None,
        requires_nurse: false,
    }
}

fn invalid_variant(medication: &Medication, occurrence: u32, message: &str) -> EngineError {
    EngineError::InvalidVariant {
        medication_id: medication.id.clone(),
        occurrence,
        message: message.to_string(),
    }
}
