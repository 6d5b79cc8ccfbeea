// ==========================================
// 输液日间治疗排程系统 - 周/批量分配引擎
// ==========================================
// 职责: 把 (药品, 疗程次数, 数量) 请求逐个落到 (日期 x 时段)
// 输入: 请求列表 + 候选日期上下文 (排班/已提交治疗/当日上限)
// 输出: 已落位治疗 + 跳过清单 (含原因)
// 红线: 单元严格串行处理,后一单元看到前一单元的累计影响
// 红线: 当日上限已满时直接跳过,不做模拟
// ==========================================

use crate::config::{DepartmentConfig, DistributorWeights};
use crate::domain::medication::MedicationCatalog;
use crate::domain::staff::DailyRoster;
use crate::domain::time::{format_minute, Minute};
use crate::domain::treatment::{ExpandedTreatment, TreatmentId, TreatmentPlacement, TreatmentRequest};
use crate::domain::types::MedicationPriority;
use crate::engine::action_expander::ActionExpander;
use crate::engine::day_plan::DayPlan;
use crate::engine::error::EngineResult;
use crate::engine::staff_scheduler::StaffStats;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, instrument, warn};

// ==========================================
// DayContextInput - 候选日期输入
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayContextInput {
    pub roster: DailyRoster,
    /// 当日已提交治疗 (预置到调度器和台账)
    #[serde(default)]
    pub committed: Vec<TreatmentPlacement>,
    /// 当日治疗数上限 (含已提交)
    #[serde(default)]
    pub capacity_ceiling: Option<usize>,
}

impl DayContextInput {
    pub fn new(roster: DailyRoster) -> Self {
        Self {
            roster,
            committed: Vec::new(),
            capacity_ceiling: None,
        }
    }

    pub fn with_committed(mut self, committed: Vec<TreatmentPlacement>) -> Self {
        self.committed = committed;
        self
    }

    pub fn with_capacity_ceiling(mut self, ceiling: usize) -> Self {
        self.capacity_ceiling = Some(ceiling);
        self
    }
}

// ==========================================
// SkipReason - 跳过原因
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkipReason {
    /// 所有候选日期均已达当日上限
    DayCapacityReached,
    /// 模拟全部失败 (座位或护士不足)
    NoFeasibleSlot,
    /// 药品无法展开
    ExpansionFailed { message: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::DayCapacityReached => write!(f, "DAY_CAPACITY_REACHED: day capacity reached"),
            SkipReason::NoFeasibleSlot => {
                write!(f, "NO_FEASIBLE_SLOT: no date/slot could assign every action")
            }
            SkipReason::ExpansionFailed { message } => write!(f, "EXPANSION_FAILED: {}", message),
        }
    }
}

/// 跳过的单元
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedUnit {
    pub medication_id: String,
    pub occurrence: u32,
    /// 请求内序号 (0 起)
    pub unit_index: u32,
    pub reason: SkipReason,
}

/// 单日汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySummary {
    pub date: NaiveDate,
    pub placed_count: usize,
    pub peak_occupancy: u32,
    pub staff_stats: Vec<StaffStats>,
}

// ==========================================
// DistributionResult - 分配结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionResult {
    /// 本次新落位 (不含预置的已提交治疗)
    pub placed: Vec<TreatmentPlacement>,
    pub skipped: Vec<SkippedUnit>,
    pub days: Vec<DaySummary>,
}

/// 展开后的待分配单元
#[derive(Debug, Clone)]
struct Unit {
    treatment_id: TreatmentId,
    medication_id: String,
    occurrence: u32,
    unit_index: u32,
    priority: MedicationPriority,
    expanded: ExpandedTreatment,
}

/// 单个 (日期, 时段) 模拟结果
struct Trial {
    score: f64,
    day_index: usize,
    plan: DayPlan,
    placement: TreatmentPlacement,
}

// ==========================================
// WeekDistributor - 周/批量分配引擎
// ==========================================
pub struct WeekDistributor<'a> {
    catalog: &'a MedicationCatalog,
    config: &'a DepartmentConfig,
    weights: DistributorWeights,
}

impl<'a> WeekDistributor<'a> {
    pub fn new(catalog: &'a MedicationCatalog, config: &'a DepartmentConfig) -> Self {
        Self {
            catalog,
            config,
            weights: DistributorWeights::default(),
        }
    }

    pub fn with_weights(mut self, weights: DistributorWeights) -> Self {
        self.weights = weights;
        self
    }

    /// 批量分配
    ///
    /// 流程:
    /// 1) 请求按数量拆成单元并展开动作 (展开失败的单元直接跳过)
    /// 2) 排序: 普通优先级在前,时长降序 (难排的先排)
    /// 3) 逐单元模拟全部 (日期 x 时段),丢弃无法完整分配的模拟
    /// 4) 取得分最低者提交,更新该日上下文后处理下一单元
    ///
    /// # 错误
    /// 配置无效,或已提交治疗引用了排班外的护士时返回 EngineError
    #[instrument(skip(self, requests, days), fields(
        requests_count = requests.len(),
        days_count = days.len()
    ))]
    pub fn distribute(
        &self,
        requests: &[TreatmentRequest],
        days: &[DayContextInput],
    ) -> EngineResult<DistributionResult> {
        self.config.validate()?;
        let mut plans = Vec::with_capacity(days.len());
        for day in days {
            let mut plan = DayPlan::new(self.config, &day.roster).with_capacity_ceiling(day.capacity_ceiling);
            for placement in &day.committed {
                plan.seed_placement(placement.clone())?;
            }
            plans.push(plan);
        }
        let seeded_counts: Vec<usize> = plans.iter().map(|p| p.placed_count()).collect();

        let mut skipped = Vec::new();
        let batch_key = days
            .iter()
            .map(|d| d.roster.date.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let units = self.expand_units(&batch_key, requests, &mut skipped);
        info!(units = units.len(), expansion_failures = skipped.len(), "单元展开完成");

        for unit in &units {
            match self.place_unit(&plans, unit) {
                Ok(trial) => {
                    debug!(
                        medication_id = %unit.medication_id,
                        date = %trial.placement.date,
                        start = %format_minute(trial.placement.start),
                        score = trial.score,
                        "单元已落位"
                    );
                    plans[trial.day_index] = trial.plan;
                }
                Err(reason) => {
                    warn!(
                        medication_id = %unit.medication_id,
                        occurrence = unit.occurrence,
                        unit_index = unit.unit_index,
                        reason = %reason,
                        "单元跳过"
                    );
                    skipped.push(SkippedUnit {
                        medication_id: unit.medication_id.clone(),
                        occurrence: unit.occurrence,
                        unit_index: unit.unit_index,
                        reason,
                    });
                }
            }
        }

        let days_summary: Vec<DaySummary> = plans
            .iter()
            .map(|p| DaySummary {
                date: p.date(),
                placed_count: p.placed_count(),
                peak_occupancy: p.ledger().day_peak(),
                staff_stats: p.scheduler().staff_stats(),
            })
            .collect();

        let placed: Vec<TreatmentPlacement> = plans
            .into_iter()
            .zip(seeded_counts)
            .flat_map(|(plan, seeded)| plan.into_placements().into_iter().skip(seeded))
            .collect();

        info!(placed = placed.len(), skipped = skipped.len(), "批量分配完成");

        Ok(DistributionResult {
            placed,
            skipped,
            days: days_summary,
        })
    }

    // ==========================================
    // 单元展开与排序
    // ==========================================

    /// 单元 id 由 (候选日期, 请求序号, 药品, 疗程次数, 单元序号) 派生
    fn expand_units(&self, batch_key: &str, requests: &[TreatmentRequest], skipped: &mut Vec<SkippedUnit>) -> Vec<Unit> {
        let expander = ActionExpander::new(self.catalog, self.config);
        let mut units = Vec::new();

        for (request_index, request) in requests.iter().enumerate() {
            let priority = self
                .catalog
                .get(&request.medication_id)
                .map(|m| m.priority)
                .unwrap_or_default();
            match expander.expand_actions(&request.medication_id, request.occurrence) {
                Ok(expanded) => {
                    for unit_index in 0..request.quantity {
                        let key = format!(
                            "{}|{}|{}|{}|{}",
                            batch_key, request_index, request.medication_id, request.occurrence, unit_index
                        );
                        units.push(Unit {
                            treatment_id: TreatmentId::derived(&key),
                            medication_id: request.medication_id.clone(),
                            occurrence: request.occurrence,
                            unit_index,
                            priority,
                            expanded: expanded.clone(),
                        });
                    }
                }
                Err(e) => {
                    for unit_index in 0..request.quantity {
                        skipped.push(SkippedUnit {
                            medication_id: request.medication_id.clone(),
                            occurrence: request.occurrence,
                            unit_index,
                            reason: SkipReason::ExpansionFailed { message: e.to_string() },
                        });
                    }
                }
            }
        }

        // 稳定排序: 同优先级同时长保持请求顺序
        units.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then(b.expanded.total_duration().cmp(&a.expanded.total_duration()))
        });
        units
    }

    // ==========================================
    // 单元模拟
    // ==========================================

    fn place_unit(&self, plans: &[DayPlan], unit: &Unit) -> Result<Trial, SkipReason> {
        let duration = unit.expanded.total_duration();
        let treatment_id = unit.treatment_id;
        let mut best: Option<Trial> = None;
        let mut blocked_days = 0;

        for (day_index, plan) in plans.iter().enumerate() {
            if plan.is_at_capacity() {
                blocked_days += 1;
                continue;
            }
            for slot in self.candidate_slots(duration) {
                if !plan.seat_available(&unit.expanded, slot, duration) {
                    continue;
                }
                let (trial, placement) = match plan.simulate(treatment_id, &unit.expanded, slot) {
                    Ok(found) => found,
                    Err(_) => continue,
                };
                let score = self.score(plan, &trial, &placement);
                // 严格小于: 同分保留更早的日期/时段
                if best.as_ref().map_or(true, |b| score < b.score) {
                    best = Some(Trial {
                        score,
                        day_index,
                        plan: trial,
                        placement,
                    });
                }
            }
        }

        match best {
            Some(trial) => Ok(trial),
            None if !plans.is_empty() && blocked_days == plans.len() => Err(SkipReason::DayCapacityReached),
            None => Err(SkipReason::NoFeasibleSlot),
        }
    }

    /// 候选开始时间: 开科起每 distributor_slot_step 一格
    pub fn candidate_slots(&self, duration: Minute) -> Vec<Minute> {
        let step = self.config.distributor_slot_step.max(1);
        let mut slots = Vec::new();
        let mut slot = self.config.opening_minute;
        while slot + duration <= self.config.closing_minute {
            slots.push(slot);
            slot += step;
        }
        slots
    }

    /// 得分越低越好
    ///
    /// 护士峰值工作量与局部占用权重最高; 当日已排数分摊到各日;
    /// 开始时间仅作最终平手裁决; 兜底分配重罚,只在别无选择时采用
    fn score(&self, before: &DayPlan, after: &DayPlan, placement: &TreatmentPlacement) -> f64 {
        let w = &self.weights;
        let local_peak = after
            .ledger()
            .peak_occupancy(placement.start, placement.total_duration);
        w.peak_staff_workload * after.scheduler().peak_workload() as f64
            + w.local_occupancy * local_peak as f64
            + w.day_load * before.placed_count() as f64
            + w.time_of_day * placement.start as f64
            + w.forced_penalty * placement.forced_count() as f64
    }
}
