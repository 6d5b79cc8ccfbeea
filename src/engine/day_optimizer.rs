// ==========================================
// 输液日间治疗排程系统 - 单日重排优化引擎
// ==========================================
// 职责: 对某日已落位治疗重新选择开始时间
// 输入: 当日排班 + 已落位治疗 (药品/疗程次数/原开始时间)
// 输出: 治疗 -> 新开始时间 + 全日均衡/占用评分
// 红线: 无可行时段的治疗保持原时间,计为失败
// ==========================================

use crate::config::{DepartmentConfig, OptimizerWeights};
use crate::domain::medication::MedicationCatalog;
use crate::domain::staff::DailyRoster;
use crate::domain::time::{format_minute, Minute};
use crate::domain::treatment::{ExistingTreatment, ExpandedTreatment, TreatmentId, TreatmentPlacement};
use crate::engine::action_expander::ActionExpander;
use crate::engine::day_plan::{DayPlan, PlacementOutcome};
use crate::engine::error::EngineResult;
use crate::engine::staff_scheduler::StaffStats;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

// ==========================================
// DayOptimizationResult - 单日优化结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayOptimizationResult {
    pub date: NaiveDate,
    /// 治疗 -> 新开始时间 (失败的治疗保持原时间)
    pub new_start_times: BTreeMap<TreatmentId, Minute>,
    pub placements: Vec<TreatmentPlacement>,
    pub failed: Vec<TreatmentId>,
    pub score: DayScore,
    pub staff_stats: Vec<StaffStats>,
}

/// 全日评分 (优化后)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayScore {
    /// 1 - (max-min)/max
    pub staff_balance: f64,
    pub peak_occupancy: u32,
    /// 营业时间内平均占用
    pub average_occupancy: f64,
    pub optimized_count: usize,
    pub failed_count: usize,
}

// ==========================================
// DayOptimizer - 单日重排优化引擎
// ==========================================
pub struct DayOptimizer<'a> {
    catalog: &'a MedicationCatalog,
    config: &'a DepartmentConfig,
    weights: OptimizerWeights,
}

/// 单个候选时段的模拟结果
struct Candidate {
    score: f64,
    plan: DayPlan,
    placement: TreatmentPlacement,
}

impl<'a> DayOptimizer<'a> {
    pub fn new(catalog: &'a MedicationCatalog, config: &'a DepartmentConfig) -> Self {
        Self {
            catalog,
            config,
            weights: OptimizerWeights::default(),
        }
    }

    pub fn with_weights(mut self, weights: OptimizerWeights) -> Self {
        self.weights = weights;
        self
    }

    /// 重排一日
    ///
    /// 流程:
    /// 1) 展开全部治疗,按时长升序 (短的先排,更易填缝)
    /// 2) 逐个评估 30 分钟网格 (跳过午休/茶歇开始的时段)
    /// 3) 丢弃越过闭科或座位不足的候选,模拟分配护士
    /// 4) 加权评分取最高 (同分取最早),提交后再排下一个
    ///
    /// # 错误
    /// 配置无效、药品不存在或无疗程定义时返回 EngineError
    #[instrument(skip(self, roster, treatments), fields(
        date = %roster.date,
        treatments_count = treatments.len(),
        staff_count = roster.staff.len()
    ))]
    pub fn optimize(
        &self,
        roster: &DailyRoster,
        treatments: &[ExistingTreatment],
    ) -> EngineResult<DayOptimizationResult> {
        self.config.validate()?;
        let expander = ActionExpander::new(self.catalog, self.config);

        let mut queue: Vec<(&ExistingTreatment, ExpandedTreatment)> = Vec::with_capacity(treatments.len());
        for treatment in treatments {
            let expanded = expander.expand_actions(&treatment.medication_id, treatment.occurrence)?;
            queue.push((treatment, expanded));
        }
        // 稳定排序: 同时长保持原开始时间顺序
        queue.sort_by_key(|(t, e)| (e.total_duration(), t.start));

        let mut plan = DayPlan::new(self.config, roster);
        let mut new_start_times = BTreeMap::new();
        let mut failed = Vec::new();

        for (treatment, expanded) in &queue {
            match self.best_candidate(&plan, treatment.treatment_id, expanded) {
                Some(best) => {
                    debug!(
                        treatment_id = %treatment.treatment_id,
                        from = %format_minute(treatment.start),
                        to = %format_minute(best.placement.start),
                        score = best.score,
                        "治疗已重排"
                    );
                    new_start_times.insert(treatment.treatment_id, best.placement.start);
                    plan = best.plan;
                }
                None => {
                    warn!(
                        treatment_id = %treatment.treatment_id,
                        medication_id = %treatment.medication_id,
                        original = %format_minute(treatment.start),
                        "无可行时段,保持原时间"
                    );
                    let kept_start = self.keep_original(&mut plan, treatment, expanded);
                    new_start_times.insert(treatment.treatment_id, kept_start);
                    failed.push(treatment.treatment_id);
                }
            }
        }

        let score = self.day_score(&plan, queue.len() - failed.len(), failed.len());
        info!(
            optimized = score.optimized_count,
            failed = score.failed_count,
            balance = score.staff_balance,
            peak = score.peak_occupancy,
            "单日重排完成"
        );

        Ok(DayOptimizationResult {
            date: roster.date,
            new_start_times,
            staff_stats: plan.scheduler().staff_stats(),
            placements: plan.into_placements(),
            failed,
            score,
        })
    }

    // ==========================================
    // 候选评估
    // ==========================================

    /// 候选开始时间: 开科起每 optimizer_slot_step 一格,跳过休息窗口
    pub fn candidate_slots(&self, duration: Minute) -> Vec<Minute> {
        let cfg = self.config;
        let step = cfg.optimizer_slot_step.max(1);
        let mut slots = Vec::new();
        let mut slot = cfg.opening_minute;
        while slot + duration <= cfg.closing_minute {
            let in_lunch = slot >= cfg.lunch_start && slot < cfg.lunch_end;
            let in_coffee = slot >= cfg.coffee_start && slot < cfg.coffee_end;
            if !in_lunch && !in_coffee {
                slots.push(slot);
            }
            slot += step;
        }
        slots
    }

    fn best_candidate(
        &self,
        plan: &DayPlan,
        treatment_id: TreatmentId,
        expanded: &ExpandedTreatment,
    ) -> Option<Candidate> {
        let duration = expanded.total_duration();
        let mut best: Option<Candidate> = None;

        for slot in self.candidate_slots(duration) {
            if !plan.seat_available(expanded, slot, duration) {
                continue;
            }
            // 座位余量按提交前台账计算
            let headroom = self.seat_headroom(plan, slot, duration);
            let (trial, placement) = match plan.simulate(treatment_id, expanded, slot) {
                Ok(found) => found,
                Err(_) => continue,
            };
            let score = self.weights.seat_headroom * headroom
                + self.weights.staff_balance * trial.scheduler().balance_score()
                + self.weights.proximity * self.proximity(placement.start)
                - self.weights.forced_penalty * placement.forced_count() as f64;

            // 严格大于: 同分保留更早的时段
            if best.as_ref().map_or(true, |b| score > b.score) {
                best = Some(Candidate {
                    score,
                    plan: trial,
                    placement,
                });
            }
        }
        best
    }

    fn seat_headroom(&self, plan: &DayPlan, start: Minute, duration: Minute) -> f64 {
        let seats = plan.ledger().total_seats();
        if seats == 0 {
            return 0.0;
        }
        1.0 - plan.ledger().peak_occupancy(start, duration) as f64 / seats as f64
    }

    fn proximity(&self, start: Minute) -> f64 {
        let span = self.config.department_minutes().max(1) as f64;
        let distance = (start - self.config.ideal_start).abs() as f64;
        (1.0 - distance / span).max(0.0)
    }

    /// 失败治疗: 尽量按原时间落位,否则只占座位 (座位足够时)
    ///
    /// 返回实际开始时间 (上针顺延时晚于原时间)
    fn keep_original(&self, plan: &mut DayPlan, treatment: &ExistingTreatment, expanded: &ExpandedTreatment) -> Minute {
        match plan.place_treatment(treatment.treatment_id, expanded, treatment.start) {
            PlacementOutcome::Placed(placement) => placement.start,
            PlacementOutcome::Rejected(reason) => {
                debug!(
                    treatment_id = %treatment.treatment_id,
                    reason = %reason,
                    "原时间也无法完整分配护士"
                );
                plan.reserve_seats(expanded, treatment.start);
                treatment.start
            }
        }
    }

    fn day_score(&self, plan: &DayPlan, optimized: usize, failed: usize) -> DayScore {
        let ledger = plan.ledger();
        let span = self.config.department_minutes();
        DayScore {
            staff_balance: plan.scheduler().balance_score(),
            peak_occupancy: ledger.day_peak(),
            average_occupancy: ledger.average_occupancy(self.config.opening_minute, span),
            optimized_count: optimized,
            failed_count: failed,
        }
    }
}
