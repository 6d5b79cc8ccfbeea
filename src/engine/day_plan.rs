// ==========================================
// 输液日间治疗排程系统 - 单日排程上下文
// ==========================================
// 职责: 把一个展开后的治疗落到当日 (座位 + 护士)
// 输入: 展开动作 + 请求开始时间
// 输出: TreatmentPlacement / 拒绝原因
// 红线: 任一动作分配失败则整单回滚,不留下半截任务
// ==========================================

use crate::config::DepartmentConfig;
use crate::domain::staff::{DailyRoster, StaffId};
use crate::domain::time::{format_minute, Minute};
use crate::domain::treatment::{AssignedAction, ExpandedTreatment, ScheduledTask, TreatmentId, TreatmentPlacement};
use crate::domain::types::{ActionType, AssignmentMode};
use crate::engine::error::EngineResult;
use crate::engine::occupancy::OccupancyLedger;
use crate::engine::staff_scheduler::{AssignOutcome, StaffScheduler};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

// ==========================================
// RejectReason - 落位失败原因
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectReason {
    /// 当日治疗数已达上限
    DayCapacityReached { placed: usize, ceiling: usize },
    /// 座位已满或无法在闭科前结束
    NoSeat { start: Minute },
    /// 某动作无可用护士
    NoStaff { action: ActionType, at: Minute },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::DayCapacityReached { placed, ceiling } => {
                write!(f, "DAY_CAPACITY_REACHED: day capacity reached ({} >= {})", placed, ceiling)
            }
            RejectReason::NoSeat { start } => {
                write!(f, "NO_SEAT: no seat or past closing at {}", format_minute(*start))
            }
            RejectReason::NoStaff { action, at } => {
                write!(f, "NO_STAFF: no staff available for {} at {}", action, format_minute(*at))
            }
        }
    }
}

// ==========================================
// PlacementOutcome - 落位结果
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum PlacementOutcome {
    Placed(TreatmentPlacement),
    Rejected(RejectReason),
}

// ==========================================
// DayPlan - 单日排程上下文
// ==========================================
// 持有当日调度器 + 座位台账 + 已落位治疗
// 模拟落位通过 clone 实现,提交即替换
#[derive(Debug, Clone)]
pub struct DayPlan {
    date: NaiveDate,
    config: DepartmentConfig,
    scheduler: StaffScheduler,
    ledger: OccupancyLedger,
    placements: Vec<TreatmentPlacement>,
    capacity_ceiling: Option<usize>,
}

impl DayPlan {
    pub fn new(config: &DepartmentConfig, roster: &DailyRoster) -> Self {
        Self {
            date: roster.date,
            config: config.clone(),
            scheduler: StaffScheduler::new(config, roster),
            ledger: OccupancyLedger::new(config),
            placements: Vec::new(),
            capacity_ceiling: None,
        }
    }

    pub fn with_capacity_ceiling(mut self, ceiling: Option<usize>) -> Self {
        self.capacity_ceiling = ceiling;
        self
    }

    // ==========================================
    // 预置已提交治疗
    // ==========================================

    /// 预置已提交的治疗: 护士任务 + 座位占用
    ///
    /// 不做容量门控,原样记账
    pub fn seed_placement(&mut self, placement: TreatmentPlacement) -> EngineResult<()> {
        for action in &placement.actions {
            if let Some(staff_id) = action.staff_id {
                self.scheduler.seed_task(ScheduledTask {
                    staff_id,
                    start: action.start,
                    end: action.end(),
                    action_type: action.action_type,
                    mode: action.mode.unwrap_or(AssignmentMode::Clean),
                })?;
            }
        }
        if placement.counts_toward_seats {
            self.ledger.admit(placement.start, placement.total_duration);
        }
        self.placements.push(placement);
        Ok(())
    }

    // ==========================================
    // 落位
    // ==========================================

    /// 落位一个治疗
    ///
    /// 流程:
    /// 1) 当日上限门控 (不做任何模拟)
    /// 2) 座位门控 can_admit
    /// 3) 分配上针,上针顺延则后续动作整体顺延
    /// 4) 依次分配其余护理动作 (方案核对排除上针护士)
    /// 5) 全部成功才计入座位台账; 任一失败回滚护士台账
    pub fn place_treatment(
        &mut self,
        treatment_id: TreatmentId,
        expanded: &ExpandedTreatment,
        requested_start: Minute,
    ) -> PlacementOutcome {
        if let Some(reason) = self.capacity_reason() {
            return PlacementOutcome::Rejected(reason);
        }

        let duration = expanded.total_duration();
        if !self.seat_available(expanded, requested_start, duration) {
            return PlacementOutcome::Rejected(RejectReason::NoSeat { start: requested_start });
        }

        let snapshot = self.scheduler.clone();
        match self.assign_actions(expanded, requested_start, duration) {
            Ok((start, actions)) => {
                if expanded.counts_toward_seats {
                    self.ledger.admit(start, duration);
                }
                let placement = TreatmentPlacement {
                    treatment_id,
                    medication_id: expanded.medication_id.clone(),
                    occurrence: expanded.occurrence,
                    date: self.date,
                    start,
                    total_duration: duration,
                    counts_toward_seats: expanded.counts_toward_seats,
                    actions,
                };
                self.placements.push(placement.clone());
                PlacementOutcome::Placed(placement)
            }
            Err(reason) => {
                self.scheduler = snapshot;
                debug!(
                    date = %self.date,
                    medication_id = %expanded.medication_id,
                    requested = %format_minute(requested_start),
                    reason = %reason,
                    "治疗落位失败,已回滚"
                );
                PlacementOutcome::Rejected(reason)
            }
        }
    }

    /// 模拟落位: 不修改自身,返回落位后的新上下文
    pub fn simulate(
        &self,
        treatment_id: TreatmentId,
        expanded: &ExpandedTreatment,
        requested_start: Minute,
    ) -> Result<(DayPlan, TreatmentPlacement), RejectReason> {
        let mut trial = self.clone();
        match trial.place_treatment(treatment_id, expanded, requested_start) {
            PlacementOutcome::Placed(placement) => Ok((trial, placement)),
            PlacementOutcome::Rejected(reason) => Err(reason),
        }
    }

    fn assign_actions(
        &mut self,
        expanded: &ExpandedTreatment,
        requested_start: Minute,
        duration: Minute,
    ) -> Result<(Minute, Vec<AssignedAction>), RejectReason> {
        let setup_index = expanded
            .actions
            .iter()
            .position(|a| a.action_type == ActionType::Setup);

        // 上针决定整单的实际开始时间
        let mut start = requested_start;
        let mut setup_staff: Option<StaffId> = None;
        let mut assigned: Vec<Option<AssignedAction>> = vec![None; expanded.actions.len()];

        if let Some(idx) = setup_index {
            let setup = &expanded.actions[idx];
            let requested_setup = requested_start + setup.offset;
            let assignment = match self.scheduler.assign_setup_with(
                requested_setup,
                setup.duration,
                setup.workload_minutes(),
            ) {
                AssignOutcome::Assigned(a) => a,
                AssignOutcome::NoStaffAvailable => {
                    return Err(RejectReason::NoStaff {
                        action: ActionType::Setup,
                        at: requested_setup,
                    })
                }
            };

            let delay = assignment.start - requested_setup;
            if delay > 0 {
                start = requested_start + delay;
                if !self.seat_available(expanded, start, duration) {
                    return Err(RejectReason::NoSeat { start });
                }
            }
            setup_staff = Some(assignment.staff_id);
            assigned[idx] = Some(AssignedAction {
                name: setup.name.clone(),
                action_type: setup.action_type,
                duration: setup.duration,
                offset: assignment.start - start,
                start: assignment.start,
                staff_id: Some(assignment.staff_id),
                staff_name: Some(assignment.staff_name),
                mode: Some(assignment.mode),
            });
        }

        for (idx, action) in expanded.actions.iter().enumerate() {
            if Some(idx) == setup_index {
                continue;
            }
            let at = start + action.offset;
            let mut resolved = AssignedAction {
                name: action.name.clone(),
                action_type: action.action_type,
                duration: action.duration,
                offset: action.offset,
                start: at,
                staff_id: None,
                staff_name: None,
                mode: None,
            };

            if action.requires_nurse {
                let exclude = match action.action_type {
                    ActionType::ProtocolCheck => setup_staff,
                    _ => None,
                };
                match self.scheduler.assign_action_with(
                    action.action_type,
                    action.duration,
                    at,
                    action.workload_minutes(),
                    exclude,
                ) {
                    AssignOutcome::Assigned(a) => {
                        resolved.staff_id = Some(a.staff_id);
                        resolved.staff_name = Some(a.staff_name);
                        resolved.mode = Some(a.mode);
                    }
                    AssignOutcome::NoStaffAvailable => {
                        return Err(RejectReason::NoStaff {
                            action: action.action_type,
                            at,
                        })
                    }
                }
            }
            assigned[idx] = Some(resolved);
        }

        Ok((start, assigned.into_iter().flatten().collect()))
    }

    /// 仅占座位,不分配护士
    ///
    /// 座位不足或不计座位时不做任何事,返回 false
    pub fn reserve_seats(&mut self, expanded: &ExpandedTreatment, start: Minute) -> bool {
        let duration = expanded.total_duration();
        if !expanded.counts_toward_seats || !self.ledger.can_admit(start, duration) {
            return false;
        }
        self.ledger.admit(start, duration);
        true
    }

    // ==========================================
    // 门控
    // ==========================================

    fn capacity_reason(&self) -> Option<RejectReason> {
        match self.capacity_ceiling {
            Some(ceiling) if self.placements.len() >= ceiling => Some(RejectReason::DayCapacityReached {
                placed: self.placements.len(),
                ceiling,
            }),
            _ => None,
        }
    }

    /// 当日上限是否已满
    pub fn is_at_capacity(&self) -> bool {
        self.capacity_reason().is_some()
    }

    /// 计座位的治疗走 can_admit; 皮下注射只检查闭科
    pub fn seat_available(&self, expanded: &ExpandedTreatment, start: Minute, duration: Minute) -> bool {
        if expanded.counts_toward_seats {
            self.ledger.can_admit(start, duration)
        } else {
            start >= self.config.opening_minute && start + duration <= self.config.closing_minute
        }
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn config(&self) -> &DepartmentConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &StaffScheduler {
        &self.scheduler
    }

    pub fn ledger(&self) -> &OccupancyLedger {
        &self.ledger
    }

    pub fn placements(&self) -> &[TreatmentPlacement] {
        &self.placements
    }

    pub fn placed_count(&self) -> usize {
        self.placements.len()
    }

    pub fn into_placements(self) -> Vec<TreatmentPlacement> {
        self.placements
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::staff::StaffMember;
    use crate::domain::time::hm;
    use crate::domain::treatment::GeneratedAction;

    // ==========================================
    // 测试辅助函数
    // ==========================================

    fn test_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 3).unwrap()
    }

    fn action(name: &str, action_type: ActionType, offset: Minute, duration: Minute) -> GeneratedAction {
        GeneratedAction {
            name: name.to_string(),
            action_type,
            duration,
            offset,
            actual_duration: None,
            offset_from_infusion_start: None,
            requires_nurse: action_type.requires_nurse(),
        }
    }

    /// 上针 15 + 输液 infusion + 拔针 5
    fn infusion_treatment(infusion: Minute) -> ExpandedTreatment {
        ExpandedTreatment {
            medication_id: "M".to_string(),
            occurrence: 1,
            actions: vec![
                action("Setup", ActionType::Setup, 0, 15),
                action("Infusion", ActionType::Infusion, 15, infusion),
                action("Removal", ActionType::Removal, 15 + infusion, 5),
            ],
            counts_toward_seats: true,
        }
    }

    fn plan(names: &[&str], seats: u32) -> DayPlan {
        let config = DepartmentConfig {
            total_seats: seats,
            ..Default::default()
        };
        let roster = DailyRoster::new(
            test_date(),
            names.iter().map(|n| StaffMember::new(n, 10)).collect(),
        );
        DayPlan::new(&config, &roster)
    }

    fn placed(outcome: PlacementOutcome) -> TreatmentPlacement {
        match outcome {
            PlacementOutcome::Placed(p) => p,
            PlacementOutcome::Rejected(r) => panic!("应落位成功: {}", r),
        }
    }

    // ==========================================
    // 测试用例
    // ==========================================

    #[test]
    fn test_place_assigns_every_nurse_action() {
        let mut day = plan(&["A", "B"], 4);
        let p = placed(day.place_treatment(TreatmentId::new(), &infusion_treatment(60), hm(9, 0)));

        assert_eq!(p.start, hm(9, 0));
        assert_eq!(p.total_duration, 80);
        let setup = &p.actions[0];
        let infusion = &p.actions[1];
        let removal = &p.actions[2];
        assert!(setup.staff_id.is_some());
        assert!(infusion.staff_id.is_none());
        assert_eq!(removal.start, hm(10, 15));
        assert!(removal.staff_id.is_some());
        assert_eq!(day.ledger().occupancy_at(hm(9, 30)), 1);
        assert_eq!(day.scheduler().tasks().len(), 2);
    }

    #[test]
    fn test_setup_delay_shifts_all_actions() {
        let mut day = plan(&["A"], 4);
        // 午休前无法完成上针 -> 顺延至 13:00
        let p = placed(day.place_treatment(TreatmentId::new(), &infusion_treatment(60), hm(11, 50)));
        assert_eq!(p.start, hm(13, 0));
        assert_eq!(p.actions[0].offset, 0);
        assert_eq!(p.actions[2].start, hm(14, 15));
        assert_eq!(day.ledger().occupancy_at(hm(11, 55)), 0);
        assert_eq!(day.ledger().occupancy_at(hm(13, 30)), 1);
    }

    #[test]
    fn test_rejects_when_seats_full() {
        let mut day = plan(&["A", "B"], 1);
        placed(day.place_treatment(TreatmentId::new(), &infusion_treatment(60), hm(9, 0)));
        let outcome = day.place_treatment(TreatmentId::new(), &infusion_treatment(60), hm(9, 30));
        assert_eq!(
            outcome,
            PlacementOutcome::Rejected(RejectReason::NoSeat { start: hm(9, 30) })
        );
    }

    #[test]
    fn test_rollback_on_removal_failure() {
        let mut day = plan(&["A"], 4);
        // 占住 A 的拔针时段
        day.scheduler
            .assign_action(ActionType::Check, 30, hm(10, 10), None)
            .into_assignment()
            .unwrap();
        let tasks_before = day.scheduler().tasks().len();

        let outcome = day.place_treatment(TreatmentId::new(), &infusion_treatment(60), hm(9, 0));
        assert!(matches!(
            outcome,
            PlacementOutcome::Rejected(RejectReason::NoStaff {
                action: ActionType::Removal,
                ..
            })
        ));
        assert_eq!(day.scheduler().tasks().len(), tasks_before);
        assert_eq!(day.ledger().day_peak(), 0);
        assert_eq!(day.placed_count(), 0);
    }

    #[test]
    fn test_day_capacity_ceiling() {
        let mut day = plan(&["A", "B"], 4).with_capacity_ceiling(Some(1));
        placed(day.place_treatment(TreatmentId::new(), &infusion_treatment(30), hm(9, 0)));
        let outcome = day.place_treatment(TreatmentId::new(), &infusion_treatment(30), hm(13, 0));
        assert_eq!(
            outcome,
            PlacementOutcome::Rejected(RejectReason::DayCapacityReached { placed: 1, ceiling: 1 })
        );
    }

    #[test]
    fn test_protocol_check_uses_other_nurse() {
        let mut day = plan(&["A", "B"], 4);
        let mut treatment = infusion_treatment(60);
        treatment
            .actions
            .insert(1, action("Double check", ActionType::ProtocolCheck, 15, 5));

        let p = placed(day.place_treatment(TreatmentId::new(), &treatment, hm(9, 0)));
        let setup_staff = p.actions[0].staff_id;
        let check_staff = p.actions[1].staff_id;
        assert!(check_staff.is_some());
        assert_ne!(setup_staff, check_staff);
    }

    #[test]
    fn test_injection_does_not_take_seat() {
        let mut day = plan(&["A"], 1);
        let injection = ExpandedTreatment {
            medication_id: "SC".to_string(),
            occurrence: 1,
            actions: vec![action("Injection", ActionType::Setup, 0, 10)],
            counts_toward_seats: false,
        };
        placed(day.place_treatment(TreatmentId::new(), &infusion_treatment(60), hm(9, 0)));
        let p = placed(day.place_treatment(TreatmentId::new(), &injection, hm(10, 0)));
        assert!(!p.counts_toward_seats);
        assert_eq!(day.ledger().occupancy_at(hm(10, 5)), 1);
    }

    #[test]
    fn test_simulate_leaves_plan_untouched() {
        let day = plan(&["A"], 4);
        let (trial, placement) = day
            .simulate(TreatmentId::new(), &infusion_treatment(60), hm(9, 0))
            .unwrap();
        assert_eq!(placement.start, hm(9, 0));
        assert_eq!(trial.placed_count(), 1);
        assert_eq!(day.placed_count(), 0);
        assert!(day.scheduler().tasks().is_empty());
    }

    #[test]
    fn test_seed_placement_books_tasks_and_seats() {
        let config = DepartmentConfig::default();
        let roster = DailyRoster::new(test_date(), vec![StaffMember::new("A", 10)]);

        let mut source = DayPlan::new(&config, &roster);
        let p = placed(source.place_treatment(TreatmentId::new(), &infusion_treatment(60), hm(9, 0)));

        // 同一排班重建,预置后状态应一致
        let mut replay = DayPlan::new(&config, &roster);
        replay.seed_placement(p).unwrap();
        assert_eq!(replay.placed_count(), 1);
        assert_eq!(replay.ledger().occupancy_at(hm(9, 30)), 1);
        assert_eq!(replay.scheduler().tasks().len(), source.scheduler().tasks().len());
        assert_eq!(replay.scheduler().peak_workload(), source.scheduler().peak_workload());
    }

    #[test]
    fn test_seed_placement_rejects_unknown_staff() {
        let mut source = plan(&["A"], 4);
        let p = placed(source.place_treatment(TreatmentId::new(), &infusion_treatment(60), hm(9, 0)));

        let mut other = plan(&["A"], 4);
        assert!(other.seed_placement(p).is_err());
    }
}
