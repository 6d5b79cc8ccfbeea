use crate::config::DepartmentConfig;
use crate::domain::staff::{DailyRoster, StaffId};
use crate::domain::time::{format_minute, overlaps, Minute};
use crate::domain::treatment::ScheduledTask;
use crate::domain::types::{ActionType, AssignmentMode};
use crate::engine::error::{EngineError, EngineResult};
use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use super::availability::{StaffAvailability, StaffStats};
use super::outcome::{AssignOutcome, StaffAssignment};

// ==========================================
// StaffScheduler - 护士分配引擎
// ==========================================
// 作用域: 单日单次排程,不可重入,不可跨线程共享
// 状态: 每位护士的工作量/上针数/最近上针/忙碌至 + 任务台账
#[derive(Debug, Clone)]
pub struct StaffScheduler {
    config: DepartmentConfig,
    date: NaiveDate,
    staff: Vec<StaffAvailability>,
    tasks: Vec<ScheduledTask>,
    last_selected: Option<usize>,
}

impl StaffScheduler {
    /// 创建当日调度器
    ///
    /// 协调护士:
    /// - 已在排班中: 就地提升
    /// - 不在排班中: 作为额外护士注入
    pub fn new(config: &DepartmentConfig, roster: &DailyRoster) -> Self {
        let mut staff: Vec<StaffAvailability> = roster
            .staff
            .iter()
            .cloned()
            .map(|m| StaffAvailability::new(m, config.opening_minute))
            .collect();

        if let Some(coordinator) = &roster.coordinator {
            // 先按 id 匹配,id 不一致时按姓名匹配 (外部排班可能不带 id)
            let position = staff
                .iter()
                .position(|s| s.id() == coordinator.id)
                .or_else(|| staff.iter().position(|s| s.name() == coordinator.name));
            match position {
                Some(i) => staff[i].promote_to_coordinator(config),
                None => {
                    let mut injected = StaffAvailability::new(coordinator.clone(), config.opening_minute);
                    injected.promote_to_coordinator(config);
                    staff.push(injected);
                }
            }
            info!(
                date = %roster.date,
                coordinator = %coordinator.name,
                max_workload = config.coordinator_max_workload(),
                "当日协调护士已就位"
            );
        }

        Self {
            config: config.clone(),
            date: roster.date,
            staff,
            tasks: Vec::new(),
            last_selected: None,
        }
    }

    // ==========================================
    // 台账预置
    // ==========================================

    /// 预置已提交的任务 (重排/周分配前)
    pub fn seed_task(&mut self, task: ScheduledTask) -> EngineResult<()> {
        let workload = task.end - task.start;
        self.seed_task_with_workload(task, workload)
    }

    pub fn seed_task_with_workload(&mut self, task: ScheduledTask, workload: Minute) -> EngineResult<()> {
        let idx = self
            .index_of(task.staff_id)
            .ok_or(EngineError::UnknownStaff(task.staff_id))?;
        self.staff[idx].record(task.start, task.end, workload, task.action_type == ActionType::Setup);
        self.tasks.push(task);
        Ok(())
    }

    // ==========================================
    // 上针分配
    // ==========================================

    /// 分配上针 (时长使用配置默认值)
    pub fn assign_setup(&mut self, requested_time: Minute) -> AssignOutcome {
        let duration = self.config.setup_minutes;
        self.assign_setup_with(requested_time, duration, duration)
    }

    /// 分配上针
    ///
    /// 流程:
    /// 1) 顺延请求时间: 避开午休 + 满足同时上针上限
    /// 2) 候选: 无时间重叠/未下班/工作量未满/满足准备间隔/非协调禁区
    /// 3) 择优: 利用率 -> 上针数 -> 工作量 -> 忙碌至 -> 轮转
    /// 4) 无候选: 强制兜底 (允许重叠)
    pub fn assign_setup_with(&mut self, requested_time: Minute, duration: Minute, workload: Minute) -> AssignOutcome {
        let start = match self.resolve_setup_start(requested_time, duration, workload) {
            Some(t) => t,
            None => {
                debug!(
                    requested = %format_minute(requested_time),
                    "上针顺延至闭科仍无可用时段"
                );
                return AssignOutcome::NoStaffAvailable;
            }
        };
        let end = start + duration;

        if start > requested_time {
            debug!(
                requested = %format_minute(requested_time),
                actual = %format_minute(start),
                delay = start - requested_time,
                "上针顺延"
            );
        }

        let candidates: Vec<usize> = (0..self.staff.len())
            .filter(|&i| self.setup_structurally_eligible(i, start, end, workload))
            .filter(|&i| !self.has_overlap(i, start, end))
            .filter(|&i| self.prep_gap_ok(i, start))
            .collect();

        if let Some(chosen) = self.pick_setup_candidate(&candidates) {
            return AssignOutcome::Assigned(self.commit(
                chosen,
                ActionType::Setup,
                start,
                end,
                workload,
                AssignmentMode::Clean,
            ));
        }

        self.forced_setup(start, duration, workload)
    }

    /// 顺延请求时间,直至落在午休之外并满足同时上针上限
    ///
    /// 可用护士数按实际计入的工作量判断,与候选过滤一致
    fn resolve_setup_start(&self, requested_time: Minute, duration: Minute, workload: Minute) -> Option<Minute> {
        let cfg = &self.config;
        let step = cfg.setup_retry_step.max(1);
        let mut t = requested_time.max(cfg.opening_minute);
        loop {
            if t + duration > cfg.closing_minute {
                return None;
            }
            if overlaps(t, t + duration, cfg.lunch_start, cfg.lunch_end) {
                t = cfg.lunch_end;
                continue;
            }
            let eligible = (0..self.staff.len())
                .filter(|&i| self.setup_structurally_eligible(i, t, t + duration, workload))
                .count() as u32;
            let cap = eligible.min(cfg.max_concurrent_setups);
            if cap == 0 || self.concurrent_setup_starts(t) >= cap {
                t += step;
                continue;
            }
            return Some(t);
        }
    }

    /// 强制兜底: 在结构可用的护士中取利用率最低者,允许时间重叠
    fn forced_setup(&mut self, start: Minute, duration: Minute, workload: Minute) -> AssignOutcome {
        let cfg = &self.config;
        let mut start = start;
        if overlaps(start, start + duration, cfg.lunch_start, cfg.lunch_end) {
            start = cfg.lunch_end;
        }
        let end = start + duration;
        if end > cfg.closing_minute {
            return AssignOutcome::NoStaffAvailable;
        }

        let chosen = (0..self.staff.len())
            .filter(|&i| self.setup_structurally_eligible(i, start, end, workload))
            .min_by(|&a, &b| self.compare_utilization(a, b).then(a.cmp(&b)));

        match chosen {
            Some(idx) => {
                warn!(
                    date = %self.date,
                    staff = %self.staff[idx].name(),
                    start = %format_minute(start),
                    setup_count = self.staff[idx].setup_count,
                    "护士超负荷: 无无冲突候选,强制分配上针"
                );
                AssignOutcome::Assigned(self.commit(
                    idx,
                    ActionType::Setup,
                    start,
                    end,
                    workload,
                    AssignmentMode::Forced,
                ))
            }
            None => {
                debug!(start = %format_minute(start), "强制兜底失败: 无结构可用护士");
                AssignOutcome::NoStaffAvailable
            }
        }
    }

    fn pick_setup_candidate(&self, candidates: &[usize]) -> Option<usize> {
        candidates.iter().copied().min_by(|&a, &b| {
            self.compare_utilization(a, b)
                .then_with(|| self.staff[a].busy_until.cmp(&self.staff[b].busy_until))
                .then_with(|| self.round_robin_distance(a).cmp(&self.round_robin_distance(b)))
        })
    }

    /// 利用率 -> 上针数 -> 工作量
    fn compare_utilization(&self, a: usize, b: usize) -> Ordering {
        let sa = &self.staff[a];
        let sb = &self.staff[b];
        sa.utilization()
            .total_cmp(&sb.utilization())
            .then(sa.setup_count.cmp(&sb.setup_count))
            .then(sa.total_workload.cmp(&sb.total_workload))
    }

    /// 相对上次选中护士的轮转距离
    fn round_robin_distance(&self, idx: usize) -> usize {
        let n = self.staff.len();
        let next = match self.last_selected {
            Some(last) => (last + 1) % n,
            None => 0,
        };
        (idx + n - next) % n
    }

    // ==========================================
    // 非上针动作分配
    // ==========================================

    /// 分配非上针动作 (时长即工作量)
    pub fn assign_action(
        &mut self,
        action_type: ActionType,
        duration: Minute,
        requested_time: Minute,
        exclude_staff: Option<StaffId>,
    ) -> AssignOutcome {
        self.assign_action_with(action_type, duration, requested_time, duration, exclude_staff)
    }

    /// 分配非上针动作
    ///
    /// 不放宽重叠约束; 额外检查午休同时在岗人数上限
    /// 择优: 工作量最低
    pub fn assign_action_with(
        &mut self,
        action_type: ActionType,
        duration: Minute,
        requested_time: Minute,
        workload: Minute,
        exclude_staff: Option<StaffId>,
    ) -> AssignOutcome {
        let start = requested_time;
        let end = start + duration;
        if start < self.config.opening_minute || end > self.config.closing_minute {
            return AssignOutcome::NoStaffAvailable;
        }

        let chosen = (0..self.staff.len())
            .filter(|&i| Some(self.staff[i].id()) != exclude_staff)
            .filter(|&i| end <= self.staff[i].work_cutoff(&self.config))
            .filter(|&i| self.staff[i].workload_allows(workload))
            .filter(|&i| !self.coordinator_blocked(i, start, end))
            .filter(|&i| !self.has_overlap(i, start, end))
            .filter(|&i| self.lunch_capacity_ok(i, start, end))
            .min_by(|&a, &b| {
                self.staff[a]
                    .total_workload
                    .cmp(&self.staff[b].total_workload)
                    .then(a.cmp(&b))
            });

        match chosen {
            Some(idx) => AssignOutcome::Assigned(self.commit(
                idx,
                action_type,
                start,
                end,
                workload,
                AssignmentMode::Clean,
            )),
            None => {
                debug!(
                    action = %action_type,
                    start = %format_minute(start),
                    "无可用护士执行动作"
                );
                AssignOutcome::NoStaffAvailable
            }
        }
    }

    // ==========================================
    // 约束判断
    // ==========================================

    /// 上针结构可用: 未下班 / 上针数未满 / 工作量未满 / 非协调禁区
    fn setup_structurally_eligible(&self, idx: usize, start: Minute, end: Minute, workload: Minute) -> bool {
        let s = &self.staff[idx];
        end <= s.work_cutoff(&self.config)
            && end <= self.config.closing_minute
            && s.has_setup_capacity()
            && s.workload_allows(workload)
            && !self.coordinator_blocked(idx, start, end)
    }

    fn coordinator_blocked(&self, idx: usize, start: Minute, end: Minute) -> bool {
        self.staff[idx].is_coordinator
            && overlaps(
                start,
                end,
                self.config.coordinator_blackout_start,
                self.config.coordinator_blackout_end,
            )
    }

    fn has_overlap(&self, idx: usize, start: Minute, end: Minute) -> bool {
        let id = self.staff[idx].id();
        self.tasks
            .iter()
            .any(|t| t.staff_id == id && overlaps(start, end, t.start, t.end))
    }

    /// 与该护士所有已有上针的间隔都不少于准备间隔
    fn prep_gap_ok(&self, idx: usize, start: Minute) -> bool {
        let id = self.staff[idx].id();
        self.tasks
            .iter()
            .filter(|t| t.staff_id == id && t.action_type == ActionType::Setup)
            .all(|t| (start - t.start).abs() >= self.config.prep_gap_minutes)
    }

    /// 同一顺延步长内开始的上针数
    fn concurrent_setup_starts(&self, t: Minute) -> u32 {
        let step = self.config.setup_retry_step.max(1);
        self.tasks
            .iter()
            .filter(|task| task.action_type == ActionType::Setup && task.start >= t && task.start < t + step)
            .count() as u32
    }

    /// 午休子窗口内同时在岗的不同护士数 <= ceil(n/2)
    fn lunch_capacity_ok(&self, idx: usize, start: Minute, end: Minute) -> bool {
        let cap = self.lunch_capacity();
        let candidate = self.staff[idx].id();
        self.config
            .lunch_sub_windows()
            .into_iter()
            .filter(|&(ws, we)| overlaps(start, end, ws, we))
            .all(|(ws, we)| {
                let engaged = self.engaged_staff(ws, we);
                engaged.contains(&candidate) || engaged.len() < cap
            })
    }

    /// 午休子窗口允许的同时在岗人数
    pub fn lunch_capacity(&self) -> usize {
        (self.staff.len() + 1) / 2
    }

    /// 区间内有任务的不同护士
    pub fn engaged_staff(&self, window_start: Minute, window_end: Minute) -> BTreeSet<StaffId> {
        self.tasks
            .iter()
            .filter(|t| overlaps(t.start, t.end, window_start, window_end))
            .map(|t| t.staff_id)
            .collect()
    }

    // ==========================================
    // 提交
    // ==========================================

    fn commit(
        &mut self,
        idx: usize,
        action_type: ActionType,
        start: Minute,
        end: Minute,
        workload: Minute,
        mode: AssignmentMode,
    ) -> StaffAssignment {
        if mode == AssignmentMode::Clean {
            debug_assert!(!self.has_overlap(idx, start, end), "正常分配出现时间重叠");
            debug_assert!(
                action_type != ActionType::Setup || self.prep_gap_ok(idx, start),
                "正常分配违反准备间隔"
            );
        }

        let is_setup = action_type == ActionType::Setup;
        let staff_id = self.staff[idx].id();
        self.staff[idx].record(start, end, workload, is_setup);
        self.tasks.push(ScheduledTask {
            staff_id,
            start,
            end,
            action_type,
            mode,
        });
        if is_setup {
            self.last_selected = Some(idx);
        }

        StaffAssignment {
            staff_id,
            staff_name: self.staff[idx].name().to_string(),
            action_type,
            start,
            end,
            mode,
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

    pub fn tasks(&self) -> &[ScheduledTask] {
        &self.tasks
    }

    pub fn staff_count(&self) -> usize {
        self.staff.len()
    }

    pub fn staff_stats(&self) -> Vec<StaffStats> {
        self.staff.iter().map(StaffAvailability::stats).collect()
    }

    pub fn availability(&self, staff_id: StaffId) -> Option<&StaffAvailability> {
        self.staff.iter().find(|s| s.id() == staff_id)
    }

    fn index_of(&self, staff_id: StaffId) -> Option<usize> {
        self.staff.iter().position(|s| s.id() == staff_id)
    }

    /// 护士最大工作量 (分钟)
    pub fn peak_workload(&self) -> Minute {
        self.staff.iter().map(|s| s.total_workload).max().unwrap_or(0)
    }

    /// 负荷均衡度 = 1 - (max - min) / max, 全员为 0 时记 1
    pub fn balance_score(&self) -> f64 {
        let max = self.peak_workload();
        if max <= 0 {
            return 1.0;
        }
        let min = self.staff.iter().map(|s| s.total_workload).min().unwrap_or(0);
        1.0 - (max - min) as f64 / max as f64
    }

    // ==========================================
    // 不变量校验
    // ==========================================

    /// 校验台账不变量 (强制兜底任务除外)
    ///
    /// 1) 同一护士的正常任务互不重叠
    /// 2) 同一护士的正常上针间隔 >= 准备间隔
    /// 3) 正常任务不晚于闭科结束
    pub fn verify_invariants(&self) -> EngineResult<()> {
        let clean: Vec<&ScheduledTask> = self
            .tasks
            .iter()
            .filter(|t| t.mode == AssignmentMode::Clean)
            .collect();

        for (i, a) in clean.iter().enumerate() {
            if a.end > self.config.closing_minute {
                return Err(EngineError::InvariantViolation(format!(
                    "任务 {} 结束于 {} 晚于闭科",
                    a.action_type,
                    format_minute(a.end)
                )));
            }
            for b in clean.iter().skip(i + 1) {
                if a.staff_id != b.staff_id {
                    continue;
                }
                if overlaps(a.start, a.end, b.start, b.end) {
                    return Err(EngineError::InvariantViolation(format!(
                        "护士 {} 任务重叠: {}-{} 与 {}-{}",
                        a.staff_id,
                        format_minute(a.start),
                        format_minute(a.end),
                        format_minute(b.start),
                        format_minute(b.end)
                    )));
                }
                if a.action_type == ActionType::Setup
                    && b.action_type == ActionType::Setup
                    && (a.start - b.start).abs() < self.config.prep_gap_minutes
                {
                    return Err(EngineError::InvariantViolation(format!(
                        "护士 {} 两次上针间隔不足: {} 与 {}",
                        a.staff_id,
                        format_minute(a.start),
                        format_minute(b.start)
                    )));
                }
            }
        }
        Ok(())
    }
}
