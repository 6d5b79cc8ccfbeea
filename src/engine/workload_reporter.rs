// ==========================================
// 输液日间治疗排程系统 - 负荷报表
// ==========================================
// 职责: 按固定时段汇总已提交治疗,给出启发式预警
// 输入: 当日已落位治疗 + 在岗护士数
// 输出: WorkloadReport (时段占用/开始数 + 预警)
// 红线: 只读,不修改任何排程状态
// ==========================================

use crate::config::{DepartmentConfig, ReportThresholds};
use crate::domain::time::{format_minute, overlaps, Minute};
use crate::domain::treatment::TreatmentPlacement;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ==========================================
// 报表结构
// ==========================================

/// 单个时段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotLoad {
    pub start: Minute,
    pub end: Minute,
    /// 时段内在座治疗数
    pub occupants: u32,
    /// 时段内开始的治疗数
    pub starts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AlertSeverity::Info => "INFO",
            AlertSeverity::Warning => "WARNING",
            AlertSeverity::Critical => "CRITICAL",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertKind {
    CapacityExceeded,
    HighUtilization,
    PeakImbalance,
    MorningAfternoonImbalance,
    BreakTimeConflict,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadAlert {
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadReport {
    pub date: NaiveDate,
    pub slots: Vec<SlotLoad>,
    pub peak_occupants: u32,
    /// 非空时段的平均在座数
    pub average_occupants: f64,
    pub total_treatments: usize,
    pub alerts: Vec<WorkloadAlert>,
}

impl WorkloadReport {
    pub fn has_alert(&self, kind: AlertKind) -> bool {
        self.alerts.iter().any(|a| a.kind == kind)
    }
}

// ==========================================
// WorkloadReporter - 负荷报表生成器
// ==========================================
pub struct WorkloadReporter<'a> {
    config: &'a DepartmentConfig,
    thresholds: ReportThresholds,
}

impl<'a> WorkloadReporter<'a> {
    pub fn new(config: &'a DepartmentConfig) -> Self {
        Self {
            config,
            thresholds: ReportThresholds::default(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: ReportThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// 生成当日报表
    pub fn build_report(
        &self,
        date: NaiveDate,
        placements: &[TreatmentPlacement],
        staff_count: usize,
    ) -> WorkloadReport {
        let day: Vec<&TreatmentPlacement> = placements.iter().filter(|p| p.date == date).collect();
        let slots = self.bucket(&day);

        let peak_occupants = slots.iter().map(|s| s.occupants).max().unwrap_or(0);
        let busy: Vec<u32> = slots.iter().map(|s| s.occupants).filter(|&o| o > 0).collect();
        let average_occupants = if busy.is_empty() {
            0.0
        } else {
            busy.iter().sum::<u32>() as f64 / busy.len() as f64
        };

        let mut alerts = Vec::new();
        self.capacity_alerts(&slots, peak_occupants, &mut alerts);
        self.imbalance_alerts(&slots, peak_occupants, average_occupants, &mut alerts);
        self.break_alerts(&day, staff_count, &mut alerts);
        alerts.sort_by(|a, b| b.severity.cmp(&a.severity));

        WorkloadReport {
            date,
            slots,
            peak_occupants,
            average_occupants,
            total_treatments: day.len(),
            alerts,
        }
    }

    fn bucket(&self, day: &[&TreatmentPlacement]) -> Vec<SlotLoad> {
        let step = self.config.report_bucket_minutes.max(1);
        let mut slots = Vec::new();
        let mut start = self.config.opening_minute;
        while start < self.config.closing_minute {
            let end = (start + step).min(self.config.closing_minute);
            let occupants = day
                .iter()
                .filter(|p| p.counts_toward_seats && overlaps(p.start, p.end(), start, end))
                .count() as u32;
            let starts = day.iter().filter(|p| p.start >= start && p.start < end).count() as u32;
            slots.push(SlotLoad {
                start,
                end,
                occupants,
                starts,
            });
            start = end;
        }
        slots
    }

    // ==========================================
    // 预警规则
    // ==========================================

    fn capacity_alerts(&self, slots: &[SlotLoad], peak: u32, alerts: &mut Vec<WorkloadAlert>) {
        let seats = self.config.total_seats;
        let over: Vec<&SlotLoad> = slots.iter().filter(|s| s.occupants > seats).collect();
        if let Some(first) = over.first() {
            alerts.push(WorkloadAlert {
                kind: AlertKind::CapacityExceeded,
                severity: AlertSeverity::Critical,
                message: format!(
                    "{} slot(s) exceed {} seats, first at {} (peak {})",
                    over.len(),
                    seats,
                    format_minute(first.start),
                    peak
                ),
            });
            return;
        }
        if seats > 0 && peak as f64 / seats as f64 >= self.thresholds.high_utilization_ratio {
            alerts.push(WorkloadAlert {
                kind: AlertKind::HighUtilization,
                severity: AlertSeverity::Warning,
                message: format!("peak occupancy {}/{} seats", peak, seats),
            });
        }
    }

    fn imbalance_alerts(&self, slots: &[SlotLoad], peak: u32, average: f64, alerts: &mut Vec<WorkloadAlert>) {
        if peak >= 2 && average > 0.0 && peak as f64 / average >= self.thresholds.peak_to_average_ratio {
            alerts.push(WorkloadAlert {
                kind: AlertKind::PeakImbalance,
                severity: AlertSeverity::Info,
                message: format!("peak {} vs average {:.1}", peak, average),
            });
        }

        let morning: u32 = slots
            .iter()
            .filter(|s| s.end <= self.config.lunch_start)
            .map(|s| s.occupants)
            .sum();
        let afternoon: u32 = slots
            .iter()
            .filter(|s| s.start >= self.config.lunch_end)
            .map(|s| s.occupants)
            .sum();
        let (heavy, light) = (morning.max(afternoon), morning.min(afternoon));
        if heavy > 0 && heavy as f64 / light.max(1) as f64 >= self.thresholds.half_day_ratio {
            let side = if morning > afternoon { "morning" } else { "afternoon" };
            alerts.push(WorkloadAlert {
                kind: AlertKind::MorningAfternoonImbalance,
                severity: AlertSeverity::Info,
                message: format!(
                    "{} heavier: morning {} vs afternoon {} slot-occupants",
                    side, morning, afternoon
                ),
            });
        }
    }

    /// 休息窗口冲突: 午休/茶歇内开始治疗,或午休子窗口在岗人数超过半数
    fn break_alerts(&self, day: &[&TreatmentPlacement], staff_count: usize, alerts: &mut Vec<WorkloadAlert>) {
        let cfg = self.config;
        let in_break = |m: Minute| {
            (m >= cfg.lunch_start && m < cfg.lunch_end) || (m >= cfg.coffee_start && m < cfg.coffee_end)
        };
        let break_starts = day.iter().filter(|p| in_break(p.start)).count();
        if break_starts > 0 {
            alerts.push(WorkloadAlert {
                kind: AlertKind::BreakTimeConflict,
                severity: AlertSeverity::Warning,
                message: format!("{} treatment(s) start during lunch or coffee break", break_starts),
            });
        }

        let cap = staff_count.div_ceil(2);
        for (ws, we) in cfg.lunch_sub_windows() {
            let engaged: BTreeSet<_> = day
                .iter()
                .flat_map(|p| p.actions.iter())
                .filter(|a| overlaps(a.start, a.end(), ws, we))
                .filter_map(|a| a.staff_id)
                .collect();
            if staff_count > 0 && engaged.len() > cap {
                alerts.push(WorkloadAlert {
                    kind: AlertKind::BreakTimeConflict,
                    severity: AlertSeverity::Warning,
                    message: format!(
                        "{} staff engaged during lunch {}-{} (limit {})",
                        engaged.len(),
                        format_minute(ws),
                        format_minute(we),
                        cap
                    ),
                });
            }
        }
    }
}
