// ==========================================
// 输液日间治疗排程系统 - 座位占用台账
// ==========================================
// 职责: 单日逐分钟的在座治疗计数
// 红线: 容量约束只在 can_admit 门控时检查, admit 本身不拦截
// ==========================================

use crate::config::DepartmentConfig;
use crate::domain::time::{Minute, MINUTES_PER_DAY};

// ==========================================
// OccupancyLedger - 座位占用台账
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct OccupancyLedger {
    counts: Vec<u32>,
    opening_minute: Minute,
    closing_minute: Minute,
    total_seats: u32,
    slot_step: Minute,
}

impl OccupancyLedger {
    pub fn new(config: &DepartmentConfig) -> Self {
        Self {
            counts: vec![0; MINUTES_PER_DAY as usize],
            opening_minute: config.opening_minute,
            closing_minute: config.closing_minute,
            total_seats: config.total_seats,
            slot_step: config.occupancy_slot_step.max(1),
        }
    }

    /// 将 [start, start+duration) 裁剪到当日范围内的下标区间
    fn index_range(start: Minute, duration: Minute) -> std::ops::Range<usize> {
        let from = start.clamp(0, MINUTES_PER_DAY) as usize;
        let to = (start + duration.max(0)).clamp(0, MINUTES_PER_DAY) as usize;
        from..to.max(from)
    }

    // ==========================================
    // 写入
    // ==========================================

    /// 无条件计入占用 (重放/模拟记账用)
    pub fn admit(&mut self, start: Minute, duration: Minute) {
        for minute in Self::index_range(start, duration) {
            self.counts[minute] += 1;
        }
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 是否可接收: 不早于开科、不晚于闭科、区间内任一分钟不超座位数
    pub fn can_admit(&self, start: Minute, duration: Minute) -> bool {
        if start < self.opening_minute || start + duration > self.closing_minute {
            return false;
        }
        self.counts[Self::index_range(start, duration)]
            .iter()
            .all(|&c| c < self.total_seats)
    }

    /// 从 preferred_start 起按固定步长向后扫描首个可接收的时刻
    ///
    /// 扫描上限: closing - duration (保证按时结束)
    pub fn next_available_slot(&self, preferred_start: Minute, duration: Minute) -> Option<Minute> {
        let latest = self.closing_minute - duration;
        let mut candidate = preferred_start.max(self.opening_minute);
        while candidate <= latest {
            if self.can_admit(candidate, duration) {
                return Some(candidate);
            }
            candidate += self.slot_step;
        }
        None
    }

    pub fn occupancy_at(&self, minute: Minute) -> u32 {
        if (0..MINUTES_PER_DAY).contains(&minute) {
            self.counts[minute as usize]
        } else {
            0
        }
    }

    /// 区间内峰值占用
    pub fn peak_occupancy(&self, range_start: Minute, duration: Minute) -> u32 {
        self.counts[Self::index_range(range_start, duration)]
            .iter()
            .copied()
            .max()
            .unwrap_or(0)
    }

    /// 区间内平均占用
    pub fn average_occupancy(&self, range_start: Minute, duration: Minute) -> f64 {
        let slice = &self.counts[Self::index_range(range_start, duration)];
        if slice.is_empty() {
            return 0.0;
        }
        slice.iter().map(|&c| c as f64).sum::<f64>() / slice.len() as f64
    }

    /// 全天 (开科到闭科) 峰值
    pub fn day_peak(&self) -> u32 {
        self.peak_occupancy(self.opening_minute, self.closing_minute - self.opening_minute)
    }

    pub fn total_seats(&self) -> u32 {
        self.total_seats
    }

    pub fn opening_minute(&self) -> Minute {
        self.opening_minute
    }

    pub fn closing_minute(&self) -> Minute {
        self.closing_minute
    }
}
