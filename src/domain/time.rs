// ==========================================
// 输液日间治疗排程系统 - 时间工具
// ==========================================
// 引擎内部统一使用「当日零点起的分钟数」
// 对外输出时转换为 chrono::NaiveTime
// ==========================================

use chrono::{NaiveTime, Timelike};

/// 当日分钟数 (00:00 = 0, 08:00 = 480)
pub type Minute = i32;

/// 每日分钟总数
pub const MINUTES_PER_DAY: Minute = 24 * 60;

/// 时:分 -> 当日分钟数
pub const fn hm(hour: i32, minute: i32) -> Minute {
    hour * 60 + minute
}

/// 当日分钟数 -> NaiveTime
///
/// 超出 [0, 24:00) 的值会被截断到当日边界
pub fn minute_to_time(minute: Minute) -> NaiveTime {
    let clamped = minute.clamp(0, MINUTES_PER_DAY - 1);
    NaiveTime::from_hms_opt((clamped / 60) as u32, (clamped % 60) as u32, 0)
        .unwrap_or(NaiveTime::MIN)
}

/// NaiveTime -> 当日分钟数 (秒被舍去)
pub fn time_to_minute(time: NaiveTime) -> Minute {
    (time.hour() * 60 + time.minute()) as Minute
}

/// 半开区间 [a_start, a_end) 与 [b_start, b_end) 是否相交
pub fn overlaps(a_start: Minute, a_end: Minute, b_start: Minute, b_end: Minute) -> bool {
    a_start < b_end && b_start < a_end
}

/// 格式化为 HH:MM (日志用)
pub fn format_minute(minute: Minute) -> String {
    format!("{:02}:{:02}", minute.div_euclid(60), minute.rem_euclid(60))
}
