// ==========================================
// 输液日间治疗排程系统 - 科室配置
// ==========================================
// 职责: 收拢全部排程常量 (营业时间/座位/间隔/休息窗口)
// 来源: JSON 文件或字符串 + key-value 覆写
// ==========================================

use crate::config::error::ConfigError;
use crate::domain::time::{hm, Minute};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

// ==========================================
// DepartmentConfig - 科室配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepartmentConfig {
    // ===== 营业时间 =====
    pub opening_minute: Minute, // 开科: 08:00
    pub closing_minute: Minute, // 闭科: 17:00

    // ===== 容量 =====
    pub total_seats: u32,           // 座位/床位数
    pub max_concurrent_setups: u32, // 同时上针上限

    // ===== 护理动作时长 =====
    pub setup_minutes: Minute,                 // 上针: 15
    pub removal_minutes: Minute,               // 拔针: 5
    pub check_minutes: Minute,                 // 巡视: 5
    pub default_pc_switch_minutes: Minute,     // 血制品更换: 10
    pub injection_minutes: Minute,             // 皮下注射: 10
    pub final_check_exclusion_minutes: Minute, // 拔针前 15 分钟内不巡视

    // ===== 护士约束 =====
    pub prep_gap_minutes: Minute,  // 同一护士两次上针最小间隔
    pub setup_retry_step: Minute,  // 上针顺延步长: 5

    // ===== 休息窗口 =====
    pub lunch_start: Minute,
    pub lunch_end: Minute,
    pub lunch_sub_window_minutes: Minute, // 午休轮换子窗口: 30
    pub coffee_start: Minute,
    pub coffee_end: Minute,

    // ===== 协调护士 =====
    pub coordinator_blackout_start: Minute,
    pub coordinator_blackout_end: Minute,
    pub coordinator_max_patients: u32,
    pub coordinator_reserved_minutes: Minute,

    // ===== 规划粒度 =====
    pub ideal_start: Minute,
    pub occupancy_slot_step: Minute,   // 空位扫描步长: 15
    pub optimizer_slot_step: Minute,   // 日优化网格: 30
    pub distributor_slot_step: Minute, // 周分配网格: 15
    pub report_bucket_minutes: Minute, // 报表时段: 15

    // 待产品确认: 规划路径是否保留 protocol_check 动作
    pub keep_protocol_check: bool,
}

impl Default for DepartmentConfig {
    fn default() -> Self {
        Self {
            opening_minute: hm(8, 0),
            closing_minute: hm(17, 0),
            total_seats: 12,
            max_concurrent_setups: 4,
            setup_minutes: 15,
            removal_minutes: 5,
            check_minutes: 5,
            default_pc_switch_minutes: 10,
            injection_minutes: 10,
            final_check_exclusion_minutes: 15,
            prep_gap_minutes: 30,
            setup_retry_step: 5,
            lunch_start: hm(12, 0),
            lunch_end: hm(13, 0),
            lunch_sub_window_minutes: 30,
            coffee_start: hm(10, 0),
            coffee_end: hm(10, 30),
            coordinator_blackout_start: hm(9, 0),
            coordinator_blackout_end: hm(12, 0),
            coordinator_max_patients: 3,
            coordinator_reserved_minutes: 180,
            ideal_start: hm(9, 0),
            occupancy_slot_step: 15,
            optimizer_slot_step: 30,
            distributor_slot_step: 15,
            report_bucket_minutes: 15,
            keep_protocol_check: false,
        }
    }
}

impl DepartmentConfig {
    // ==========================================
    // 加载
    // ==========================================

    /// 从 JSON 字符串加载 (缺省字段取默认值)
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: DepartmentConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// 从 JSON 文件加载
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// 应用 key-value 覆写 (键见 config_keys)
    pub fn apply_overrides(&mut self, overrides: &HashMap<String, String>) -> Result<(), ConfigError> {
        // 排序后应用,保证错误信息稳定
        let mut keys: Vec<&String> = overrides.keys().collect();
        keys.sort();
        for key in keys {
            let value = &overrides[key];
            self.apply_override(key, value)?;
        }
        self.validate()
    }

    fn apply_override(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        use config_keys::*;

        let target: &mut Minute = match key {
            OPENING_MINUTE => &mut self.opening_minute,
            CLOSING_MINUTE => &mut self.closing_minute,
            PREP_GAP_MINUTES => &mut self.prep_gap_minutes,
            SETUP_MINUTES => &mut self.setup_minutes,
            REMOVAL_MINUTES => &mut self.removal_minutes,
            LUNCH_START => &mut self.lunch_start,
            LUNCH_END => &mut self.lunch_end,
            IDEAL_START => &mut self.ideal_start,
            TOTAL_SEATS => {
                self.total_seats = parse_value(key, value)?;
                return Ok(());
            }
            MAX_CONCURRENT_SETUPS => {
                self.max_concurrent_setups = parse_value(key, value)?;
                return Ok(());
            }
            KEEP_PROTOCOL_CHECK => {
                self.keep_protocol_check = parse_value(key, value)?;
                return Ok(());
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        };
        *target = parse_value(key, value)?;
        Ok(())
    }

    // ==========================================
    // 校验
    // ==========================================

    /// 校验配置一致性
    ///
    /// # 规则
    /// 1. 开科 < 闭科
    /// 2. 座位数、同时上针数 > 0
    /// 3. 各步长、时长 > 0
    /// 4. 午休/茶歇/协调窗口 start < end
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.opening_minute >= self.closing_minute {
            return Err(ConfigError::Validation(format!(
                "开科时间 {} 必须早于闭科时间 {}",
                self.opening_minute, self.closing_minute
            )));
        }
        if self.total_seats == 0 {
            return Err(ConfigError::Validation("座位数必须大于 0".to_string()));
        }
        if self.max_concurrent_setups == 0 {
            return Err(ConfigError::Validation("同时上针上限必须大于 0".to_string()));
        }

        let positive = [
            ("setup_minutes", self.setup_minutes),
            ("removal_minutes", self.removal_minutes),
            ("check_minutes", self.check_minutes),
            ("injection_minutes", self.injection_minutes),
            ("setup_retry_step", self.setup_retry_step),
            ("lunch_sub_window_minutes", self.lunch_sub_window_minutes),
            ("occupancy_slot_step", self.occupancy_slot_step),
            ("optimizer_slot_step", self.optimizer_slot_step),
            ("distributor_slot_step", self.distributor_slot_step),
            ("report_bucket_minutes", self.report_bucket_minutes),
        ];
        for (name, value) in positive {
            if value <= 0 {
                return Err(ConfigError::InvalidValue {
                    key: name.to_string(),
                    message: format!("必须大于 0, 实际 {}", value),
                });
            }
        }
        if self.prep_gap_minutes < 0 {
            return Err(ConfigError::InvalidValue {
                key: "prep_gap_minutes".to_string(),
                message: "不能为负数".to_string(),
            });
        }

        let windows = [
            ("lunch", self.lunch_start, self.lunch_end),
            ("coffee", self.coffee_start, self.coffee_end),
            (
                "coordinator_blackout",
                self.coordinator_blackout_start,
                self.coordinator_blackout_end,
            ),
        ];
        for (name, start, end) in windows {
            if start >= end {
                return Err(ConfigError::Validation(format!(
                    "{} 窗口起止非法: {} >= {}",
                    name, start, end
                )));
            }
        }

        Ok(())
    }

    // ==========================================
    // 派生量
    // ==========================================

    /// 科室全天分钟数
    pub fn department_minutes(&self) -> Minute {
        self.closing_minute - self.opening_minute
    }

    /// 午休轮换子窗口 (12:00-12:30, 12:30-13:00)
    pub fn lunch_sub_windows(&self) -> Vec<(Minute, Minute)> {
        let mut windows = Vec::new();
        let mut start = self.lunch_start;
        while start < self.lunch_end {
            let end = (start + self.lunch_sub_window_minutes.max(1)).min(self.lunch_end);
            windows.push((start, end));
            start = end;
        }
        windows
    }

    /// 协调护士工作量上限 = 全天分钟数 - 预留时段
    pub fn coordinator_max_workload(&self) -> Minute {
        (self.department_minutes() - self.coordinator_reserved_minutes).max(0)
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 营业时间
    pub const OPENING_MINUTE: &str = "opening_minute";
    pub const CLOSING_MINUTE: &str = "closing_minute";

    // 容量
    pub const TOTAL_SEATS: &str = "total_seats";
    pub const MAX_CONCURRENT_SETUPS: &str = "max_concurrent_setups";

    // 护理
    pub const PREP_GAP_MINUTES: &str = "prep_gap_minutes";
    pub const SETUP_MINUTES: &str = "setup_minutes";
    pub const REMOVAL_MINUTES: &str = "removal_minutes";

    // 休息/规划
    pub const LUNCH_START: &str = "lunch_start";
    pub const LUNCH_END: &str = "lunch_end";
    pub const IDEAL_START: &str = "ideal_start";

    pub const KEEP_PROTOCOL_CHECK: &str = "keep_protocol_check";
}
