use serde::{Deserialize, Serialize};

/// 日优化评分权重
///
/// score = seat_headroom * 座位余量 + staff_balance * 护士负荷均衡 + proximity * 贴近理想开始时间
///         - forced_penalty * 兜底分配次数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerWeights {
    pub seat_headroom: f64,
    pub staff_balance: f64,
    pub proximity: f64,
    /// 每个兜底 (FORCED) 分配的扣分
    pub forced_penalty: f64,
}

impl Default for OptimizerWeights {
    fn default() -> Self {
        Self {
            seat_headroom: 0.4,
            staff_balance: 0.4,
            proximity: 0.2,
            forced_penalty: 1.0,
        }
    }
}

/// 周/批量分配评分权重 (分数越低越好)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributorWeights {
    /// 落位后当日护士最大工作量 (分钟)
    pub peak_staff_workload: f64,
    /// 治疗区间内的峰值座位占用
    pub local_occupancy: f64,
    /// 当日已落位治疗数 (跨日分散)
    pub day_load: f64,
    /// 开始时间 (分钟), 仅用于同分时偏向较早时段
    pub time_of_day: f64,
    /// 每个兜底 (FORCED) 分配的罚分
    pub forced_penalty: f64,
}

impl Default for DistributorWeights {
    fn default() -> Self {
        Self {
            peak_staff_workload: 1.0,
            local_occupancy: 20.0,
            day_load: 10.0,
            time_of_day: 0.01,
            forced_penalty: 1000.0,
        }
    }
}

/// 负荷报表告警阈值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportThresholds {
    /// 峰值占用 / 座位数 >= 该值时提示高负荷
    pub high_utilization_ratio: f64,
    /// 峰值 / 非空时段均值 >= 该值时提示峰值失衡
    pub peak_to_average_ratio: f64,
    /// 上午/下午 (或反之) 负荷比 >= 该值时提示失衡
    pub half_day_ratio: f64,
}

impl Default for ReportThresholds {
    fn default() -> Self {
        Self {
            high_utilization_ratio: 0.9,
            peak_to_average_ratio: 2.0,
            half_day_ratio: 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optimizer_weights_sum_to_one() {
        let w = OptimizerWeights::default();
        assert!((w.seat_headroom + w.staff_balance + w.proximity - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_partial_weights_json() {
        let w: DistributorWeights = serde_json::from_str(r#"{"day_load": 3.0}"#).unwrap();
        assert_eq!(w.day_load, 3.0);
        assert_eq!(w.time_of_day, 0.01);
    }
}
