// ==========================================
// 输液日间治疗排程系统 - 领域类型定义
// ==========================================
// 职责: 护理动作类型、分配模式等枚举
// 序列化格式: snake_case (与目录/前端数据一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 护理动作类型 (Action Type)
// ==========================================
// 红线: 每个治疗至多一个 Infusion 动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Setup,         // 上针/连接输液
    Infusion,      // 输液本身
    Check,         // 输液中巡视
    PcSwitch,      // 血制品更换
    Removal,       // 拔针
    Observation,   // 输液后观察
    Flush,         // 冲管
    Custom,        // 自定义(非护理)
    CustomNurse,   // 自定义(护理)
    ProtocolCheck, // 方案双人核对 (待产品确认是否弃用)
}

impl ActionType {
    /// 该类型是否天然需要护士执行
    ///
    /// 模板动作还可以通过 `is_nurse_action` 额外声明
    pub fn requires_nurse(&self) -> bool {
        matches!(
            self,
            ActionType::Setup
                | ActionType::Check
                | ActionType::PcSwitch
                | ActionType::Removal
                | ActionType::CustomNurse
                | ActionType::ProtocolCheck
        )
    }

    /// 转换为字符串标识
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Setup => "setup",
            ActionType::Infusion => "infusion",
            ActionType::Check => "check",
            ActionType::PcSwitch => "pc_switch",
            ActionType::Removal => "removal",
            ActionType::Observation => "observation",
            ActionType::Flush => "flush",
            ActionType::Custom => "custom",
            ActionType::CustomNurse => "custom_nurse",
            ActionType::ProtocolCheck => "protocol_check",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 分配模式 (Assignment Mode)
// ==========================================
// Forced: 兜底分配,可能与该护士已有任务时间重叠
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentMode {
    Clean,  // 正常分配 (满足全部约束)
    Forced, // 强制兜底 (放宽重叠/准备间隔)
}

impl fmt::Display for AssignmentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssignmentMode::Clean => write!(f, "CLEAN"),
            AssignmentMode::Forced => write!(f, "FORCED"),
        }
    }
}

// ==========================================
// 药品优先级 (Medication Priority)
// ==========================================
// 周排程时 Low 优先级药品排在最后
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MedicationPriority {
    #[default]
    Normal,
    Low,
}

impl fmt::Display for MedicationPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MedicationPriority::Normal => write!(f, "NORMAL"),
            MedicationPriority::Low => write!(f, "LOW"),
        }
    }
}
