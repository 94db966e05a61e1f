// ==========================================
// 周考勤登记引擎 - 领域类型定义
// ==========================================
// 职责: 封闭枚举 (记录状态 / 日状态 / 人员状态 / 角色 / 完成度)
// 存储格式: 与数据库既有取值保持一致
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 周记录状态 (Weekly Record Status)
// ==========================================
// 状态机: Draft → Submitted (单向, 无回退)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Draft,     // 草稿，可编辑
    Submitted, // 已提交，锁定
}

impl RecordStatus {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            RecordStatus::Draft => "draft",
            RecordStatus::Submitted => "submitted",
        }
    }

    /// 从数据库字符串解析，未知值按草稿处理
    pub fn from_db_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "submitted" => RecordStatus::Submitted,
            _ => RecordStatus::Draft,
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, RecordStatus::Submitted)
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 日状态 (Day Status)
// ==========================================
// 封闭集合; 非 Normal 的日子不计出勤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DayStatus {
    Normal,             // 正常
    Vacation,           // Férias
    JustifiedAbsence,   // Falta Justificada
    UnjustifiedAbsence, // Falta Sem Justificativa
    Holiday,            // Feriado
    OptionalHoliday,    // Facultativo
    BirthdayOff,        // Folga de Aniversário
}

impl DayStatus {
    pub const ALL: [DayStatus; 7] = [
        DayStatus::Normal,
        DayStatus::Vacation,
        DayStatus::JustifiedAbsence,
        DayStatus::UnjustifiedAbsence,
        DayStatus::Holiday,
        DayStatus::OptionalHoliday,
        DayStatus::BirthdayOff,
    ];

    /// 数据库中存储的标签 (沿用业务方的葡语标签)
    pub fn to_db_str(&self) -> &'static str {
        match self {
            DayStatus::Normal => "Normal",
            DayStatus::Vacation => "Férias",
            DayStatus::JustifiedAbsence => "Falta Justificada",
            DayStatus::UnjustifiedAbsence => "Falta Sem Justificativa",
            DayStatus::Holiday => "Feriado",
            DayStatus::OptionalHoliday => "Facultativo",
            DayStatus::BirthdayOff => "Folga de Aniversário",
        }
    }

    fn variant_name(&self) -> &'static str {
        match self {
            DayStatus::Normal => "Normal",
            DayStatus::Vacation => "Vacation",
            DayStatus::JustifiedAbsence => "JustifiedAbsence",
            DayStatus::UnjustifiedAbsence => "UnjustifiedAbsence",
            DayStatus::Holiday => "Holiday",
            DayStatus::OptionalHoliday => "OptionalHoliday",
            DayStatus::BirthdayOff => "BirthdayOff",
        }
    }

    /// 解析日状态
    ///
    /// 接受数据库标签与英文枚举名 (忽略大小写和首尾空白)，
    /// 不在封闭集合内返回 None
    pub fn parse(s: &str) -> Option<Self> {
        let needle = s.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        DayStatus::ALL.iter().copied().find(|st| {
            st.to_db_str().to_lowercase() == needle || st.variant_name().to_lowercase() == needle
        })
    }

    pub fn is_absence(&self) -> bool {
        matches!(
            self,
            DayStatus::JustifiedAbsence | DayStatus::UnjustifiedAbsence
        )
    }
}

impl fmt::Display for DayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 人员状态 (Worker Status)
// ==========================================
// 仅作展示，不参与汇总计算
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    Active,
    Inactive,
    Leave,    // 休假/离岗 (Afastado)
    Vacation, // 年假中
}

impl WorkerStatus {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            WorkerStatus::Active => "active",
            WorkerStatus::Inactive => "inactive",
            WorkerStatus::Leave => "leave",
            WorkerStatus::Vacation => "vacation",
        }
    }

    pub fn from_db_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "inactive" => WorkerStatus::Inactive,
            "leave" => WorkerStatus::Leave,
            "vacation" => WorkerStatus::Vacation,
            _ => WorkerStatus::Active, // 默认值
        }
    }
}

impl fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 调用方角色 (Caller Role)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Gestor,
    SupervisorGeral,
    SupervisorArea,
    Servidor,
}

impl Role {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Gestor => "gestor",
            Role::SupervisorGeral => "supervisor_geral",
            Role::SupervisorArea => "supervisor_area",
            Role::Servidor => "servidor",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "super_admin" => Some(Role::SuperAdmin),
            "gestor" => Some(Role::Gestor),
            "supervisor_geral" => Some(Role::SupervisorGeral),
            "supervisor_area" => Some(Role::SupervisorArea),
            "servidor" => Some(Role::Servidor),
            _ => None,
        }
    }

    /// 是否可查看全部人员
    pub fn sees_everything(&self) -> bool {
        matches!(self, Role::SuperAdmin | Role::Gestor)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 完成度分类 (Completion Status)
// ==========================================
// 顺序: Pending < Partial < Complete (单调)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionStatus {
    Pending,
    Partial,
    Complete,
}

impl CompletionStatus {
    /// 由已提交数与总数判定
    ///
    /// 直接比较整数，避免浮点比较 1.0 的误差
    pub fn classify(submitted_count: usize, total: usize) -> Self {
        if total == 0 || submitted_count == 0 {
            CompletionStatus::Pending
        } else if submitted_count >= total {
            CompletionStatus::Complete
        } else {
            CompletionStatus::Partial
        }
    }
}

impl fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionStatus::Pending => write!(f, "pending"),
            CompletionStatus::Partial => write!(f, "partial"),
            CompletionStatus::Complete => write!(f, "complete"),
        }
    }
}
