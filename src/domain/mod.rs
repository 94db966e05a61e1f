// ==========================================
// 周考勤登记引擎 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod period;
pub mod record;
pub mod roster;
pub mod types;

// 重导出核心类型
pub use period::{EpiPeriod, PeriodRange};
pub use record::{
    active_days, DailyEntry, DayInput, PeriodFact, PeriodStatusSummary, ProductionOverview,
    RecordWrite, ValidatedDay, WeeklyRecord, WeeklyRecordWithEntries,
};
pub use roster::{Roster, SupervisorArea, SupervisorGeral, Worker};
pub use types::{CompletionStatus, DayStatus, RecordStatus, Role, WorkerStatus};
