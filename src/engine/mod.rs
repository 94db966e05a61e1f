// ==========================================
// 周考勤登记引擎 - 引擎层
// ==========================================
// 职责: 周历计算、写入校验、层级构建与汇总
// 红线: Engine 不拼 SQL，不持有可变状态
// ==========================================

pub mod calendar;
pub mod hierarchy;
pub mod record_rules;
pub mod rollup;
pub mod scope;
pub mod summary;

// 重导出核心引擎
pub use calendar::{CalendarError, CalendarResult, EpidemiologicalCalendar};
pub use hierarchy::{AreaNode, GeralNode, HierarchyIndex, HierarchyTree, NodeKey, WorkerLeaf};
pub use record_rules::{RecordRuleError, RecordRules, DEFAULT_NOTES_MAX_CHARS};
pub use rollup::{
    filter_rollup, AreaRollup, GeralRollup, RollupAggregator, RollupFilter, RollupReport,
    RollupStats, WorkerRollup,
};
pub use scope::scope_roster;
pub use summary::{worker_summary, WorkerSummary};
