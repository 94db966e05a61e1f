// ==========================================
// 周考勤登记引擎 - 数据仓储层
// ==========================================
// 红线: Repository 不含汇总/校验规则，只做状态机守卫与数据访问
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod error;
pub mod roster_repo;
pub mod weekly_record_repo;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use roster_repo::RosterRepository;
pub use weekly_record_repo::{SubmitOutcome, WeeklyRecordRepository, DEFAULT_KEY_CONFLICT_RETRIES};
