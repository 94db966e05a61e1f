// ==========================================
// 周考勤登记引擎 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 外勤人员周考勤登记、提交锁定与层级完成度监控
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 状态组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{CompletionStatus, DayStatus, RecordStatus, Role, WorkerStatus};

// 领域实体
pub use domain::{
    DailyEntry, DayInput, EpiPeriod, PeriodRange, Roster, SupervisorArea, SupervisorGeral,
    WeeklyRecord, WeeklyRecordWithEntries, Worker,
};

// 引擎
pub use engine::{
    EpidemiologicalCalendar, HierarchyIndex, RecordRules, RollupAggregator, RollupFilter,
    RollupReport,
};

// API
pub use api::{ApiError, ApiResult, MonitoringApi, PontoApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "周考勤登记引擎";
