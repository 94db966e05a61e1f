// ==========================================
// 周考勤登记引擎 - API 层
// ==========================================
// 职责: 入参校验、错误转换、编排引擎与仓储
// 说明: 与传输方式无关，REST/RPC/CLI 均可直接包装
// ==========================================

pub mod dto;
pub mod error;
pub mod monitoring_api;
pub mod ponto_api;

pub use dto::{
    DashboardOverview, PeriodInfo, PeriodStatusResponse, SubmitPeriodResponse,
    WorkerSummaryResponse, WriteRecordRequest,
};
pub use error::{ApiError, ApiResult};
pub use monitoring_api::MonitoringApi;
pub use ponto_api::PontoApi;
