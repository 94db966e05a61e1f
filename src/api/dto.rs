// ==========================================
// 周考勤登记引擎 - API 数据传输对象
// ==========================================
// 职责: 请求/响应结构，供任意传输层 (REST/RPC/CLI) 序列化
// ==========================================

use crate::domain::period::{EpiPeriod, PeriodRange};
use crate::domain::record::{DayInput, PeriodStatusSummary, ProductionOverview};
use crate::engine::summary::WorkerSummary;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 周信息 (周序号 + 起止日期)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodInfo {
    pub year: i32,
    pub period: u32,
    /// 显示标签，如 "SE 03/2026"
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl PeriodInfo {
    pub fn new(period: EpiPeriod, range: PeriodRange) -> Self {
        Self {
            year: period.year,
            period: period.number,
            label: period.to_string(),
            start: range.start,
            end: range.end,
        }
    }
}

/// 写入周记录请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteRecordRequest {
    pub server_id: String,
    pub year: i32,
    pub week_number: u32,
    #[serde(default)]
    pub saturday_active: bool,
    #[serde(default)]
    pub notes: Option<String>,
    pub days: Vec<DayInput>,
}

/// 批量提交结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitPeriodResponse {
    pub year: i32,
    pub week_numbers: Vec<u32>,
    pub newly_submitted: usize,
    pub already_submitted: usize,
}

/// 周登记情况 (录入页完整度提示)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodStatusResponse {
    pub year: i32,
    pub week_number: u32,
    pub targeted: usize,
    pub existing: usize,
    pub submitted: usize,
    pub fully_recorded: bool,
    pub any_submitted: bool,
    pub all_submitted: bool,
}

impl PeriodStatusResponse {
    pub fn new(year: i32, week_number: u32, s: PeriodStatusSummary) -> Self {
        Self {
            year,
            week_number,
            targeted: s.targeted,
            existing: s.existing,
            submitted: s.submitted,
            fully_recorded: s.is_fully_recorded(),
            any_submitted: s.any_submitted(),
            all_submitted: s.all_submitted(),
        }
    }
}

/// 人员报表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerSummaryResponse {
    pub server_id: String,
    pub year: i32,
    pub periods: Vec<u32>,
    pub summary: WorkerSummary,
}

/// 驾驶舱概览
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardOverview {
    pub year: i32,
    pub worker_count: usize,
    pub production: ProductionOverview,
    /// 当前周 (仅当 year 为当前流行病学年时给出)
    pub current_period: Option<PeriodInfo>,
    pub current_period_status: Option<PeriodStatusResponse>,
}
