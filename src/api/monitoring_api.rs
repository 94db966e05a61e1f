// ==========================================
// 周考勤登记引擎 - 监控 API
// ==========================================
// 职责: 按角色裁剪名册 → 构建层级 → 一次查询事实 → 汇总
// 架构: API 层 → Engine (scope / hierarchy / rollup) + Repository
// ==========================================

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{info, instrument};

use crate::api::dto::{DashboardOverview, PeriodInfo, PeriodStatusResponse, WorkerSummaryResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::domain::roster::Roster;
use crate::domain::types::Role;
use crate::engine::calendar::EpidemiologicalCalendar;
use crate::engine::hierarchy::HierarchyIndex;
use crate::engine::rollup::{filter_rollup, RollupAggregator, RollupFilter, RollupReport};
use crate::engine::scope::scope_roster;
use crate::engine::summary::worker_summary;
use crate::repository::roster_repo::RosterRepository;
use crate::repository::weekly_record_repo::WeeklyRecordRepository;

// ==========================================
// MonitoringApi - 监控 API
// ==========================================
pub struct MonitoringApi {
    calendar: EpidemiologicalCalendar,
    hierarchy: HierarchyIndex,
    aggregator: RollupAggregator,
    roster_repo: Arc<RosterRepository>,
    record_repo: Arc<WeeklyRecordRepository>,
}

impl MonitoringApi {
    /// 创建新的MonitoringApi实例
    pub fn new(roster_repo: Arc<RosterRepository>, record_repo: Arc<WeeklyRecordRepository>) -> Self {
        Self {
            calendar: EpidemiologicalCalendar::new(),
            hierarchy: HierarchyIndex::new(),
            aggregator: RollupAggregator::new(),
            roster_repo,
            record_repo,
        }
    }

    /// 层级完成度汇总
    ///
    /// # 参数
    /// - role / scope_id: 调用方角色与ID (super_admin / gestor 可为空)
    /// - periods: 选定周集合 (非空)
    /// - filter: 按总督导节点完成度过滤
    #[instrument(skip(self, periods), fields(periods = periods.len()))]
    pub fn get_rollup(
        &self,
        role: Role,
        scope_id: &str,
        year: i32,
        periods: &[u32],
        filter: RollupFilter,
    ) -> ApiResult<RollupReport> {
        let weeks = self.validate_weeks(year, periods)?;
        let roster = self.scoped_roster(role, scope_id)?;

        let tree = self.hierarchy.build_from_roster(&roster);
        let facts = self
            .record_repo
            .find_period_facts(&tree.worker_ids(), year, &weeks)?;
        let report = self.aggregator.rollup(&tree, year, &weeks, &facts);

        info!(
            role = %role,
            total = report.global.total,
            submitted = report.global.submitted_count,
            "监控汇总完成"
        );
        Ok(filter_rollup(&report, filter))
    }

    /// 人员报表汇总 (periods 为空表示全年)
    pub fn get_worker_summary(
        &self,
        server_id: &str,
        year: i32,
        periods: &[u32],
    ) -> ApiResult<WorkerSummaryResponse> {
        let server_id = server_id.trim();
        if server_id.is_empty() {
            return Err(ApiError::InvalidInput("server_id不能为空".to_string()));
        }
        let weeks: Vec<u32> = if periods.is_empty() {
            Vec::new()
        } else {
            self.validate_weeks(year, periods)?
        };

        let records = self.record_repo.list_by_worker(server_id, year, &weeks)?;
        Ok(WorkerSummaryResponse {
            server_id: server_id.to_string(),
            year,
            periods: records.iter().map(|r| r.record.week_number).collect(),
            summary: worker_summary(&records),
        })
    }

    /// 驾驶舱概览: 年度产量卡片 + 当前周登记情况
    pub fn get_dashboard_overview(
        &self,
        role: Role,
        scope_id: &str,
        year: i32,
    ) -> ApiResult<DashboardOverview> {
        self.calendar.periods_in_year(year)?;
        let roster = self.scoped_roster(role, scope_id)?;
        let ids = roster.worker_ids();

        let production = if role.sees_everything() {
            self.record_repo.production_overview(None, year)?
        } else {
            self.record_repo.production_overview(Some(&ids), year)?
        };

        let current = self.calendar.current_period()?;
        let (current_period, current_period_status) = if current.year == year {
            let range = self.calendar.range_of(current.year, current.number)?;
            let status = self
                .record_repo
                .period_status(&ids, current.year, current.number)?;
            (
                Some(PeriodInfo::new(current, range)),
                Some(PeriodStatusResponse::new(current.year, current.number, status)),
            )
        } else {
            (None, None)
        };

        Ok(DashboardOverview {
            year,
            worker_count: ids.len(),
            production,
            current_period,
            current_period_status,
        })
    }

    fn scoped_roster(&self, role: Role, scope_id: &str) -> ApiResult<Roster> {
        let scope_id = scope_id.trim();
        if !role.sees_everything() && scope_id.is_empty() {
            return Err(ApiError::InvalidInput(format!(
                "角色{}必须提供scope_id",
                role
            )));
        }
        let roster = self.roster_repo.load_roster()?;
        Ok(scope_roster(role, scope_id, &roster))
    }

    fn validate_weeks(&self, year: i32, periods: &[u32]) -> ApiResult<Vec<u32>> {
        let weeks: BTreeSet<u32> = periods.iter().copied().collect();
        if weeks.is_empty() {
            return Err(ApiError::InvalidInput("周集合不能为空".to_string()));
        }
        for &week in &weeks {
            self.calendar.validate(year, week)?;
        }
        Ok(weeks.into_iter().collect())
    }
}
