// ==========================================
// 周考勤登记引擎 - 周记录 API
// ==========================================
// 职责: 周历查询、周记录写入/读取/删除、批量提交
// 流程: 入参校验 → 引擎规则 (RecordRules) → 仓储事务 (WeeklyRecordRepository)
// ==========================================

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, instrument, warn};

use crate::api::dto::{PeriodInfo, PeriodStatusResponse, SubmitPeriodResponse, WriteRecordRequest};
use crate::api::error::{ApiError, ApiResult};
use crate::domain::record::WeeklyRecordWithEntries;
use crate::engine::calendar::EpidemiologicalCalendar;
use crate::engine::record_rules::RecordRules;
use crate::repository::weekly_record_repo::WeeklyRecordRepository;

// ==========================================
// PontoApi - 周记录 API
// ==========================================
pub struct PontoApi {
    calendar: EpidemiologicalCalendar,
    rules: RecordRules,
    record_repo: Arc<WeeklyRecordRepository>,
}

impl PontoApi {
    /// 创建新的PontoApi实例
    pub fn new(record_repo: Arc<WeeklyRecordRepository>, rules: RecordRules) -> Self {
        Self {
            calendar: EpidemiologicalCalendar::new(),
            rules,
            record_repo,
        }
    }

    // ==========================================
    // 周历
    // ==========================================

    /// 日期所在的流行病学周
    pub fn get_period(&self, date: NaiveDate) -> ApiResult<PeriodInfo> {
        let period = self.calendar.period_of(date)?;
        let range = self.calendar.range_of(period.year, period.number)?;
        Ok(PeriodInfo::new(period, range))
    }

    /// 当前本地日期所在周
    pub fn get_current_period(&self) -> ApiResult<PeriodInfo> {
        self.get_period(chrono::Local::now().date_naive())
    }

    /// 周的起止日期
    pub fn get_period_range(&self, year: i32, period: u32) -> ApiResult<PeriodInfo> {
        let validated = self.calendar.validate(year, period)?;
        let range = self.calendar.range_of(year, period)?;
        Ok(PeriodInfo::new(validated, range))
    }

    // ==========================================
    // 周记录
    // ==========================================

    /// 写入周记录
    ///
    /// # 返回
    /// - Ok: 写入后的记录 (草稿)
    /// - Err(InvalidDayStatus / InvalidEntry / InvalidPeriod): 本地校验失败
    /// - Err(RecordLocked): 记录已提交
    /// - Err(KeyConflict): 并发创建冲突 (内部已重试)
    #[instrument(skip(self, request), fields(server_id = %request.server_id, year = request.year, week = request.week_number))]
    pub fn write_record(&self, request: &WriteRecordRequest) -> ApiResult<WeeklyRecordWithEntries> {
        let write = self
            .rules
            .validate_write(
                &request.server_id,
                request.year,
                request.week_number,
                request.saturday_active,
                request.notes.as_deref(),
                &request.days,
            )
            .map_err(|e| {
                warn!(error = %e, "周记录写入校验失败");
                ApiError::from(e)
            })?;

        let saved = self.record_repo.upsert(&write)?;
        info!(record_id = %saved.record.id, "周记录已保存");
        Ok(saved)
    }

    /// 查询单条周记录 (不存在返回 None)
    pub fn get_record(
        &self,
        server_id: &str,
        year: i32,
        week_number: u32,
    ) -> ApiResult<Option<WeeklyRecordWithEntries>> {
        let server_id = require_id(server_id, "server_id")?;
        self.calendar.validate(year, week_number)?;
        Ok(self.record_repo.find(server_id, year, week_number)?)
    }

    /// 查询人员某年若干周的记录 (week_numbers 为空表示全年)
    pub fn list_records(
        &self,
        server_id: &str,
        year: i32,
        week_numbers: &[u32],
    ) -> ApiResult<Vec<WeeklyRecordWithEntries>> {
        let server_id = require_id(server_id, "server_id")?;
        for &week in week_numbers {
            self.calendar.validate(year, week)?;
        }
        Ok(self.record_repo.list_by_worker(server_id, year, week_numbers)?)
    }

    /// 删除草稿周记录
    pub fn delete_record(&self, server_id: &str, year: i32, week_number: u32) -> ApiResult<()> {
        let server_id = require_id(server_id, "server_id")?;
        self.calendar.validate(year, week_number)?;
        Ok(self.record_repo.delete(server_id, year, week_number)?)
    }

    // ==========================================
    // 提交
    // ==========================================

    /// 批量提交 (全有或全无，幂等)
    #[instrument(skip(self, server_ids), fields(workers = server_ids.len()))]
    pub fn submit_period(
        &self,
        server_ids: &[String],
        year: i32,
        week_numbers: &[u32],
    ) -> ApiResult<SubmitPeriodResponse> {
        let ids = normalize_ids(server_ids)?;
        let weeks = self.validate_weeks(year, week_numbers)?;

        let outcome = self.record_repo.submit(&ids, year, &weeks)?;
        Ok(SubmitPeriodResponse {
            year,
            week_numbers: weeks,
            newly_submitted: outcome.newly_submitted,
            already_submitted: outcome.already_submitted,
        })
    }

    /// 一组人员在某周的登记情况
    pub fn get_period_status(
        &self,
        server_ids: &[String],
        year: i32,
        week_number: u32,
    ) -> ApiResult<PeriodStatusResponse> {
        self.calendar.validate(year, week_number)?;
        let ids: Vec<String> = server_ids
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        let summary = self.record_repo.period_status(&ids, year, week_number)?;
        Ok(PeriodStatusResponse::new(year, week_number, summary))
    }

    /// 周集合校验: 非空、去重、升序、每周有效
    fn validate_weeks(&self, year: i32, week_numbers: &[u32]) -> ApiResult<Vec<u32>> {
        let weeks: BTreeSet<u32> = week_numbers.iter().copied().collect();
        if weeks.is_empty() {
            return Err(ApiError::InvalidInput("周集合不能为空".to_string()));
        }
        for &week in &weeks {
            self.calendar.validate(year, week)?;
        }
        Ok(weeks.into_iter().collect())
    }
}

fn require_id<'a>(id: &'a str, field: &str) -> ApiResult<&'a str> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ApiError::InvalidInput(format!("{}不能为空", field)));
    }
    Ok(id)
}

fn normalize_ids(server_ids: &[String]) -> ApiResult<Vec<String>> {
    let ids: BTreeSet<&str> = server_ids
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if ids.is_empty() {
        return Err(ApiError::InvalidInput("人员列表不能为空".to_string()));
    }
    Ok(ids.into_iter().map(str::to_string).collect())
}
