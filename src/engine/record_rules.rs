// ==========================================
// 周考勤登记引擎 - 周记录写入规则
// ==========================================
// 职责: 写入前的本地校验，产出 RecordWrite
// 规则: 日集合 = {1..5} ∪ ({6} 当且仅当周六启用)
// 规则: 日状态属于封闭集合；非 Normal 日不计出勤
// 红线: Engine 不拼 SQL
// ==========================================

use crate::domain::record::{active_days, DayInput, RecordWrite, ValidatedDay};
use crate::domain::types::DayStatus;
use crate::engine::calendar::{CalendarError, EpidemiologicalCalendar};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{instrument, warn};

/// 备注默认长度上限 (字符)
pub const DEFAULT_NOTES_MAX_CHARS: usize = 800;

/// 写入规则错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordRuleError {
    /// 日状态未知，或日集合与周六开关不一致
    #[error("日状态无效: {0}")]
    InvalidDayStatus(String),

    /// 出勤标记/产量等字段值非法
    #[error("日明细无效: {0}")]
    InvalidEntry(String),

    #[error(transparent)]
    InvalidPeriod(#[from] CalendarError),
}

// ==========================================
// RecordRules - 写入规则
// ==========================================
#[derive(Debug, Clone)]
pub struct RecordRules {
    calendar: EpidemiologicalCalendar,
    notes_max_chars: usize,
}

impl Default for RecordRules {
    fn default() -> Self {
        Self::new(DEFAULT_NOTES_MAX_CHARS)
    }
}

impl RecordRules {
    pub fn new(notes_max_chars: usize) -> Self {
        Self {
            calendar: EpidemiologicalCalendar::new(),
            notes_max_chars,
        }
    }

    pub fn notes_max_chars(&self) -> usize {
        self.notes_max_chars
    }

    /// 校验一次完整写入
    ///
    /// # 返回
    /// - Ok(RecordWrite): 日明细按 day_of_week 升序
    /// - Err(InvalidDayStatus): 未知状态 / 日集合不匹配
    /// - Err(InvalidEntry): worked_units ∉ {0,1}、产量为负或非有限值、人员ID为空
    /// - Err(InvalidPeriod): 周序号超出该年范围
    #[instrument(skip(self, notes, days), fields(day_count = days.len()))]
    pub fn validate_write(
        &self,
        server_id: &str,
        year: i32,
        week_number: u32,
        saturday_active: bool,
        notes: Option<&str>,
        days: &[DayInput],
    ) -> Result<RecordWrite, RecordRuleError> {
        let server_id = server_id.trim();
        if server_id.is_empty() {
            return Err(RecordRuleError::InvalidEntry("人员ID不能为空".to_string()));
        }

        self.calendar.validate(year, week_number)?;

        check_day_set(saturday_active, days)?;

        let mut validated = days
            .iter()
            .map(validate_day)
            .collect::<Result<Vec<_>, _>>()?;
        validated.sort_by_key(|d| d.day_of_week);

        Ok(RecordWrite {
            server_id: server_id.to_string(),
            year,
            week_number,
            saturday_active,
            notes: self.normalize_notes(notes),
            days: validated,
        })
    }

    /// 备注超长按字符截断 (不拒绝)
    pub fn normalize_notes(&self, notes: Option<&str>) -> Option<String> {
        let trimmed = notes.map(str::trim).filter(|s| !s.is_empty())?;
        let char_count = trimmed.chars().count();
        if char_count > self.notes_max_chars {
            warn!(char_count, limit = self.notes_max_chars, "备注超长，已截断");
            Some(trimmed.chars().take(self.notes_max_chars).collect())
        } else {
            Some(trimmed.to_string())
        }
    }
}

fn check_day_set(saturday_active: bool, days: &[DayInput]) -> Result<(), RecordRuleError> {
    let mut seen = BTreeSet::new();
    for day in days {
        if !seen.insert(day.day_of_week) {
            return Err(RecordRuleError::InvalidDayStatus(format!(
                "日明细重复: day_of_week={}",
                day.day_of_week
            )));
        }
    }

    let expected: BTreeSet<u8> = active_days(saturday_active).into_iter().collect();
    if seen != expected {
        return Err(RecordRuleError::InvalidDayStatus(format!(
            "日集合不匹配: expected={:?}, actual={:?}, saturday_active={}",
            expected, seen, saturday_active
        )));
    }
    Ok(())
}

fn validate_day(day: &DayInput) -> Result<ValidatedDay, RecordRuleError> {
    let status = DayStatus::parse(&day.status).ok_or_else(|| {
        RecordRuleError::InvalidDayStatus(format!(
            "day_of_week={}, status={:?}",
            day.day_of_week, day.status
        ))
    })?;

    if day.worked_units > 1 {
        return Err(RecordRuleError::InvalidEntry(format!(
            "day_of_week={}, worked_units={} (仅允许 0 或 1)",
            day.day_of_week, day.worked_units
        )));
    }

    if !day.production.is_finite() || day.production < 0.0 {
        return Err(RecordRuleError::InvalidEntry(format!(
            "day_of_week={}, production={} (必须为非负数)",
            day.day_of_week, day.production
        )));
    }

    // 非 Normal 日一律不计出勤; Normal 日允许标记为未出勤
    let worked_units = if status == DayStatus::Normal {
        day.worked_units
    } else {
        0
    };

    Ok(ValidatedDay {
        day_of_week: day.day_of_week,
        status,
        worked_units,
        production: day.production,
    })
}
