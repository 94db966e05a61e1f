// ==========================================
// 周考勤登记引擎 - 周记录领域模型
// ==========================================
// 对齐: weekly_records / daily_entries 表
// 约束: 周记录与其日明细作为一个整体创建/更新/删除
// ==========================================

use crate::domain::types::{DayStatus, RecordStatus};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 周一至周五固定存在
pub const WEEKDAY_SET: [u8; 5] = [1, 2, 3, 4, 5];
/// 周六 (可选第 6 天)
pub const SATURDAY: u8 = 6;

/// 给定周六开关时应存在的日集合
pub fn active_days(saturday_active: bool) -> Vec<u8> {
    let mut days = WEEKDAY_SET.to_vec();
    if saturday_active {
        days.push(SATURDAY);
    }
    days
}

// ==========================================
// WeeklyRecord - 周记录
// ==========================================
// 唯一键: (server_id, year, week_number)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyRecord {
    pub id: String,
    pub server_id: String,
    pub year: i32,
    pub week_number: u32,
    pub saturday_active: bool,
    pub status: RecordStatus,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

// ==========================================
// DailyEntry - 日明细
// ==========================================
// 唯一键: (weekly_record_id, day_of_week)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyEntry {
    pub id: String,
    pub weekly_record_id: String,
    pub day_of_week: u8,  // 1..=6
    pub worked_days: u8,  // 0 或 1
    pub production: f64,  // ≥ 0
    pub status: DayStatus,
    pub updated_at: NaiveDateTime,
}

/// 周记录及其日明细 (按 day_of_week 升序)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyRecordWithEntries {
    pub record: WeeklyRecord,
    pub entries: Vec<DailyEntry>,
}

impl WeeklyRecordWithEntries {
    pub fn worked_days_total(&self) -> u32 {
        self.entries.iter().map(|e| e.worked_days as u32).sum()
    }

    pub fn production_total(&self) -> f64 {
        self.entries.iter().map(|e| e.production).sum()
    }

    pub fn day_set(&self) -> Vec<u8> {
        self.entries.iter().map(|e| e.day_of_week).collect()
    }
}

// ==========================================
// 写入输入
// ==========================================

/// 单日输入 (未校验)
///
/// status 为原始字符串，由校验阶段解析到封闭集合
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayInput {
    pub day_of_week: u8,
    pub status: String,
    pub worked_units: u8,
    pub production: f64,
}

impl DayInput {
    pub fn normal(day_of_week: u8, production: f64) -> Self {
        Self {
            day_of_week,
            status: DayStatus::Normal.to_db_str().to_string(),
            worked_units: 1,
            production,
        }
    }

    pub fn with_status(day_of_week: u8, status: DayStatus) -> Self {
        Self {
            day_of_week,
            status: status.to_db_str().to_string(),
            worked_units: if status == DayStatus::Normal { 1 } else { 0 },
            production: 0.0,
        }
    }
}

/// 单日明细 (已校验)
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedDay {
    pub day_of_week: u8,
    pub status: DayStatus,
    pub worked_units: u8,
    pub production: f64,
}

/// 一次完整写入 (已校验)
///
/// 由 engine::record_rules::validate_write 构造
#[derive(Debug, Clone, PartialEq)]
pub struct RecordWrite {
    pub server_id: String,
    pub year: i32,
    pub week_number: u32,
    pub saturday_active: bool,
    pub notes: Option<String>,
    pub days: Vec<ValidatedDay>,
}

// ==========================================
// 汇总用读模型
// ==========================================

/// 单人单周的汇总事实 (一次分组查询得到)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodFact {
    pub server_id: String,
    pub week_number: u32,
    pub status: RecordStatus,
    pub updated_at: NaiveDateTime,
    pub worked_days: u32,
    pub production: f64,
}

/// 一组人员在某周的登记情况
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodStatusSummary {
    pub targeted: usize,
    pub existing: usize,
    pub submitted: usize,
}

impl PeriodStatusSummary {
    pub fn is_fully_recorded(&self) -> bool {
        self.existing >= self.targeted
    }

    pub fn any_submitted(&self) -> bool {
        self.submitted > 0
    }

    pub fn all_submitted(&self) -> bool {
        self.targeted > 0 && self.submitted >= self.targeted
    }
}

/// 年度产量概览 (驾驶舱卡片)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductionOverview {
    pub record_count: u32,
    pub total_production: f64,
    pub vacation_entries: u32,
    pub absence_entries: u32,
}
