// ==========================================
// 周考勤登记引擎 - 流行病学周 (Semana Epidemiológica)
// ==========================================
// 一周 = 周日至周六; 第 1 周须包含至少 4 天一月日期
// 计算逻辑见 engine::calendar
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 流行病学周标识 (年, 周序号)
///
/// 排序按 (year, number)，与时间先后一致
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EpiPeriod {
    pub year: i32,
    pub number: u32, // 1..=53
}

impl EpiPeriod {
    pub fn new(year: i32, number: u32) -> Self {
        Self { year, number }
    }
}

impl fmt::Display for EpiPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SE {:02}/{}", self.number, self.year)
    }
}

/// 周日期范围 (闭区间)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodRange {
    pub start: NaiveDate, // 周日
    pub end: NaiveDate,   // 周六
}

impl PeriodRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// 第 day_of_week 天 (1=周一 … 6=周六) 的日期
    pub fn date_of_day(&self, day_of_week: u8) -> Option<NaiveDate> {
        if !(1..=6).contains(&day_of_week) {
            return None;
        }
        Some(self.start + chrono::Duration::days(day_of_week as i64))
    }
}
