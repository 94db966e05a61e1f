// ==========================================
// 周考勤登记引擎 - 流行病学周历
// ==========================================
// 规则: 一周为周日至周六，以该周周六所在年份为候选年份
// 规则: 第 1 周必须包含至少 4 天一月日期
//       (一月第一个周六落在 1~3 日时，该周归上一年最后一周，
//        第 1 周顺延到下一个周六结束)
// 性质: 纯函数，无内部可变状态
// ==========================================

use crate::domain::period::{EpiPeriod, PeriodRange};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use thiserror::Error;
use tracing::instrument;

/// 第 1 周至少包含的一月天数
pub const MIN_JANUARY_DAYS: u32 = 4;

/// 支持的年份范围
pub const MIN_YEAR: i32 = 1;
pub const MAX_YEAR: i32 = 9998;

/// 周历错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    #[error("年份超出支持范围: year={0}")]
    InvalidYear(i32),

    #[error("无效的周序号: year={year}, period={period}, 有效范围 1..={max}")]
    InvalidPeriod { year: i32, period: u32, max: u32 },

    #[error("日期超出可计算范围: {0}")]
    DateOutOfRange(NaiveDate),
}

pub type CalendarResult<T> = Result<T, CalendarError>;

// ==========================================
// EpidemiologicalCalendar - 流行病学周历
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct EpidemiologicalCalendar;

impl EpidemiologicalCalendar {
    pub fn new() -> Self {
        Self
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 日期 → (年, 周序号)
    ///
    /// 当周六早于候选年份第 1 周的周六时，日期属于上一年的最后一周，
    /// 向前一年迭代求解 (不做 "返回第 1 周" 的简化处理)
    #[instrument(level = "trace", skip(self))]
    pub fn period_of(&self, date: NaiveDate) -> CalendarResult<EpiPeriod> {
        let saturday = saturday_of(date)?;
        let mut year = saturday.year();

        let anchor = loop {
            let anchor = period_one_saturday_unchecked(year)?;
            if saturday >= anchor {
                break anchor;
            }
            year -= 1;
        };

        check_year(year)?;

        let number = ((saturday - anchor).num_days() / 7) as u32 + 1;
        Ok(EpiPeriod::new(year, number))
    }

    /// 日期时间 → (年, 周序号)，按本地日历日期归一
    pub fn period_of_datetime(&self, dt: NaiveDateTime) -> CalendarResult<EpiPeriod> {
        self.period_of(dt.date())
    }

    /// 当前本地日期所在周
    pub fn current_period(&self) -> CalendarResult<EpiPeriod> {
        self.period_of(chrono::Local::now().date_naive())
    }

    /// (年, 周序号) → [周日, 周六]
    ///
    /// period_of(range.start) == period_of(range.end) == (year, period)
    pub fn range_of(&self, year: i32, period: u32) -> CalendarResult<PeriodRange> {
        let max = self.periods_in_year(year)?;
        if period == 0 || period > max {
            return Err(CalendarError::InvalidPeriod { year, period, max });
        }

        let end = period_one_saturday_unchecked(year)? + Duration::days(7 * (period as i64 - 1));
        let start = end - Duration::days(6);
        Ok(PeriodRange { start, end })
    }

    /// 年度第 1 周结束的周六
    pub fn period_one_saturday(&self, year: i32) -> CalendarResult<NaiveDate> {
        check_year(year)?;
        period_one_saturday_unchecked(year)
    }

    /// 年度周数 (52 或 53)
    pub fn periods_in_year(&self, year: i32) -> CalendarResult<u32> {
        check_year(year)?;
        let this_year = period_one_saturday_unchecked(year)?;
        let next_year = period_one_saturday_unchecked(year + 1)?;
        Ok(((next_year - this_year).num_days() / 7) as u32)
    }

    /// 校验 (年, 周序号) 是否有效
    pub fn validate(&self, year: i32, period: u32) -> CalendarResult<EpiPeriod> {
        self.range_of(year, period)?;
        Ok(EpiPeriod::new(year, period))
    }

    /// 下一周 (跨年)
    pub fn next_period(&self, period: EpiPeriod) -> CalendarResult<EpiPeriod> {
        let max = self.periods_in_year(period.year)?;
        if period.number >= max {
            check_year(period.year + 1)?;
            Ok(EpiPeriod::new(period.year + 1, 1))
        } else {
            Ok(EpiPeriod::new(period.year, period.number + 1))
        }
    }

    /// 上一周 (跨年)
    pub fn prev_period(&self, period: EpiPeriod) -> CalendarResult<EpiPeriod> {
        if period.number <= 1 {
            let year = period.year - 1;
            Ok(EpiPeriod::new(year, self.periods_in_year(year)?))
        } else {
            Ok(EpiPeriod::new(period.year, period.number - 1))
        }
    }
}

// ==========================================
// 内部计算
// ==========================================

fn check_year(year: i32) -> CalendarResult<()> {
    if (MIN_YEAR..=MAX_YEAR).contains(&year) {
        Ok(())
    } else {
        Err(CalendarError::InvalidYear(year))
    }
}

/// 日期所在周 (周日~周六) 的周六
fn saturday_of(date: NaiveDate) -> CalendarResult<NaiveDate> {
    let offset = 6 - date.weekday().num_days_from_sunday();
    date.checked_add_signed(Duration::days(offset as i64))
        .ok_or(CalendarError::DateOutOfRange(date))
}

/// 第 1 周的周六，不检查年份支持范围 (供相邻年份计算)
fn period_one_saturday_unchecked(year: i32) -> CalendarResult<NaiveDate> {
    let jan_first = NaiveDate::from_ymd_opt(year, 1, 1).ok_or(CalendarError::InvalidYear(year))?;
    let offset = 6 - jan_first.weekday().num_days_from_sunday();
    let first_saturday = jan_first + Duration::days(offset as i64);

    // 该周在一月不足 4 天 → 归上一年
    if first_saturday.day() < MIN_JANUARY_DAYS {
        Ok(first_saturday + Duration::days(7))
    } else {
        Ok(first_saturday)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_period_one_for_each_january_weekday() {
        let cal = EpidemiologicalCalendar::new();
        // (年份, 1月1日星期, 第1周周六)
        let cases = [
            (2023, Weekday::Sun, d(2023, 1, 7)),
            (2024, Weekday::Mon, d(2024, 1, 6)),
            (2019, Weekday::Tue, d(2019, 1, 5)),
            (2025, Weekday::Wed, d(2025, 1, 4)),
            (2026, Weekday::Thu, d(2026, 1, 10)),
            (2027, Weekday::Fri, d(2027, 1, 9)),
            (2022, Weekday::Sat, d(2022, 1, 8)),
        ];

        for (year, weekday, expected) in cases {
            assert_eq!(d(year, 1, 1).weekday(), weekday);
            assert_eq!(cal.period_one_saturday(year).unwrap(), expected, "year={}", year);
            // 第1周至少包含4天一月日期
            assert!(expected.day() >= MIN_JANUARY_DAYS);
        }
    }

    #[test]
    fn test_thursday_new_year_belongs_to_previous_year() {
        let cal = EpidemiologicalCalendar::new();
        // 2026-01-01 是周四: 1~3 日属于 2025 年最后一周
        assert_eq!(cal.period_of(d(2026, 1, 1)).unwrap(), EpiPeriod::new(2025, 53));
        assert_eq!(cal.period_of(d(2026, 1, 3)).unwrap(), EpiPeriod::new(2025, 53));
        assert_eq!(cal.period_of(d(2026, 1, 4)).unwrap(), EpiPeriod::new(2026, 1));
        assert_eq!(cal.period_of(d(2026, 1, 14)).unwrap(), EpiPeriod::new(2026, 2));
    }

    #[test]
    fn test_saturday_new_year_belongs_to_previous_year() {
        let cal = EpidemiologicalCalendar::new();
        assert_eq!(cal.period_of(d(2022, 1, 1)).unwrap(), EpiPeriod::new(2021, 52));
        assert_eq!(cal.period_of(d(2022, 1, 2)).unwrap(), EpiPeriod::new(2022, 1));
    }

    #[test]
    fn test_december_dates_can_open_next_year() {
        let cal = EpidemiologicalCalendar::new();
        // 2024-01-01 周一: 2023-12-31 (周日) 已属于 2024 第 1 周
        assert_eq!(cal.period_of(d(2023, 12, 31)).unwrap(), EpiPeriod::new(2024, 1));
        assert_eq!(cal.period_of(d(2023, 12, 30)).unwrap(), EpiPeriod::new(2023, 52));
    }

    #[test]
    fn test_periods_in_year() {
        let cal = EpidemiologicalCalendar::new();
        assert_eq!(cal.periods_in_year(2020).unwrap(), 53);
        assert_eq!(cal.periods_in_year(2025).unwrap(), 53);
        assert_eq!(cal.periods_in_year(2021).unwrap(), 52);
        assert_eq!(cal.periods_in_year(2026).unwrap(), 52);
    }

    #[test]
    fn test_range_of() {
        let cal = EpidemiologicalCalendar::new();
        let range = cal.range_of(2026, 3).unwrap();
        assert_eq!(range.start, d(2026, 1, 18));
        assert_eq!(range.end, d(2026, 1, 24));
        assert_eq!(range.start.weekday(), Weekday::Sun);
        assert_eq!(range.end.weekday(), Weekday::Sat);
    }

    #[test]
    fn test_range_of_rejects_invalid_period() {
        let cal = EpidemiologicalCalendar::new();
        assert_eq!(
            cal.range_of(2026, 53),
            Err(CalendarError::InvalidPeriod { year: 2026, period: 53, max: 52 })
        );
        assert!(matches!(cal.range_of(2026, 0), Err(CalendarError::InvalidPeriod { .. })));
        assert!(cal.range_of(2025, 53).is_ok());
        assert_eq!(cal.range_of(0, 1), Err(CalendarError::InvalidYear(0)));
    }

    #[test]
    fn test_round_trip_every_period() {
        let cal = EpidemiologicalCalendar::new();
        for year in 1990..=2060 {
            let max = cal.periods_in_year(year).unwrap();
            assert!(max == 52 || max == 53);
            for period in 1..=max {
                let range = cal.range_of(year, period).unwrap();
                let expected = EpiPeriod::new(year, period);
                assert_eq!(cal.period_of(range.start).unwrap(), expected);
                assert_eq!(cal.period_of(range.end).unwrap(), expected);
            }
        }
    }

    #[test]
    fn test_consecutive_days_are_contiguous() {
        let cal = EpidemiologicalCalendar::new();
        let mut date = d(2019, 12, 1);
        let mut prev = cal.period_of(date).unwrap();
        while date < d(2027, 2, 1) {
            date = date.succ_opt().unwrap();
            let cur = cal.period_of(date).unwrap();
            if date.weekday() == Weekday::Sun {
                assert_eq!(cur, cal.next_period(prev).unwrap(), "date={}", date);
            } else {
                assert_eq!(cur, prev, "date={}", date);
            }
            prev = cur;
        }
    }

    #[test]
    fn test_period_of_is_deterministic() {
        let cal = EpidemiologicalCalendar::new();
        let date = d(2025, 12, 30);
        assert_eq!(cal.period_of(date), cal.period_of(date));
    }

    #[test]
    fn test_next_and_prev_cross_year() {
        let cal = EpidemiologicalCalendar::new();
        assert_eq!(cal.next_period(EpiPeriod::new(2025, 53)).unwrap(), EpiPeriod::new(2026, 1));
        assert_eq!(cal.prev_period(EpiPeriod::new(2026, 1)).unwrap(), EpiPeriod::new(2025, 53));
        assert_eq!(cal.next_period(EpiPeriod::new(2026, 10)).unwrap(), EpiPeriod::new(2026, 11));
    }

    #[test]
    fn test_period_of_datetime_ignores_time_of_day() {
        let cal = EpidemiologicalCalendar::new();
        let late = d(2026, 1, 10).and_hms_opt(23, 59, 59).unwrap();
        assert_eq!(cal.period_of_datetime(late).unwrap(), EpiPeriod::new(2026, 1));
    }
}
