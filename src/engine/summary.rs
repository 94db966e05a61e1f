// ==========================================
// 周考勤登记引擎 - 人员报表汇总
// ==========================================
// 职责: 单个人员若干周记录的合计 (报表页汇总卡片)
// 说明: 统计传入的全部记录 (含草稿)，调用方决定取哪些周
// ==========================================

use crate::domain::record::WeeklyRecordWithEntries;
use crate::domain::types::DayStatus;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerSummary {
    pub weeks_count: u32,
    pub submitted_weeks: u32,
    pub total_worked_days: u32,
    pub total_production: f64,
    /// 缺勤日 (含有无理由两类)
    pub absences: u32,
    pub vacation_days: u32,
}

pub fn worker_summary(records: &[WeeklyRecordWithEntries]) -> WorkerSummary {
    records.iter().fold(WorkerSummary::default(), |mut acc, r| {
        acc.weeks_count += 1;
        if r.record.status.is_locked() {
            acc.submitted_weeks += 1;
        }
        acc.total_worked_days += r.worked_days_total();
        acc.total_production += r.production_total();
        for e in &r.entries {
            if e.status.is_absence() {
                acc.absences += 1;
            } else if e.status == DayStatus::Vacation {
                acc.vacation_days += 1;
            }
        }
        acc
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::{DailyEntry, WeeklyRecord};
    use crate::domain::types::RecordStatus;
    use chrono::NaiveDate;

    fn record(week: u32, status: RecordStatus, days: &[(DayStatus, u8, f64)]) -> WeeklyRecordWithEntries {
        let ts = NaiveDate::from_ymd_opt(2026, 1, 20)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        WeeklyRecordWithEntries {
            record: WeeklyRecord {
                id: format!("r{week}"),
                server_id: "W1".into(),
                year: 2026,
                week_number: week,
                saturday_active: false,
                status,
                notes: None,
                created_at: ts,
                updated_at: ts,
            },
            entries: days
                .iter()
                .enumerate()
                .map(|(i, (st, worked, prod))| DailyEntry {
                    id: format!("e{week}-{i}"),
                    weekly_record_id: format!("r{week}"),
                    day_of_week: i as u8 + 1,
                    worked_days: *worked,
                    production: *prod,
                    status: *st,
                    updated_at: ts,
                })
                .collect(),
        }
    }

    #[test]
    fn test_summary_counts() {
        let records = vec![
            record(
                3,
                RecordStatus::Submitted,
                &[
                    (DayStatus::Normal, 1, 4.0),
                    (DayStatus::Vacation, 0, 0.0),
                    (DayStatus::JustifiedAbsence, 0, 0.0),
                    (DayStatus::Normal, 1, 6.0),
                    (DayStatus::Holiday, 0, 0.0),
                ],
            ),
            record(
                4,
                RecordStatus::Draft,
                &[
                    (DayStatus::UnjustifiedAbsence, 0, 0.0),
                    (DayStatus::Normal, 1, 1.5),
                    (DayStatus::Normal, 0, 0.0),
                    (DayStatus::Normal, 1, 1.5),
                    (DayStatus::Normal, 1, 1.0),
                ],
            ),
        ];
        let s = worker_summary(&records);
        assert_eq!(s.weeks_count, 2);
        assert_eq!(s.submitted_weeks, 1);
        assert_eq!(s.total_worked_days, 5);
        assert_eq!(s.total_production, 14.0);
        assert_eq!(s.absences, 2);
        assert_eq!(s.vacation_days, 1);
    }

    #[test]
    fn test_empty_summary() {
        assert_eq!(worker_summary(&[]), WorkerSummary::default());
    }
}
