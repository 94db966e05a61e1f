// ==========================================
// 周考勤登记引擎 - 周记录数据仓储
// ==========================================
// 职责: weekly_records / daily_entries 两表的读写
// 状态机: 不存在 → Draft (首次写入) → Draft (覆盖写) → Submitted (批量提交)
//         Submitted 之后所有写操作拒绝 (RecordLocked)，读操作允许
// 并发: 写入与提交各为一个 IMMEDIATE 事务；唯一键冲突重试一次后上抛
// ==========================================

use crate::domain::record::{
    DailyEntry, PeriodFact, PeriodStatusSummary, ProductionOverview, RecordWrite, WeeklyRecord,
    WeeklyRecordWithEntries,
};
use crate::domain::types::{DayStatus, RecordStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, TransactionBehavior};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

/// IN 列表分块大小，避免超过 SQLite 参数上限
const IN_CHUNK_SIZE: usize = 500;

/// 默认唯一键冲突重试次数
pub const DEFAULT_KEY_CONFLICT_RETRIES: u32 = 1;

/// 批量提交结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubmitOutcome {
    /// 本次由 Draft 转为 Submitted 的记录数
    pub newly_submitted: usize,
    /// 提交前已是 Submitted 的记录数
    pub already_submitted: usize,
}

// ==========================================
// WeeklyRecordRepository - 周记录仓储
// ==========================================
pub struct WeeklyRecordRepository {
    conn: Arc<Mutex<Connection>>,
    key_conflict_retries: u32,
}

impl WeeklyRecordRepository {
    /// 创建新的WeeklyRecordRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            conn,
            key_conflict_retries: DEFAULT_KEY_CONFLICT_RETRIES,
        }
    }

    pub fn with_key_conflict_retries(mut self, retries: u32) -> Self {
        self.key_conflict_retries = retries;
        self
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入
    // ==========================================

    /// 写入周记录 (不存在则创建，Draft 则整体覆盖)
    ///
    /// # 返回
    /// - Ok: 写入后的记录及日明细
    /// - Err(RecordLocked): 记录已提交
    /// - Err(KeyConflict): 并发创建冲突，重试后仍冲突
    #[instrument(skip(self, write), fields(server_id = %write.server_id, year = write.year, week = write.week_number))]
    pub fn upsert(&self, write: &RecordWrite) -> RepositoryResult<WeeklyRecordWithEntries> {
        let expected = crate::domain::record::active_days(write.saturday_active);
        let actual: Vec<u8> = write.days.iter().map(|d| d.day_of_week).collect();
        if expected != actual {
            return Err(RepositoryError::ValidationError(format!(
                "日明细集合与周六开关不一致: expected={:?}, actual={:?}",
                expected, actual
            )));
        }

        let mut attempt = 0;
        loop {
            match self.try_upsert(write) {
                Err(RepositoryError::KeyConflict { .. }) if attempt < self.key_conflict_retries => {
                    attempt += 1;
                    warn!(attempt, "周记录并发创建冲突，按读-改-写重试");
                }
                other => return other,
            }
        }
    }

    fn try_upsert(&self, write: &RecordWrite) -> RepositoryResult<WeeklyRecordWithEntries> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let now = now_str();

        let existing = find_key(&tx, &write.server_id, write.year, write.week_number)?;

        let record_id = match existing {
            Some((_, RecordStatus::Submitted)) => {
                warn!("周记录已提交，拒绝写入");
                return Err(RepositoryError::RecordLocked {
                    server_id: write.server_id.clone(),
                    year: write.year,
                    week_number: write.week_number,
                });
            }
            Some((id, RecordStatus::Draft)) => {
                tx.execute(
                    r#"UPDATE weekly_records
                       SET saturday_active = ?1, notes = ?2, updated_at = ?3
                       WHERE id = ?4 AND status = 'draft'"#,
                    params![write.saturday_active, write.notes, now, id],
                )?;
                debug!(record_id = %id, "更新草稿周记录");
                id
            }
            None => {
                let id = Uuid::new_v4().to_string();
                let inserted = tx.execute(
                    r#"INSERT INTO weekly_records (
                           id, server_id, year, week_number, saturday_active,
                           status, notes, created_at, updated_at
                       ) VALUES (?1, ?2, ?3, ?4, ?5, 'draft', ?6, ?7, ?7)"#,
                    params![
                        id,
                        write.server_id,
                        write.year,
                        write.week_number,
                        write.saturday_active,
                        write.notes,
                        now,
                    ],
                );
                if let Err(e) = inserted {
                    return Err(match RepositoryError::from(e) {
                        RepositoryError::UniqueConstraintViolation(_) => RepositoryError::KeyConflict {
                            server_id: write.server_id.clone(),
                            year: write.year,
                            week_number: write.week_number,
                        },
                        other => other,
                    });
                }
                info!(record_id = %id, "创建草稿周记录");
                id
            }
        };

        // 周六关闭时移除第 6 天
        let max_day: u8 = if write.saturday_active { 6 } else { 5 };
        tx.execute(
            "DELETE FROM daily_entries WHERE weekly_record_id = ?1 AND day_of_week > ?2",
            params![record_id, max_day],
        )?;

        {
            let mut stmt = tx.prepare(
                r#"INSERT INTO daily_entries (
                       id, weekly_record_id, day_of_week, worked_days, production, status, updated_at
                   ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                   ON CONFLICT(weekly_record_id, day_of_week) DO UPDATE SET
                       worked_days = excluded.worked_days,
                       production = excluded.production,
                       status = excluded.status,
                       updated_at = excluded.updated_at"#,
            )?;
            for day in &write.days {
                stmt.execute(params![
                    Uuid::new_v4().to_string(),
                    record_id,
                    day.day_of_week,
                    day.worked_units,
                    day.production,
                    day.status.to_db_str(),
                    now,
                ])?;
            }
        }

        let saved = load_with_entries(&tx, &record_id)?.ok_or_else(|| RepositoryError::NotFound {
            entity: "WeeklyRecord".to_string(),
            id: record_id.clone(),
        })?;

        tx.commit()?;
        Ok(saved)
    }

    // ==========================================
    // 提交
    // ==========================================

    /// 批量提交 (全有或全无)
    ///
    /// 每个 (人员, 周) 都必须已有记录 (Draft 或 Submitted)，
    /// 否则返回 IncompleteCoverage 且不改变任何状态；
    /// 对已全部提交的集合重复调用为无操作
    #[instrument(skip(self, server_ids), fields(workers = server_ids.len()))]
    pub fn submit(
        &self,
        server_ids: &[String],
        year: i32,
        week_numbers: &[u32],
    ) -> RepositoryResult<SubmitOutcome> {
        let ids: BTreeSet<&str> = server_ids.iter().map(|s| s.as_str()).collect();
        let weeks: BTreeSet<u32> = week_numbers.iter().copied().collect();
        if ids.is_empty() || weeks.is_empty() {
            return Ok(SubmitOutcome::default());
        }
        let ids: Vec<&str> = ids.into_iter().collect();
        let weeks: Vec<u32> = weeks.into_iter().collect();

        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let statuses = load_statuses(&tx, &ids, year, &weeks)?;

        let missing: Vec<String> = ids
            .iter()
            .filter(|id| weeks.iter().any(|w| !statuses.contains_key(&(id.to_string(), *w))))
            .map(|id| id.to_string())
            .collect();

        if !missing.is_empty() {
            warn!(missing = missing.len(), "提交覆盖不足，未做任何变更");
            return Err(RepositoryError::IncompleteCoverage {
                year,
                week_numbers: weeks,
                missing,
            });
        }

        let already_submitted = statuses
            .values()
            .filter(|s| **s == RecordStatus::Submitted)
            .count();

        let now = now_str();
        let mut newly_submitted = 0;
        for chunk in ids.chunks(IN_CHUNK_SIZE) {
            let sql = format!(
                r#"UPDATE weekly_records
                   SET status = 'submitted', updated_at = ?
                   WHERE status = 'draft' AND year = ?
                     AND week_number IN ({})
                     AND server_id IN ({})"#,
                placeholders(weeks.len()),
                placeholders(chunk.len())
            );
            let mut values: Vec<Value> = vec![Value::from(now.clone()), Value::from(year)];
            values.extend(weeks.iter().map(|w| Value::from(*w as i64)));
            values.extend(chunk.iter().map(|id| Value::from(id.to_string())));
            newly_submitted += tx.execute(&sql, params_from_iter(values.iter()))?;
        }

        tx.commit()?;
        info!(newly_submitted, already_submitted, "周记录批量提交完成");
        Ok(SubmitOutcome {
            newly_submitted,
            already_submitted,
        })
    }

    // ==========================================
    // 删除
    // ==========================================

    /// 删除草稿周记录及其日明细
    pub fn delete(&self, server_id: &str, year: i32, week_number: u32) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let (id, status) = find_key(&tx, server_id, year, week_number)?.ok_or_else(|| {
            RepositoryError::NotFound {
                entity: "WeeklyRecord".to_string(),
                id: format!("{}/{}/{}", server_id, year, week_number),
            }
        })?;

        if status.is_locked() {
            return Err(RepositoryError::RecordLocked {
                server_id: server_id.to_string(),
                year,
                week_number,
            });
        }

        tx.execute("DELETE FROM daily_entries WHERE weekly_record_id = ?1", params![id])?;
        tx.execute("DELETE FROM weekly_records WHERE id = ?1", params![id])?;
        tx.commit()?;
        info!(record_id = %id, server_id, year, week_number, "删除草稿周记录");
        Ok(())
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 按唯一键查询周记录 (含日明细)
    pub fn find(
        &self,
        server_id: &str,
        year: i32,
        week_number: u32,
    ) -> RepositoryResult<Option<WeeklyRecordWithEntries>> {
        let conn = self.get_conn()?;
        match find_key(&conn, server_id, year, week_number)? {
            Some((id, _)) => load_with_entries(&conn, &id),
            None => Ok(None),
        }
    }

    /// 查询人员某年若干周的记录，按周升序
    ///
    /// week_numbers 为空时返回该年全部记录
    pub fn list_by_worker(
        &self,
        server_id: &str,
        year: i32,
        week_numbers: &[u32],
    ) -> RepositoryResult<Vec<WeeklyRecordWithEntries>> {
        let conn = self.get_conn()?;

        let mut sql = String::from(
            "SELECT id FROM weekly_records WHERE server_id = ? AND year = ?",
        );
        let mut values: Vec<Value> = vec![Value::from(server_id.to_string()), Value::from(year)];
        let weeks: BTreeSet<u32> = week_numbers.iter().copied().collect();
        if !weeks.is_empty() {
            sql.push_str(&format!(" AND week_number IN ({})", placeholders(weeks.len())));
            values.extend(weeks.iter().map(|w| Value::from(*w as i64)));
        }
        sql.push_str(" ORDER BY week_number ASC");

        let ids = {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(values.iter()), |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(r) = load_with_entries(&conn, &id)? {
                records.push(r);
            }
        }
        Ok(records)
    }

    /// 一组人员在某周的登记情况
    pub fn period_status(
        &self,
        server_ids: &[String],
        year: i32,
        week_number: u32,
    ) -> RepositoryResult<PeriodStatusSummary> {
        let ids: BTreeSet<&str> = server_ids.iter().map(|s| s.as_str()).collect();
        let ids: Vec<&str> = ids.into_iter().collect();
        let conn = self.get_conn()?;
        let statuses = load_statuses(&conn, &ids, year, &[week_number])?;

        Ok(PeriodStatusSummary {
            targeted: ids.len(),
            existing: statuses.len(),
            submitted: statuses
                .values()
                .filter(|s| **s == RecordStatus::Submitted)
                .count(),
        })
    }

    /// 汇总事实: 每个 (人员, 周) 一行，含出勤天数与产量合计
    ///
    /// 无记录的 (人员, 周) 不出现在结果中 (视为零统计)
    pub fn find_period_facts(
        &self,
        server_ids: &[String],
        year: i32,
        week_numbers: &[u32],
    ) -> RepositoryResult<Vec<PeriodFact>> {
        let ids: BTreeSet<&str> = server_ids.iter().map(|s| s.as_str()).collect();
        let weeks: BTreeSet<u32> = week_numbers.iter().copied().collect();
        if ids.is_empty() || weeks.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<&str> = ids.into_iter().collect();

        let conn = self.get_conn()?;
        let mut facts = Vec::new();
        for chunk in ids.chunks(IN_CHUNK_SIZE) {
            let sql = format!(
                r#"SELECT r.server_id, r.week_number, r.status, r.updated_at,
                          COALESCE(SUM(e.worked_days), 0), COALESCE(SUM(e.production), 0.0)
                   FROM weekly_records r
                   LEFT JOIN daily_entries e ON e.weekly_record_id = r.id
                   WHERE r.year = ?
                     AND r.week_number IN ({})
                     AND r.server_id IN ({})
                   GROUP BY r.id
                   ORDER BY r.server_id, r.week_number"#,
                placeholders(weeks.len()),
                placeholders(chunk.len())
            );
            let mut values: Vec<Value> = vec![Value::from(year)];
            values.extend(weeks.iter().map(|w| Value::from(*w as i64)));
            values.extend(chunk.iter().map(|id| Value::from(id.to_string())));

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(values.iter()), |row| {
                    Ok(PeriodFact {
                        server_id: row.get(0)?,
                        week_number: row.get(1)?,
                        status: RecordStatus::from_db_str(&row.get::<_, String>(2)?),
                        updated_at: parse_datetime(row, 3)?,
                        worked_days: row.get::<_, i64>(4)? as u32,
                        production: row.get(5)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            facts.extend(rows);
        }
        Ok(facts)
    }

    /// 年度产量概览
    ///
    /// server_ids 为 None 表示不限人员 (全局视角)
    pub fn production_overview(
        &self,
        server_ids: Option<&[String]>,
        year: i32,
    ) -> RepositoryResult<ProductionOverview> {
        let conn = self.get_conn()?;

        let base = r#"SELECT COUNT(DISTINCT r.id),
                             COALESCE(SUM(e.production), 0.0),
                             COALESCE(SUM(CASE WHEN e.status = ? THEN 1 ELSE 0 END), 0),
                             COALESCE(SUM(CASE WHEN e.status IN (?, ?) THEN 1 ELSE 0 END), 0)
                      FROM weekly_records r
                      LEFT JOIN daily_entries e ON e.weekly_record_id = r.id
                      WHERE r.year = ?"#;
        let head: Vec<Value> = vec![
            Value::from(DayStatus::Vacation.to_db_str().to_string()),
            Value::from(DayStatus::JustifiedAbsence.to_db_str().to_string()),
            Value::from(DayStatus::UnjustifiedAbsence.to_db_str().to_string()),
            Value::from(year),
        ];

        let read = |sql: &str, values: &[Value]| -> RepositoryResult<ProductionOverview> {
            let overview = conn.query_row(sql, params_from_iter(values.iter()), |row| {
                Ok(ProductionOverview {
                    record_count: row.get::<_, i64>(0)? as u32,
                    total_production: row.get(1)?,
                    vacation_entries: row.get::<_, i64>(2)? as u32,
                    absence_entries: row.get::<_, i64>(3)? as u32,
                })
            })?;
            Ok(overview)
        };

        match server_ids {
            None => read(base, &head),
            Some(ids) => {
                let ids: BTreeSet<&str> = ids.iter().map(|s| s.as_str()).collect();
                let ids: Vec<&str> = ids.into_iter().collect();
                let mut total = ProductionOverview::default();
                for chunk in ids.chunks(IN_CHUNK_SIZE) {
                    let sql = format!("{} AND r.server_id IN ({})", base, placeholders(chunk.len()));
                    let mut values = head.clone();
                    values.extend(chunk.iter().map(|id| Value::from(id.to_string())));
                    let part = read(&sql, &values)?;
                    total.record_count += part.record_count;
                    total.total_production += part.total_production;
                    total.vacation_entries += part.vacation_entries;
                    total.absence_entries += part.absence_entries;
                }
                Ok(total)
            }
        }
    }
}

// ==========================================
// 内部辅助
// ==========================================

fn now_str() -> String {
    chrono::Local::now().naive_local().format(DATETIME_FMT).to_string()
}

fn placeholders(n: usize) -> String {
    std::iter::repeat("?").take(n).collect::<Vec<_>>().join(", ")
}

fn parse_datetime(row: &Row, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&raw, DATETIME_FMT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// 唯一键 → (id, status)
fn find_key(
    conn: &Connection,
    server_id: &str,
    year: i32,
    week_number: u32,
) -> RepositoryResult<Option<(String, RecordStatus)>> {
    let found = conn
        .query_row(
            "SELECT id, status FROM weekly_records WHERE server_id = ?1 AND year = ?2 AND week_number = ?3",
            params![server_id, year, week_number],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    RecordStatus::from_db_str(&row.get::<_, String>(1)?),
                ))
            },
        )
        .optional()?;
    Ok(found)
}

/// (server_id, week_number) → status
fn load_statuses(
    conn: &Connection,
    ids: &[&str],
    year: i32,
    weeks: &[u32],
) -> RepositoryResult<BTreeMap<(String, u32), RecordStatus>> {
    let mut statuses = BTreeMap::new();
    if ids.is_empty() || weeks.is_empty() {
        return Ok(statuses);
    }

    for chunk in ids.chunks(IN_CHUNK_SIZE) {
        let sql = format!(
            r#"SELECT server_id, week_number, status FROM weekly_records
               WHERE year = ? AND week_number IN ({}) AND server_id IN ({})"#,
            placeholders(weeks.len()),
            placeholders(chunk.len())
        );
        let mut values: Vec<Value> = vec![Value::from(year)];
        values.extend(weeks.iter().map(|w| Value::from(*w as i64)));
        values.extend(chunk.iter().map(|id| Value::from(id.to_string())));

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, u32>(1)?,
                    RecordStatus::from_db_str(&row.get::<_, String>(2)?),
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        for (server_id, week, status) in rows {
            statuses.insert((server_id, week), status);
        }
    }
    Ok(statuses)
}

fn load_with_entries(
    conn: &Connection,
    record_id: &str,
) -> RepositoryResult<Option<WeeklyRecordWithEntries>> {
    let record = conn
        .query_row(
            r#"SELECT id, server_id, year, week_number, saturday_active, status, notes,
                      created_at, updated_at
               FROM weekly_records WHERE id = ?1"#,
            params![record_id],
            map_record,
        )
        .optional()?;

    let record = match record {
        Some(r) => r,
        None => return Ok(None),
    };

    let mut stmt = conn.prepare(
        r#"SELECT id, weekly_record_id, day_of_week, worked_days, production, status, updated_at
           FROM daily_entries
           WHERE weekly_record_id = ?1
           ORDER BY day_of_week ASC"#,
    )?;
    let entries = stmt
        .query_map(params![record_id], map_entry)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(WeeklyRecordWithEntries { record, entries }))
}

fn map_record(row: &Row) -> rusqlite::Result<WeeklyRecord> {
    Ok(WeeklyRecord {
        id: row.get(0)?,
        server_id: row.get(1)?,
        year: row.get(2)?,
        week_number: row.get(3)?,
        saturday_active: row.get(4)?,
        status: RecordStatus::from_db_str(&row.get::<_, String>(5)?),
        notes: row.get(6)?,
        created_at: parse_datetime(row, 7)?,
        updated_at: parse_datetime(row, 8)?,
    })
}

fn map_entry(row: &Row) -> rusqlite::Result<DailyEntry> {
    let raw_status: String = row.get(5)?;
    let status = DayStatus::parse(&raw_status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            5,
            Type::Text,
            format!("未知日状态: {}", raw_status).into(),
        )
    })?;

    Ok(DailyEntry {
        id: row.get(0)?,
        weekly_record_id: row.get(1)?,
        day_of_week: row.get(2)?,
        worked_days: row.get(3)?,
        production: row.get(4)?,
        status,
        updated_at: parse_datetime(row, 6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::ValidatedDay;

    fn setup() -> WeeklyRecordRepository {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        WeeklyRecordRepository::new(Arc::new(Mutex::new(conn)))
    }

    fn write(server_id: &str, week: u32, saturday: bool, production: f64) -> RecordWrite {
        let days = crate::domain::record::active_days(saturday)
            .into_iter()
            .map(|d| ValidatedDay {
                day_of_week: d,
                status: DayStatus::Normal,
                worked_units: 1,
                production,
            })
            .collect();
        RecordWrite {
            server_id: server_id.to_string(),
            year: 2026,
            week_number: week,
            saturday_active: saturday,
            notes: None,
            days,
        }
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_upsert_creates_then_overwrites_draft() {
        let repo = setup();
        let first = repo.upsert(&write("W1", 3, true, 2.0)).unwrap();
        assert_eq!(first.record.status, RecordStatus::Draft);
        assert_eq!(first.day_set(), vec![1, 2, 3, 4, 5, 6]);

        let second = repo.upsert(&write("W1", 3, false, 5.0)).unwrap();
        assert_eq!(second.record.id, first.record.id);
        assert_eq!(second.day_set(), vec![1, 2, 3, 4, 5]);
        assert_eq!(second.production_total(), 25.0);
        assert_eq!(second.record.created_at, first.record.created_at);
    }

    #[test]
    fn test_submitted_record_is_locked() {
        let repo = setup();
        repo.upsert(&write("W1", 3, false, 1.0)).unwrap();
        repo.submit(&ids(&["W1"]), 2026, &[3]).unwrap();

        let err = repo.upsert(&write("W1", 3, false, 9.0)).unwrap_err();
        assert!(matches!(err, RepositoryError::RecordLocked { week_number: 3, .. }));

        let err = repo.delete("W1", 2026, 3).unwrap_err();
        assert!(matches!(err, RepositoryError::RecordLocked { .. }));

        let stored = repo.find("W1", 2026, 3).unwrap().unwrap();
        assert_eq!(stored.production_total(), 5.0);
        assert_eq!(stored.record.status, RecordStatus::Submitted);
    }

    #[test]
    fn test_submit_requires_full_coverage() {
        let repo = setup();
        repo.upsert(&write("W1", 3, false, 1.0)).unwrap();

        let err = repo.submit(&ids(&["W1", "W2"]), 2026, &[3]).unwrap_err();
        match err {
            RepositoryError::IncompleteCoverage { missing, .. } => assert_eq!(missing, vec!["W2"]),
            other => panic!("unexpected error: {other:?}"),
        }
        let still_draft = repo.find("W1", 2026, 3).unwrap().unwrap();
        assert_eq!(still_draft.record.status, RecordStatus::Draft);
    }

    #[test]
    fn test_submit_is_idempotent() {
        let repo = setup();
        repo.upsert(&write("W1", 3, false, 1.0)).unwrap();
        repo.upsert(&write("W1", 4, false, 1.0)).unwrap();

        let first = repo.submit(&ids(&["W1"]), 2026, &[3, 4]).unwrap();
        assert_eq!(first, SubmitOutcome { newly_submitted: 2, already_submitted: 0 });

        let again = repo.submit(&ids(&["W1"]), 2026, &[3, 4]).unwrap();
        assert_eq!(again, SubmitOutcome { newly_submitted: 0, already_submitted: 2 });
    }

    #[test]
    fn test_delete_draft_and_missing() {
        let repo = setup();
        repo.upsert(&write("W1", 3, false, 1.0)).unwrap();
        repo.delete("W1", 2026, 3).unwrap();
        assert!(repo.find("W1", 2026, 3).unwrap().is_none());

        let err = repo.delete("W1", 2026, 3).unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }

    #[test]
    fn test_list_by_worker_orders_by_week() {
        let repo = setup();
        for week in [5, 2, 9] {
            repo.upsert(&write("W1", week, false, 1.0)).unwrap();
        }
        let all: Vec<u32> = repo
            .list_by_worker("W1", 2026, &[])
            .unwrap()
            .iter()
            .map(|r| r.record.week_number)
            .collect();
        assert_eq!(all, vec![2, 5, 9]);

        let some = repo.list_by_worker("W1", 2026, &[9, 2]).unwrap();
        assert_eq!(some.len(), 2);
    }

    #[test]
    fn test_period_status_and_facts() {
        let repo = setup();
        repo.upsert(&write("W1", 3, false, 2.0)).unwrap();
        repo.upsert(&write("W2", 3, true, 1.0)).unwrap();
        repo.submit(&ids(&["W1"]), 2026, &[3]).unwrap();

        let status = repo.period_status(&ids(&["W1", "W2", "W3"]), 2026, 3).unwrap();
        assert_eq!(status, PeriodStatusSummary { targeted: 3, existing: 2, submitted: 1 });

        let facts = repo.find_period_facts(&ids(&["W1", "W2", "W3"]), 2026, &[3]).unwrap();
        assert_eq!(facts.len(), 2);
        assert_eq!(facts[0].server_id, "W1");
        assert_eq!(facts[0].status, RecordStatus::Submitted);
        assert_eq!(facts[0].worked_days, 5);
        assert_eq!(facts[0].production, 10.0);
        assert_eq!(facts[1].worked_days, 6);
    }

    #[test]
    fn test_production_overview_counts_statuses() {
        let repo = setup();
        let mut w = write("W1", 3, false, 4.0);
        w.days[0].status = DayStatus::Vacation;
        w.days[0].worked_units = 0;
        w.days[1].status = DayStatus::UnjustifiedAbsence;
        w.days[1].worked_units = 0;
        repo.upsert(&w).unwrap();
        repo.upsert(&write("W2", 3, false, 1.0)).unwrap();

        let global = repo.production_overview(None, 2026).unwrap();
        assert_eq!(global.record_count, 2);
        assert_eq!(global.total_production, 25.0);
        assert_eq!(global.vacation_entries, 1);
        assert_eq!(global.absence_entries, 1);

        let scoped = repo.production_overview(Some(&ids(&["W2"])), 2026).unwrap();
        assert_eq!(scoped.record_count, 1);
        assert_eq!(scoped.total_production, 5.0);
    }

    // ==========================================
    // 并发创建冲突 (UNIQUE → KeyConflict → 重试)
    // ==========================================

    /// 在本次 INSERT 之前由触发器写入同键记录，模拟另一写者抢先创建;
    /// rival_gate() 返回 1 时触发器生效
    fn setup_with_rival_writer(
        rival_gate: impl FnMut() -> i64 + Send + std::panic::UnwindSafe + 'static,
    ) -> Connection {
        use rusqlite::functions::FunctionFlags;

        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();

        let mut gate = rival_gate;
        conn.create_scalar_function(
            "rival_gate",
            0,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_INNOCUOUS,
            move |_ctx| Ok(gate()),
        )
        .unwrap();
        conn.execute_batch(
            r#"CREATE TEMP TRIGGER rival_writer BEFORE INSERT ON weekly_records
               WHEN rival_gate() = 1
               BEGIN
                   INSERT INTO weekly_records (
                       id, server_id, year, week_number, saturday_active,
                       status, notes, created_at, updated_at
                   ) VALUES (
                       'rival-' || NEW.id, NEW.server_id, NEW.year, NEW.week_number, 0,
                       'draft', NULL, NEW.created_at, NEW.updated_at
                   );
               END;"#,
        )
        .unwrap();
        conn
    }

    fn record_count(repo: &WeeklyRecordRepository) -> i64 {
        let conn = repo.get_conn().unwrap();
        conn.query_row("SELECT COUNT(*) FROM weekly_records", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_key_conflict_is_retried_once_then_succeeds() {
        use std::sync::atomic::{AtomicU32, Ordering};

        let inserts = Arc::new(AtomicU32::new(0));
        let counter = inserts.clone();
        // 仅第一次 INSERT 遇到抢先写入
        let conn = setup_with_rival_writer(move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                1
            } else {
                0
            }
        });
        let repo = WeeklyRecordRepository::new(Arc::new(Mutex::new(conn)));

        let saved = repo.upsert(&write("W1", 3, false, 2.0)).unwrap();
        assert_eq!(inserts.load(Ordering::SeqCst), 2);
        assert_eq!(saved.record.status, RecordStatus::Draft);
        assert!(!saved.record.id.starts_with("rival-"));
        assert_eq!(saved.production_total(), 10.0);
        assert_eq!(record_count(&repo), 1);

        // 之后的写入走草稿覆盖路径，不再 INSERT
        let updated = repo.upsert(&write("W1", 3, false, 3.0)).unwrap();
        assert_eq!(updated.record.id, saved.record.id);
        assert_eq!(inserts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_key_conflict_surfaces_without_retries() {
        let conn = setup_with_rival_writer(|| 1);
        let repo = WeeklyRecordRepository::new(Arc::new(Mutex::new(conn)))
            .with_key_conflict_retries(0);

        let err = repo.upsert(&write("W1", 3, false, 1.0)).unwrap_err();
        match err {
            RepositoryError::KeyConflict {
                server_id,
                year,
                week_number,
            } => {
                assert_eq!(server_id, "W1");
                assert_eq!((year, week_number), (2026, 3));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // 冲突事务整体回滚
        assert_eq!(record_count(&repo), 0);
    }

    #[test]
    fn test_key_conflict_surfaces_after_retries_exhausted() {
        use std::sync::atomic::{AtomicU32, Ordering};

        let inserts = Arc::new(AtomicU32::new(0));
        let counter = inserts.clone();
        let conn = setup_with_rival_writer(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            1
        });
        let repo = WeeklyRecordRepository::new(Arc::new(Mutex::new(conn)));

        let err = repo.upsert(&write("W1", 3, false, 1.0)).unwrap_err();
        assert!(matches!(err, RepositoryError::KeyConflict { .. }));
        assert_eq!(inserts.load(Ordering::SeqCst), 1 + DEFAULT_KEY_CONFLICT_RETRIES);
        assert_eq!(record_count(&repo), 0);
    }
}
