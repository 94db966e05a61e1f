// ==========================================
// 周考勤登记引擎 - 名册仓储
// ==========================================
// 职责: servers (外勤人员) / users (督导) 两表的读写
// 说明: 名册由外部协作方维护，这里提供导入 (upsert) 与快照读取
// ==========================================

use crate::domain::roster::{Roster, SupervisorArea, SupervisorGeral, Worker};
use crate::domain::types::{Role, WorkerStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};
use tracing::debug;

pub struct RosterRepository {
    conn: Arc<Mutex<Connection>>,
}

impl RosterRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建或更新外勤人员
    pub fn upsert_worker(&self, worker: &Worker) -> RepositoryResult<()> {
        if worker.id.trim().is_empty() {
            return Err(RepositoryError::FieldValueError {
                field: "id".to_string(),
                message: "人员ID不能为空".to_string(),
            });
        }

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO servers (
                id, matricula, name, status, supervisor_geral_id, supervisor_area_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                matricula = excluded.matricula,
                name = excluded.name,
                status = excluded.status,
                supervisor_geral_id = excluded.supervisor_geral_id,
                supervisor_area_id = excluded.supervisor_area_id,
                updated_at = datetime('now', 'localtime')
            "#,
            params![
                worker.id,
                worker.matricula,
                worker.name,
                worker.status.to_db_str(),
                worker.supervisor_geral_id,
                worker.supervisor_area_id,
            ],
        )?;
        debug!(worker_id = %worker.id, "名册人员已写入");
        Ok(())
    }

    pub fn upsert_area(&self, area: &SupervisorArea) -> RepositoryResult<()> {
        self.upsert_supervisor(
            &area.id,
            &area.name,
            Role::SupervisorArea,
            area.supervisor_geral_id.as_deref(),
        )
    }

    pub fn upsert_geral(&self, geral: &SupervisorGeral) -> RepositoryResult<()> {
        self.upsert_supervisor(&geral.id, &geral.name, Role::SupervisorGeral, None)
    }

    fn upsert_supervisor(
        &self,
        id: &str,
        name: &str,
        role: Role,
        supervisor_geral_id: Option<&str>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO users (id, name, role, supervisor_geral_id)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                role = excluded.role,
                supervisor_geral_id = excluded.supervisor_geral_id,
                updated_at = datetime('now', 'localtime')
            "#,
            params![id, name, role.to_db_str(), supervisor_geral_id],
        )?;
        Ok(())
    }

    /// 查询单个人员
    pub fn find_worker(&self, id: &str) -> RepositoryResult<Option<Worker>> {
        let conn = self.get_conn()?;
        let worker = conn
            .query_row(
                r#"SELECT id, name, matricula, status, supervisor_area_id, supervisor_geral_id
                   FROM servers WHERE id = ?1"#,
                params![id],
                map_worker,
            )
            .optional()?;
        Ok(worker)
    }

    /// 全部外勤人员 (按姓名、ID 排序)
    pub fn list_workers(&self) -> RepositoryResult<Vec<Worker>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT id, name, matricula, status, supervisor_area_id, supervisor_geral_id
               FROM servers
               ORDER BY name ASC, id ASC"#,
        )?;
        let workers = stmt
            .query_map([], map_worker)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(workers)
    }

    /// 在职的区域督导
    pub fn list_areas(&self) -> RepositoryResult<Vec<SupervisorArea>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT id, name, supervisor_geral_id
               FROM users
               WHERE role = ?1 AND is_active = 1
               ORDER BY name ASC, id ASC"#,
        )?;
        let areas = stmt
            .query_map(params![Role::SupervisorArea.to_db_str()], |row| {
                Ok(SupervisorArea {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    supervisor_geral_id: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(areas)
    }

    /// 在职的总督导
    pub fn list_gerais(&self) -> RepositoryResult<Vec<SupervisorGeral>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT id, name
               FROM users
               WHERE role = ?1 AND is_active = 1
               ORDER BY name ASC, id ASC"#,
        )?;
        let gerais = stmt
            .query_map(params![Role::SupervisorGeral.to_db_str()], |row| {
                Ok(SupervisorGeral {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(gerais)
    }

    /// 名册快照
    pub fn load_roster(&self) -> RepositoryResult<Roster> {
        Ok(Roster {
            workers: self.list_workers()?,
            areas: self.list_areas()?,
            gerais: self.list_gerais()?,
        })
    }
}

fn map_worker(row: &rusqlite::Row) -> rusqlite::Result<Worker> {
    Ok(Worker {
        id: row.get(0)?,
        name: row.get(1)?,
        matricula: row.get(2)?,
        status: WorkerStatus::from_db_str(&row.get::<_, String>(3)?),
        supervisor_area_id: row.get(4)?,
        supervisor_geral_id: row.get(5)?,
    })
}
