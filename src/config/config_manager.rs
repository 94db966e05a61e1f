// ==========================================
// 周考勤登记引擎 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写
// 存储: config_kv 表 (key-value + scope)
// 说明: 配置缺失或格式错误时回退默认值并告警，不中断调用
// ==========================================

use crate::db::{open_sqlite_connection, DEFAULT_BUSY_TIMEOUT_MS};
use crate::engine::record_rules::DEFAULT_NOTES_MAX_CHARS;
use crate::repository::weekly_record_repo::DEFAULT_KEY_CONFLICT_RETRIES;
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::error::Error;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

/// 备注长度的硬上限 (与 weekly_records.notes 的 CHECK 约束一致)
const NOTES_HARD_LIMIT: usize = 800;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 写入 global scope 配置 (UPSERT)
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at)
             VALUES ('global', ?1, ?2, datetime('now', 'localtime'))
             ON CONFLICT(scope_id, key) DO UPDATE SET
                 value = excluded.value,
                 updated_at = excluded.updated_at",
            params![key, value],
        )?;
        tracing::info!(config_key = key, value, "配置已更新");
        Ok(())
    }

    /// 全部 global 配置 (按键排序)
    pub fn list_global_config(&self) -> Result<BTreeMap<String, String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        let mut stmt = conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global'")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        let mut map = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            map.insert(key, value);
        }
        Ok(map)
    }

    /// 读取并解析数值配置；缺失或解析失败时返回默认值
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> Result<T, Box<dyn Error>>
    where
        T: FromStr + Copy + std::fmt::Display,
    {
        let raw = match self.get_global_config_value(key)? {
            Some(v) => v,
            None => return Ok(default),
        };
        match raw.trim().parse::<T>() {
            Ok(v) => Ok(v),
            Err(_) => {
                tracing::warn!(
                    config_key = key,
                    raw_value = %raw,
                    default = %default,
                    "配置值格式错误，使用默认值"
                );
                Ok(default)
            }
        }
    }

    // ===== 周记录配置 =====

    /// 备注长度上限 (字符)，不超过存储层硬上限
    pub fn get_notes_max_chars(&self) -> Result<usize, Box<dyn Error>> {
        let v = self.get_parsed_or_default(config_keys::NOTES_MAX_CHARS, DEFAULT_NOTES_MAX_CHARS)?;
        if v == 0 || v > NOTES_HARD_LIMIT {
            tracing::warn!(value = v, limit = NOTES_HARD_LIMIT, "备注长度配置越界，已收敛");
            return Ok(v.clamp(1, NOTES_HARD_LIMIT));
        }
        Ok(v)
    }

    /// 并发创建冲突的重试次数
    pub fn get_key_conflict_retries(&self) -> Result<u32, Box<dyn Error>> {
        self.get_parsed_or_default(config_keys::KEY_CONFLICT_RETRIES, DEFAULT_KEY_CONFLICT_RETRIES)
    }

    // ===== 存储配置 =====

    pub fn get_busy_timeout_ms(&self) -> Result<u64, Box<dyn Error>> {
        self.get_parsed_or_default(config_keys::BUSY_TIMEOUT_MS, DEFAULT_BUSY_TIMEOUT_MS)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 周记录
    pub const NOTES_MAX_CHARS: &str = "notes_max_chars";
    pub const KEY_CONFLICT_RETRIES: &str = "key_conflict_retries";

    // 存储
    pub const BUSY_TIMEOUT_MS: &str = "busy_timeout_ms";
}
