// ==========================================
// 周考勤登记引擎 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// 说明: 所有仓储共享同一个连接 (Arc<Mutex<Connection>>)
// ==========================================

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context};

use crate::api::{MonitoringApi, PontoApi};
use crate::config::config_manager::ConfigManager;
use crate::db::{configure_sqlite_connection_with_timeout, init_schema, open_sqlite_connection};
use crate::engine::record_rules::RecordRules;
use crate::repository::{RosterRepository, WeeklyRecordRepository};

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 周记录API
    pub ponto_api: Arc<PontoApi>,

    /// 监控API
    pub monitoring_api: Arc<MonitoringApi>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 名册仓储 (名册导入)
    pub roster_repo: Arc<RosterRepository>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 返回
    /// - Ok(AppState): 成功创建的状态
    /// - Err: 初始化失败原因 (带上下文链)
    pub fn new(db_path: String) -> anyhow::Result<Self> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path)
            .with_context(|| format!("无法打开数据库: {}", db_path))?;
        init_schema(&conn).context("数据库建表失败")?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 读取配置
        // ==========================================
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| anyhow!("无法创建ConfigManager: {}", e))?,
        );
        let notes_max_chars = config_manager
            .get_notes_max_chars()
            .map_err(|e| anyhow!("读取配置失败: {}", e))?;
        let key_conflict_retries = config_manager
            .get_key_conflict_retries()
            .map_err(|e| anyhow!("读取配置失败: {}", e))?;
        let busy_timeout_ms = config_manager
            .get_busy_timeout_ms()
            .map_err(|e| anyhow!("读取配置失败: {}", e))?;

        {
            let guard = conn.lock().map_err(|e| anyhow!("锁获取失败: {}", e))?;
            configure_sqlite_connection_with_timeout(&guard, busy_timeout_ms)
                .context("连接配置失败")?;
        }

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let record_repo = Arc::new(
            WeeklyRecordRepository::new(conn.clone()).with_key_conflict_retries(key_conflict_retries),
        );
        let roster_repo = Arc::new(RosterRepository::new(conn.clone()));

        // ==========================================
        // 初始化API层
        // ==========================================
        let ponto_api = Arc::new(PontoApi::new(
            record_repo.clone(),
            RecordRules::new(notes_max_chars),
        ));
        let monitoring_api = Arc::new(MonitoringApi::new(roster_repo.clone(), record_repo));

        tracing::info!(
            notes_max_chars,
            key_conflict_retries,
            busy_timeout_ms,
            "AppState初始化完成"
        );

        Ok(Self {
            db_path,
            ponto_api,
            monitoring_api,
            config_manager,
            roster_repo,
        })
    }
}

/// 获取默认数据库路径
///
/// 优先级: 环境变量 PONTO_DB_PATH → 用户数据目录 → 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    // 允许通过环境变量显式指定 DB 路径（便于调试/测试/CI）
    if let Ok(path) = std::env::var("PONTO_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./ponto_engine.db");

    if let Some(data_dir) = dirs::data_dir() {
        // 开发环境使用独立目录，避免污染生产数据
        #[cfg(debug_assertions)]
        let dir = data_dir.join("ponto-engine-dev");

        #[cfg(not(debug_assertions))]
        let dir = data_dir.join("ponto-engine");

        // 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("ponto_engine.db");
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_reports_unopenable_path_with_context() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("missing").join("ponto.db");

        let err = match AppState::new(db_path.to_string_lossy().to_string()) {
            Ok(_) => panic!("expected open failure"),
            Err(e) => e,
        };
        assert!(format!("{:#}", err).contains("无法打开数据库"));
    }

    #[test]
    fn test_default_db_path_honors_env_override() {
        std::env::set_var("PONTO_DB_PATH", "  /tmp/ponto-override.db ");
        assert_eq!(get_default_db_path(), "/tmp/ponto-override.db");
        std::env::remove_var("PONTO_DB_PATH");

        assert!(get_default_db_path().ends_with("ponto_engine.db"));
    }
}
