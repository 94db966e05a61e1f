// ==========================================
// 周考勤登记引擎 - 仓储层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 生命周期条件 (锁定/覆盖不足/键冲突) 在仓储层事务内判定
// ==========================================

use thiserror::Error;

/// 仓储层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    // ===== 周记录生命周期 =====
    #[error("周记录已提交锁定: server_id={server_id}, year={year}, week={week_number}")]
    RecordLocked {
        server_id: String,
        year: i32,
        week_number: u32,
    },

    #[error("提交覆盖不足: year={year}, weeks={week_numbers:?}, 缺少记录的人员={missing:?}")]
    IncompleteCoverage {
        year: i32,
        week_numbers: Vec<u32>,
        missing: Vec<String>,
    },

    #[error("并发创建冲突: server_id={server_id}, year={year}, week={week_number}")]
    KeyConflict {
        server_id: String,
        year: i32,
        week_number: u32,
    },

    // ===== 数据库错误 =====
    #[error("记录未找到: {entity} with id={id}")]
    NotFound { entity: String, id: String },

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    /// 写锁在 busy_timeout 内未取得 (SQLITE_BUSY / SQLITE_LOCKED)
    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    #[error("唯一约束违反: {0}")]
    UniqueConstraintViolation(String),

    #[error("外键约束违反: {0}")]
    ForeignKeyViolation(String),

    // ===== 数据质量错误 =====
    #[error("数据验证失败: {0}")]
    ValidationError(String),

    #[error("字段值错误 (field={field}): {message}")]
    FieldValueError { field: String, message: String },
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(e, msg)
                if matches!(
                    e.code,
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                ) =>
            {
                RepositoryError::DatabaseTransactionError(msg.unwrap_or_else(|| e.to_string()))
            }
            rusqlite::Error::SqliteFailure(_, Some(msg)) => {
                if msg.contains("UNIQUE") {
                    RepositoryError::UniqueConstraintViolation(msg)
                } else if msg.contains("FOREIGN KEY") {
                    RepositoryError::ForeignKeyViolation(msg)
                } else {
                    RepositoryError::DatabaseQueryError(msg)
                }
            }
            rusqlite::Error::SqliteFailure(e, None)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                RepositoryError::UniqueConstraintViolation(e.to_string())
            }
            rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound {
                entity: "Unknown".to_string(),
                id: "Unknown".to_string(),
            },
            _ => RepositoryError::DatabaseQueryError(err.to_string()),
        }
    }
}

/// Result 类型别名
pub type RepositoryResult<T> = Result<T, RepositoryError>;
