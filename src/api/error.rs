// ==========================================
// 周考勤登记引擎 - API层错误类型
// ==========================================
// 职责: 统一对外错误分类，把引擎/仓储错误转换为调用方可读的消息
// 说明: 所有错误均为单次请求失败，不影响进程
// ==========================================

use crate::engine::calendar::CalendarError;
use crate::engine::record_rules::RecordRuleError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 本地校验错误 (不自动重试)
    // ==========================================
    #[error("日状态无效: {0}")]
    InvalidDayStatus(String),

    #[error("日明细无效: {0}")]
    InvalidEntry(String),

    #[error("周序号无效: {0}")]
    InvalidPeriod(String),

    #[error("无效输入: {0}")]
    InvalidInput(String),

    // ==========================================
    // 生命周期错误
    // ==========================================
    #[error("周记录已提交，不可修改: server_id={server_id}, year={year}, week={week_number}")]
    RecordLocked {
        server_id: String,
        year: i32,
        week_number: u32,
    },

    /// 提交覆盖不足，missing 为仍缺记录的人员
    #[error("提交被拒绝，以下人员尚无记录: {missing:?}")]
    IncompleteCoverage {
        year: i32,
        week_numbers: Vec<u32>,
        missing: Vec<String>,
    },

    #[error("并发写入冲突，请重试: {0}")]
    KeyConflict(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    #[error("数据验证失败: {0}")]
    ValidationError(String),
}

impl ApiError {
    /// 可由调用方稍后重试的错误
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::KeyConflict(_)
                | ApiError::DatabaseConnectionError(_)
                | ApiError::DatabaseTransactionError(_)
        )
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            // 生命周期
            RepositoryError::RecordLocked {
                server_id,
                year,
                week_number,
            } => ApiError::RecordLocked {
                server_id,
                year,
                week_number,
            },
            RepositoryError::IncompleteCoverage {
                year,
                week_numbers,
                missing,
            } => ApiError::IncompleteCoverage {
                year,
                week_numbers,
                missing,
            },
            RepositoryError::KeyConflict {
                server_id,
                year,
                week_number,
            } => ApiError::KeyConflict(format!(
                "server_id={}, year={}, week={}",
                server_id, year, week_number
            )),

            // 数据库错误
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::DatabaseError(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::DatabaseError(format!("外键约束违反: {}", msg))
            }

            // 数据质量错误
            RepositoryError::ValidationError(msg) => ApiError::ValidationError(msg),
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }
        }
    }
}

impl From<RecordRuleError> for ApiError {
    fn from(err: RecordRuleError) -> Self {
        match err {
            RecordRuleError::InvalidDayStatus(msg) => ApiError::InvalidDayStatus(msg),
            RecordRuleError::InvalidEntry(msg) => ApiError::InvalidEntry(msg),
            RecordRuleError::InvalidPeriod(e) => e.into(),
        }
    }
}

impl From<CalendarError> for ApiError {
    fn from(err: CalendarError) -> Self {
        match err {
            CalendarError::InvalidPeriod { .. } => ApiError::InvalidPeriod(err.to_string()),
            CalendarError::InvalidYear(_) | CalendarError::DateOutOfRange(_) => {
                ApiError::InvalidInput(err.to_string())
            }
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_errors_keep_details() {
        let err: ApiError = RepositoryError::IncompleteCoverage {
            year: 2026,
            week_numbers: vec![3],
            missing: vec!["W2".to_string()],
        }
        .into();
        match err {
            ApiError::IncompleteCoverage { missing, .. } => assert_eq!(missing, vec!["W2"]),
            other => panic!("unexpected: {other:?}"),
        }

        let err: ApiError = RepositoryError::KeyConflict {
            server_id: "W1".into(),
            year: 2026,
            week_number: 3,
        }
        .into();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_busy_and_lock_failures_are_retryable() {
        let err: ApiError = RepositoryError::DatabaseTransactionError("database is locked".into()).into();
        assert!(matches!(err, ApiError::DatabaseTransactionError(_)));
        assert!(err.is_retryable());

        let err: ApiError = RepositoryError::LockError("poisoned".into()).into();
        assert!(matches!(err, ApiError::DatabaseConnectionError(_)));
        assert!(err.is_retryable());

        let err: ApiError = RepositoryError::DatabaseQueryError("syntax".into()).into();
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_rule_errors_map_to_same_taxonomy() {
        let err: ApiError = RecordRuleError::InvalidPeriod(CalendarError::InvalidPeriod {
            year: 2026,
            period: 53,
            max: 52,
        })
        .into();
        assert!(matches!(err, ApiError::InvalidPeriod(_)));

        let err: ApiError = RecordRuleError::InvalidDayStatus("x".into()).into();
        assert!(matches!(err, ApiError::InvalidDayStatus(_)));
        assert!(!err.is_retryable());
    }
}
