// ==========================================
// 运动员名册导入系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型,将仓储/导入错误转换为调用方可理解的消息
// 分类: 无效输入 / 未找到 / 冲突 / 结构性导入错误 / 数据库 / 内部
// ==========================================

use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
/// 所有错误信息必须包含显式原因
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    // ==========================================
    // 并发控制错误
    // ==========================================
    /// 复核项已被决定（含并发竞争失败方）
    #[error("决定冲突: {0}")]
    Conflict(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    #[error("实体存储超时: {0}ms")]
    Timeout(u64),

    // ==========================================
    // 导入错误
    // ==========================================
    /// 结构性错误（整个文件/映射不可处理）
    #[error("文件导入失败: {0}")]
    ImportError(String),

    #[error("数据验证失败: {0}")]
    ValidationError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            // 并发控制错误
            RepositoryError::DecisionConflict { id, status } => {
                ApiError::Conflict(format!("复核项{}已被决定（当前状态={}）", id, status))
            }
            RepositoryError::InvalidStateTransition { from, to } => {
                ApiError::InvalidStateTransition { from, to }
            }

            // 数据库错误
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::Conflict(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::ValidationError(format!("外键约束违反: {}", msg))
            }
            RepositoryError::Timeout(ms) => ApiError::Timeout(ms),

            // 数据质量错误
            RepositoryError::ValidationError(msg) => ApiError::ValidationError(msg),
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InternalError(format!("字段{}存储值损坏: {}", field, message))
            }

            // 通用错误
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::Repository(e) => e.into(),
            ImportError::InternalError(msg) => ApiError::InternalError(msg),
            ImportError::Other(e) => ApiError::Other(e),
            // 其余均为结构性错误,整体拒绝
            other => ApiError::ImportError(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{ImportKind, SystemField};

    #[test]
    fn test_repository_error_conversion() {
        let api_err: ApiError = RepositoryError::not_found("ImportReviewItem", "R001").into();
        match api_err {
            ApiError::NotFound(msg) => {
                assert!(msg.contains("ImportReviewItem"));
                assert!(msg.contains("R001"));
            }
            other => panic!("Expected NotFound, got {:?}", other),
        }

        let api_err: ApiError = RepositoryError::DecisionConflict {
            id: "R002".to_string(),
            status: "APPROVED".to_string(),
        }
        .into();
        match api_err {
            ApiError::Conflict(msg) => {
                assert!(msg.contains("R002"));
                assert!(msg.contains("APPROVED"));
            }
            other => panic!("Expected Conflict, got {:?}", other),
        }
    }

    #[test]
    fn test_import_error_conversion() {
        let api_err: ApiError = ImportError::MissingRequiredMapping {
            kind: ImportKind::Athletes,
            fields: vec![SystemField::LastName],
        }
        .into();
        match api_err {
            ApiError::ImportError(msg) => assert!(msg.contains("lastName")),
            other => panic!("Expected ImportError, got {:?}", other),
        }

        let api_err: ApiError = ImportError::Repository(RepositoryError::Timeout(5000)).into();
        assert!(matches!(api_err, ApiError::Timeout(5000)));
    }
}
