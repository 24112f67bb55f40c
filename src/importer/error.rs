// ==========================================
// 运动员名册导入系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 范围: 只包含结构性错误（整体失败,不产生部分结果）
// 说明: 行级校验/提交错误收集在结果中,不经过本类型
// ==========================================

use crate::domain::types::{ImportKind, SystemField};
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("file is empty")]
    EmptyFile,

    #[error("file has no header row")]
    MissingHeader,

    #[error("file is {actual} bytes, the limit is {limit} bytes")]
    FileTooLarge { actual: usize, limit: usize },

    #[error("file has {actual} data rows, the limit is {limit}")]
    TooManyRows { actual: usize, limit: usize },

    #[error("file read failed: {0}")]
    FileReadError(String),

    #[error("CSV parse failed: {0}")]
    CsvParseError(String),

    // ===== 字段映射错误 =====
    #[error("required fields are not mapped for {kind}: {}", format_fields(.fields))]
    MissingRequiredMapping {
        kind: ImportKind,
        fields: Vec<SystemField>,
    },

    #[error("source column '{0}' is mapped more than once")]
    DuplicateSourceColumn(String),

    #[error("system field '{0}' is mapped more than once")]
    DuplicateSystemField(SystemField),

    #[error("system field '{field}' does not belong to {kind} imports")]
    FieldNotApplicable { kind: ImportKind, field: SystemField },

    #[error("source column '{0}' does not exist in the file")]
    UnknownSourceColumn(String),

    // ===== 存储错误 =====
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    // ===== 通用错误 =====
    #[error("internal error: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn format_fields(fields: &[SystemField]) -> String {
    fields
        .iter()
        .map(|f| f.key())
        .collect::<Vec<_>>()
        .join(", ")
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

/// Result 类型别名
pub type PipelineResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_mapping_message_lists_keys() {
        let err = ImportError::MissingRequiredMapping {
            kind: ImportKind::Measurements,
            fields: vec![SystemField::Metric, SystemField::Value],
        };
        assert_eq!(
            err.to_string(),
            "required fields are not mapped for MEASUREMENTS: metric, value"
        );
    }
}
