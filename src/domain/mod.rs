// ==========================================
// 运动员名册导入系统 - 领域模型层
// ==========================================
// 职责: 定义导入流水线的实体、类型与不变量
// 红线: 不含数据访问逻辑,不含流水线逻辑
// ==========================================

pub mod import_result;
pub mod import_row;
pub mod person;
pub mod preview;
pub mod review;
pub mod types;

// 重导出核心类型
pub use import_result::{ImportResult, ImportSummary, RowError, RowOutcome};
pub use import_row::{FieldMapping, FieldValidation, MappedRecord, MeasurementFields, RawRow, RowIndex};
pub use person::{MatchingCriteria, NewMeasurement, NewPerson, PersonRecord, PersonWrite};
pub use preview::{MatchCandidate, MatchOutcome, PreviewResult, PreviewRow, PreviewSummary};
pub use review::{
    ImportReviewItem, NewReviewItem, ReviewDecision, ReviewDecisionKind, ReviewDecisionRef,
    ReviewFilter,
};
pub use types::{
    Gender, ImportAction, ImportKind, MatchStatus, MeasurementUnit, MetricType, ReviewStatus,
    SystemField, ValidationStatus,
};
