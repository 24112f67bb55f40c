// ==========================================
// 运动员名册导入系统 - 导入层
// ==========================================
// 职责: CSV 名册/成绩导入流水线
// 流程: 解析清洗 → 列映射 → 行校验 → 实体匹配 → 预览 → 复核 → 提交
// ==========================================

// 模块声明
pub mod entity_matcher;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod import_executor;
pub mod importer_trait;
pub mod preview_builder;
pub mod review_queue;
pub mod roster_importer_impl;
pub mod row_validator;

// 重导出核心类型
pub use entity_matcher::EntityMatcher;
pub use error::{ImportError, PipelineResult};
pub use field_mapper::HeaderFieldMapper as FieldMapperImpl;
pub use file_parser::{parse, render_csv, sanitize, CsvFileParser, ParsedFile};
pub use import_executor::ImportExecutor;
pub use preview_builder::PreviewBuilder;
pub use review_queue::ReviewQueue;
pub use roster_importer_impl::RosterImporterImpl;
pub use row_validator::RowValidatorImpl;

// 重导出 Trait 接口
pub use importer_trait::{
    FieldMapper, FileParser, ParsedUpload, RosterImporter, RowValidator, ValidatedRow,
};
