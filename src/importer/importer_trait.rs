// ==========================================
// 运动员名册导入系统 - 导入流水线 Trait
// ==========================================
// 职责: 定义流水线各阶段接口（不包含实现）
// 流程: 解析 → 列映射 → 行校验 → 实体匹配 → 预览 → (复核) → 提交
// ==========================================

use crate::domain::import_result::ImportResult;
use crate::domain::import_row::{FieldMapping, FieldValidation, MappedRecord, RawRow};
use crate::domain::preview::PreviewResult;
use crate::domain::review::ReviewDecisionRef;
use crate::domain::types::ImportKind;
use crate::importer::error::PipelineResult;
use crate::importer::file_parser::ParsedFile;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ==========================================
// RosterImporter Trait
// ==========================================
// 用途: 导入主接口
// 实现者: RosterImporterImpl
#[async_trait]
pub trait RosterImporter: Send + Sync {
    /// 解析上传文本并给出列映射建议
    ///
    /// # 错误（结构性,整体失败）
    /// - FileTooLarge / TooManyRows: 超出上传上限（在任何逐行处理之前检查）
    /// - EmptyFile / MissingHeader
    async fn parse_upload(&self, text: &str, kind: ImportKind) -> PipelineResult<ParsedUpload>;

    /// 生成预览（不写入任何数据）
    ///
    /// 必填字段未映射时照常预览,缺失字段以行级错误呈现
    async fn preview(
        &self,
        kind: ImportKind,
        rows: &[RawRow],
        mapping: &[FieldMapping],
    ) -> PipelineResult<PreviewResult>;

    /// 提交导入
    ///
    /// # 错误
    /// - MissingRequiredMapping: 必填字段未映射
    /// - 行级失败不作为错误返回,收集在 ImportResult.errors
    async fn commit(
        &self,
        kind: ImportKind,
        rows: &[RawRow],
        mapping: &[FieldMapping],
        decisions: &[ReviewDecisionRef],
        created_by: &str,
    ) -> PipelineResult<ImportResult>;
}

/// 解析上传结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedUpload {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
    pub suggested_mappings: Vec<FieldMapping>,
}

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 文本解析接口（阶段 1）
// 实现者: CsvFileParser
pub trait FileParser: Send + Sync {
    fn parse_text(&self, text: &str) -> PipelineResult<ParsedFile>;
}

// ==========================================
// FieldMapper Trait
// ==========================================
// 用途: 列映射建议接口（阶段 2）
// 实现者: HeaderFieldMapper
pub trait FieldMapper: Send + Sync {
    /// 为源表头建议系统字段映射（每个系统字段最多被一列占用）
    fn suggest_mappings(&self, headers: &[String], kind: ImportKind) -> Vec<FieldMapping>;
}

// ==========================================
// RowValidator Trait
// ==========================================
// 用途: 行校验接口（阶段 3）
// 实现者: RowValidatorImpl
pub trait RowValidator: Send + Sync {
    /// 校验并生成强类型记录（从不失败,问题以校验结果表达）
    fn validate_and_normalize(
        &self,
        row: &RawRow,
        mapping: &[FieldMapping],
        kind: ImportKind,
    ) -> ValidatedRow;

    fn validate(&self, row: &RawRow, mapping: &[FieldMapping], kind: ImportKind) -> Vec<FieldValidation> {
        self.validate_and_normalize(row, mapping, kind).validations
    }
}

/// 行校验输出
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRow {
    pub record: MappedRecord,
    pub validations: Vec<FieldValidation>,
}

impl ValidatedRow {
    pub fn has_errors(&self) -> bool {
        self.validations.iter().any(|v| v.is_error())
    }
}
