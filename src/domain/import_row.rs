// ==========================================
// 运动员名册导入系统 - 导入行模型
// ==========================================
// 职责: 原始行 / 字段映射 / 字段校验结果 / 强类型映射记录
// 生命周期: 仅在一次导入会话内（不落库）
// ==========================================

use crate::domain::types::{
    Gender, ImportKind, MeasurementUnit, MetricType, SystemField, ValidationStatus,
};
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ==========================================
// RowIndex - 数据行序号（0 起,不含表头）
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowIndex(pub usize);

impl RowIndex {
    /// 面向用户的行号（表头为第 1 行,首个数据行为第 2 行）
    pub fn display_line(&self) -> usize {
        self.0 + 2
    }
}

impl fmt::Display for RowIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ==========================================
// RawRow - 解析后的原始行
// ==========================================
// 列名 → 值,保持源文件列顺序
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    pub index: RowIndex,
    pub values: IndexMap<String, String>,
}

impl RawRow {
    pub fn new(index: usize, values: IndexMap<String, String>) -> Self {
        Self {
            index: RowIndex(index),
            values,
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(|v| v.as_str())
    }

    pub fn headers(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }
}

// ==========================================
// FieldMapping - 源列 → 系统字段
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub source_column: String,
    pub system_field: SystemField,
    pub is_required: bool,
    pub auto_detected: bool,
}

// ==========================================
// FieldValidation - 单字段校验结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValidation {
    pub row_index: RowIndex,
    /// 系统字段键（实体匹配失败时为 "identity"）
    pub field: String,
    pub status: ValidationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl FieldValidation {
    pub const IDENTITY_FIELD: &'static str = "identity";

    pub fn valid(row_index: RowIndex, field: SystemField) -> Self {
        Self {
            row_index,
            field: field.key().to_string(),
            status: ValidationStatus::Valid,
            message: None,
        }
    }

    pub fn warning(row_index: RowIndex, field: SystemField, message: impl Into<String>) -> Self {
        Self {
            row_index,
            field: field.key().to_string(),
            status: ValidationStatus::Warning,
            message: Some(message.into()),
        }
    }

    pub fn error(row_index: RowIndex, field: SystemField, message: impl Into<String>) -> Self {
        Self {
            row_index,
            field: field.key().to_string(),
            status: ValidationStatus::Error,
            message: Some(message.into()),
        }
    }

    /// 实体查找失败（超时/存储错误）作为行级错误
    pub fn identity_error(row_index: RowIndex, message: impl Into<String>) -> Self {
        Self {
            row_index,
            field: Self::IDENTITY_FIELD.to_string(),
            status: ValidationStatus::Error,
            message: Some(message.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == ValidationStatus::Error
    }

    pub fn is_warning(&self) -> bool {
        self.status == ValidationStatus::Warning
    }
}

// ==========================================
// MeasurementFields - 测试成绩字段
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasurementFields {
    pub metric: Option<MetricType>,
    pub value: Option<f64>,
    pub units: Option<MeasurementUnit>,
    pub date: Option<NaiveDate>,
    pub age: Option<i32>,
    pub fly_in_distance: Option<f64>,
    pub notes: Option<String>,
}

// ==========================================
// MappedRecord - 强类型映射记录
// ==========================================
// 只填充校验通过的值；未映射列保留在 extras
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappedRecord {
    // ===== 身份字段 =====
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub emails: Vec<String>,
    pub phone_numbers: Vec<String>,
    pub birth_date: Option<NaiveDate>,
    pub birth_year: Option<i32>,
    pub gender: Option<Gender>,
    pub team_name: Option<String>,

    // ===== 名册字段 =====
    pub graduation_year: Option<i32>,
    pub sports: Option<String>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub school: Option<String>,
    pub competitive_level: Option<u8>,

    // ===== 测试成绩 =====
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measurement: Option<MeasurementFields>,

    /// 无法识别的联系方式（保留供人工修正）
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unrecognized_contacts: Vec<String>,

    /// 未映射的源列
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extras: BTreeMap<String, String>,
}

impl MappedRecord {
    pub fn for_kind(kind: ImportKind) -> Self {
        Self {
            measurement: match kind {
                ImportKind::Athletes => None,
                ImportKind::Measurements => Some(MeasurementFields::default()),
            },
            ..Default::default()
        }
    }

    /// 展示名（"First Last"）
    pub fn display_name(&self) -> String {
        let first = self.first_name.as_deref().unwrap_or("");
        let last = self.last_name.as_deref().unwrap_or("");
        format!("{} {}", first, last).trim().to_string()
    }

    /// 出生年份：优先显式列,其次由出生日期推导
    pub fn effective_birth_year(&self) -> Option<i32> {
        use chrono::Datelike;
        self.birth_year
            .or_else(|| self.birth_date.map(|d| d.year()))
    }
}
