// ==========================================
// 运动员名册导入系统 - 预览模型
// ==========================================
// 职责: 匹配候选 / 预览行 / 汇总统计
// 红线: 汇总只由行列表推导,不单独存储
// ==========================================

use crate::domain::import_row::{FieldValidation, MappedRecord, RawRow, RowIndex};
use crate::domain::types::MatchStatus;
use serde::{Deserialize, Serialize};

// ==========================================
// MatchCandidate - 匹配候选
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub entity_id: String,
    pub display_name: String,
    /// 置信度 [0, 1]
    pub confidence: f64,
    /// 可解释的匹配原因（如 "name, email, birth year"）
    pub reason: String,
    /// 候选创建顺序（同分排序用）
    #[serde(skip)]
    pub created_seq: i64,
}

// ==========================================
// MatchOutcome - 单行匹配结论
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub status: MatchStatus,
    pub best: Option<MatchCandidate>,
    /// 除 best 之外高于下限的候选（置信度降序）
    pub alternatives: Vec<MatchCandidate>,
}

impl MatchOutcome {
    pub fn will_create() -> Self {
        Self {
            status: MatchStatus::WillCreate,
            best: None,
            alternatives: Vec::new(),
        }
    }

    pub fn error() -> Self {
        Self {
            status: MatchStatus::Error,
            best: None,
            alternatives: Vec::new(),
        }
    }
}

// ==========================================
// PreviewRow - 预览行
// ==========================================
// 不变量:
// - WillMatch / Duplicate ⇒ matched_entity_id 非空
// - Error ⇒ 至少一条 error 级校验
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewRow {
    pub row_index: RowIndex,
    pub data: RawRow,
    pub record: MappedRecord,
    pub validations: Vec<FieldValidation>,
    pub match_status: MatchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_entity_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_entity_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<MatchCandidate>,
}

impl PreviewRow {
    pub fn has_errors(&self) -> bool {
        self.validations.iter().any(|v| v.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &FieldValidation> {
        self.validations.iter().filter(|v| v.is_warning())
    }

    pub fn error_messages(&self) -> Vec<String> {
        self.validations
            .iter()
            .filter(|v| v.is_error())
            .map(|v| v.message.clone().unwrap_or_else(|| format!("{} is invalid", v.field)))
            .collect()
    }

    /// 校验不变量（供测试与提交前自检）
    pub fn check_invariants(&self) -> Result<(), String> {
        match self.match_status {
            MatchStatus::WillMatch | MatchStatus::Duplicate if self.matched_entity_id.is_none() => {
                Err(format!(
                    "row {}: {} without matched_entity_id",
                    self.row_index, self.match_status
                ))
            }
            MatchStatus::Error if !self.has_errors() => Err(format!(
                "row {}: error status without an error validation",
                self.row_index
            )),
            _ => Ok(()),
        }
    }
}

// ==========================================
// PreviewSummary - 预览汇总
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewSummary {
    pub total: usize,
    pub will_create: usize,
    pub will_match: usize,
    pub duplicate: usize,
    pub errors: usize,
    pub warnings: usize,
}

impl PreviewSummary {
    pub fn from_rows(rows: &[PreviewRow]) -> Self {
        let mut summary = PreviewSummary {
            total: rows.len(),
            ..Default::default()
        };
        for row in rows {
            match row.match_status {
                MatchStatus::WillCreate => summary.will_create += 1,
                MatchStatus::WillMatch => summary.will_match += 1,
                MatchStatus::Duplicate => summary.duplicate += 1,
                MatchStatus::Error => summary.errors += 1,
            }
            summary.warnings += row.warnings().count();
        }
        summary
    }

    pub fn is_consistent(&self) -> bool {
        self.will_create + self.will_match + self.duplicate + self.errors == self.total
    }
}

// ==========================================
// PreviewResult - 预览结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewResult {
    pub rows: Vec<PreviewRow>,
    pub summary: PreviewSummary,
}

impl PreviewResult {
    pub fn new(rows: Vec<PreviewRow>) -> Self {
        let summary = PreviewSummary::from_rows(&rows);
        Self { rows, summary }
    }

    /// 按行号取预览行（越界返回 None）
    pub fn get(&self, index: RowIndex) -> Option<&PreviewRow> {
        self.rows.get(index.0).filter(|r| r.row_index == index)
    }

    /// 展示用截断（汇总仍覆盖全部行）
    pub fn rendered(&self, limit: usize) -> &[PreviewRow] {
        &self.rows[..self.rows.len().min(limit)]
    }
}
