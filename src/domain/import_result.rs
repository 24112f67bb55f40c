// ==========================================
// 运动员名册导入系统 - 提交结果模型
// ==========================================
// 职责: 单次提交的终态汇总（生成后不再修改）
// ==========================================

use crate::domain::import_row::RowIndex;
use crate::domain::types::ImportAction;
use serde::{Deserialize, Serialize};

/// 单行提交结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowOutcome {
    pub row_index: RowIndex,
    pub action: ImportAction,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
}

/// 单行提交失败
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    pub row_index: RowIndex,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub created: usize,
    pub matched: usize,
    pub matched_and_deactivated: usize,
    pub pending_review: usize,
    pub errors: usize,
    pub warnings: usize,
}

// ==========================================
// ImportResult - 提交终态
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    pub batch_id: String,
    pub total_rows: usize,
    pub outcomes: Vec<RowOutcome>,
    pub errors: Vec<RowError>,
    pub warnings: Vec<String>,
    pub summary: ImportSummary,
}

impl ImportResult {
    pub fn new(
        batch_id: String,
        total_rows: usize,
        outcomes: Vec<RowOutcome>,
        errors: Vec<RowError>,
        warnings: Vec<String>,
    ) -> Self {
        let mut summary = ImportSummary {
            errors: errors.len(),
            warnings: warnings.len(),
            ..Default::default()
        };
        for outcome in &outcomes {
            match outcome.action {
                ImportAction::Created => summary.created += 1,
                ImportAction::Matched => summary.matched += 1,
                ImportAction::MatchedAndDeactivated => summary.matched_and_deactivated += 1,
                ImportAction::PendingReview => summary.pending_review += 1,
            }
        }
        Self {
            batch_id,
            total_rows,
            outcomes,
            errors,
            warnings,
            summary,
        }
    }

    pub fn outcome_for(&self, row_index: RowIndex) -> Option<&RowOutcome> {
        self.outcomes.iter().find(|o| o.row_index == row_index)
    }

    pub fn error_for(&self, row_index: RowIndex) -> Option<&RowError> {
        self.errors.iter().find(|e| e.row_index == row_index)
    }
}
