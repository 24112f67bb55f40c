// ==========================================
// 运动员名册导入系统 - 复核队列模型
// ==========================================
// 职责: 复核项 / 复核决定 / 查询条件
// 状态机: PENDING → APPROVED | REJECTED（只允许决定一次）
// 红线: 复核决定本身不写实体存储,由导入执行器落实
// ==========================================

use crate::domain::import_row::RowIndex;
use crate::domain::person::MatchingCriteria;
use crate::domain::preview::MatchCandidate;
use crate::domain::types::{ImportKind, ReviewStatus};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// ==========================================
// ImportReviewItem - 复核项（唯一跨请求持久化的实体）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportReviewItem {
    pub id: String,
    pub batch_id: String,
    pub import_kind: ImportKind,
    pub row_index: RowIndex,
    pub original_data: IndexMap<String, String>,
    pub matching_criteria: MatchingCriteria,
    pub suggested_match: Option<MatchCandidate>,
    pub alternatives: Vec<MatchCandidate>,
    pub status: ReviewStatus,
    /// 决定后绑定的实体（APPROVED 时非空）
    pub resolved_entity_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<String>,
    pub review_notes: Option<String>,
    /// 已被导入执行器落实的时间（防止重复落实）
    pub applied_at: Option<DateTime<Utc>>,
}

impl ImportReviewItem {
    pub fn is_pending(&self) -> bool {
        self.status == ReviewStatus::Pending
    }

    /// 该复核项是否引用了给定候选实体
    pub fn offers_candidate(&self, entity_id: &str) -> bool {
        self.suggested_match
            .iter()
            .chain(self.alternatives.iter())
            .any(|c| c.entity_id == entity_id)
    }
}

// ==========================================
// NewReviewItem - 入队参数
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReviewItem {
    pub batch_id: String,
    pub import_kind: ImportKind,
    pub row_index: RowIndex,
    pub original_data: IndexMap<String, String>,
    pub matching_criteria: MatchingCriteria,
    pub suggested_match: Option<MatchCandidate>,
    pub alternatives: Vec<MatchCandidate>,
    pub created_by: String,
}

// ==========================================
// ReviewDecision - 复核决定
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "entity_id", rename_all = "snake_case")]
pub enum ReviewDecisionKind {
    /// 接受系统建议
    Approve,
    /// 拒绝匹配（落实时新建人员）
    Reject,
    /// 改选某个备选实体
    SelectAlternative(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewDecision {
    pub kind: ReviewDecisionKind,
    pub reviewed_by: String,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ReviewDecision {
    pub fn target_status(&self) -> ReviewStatus {
        match self.kind {
            ReviewDecisionKind::Approve | ReviewDecisionKind::SelectAlternative(_) => {
                ReviewStatus::Approved
            }
            ReviewDecisionKind::Reject => ReviewStatus::Rejected,
        }
    }
}

// ==========================================
// ReviewFilter - 待复核列表查询条件
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewFilter {
    #[serde(default)]
    pub batch_id: Option<String>,
    #[serde(default)]
    pub import_kind: Option<ImportKind>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default = "ReviewFilter::default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

impl ReviewFilter {
    pub const MAX_LIMIT: usize = 100;

    fn default_limit() -> usize {
        50
    }

    /// 分页大小钳制到 [1, 100]
    pub fn clamped_limit(&self) -> usize {
        self.limit.clamp(1, Self::MAX_LIMIT)
    }

    pub fn for_batch(batch_id: impl Into<String>) -> Self {
        Self {
            batch_id: Some(batch_id.into()),
            ..Default::default()
        }
    }
}

impl Default for ReviewFilter {
    fn default() -> Self {
        Self {
            batch_id: None,
            import_kind: None,
            created_by: None,
            limit: Self::default_limit(),
            offset: 0,
        }
    }
}

// ==========================================
// ReviewDecisionRef - 提交时随附的复核引用
// ==========================================
// 将某个 Duplicate 行与已入队的复核项关联
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewDecisionRef {
    pub row_index: RowIndex,
    pub review_item_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_target_status() {
        let approve = ReviewDecision {
            kind: ReviewDecisionKind::Approve,
            reviewed_by: "coach".to_string(),
            notes: None,
        };
        assert_eq!(approve.target_status(), ReviewStatus::Approved);

        let alt = ReviewDecision {
            kind: ReviewDecisionKind::SelectAlternative("p-2".to_string()),
            ..approve.clone()
        };
        assert_eq!(alt.target_status(), ReviewStatus::Approved);

        let reject = ReviewDecision {
            kind: ReviewDecisionKind::Reject,
            ..approve
        };
        assert_eq!(reject.target_status(), ReviewStatus::Rejected);
    }

    #[test]
    fn test_filter_limit_clamped() {
        let mut filter = ReviewFilter::default();
        filter.limit = 0;
        assert_eq!(filter.clamped_limit(), 1);
        filter.limit = 10_000;
        assert_eq!(filter.clamped_limit(), 100);
        filter.limit = 25;
        assert_eq!(filter.clamped_limit(), 25);
    }

    #[test]
    fn test_decision_kind_serde_shape() {
        let json = serde_json::to_value(ReviewDecisionKind::SelectAlternative("p-9".into())).unwrap();
        assert_eq!(json["type"], "select_alternative");
        assert_eq!(json["entity_id"], "p-9");

        let parsed: ReviewDecisionKind = serde_json::from_str(r#"{"type":"reject"}"#).unwrap();
        assert_eq!(parsed, ReviewDecisionKind::Reject);
    }
}
