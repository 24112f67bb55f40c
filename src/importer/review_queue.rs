// ==========================================
// 运动员名册导入系统 - 复核队列服务
// ==========================================
// 职责: 疑似重复行入队、记录复核决定、查询待复核列表
// 状态机: PENDING --approve/select_alternative--> APPROVED
//         PENDING --reject--> REJECTED
// 红线: 决定只确定"绑定哪个实体",实体写入由导入执行器完成
// ==========================================

use crate::domain::person::MatchingCriteria;
use crate::domain::preview::{MatchCandidate, PreviewRow};
use crate::domain::review::{ImportReviewItem, NewReviewItem, ReviewDecision, ReviewFilter};
use crate::domain::types::{ImportKind, MatchStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::review_queue_repo::ReviewQueueRepository;
use std::sync::Arc;
use tracing::instrument;

pub struct ReviewQueue<Q>
where
    Q: ReviewQueueRepository,
{
    repo: Arc<Q>,
}

impl<Q> ReviewQueue<Q>
where
    Q: ReviewQueueRepository,
{
    pub fn new(repo: Arc<Q>) -> Self {
        Self { repo }
    }

    /// 将一条 Duplicate 预览行入队
    ///
    /// # 错误
    /// - InvalidStateTransition: 行不是 Duplicate 处置
    pub async fn enqueue_preview_row(
        &self,
        batch_id: &str,
        kind: ImportKind,
        row: &PreviewRow,
        created_by: &str,
    ) -> RepositoryResult<ImportReviewItem> {
        if row.match_status != MatchStatus::Duplicate {
            return Err(RepositoryError::InvalidStateTransition {
                from: row.match_status.to_string(),
                to: "review".to_string(),
            });
        }

        let suggested = match (&row.matched_entity_id, row.match_confidence) {
            (Some(id), Some(confidence)) => Some(MatchCandidate {
                entity_id: id.clone(),
                display_name: row.matched_entity_name.clone().unwrap_or_default(),
                confidence,
                reason: row.match_reason.clone().unwrap_or_default(),
                created_seq: 0,
            }),
            _ => None,
        };

        let item = self
            .repo
            .enqueue(NewReviewItem {
                batch_id: batch_id.to_string(),
                import_kind: kind,
                row_index: row.row_index,
                original_data: row.data.values.clone(),
                matching_criteria: MatchingCriteria::from_record(&row.record),
                suggested_match: suggested,
                alternatives: row.alternatives.clone(),
                created_by: created_by.to_string(),
            })
            .await?;

        tracing::info!(
            review_item_id = %item.id,
            batch_id = %batch_id,
            row = row.row_index.0,
            alternatives = item.alternatives.len(),
            "row queued for review"
        );
        Ok(item)
    }

    #[instrument(skip(self, decision), fields(decision = ?decision.kind))]
    pub async fn decide(&self, id: &str, decision: &ReviewDecision) -> RepositoryResult<ImportReviewItem> {
        match self.repo.decide(id, decision).await {
            Ok(item) => {
                tracing::info!(
                    status = %item.status,
                    resolved_entity_id = ?item.resolved_entity_id,
                    reviewed_by = %decision.reviewed_by,
                    "review item decided"
                );
                Ok(item)
            }
            Err(e) => {
                tracing::warn!(error = %e, "review decision rejected");
                Err(e)
            }
        }
    }

    pub async fn list_pending(&self, filter: &ReviewFilter) -> RepositoryResult<Vec<ImportReviewItem>> {
        self.repo.list_pending(filter).await
    }

    pub async fn get(&self, id: &str) -> RepositoryResult<Option<ImportReviewItem>> {
        self.repo.get(id).await
    }

    pub async fn mark_applied(&self, id: &str) -> RepositoryResult<bool> {
        self.repo.mark_applied(id).await
    }
}
