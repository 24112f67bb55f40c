// ==========================================
// 运动员名册导入系统 - 导入执行器
// ==========================================
// 阶段 7: 按预览处置逐行写入实体存储
// 顺序: 严格按原始行顺序串行执行（错误行号稳定可复现）
// 部分失败: 单行存储错误记入 errors 后继续下一行,从不整体中止
// 幂等: WillMatch 行重复提交只做合并；已落实的复核项跳过
// 批内: 同一身份的多行新建只建一次人员,后续行并入该人员
// 原子: 每行的人员 / 邀请 / 成绩写入在存储侧同一事务内完成
// ==========================================

use crate::domain::import_result::{ImportResult, RowError, RowOutcome};
use crate::domain::import_row::MappedRecord;
use crate::domain::person::{normalize_name, NewMeasurement, NewPerson, PersonWrite};
use crate::domain::preview::{PreviewResult, PreviewRow};
use crate::domain::review::{ImportReviewItem, ReviewDecisionRef};
use crate::domain::types::{ImportAction, ImportKind, MatchStatus, ReviewStatus};
use crate::importer::review_queue::ReviewQueue;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::person_repo::PersonStore;
use crate::repository::review_queue_repo::ReviewQueueRepository;
use chrono::Utc;
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

/// 单行执行结果
enum RowStep {
    Done(RowOutcome),
    /// 已执行,附告警说明
    DoneWithWarning(RowOutcome, String),
    /// 跳过（附告警说明）
    Skipped(String),
}

pub struct ImportExecutor<'a, S, Q>
where
    S: PersonStore + ?Sized,
    Q: ReviewQueueRepository,
{
    store: &'a S,
    queue: &'a ReviewQueue<Q>,
    created_by: &'a str,
}

impl<'a, S, Q> ImportExecutor<'a, S, Q>
where
    S: PersonStore + ?Sized,
    Q: ReviewQueueRepository,
{
    pub fn new(store: &'a S, queue: &'a ReviewQueue<Q>, created_by: &'a str) -> Self {
        Self {
            store,
            queue,
            created_by,
        }
    }

    #[instrument(skip_all, fields(kind = %kind, rows = preview.rows.len()))]
    pub async fn execute(
        &self,
        kind: ImportKind,
        preview: &PreviewResult,
        decisions: &[ReviewDecisionRef],
    ) -> ImportResult {
        let batch_id = Uuid::new_v4().to_string();
        let mut outcomes = Vec::new();
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        // 批内身份 → 本批新建的人员
        let mut created_in_batch: HashMap<String, String> = HashMap::new();

        for row in &preview.rows {
            let line = row.row_index.display_line();
            for w in row.warnings() {
                warnings.push(format!(
                    "Row {}: {}: {}",
                    line,
                    w.field,
                    w.message.as_deref().unwrap_or("check value")
                ));
            }

            if row.match_status == MatchStatus::Error {
                errors.push(RowError {
                    row_index: row.row_index,
                    error: row.error_messages().join("; "),
                });
                continue;
            }

            match self
                .execute_row(&batch_id, kind, row, decisions, &mut created_in_batch)
                .await
            {
                Ok(RowStep::Done(outcome)) => outcomes.push(outcome),
                Ok(RowStep::DoneWithWarning(outcome, warning)) => {
                    warnings.push(format!("Row {}: {}", line, warning));
                    outcomes.push(outcome);
                }
                Ok(RowStep::Skipped(reason)) => {
                    tracing::warn!(row = row.row_index.0, %reason, "row skipped");
                    warnings.push(format!("Row {}: {}", line, reason));
                }
                Err(e) => {
                    tracing::warn!(row = row.row_index.0, error = %e, "row commit failed");
                    errors.push(RowError {
                        row_index: row.row_index,
                        error: e.to_string(),
                    });
                }
            }
        }

        let result = ImportResult::new(batch_id, preview.rows.len(), outcomes, errors, warnings);
        tracing::info!(
            batch_id = %result.batch_id,
            created = result.summary.created,
            matched = result.summary.matched,
            matched_and_deactivated = result.summary.matched_and_deactivated,
            pending_review = result.summary.pending_review,
            errors = result.summary.errors,
            "import committed"
        );
        result
    }

    async fn execute_row(
        &self,
        batch_id: &str,
        kind: ImportKind,
        row: &PreviewRow,
        decisions: &[ReviewDecisionRef],
        created_in_batch: &mut HashMap<String, String>,
    ) -> RepositoryResult<RowStep> {
        match row.match_status {
            MatchStatus::WillCreate => {
                let identity = batch_identity(&row.record);
                if let Some(person_id) = identity.as_ref().and_then(|k| created_in_batch.get(k)).cloned() {
                    tracing::debug!(row = row.row_index.0, person_id = %person_id, "bound to person created earlier in batch");
                    return self.merge(kind, row, &person_id).await;
                }
                let (step, person_id) = self.create(kind, row, None).await?;
                if let Some(identity) = identity {
                    created_in_batch.insert(identity, person_id);
                }
                Ok(step)
            }
            MatchStatus::WillMatch => {
                let entity_id = row.matched_entity_id.as_deref().ok_or_else(|| {
                    RepositoryError::InternalError(format!(
                        "row {} is will_match without an entity",
                        row.row_index
                    ))
                })?;
                self.merge(kind, row, entity_id).await
            }
            MatchStatus::Duplicate => {
                match decisions.iter().find(|d| d.row_index == row.row_index) {
                    Some(decision) => self.apply_decision(kind, row, &decision.review_item_id).await,
                    None => {
                        let item = self
                            .queue
                            .enqueue_preview_row(batch_id, kind, row, self.created_by)
                            .await?;
                        Ok(RowStep::Done(pending(row, &item, "Queued for review")))
                    }
                }
            }
            // 已在 execute 中处理
            MatchStatus::Error => Err(RepositoryError::InternalError(format!(
                "row {} has validation errors",
                row.row_index
            ))),
        }
    }

    async fn apply_decision(&self, kind: ImportKind, row: &PreviewRow, item_id: &str) -> RepositoryResult<RowStep> {
        let item = self
            .queue
            .get(item_id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("ImportReviewItem", item_id))?;

        if item.row_index != row.row_index {
            return Err(RepositoryError::ValidationError(format!(
                "review item {} belongs to row {}, not row {}",
                item.id, item.row_index, row.row_index
            )));
        }
        if item.status == ReviewStatus::Pending {
            return Ok(RowStep::Done(pending(row, &item, "Awaiting review")));
        }
        // 先占用再写入: 并发或重复提交只有一方能落实
        if item.applied_at.is_some() || !self.queue.mark_applied(&item.id).await? {
            return Ok(RowStep::Skipped(format!(
                "review item {} was already applied; row skipped",
                item.id
            )));
        }

        match item.status {
            ReviewStatus::Approved => {
                let entity_id = item.resolved_entity_id.as_deref().ok_or_else(|| {
                    RepositoryError::InternalError(format!(
                        "approved review item {} has no resolved entity",
                        item.id
                    ))
                })?;
                self.merge(kind, row, entity_id).await
            }
            ReviewStatus::Rejected => self.create(kind, row, Some(&item)).await.map(|(step, _)| step),
            ReviewStatus::Pending => Ok(RowStep::Done(pending(row, &item, "Awaiting review"))),
        }
    }

    /// 新建人员；返回执行结果与新人员 ID
    async fn create(
        &self,
        kind: ImportKind,
        row: &PreviewRow,
        rejected: Option<&ImportReviewItem>,
    ) -> RepositoryResult<(RowStep, String)> {
        let measurement = self.measurement_for(kind, row)?;
        let write = self
            .store
            .record_new_person(
                &NewPerson::from_record(&row.record, self.created_by),
                measurement.as_ref(),
            )
            .await?;

        let detail = match rejected {
            Some(item) => format!(
                "Created {} after review item {} rejected the suggested match",
                write.person.display_name(),
                item.id
            ),
            None => format!("Created {}", write.person.display_name()),
        };
        let person_id = write.person.person_id.clone();
        let step = finish(row, ImportAction::Created, detail, &write);
        Ok((step, person_id))
    }

    async fn merge(&self, kind: ImportKind, row: &PreviewRow, entity_id: &str) -> RepositoryResult<RowStep> {
        let measurement = self.measurement_for(kind, row)?;
        let write = self
            .store
            .record_matched_person(
                entity_id,
                &NewPerson::from_record(&row.record, self.created_by),
                measurement.as_ref(),
            )
            .await?;

        let (action, detail) = if write.closed_invitations > 0 {
            (
                ImportAction::MatchedAndDeactivated,
                format!(
                    "Matched {}; closed {} pending invitation(s)",
                    write.person.display_name(),
                    write.closed_invitations
                ),
            )
        } else {
            (ImportAction::Matched, format!("Matched {}", write.person.display_name()))
        };
        Ok(finish(row, action, detail, &write))
    }

    /// 成绩导入行的待写入成绩（名册导入返回 None）
    fn measurement_for(&self, kind: ImportKind, row: &PreviewRow) -> RepositoryResult<Option<NewMeasurement>> {
        if kind != ImportKind::Measurements {
            return Ok(None);
        }
        let fields = row.record.measurement.as_ref();
        let (Some(metric), Some(value)) = (
            fields.and_then(|m| m.metric),
            fields.and_then(|m| m.value),
        ) else {
            return Err(RepositoryError::ValidationError(format!(
                "row {} is missing metric or value",
                row.row_index
            )));
        };

        Ok(Some(NewMeasurement {
            metric,
            value,
            units: fields
                .and_then(|m| m.units)
                .unwrap_or_else(|| metric.canonical_unit()),
            // 未提供日期时记为导入当天
            measured_on: fields
                .and_then(|m| m.date)
                .unwrap_or_else(|| Utc::now().date_naive()),
            age: fields.and_then(|m| m.age),
            fly_in_distance: fields.and_then(|m| m.fly_in_distance),
            notes: fields.and_then(|m| m.notes.clone()),
            team_name: row.record.team_name.clone(),
            created_by: self.created_by.to_string(),
        }))
    }
}

fn finish(row: &PreviewRow, action: ImportAction, detail: String, write: &PersonWrite) -> RowStep {
    let outcome = RowOutcome {
        row_index: row.row_index,
        action,
        detail,
        entity_id: Some(write.person.person_id.clone()),
    };
    if write.measurement_inserted == Some(false) {
        tracing::warn!(row = row.row_index.0, person_id = %write.person.person_id, "measurement already recorded");
        return RowStep::DoneWithWarning(outcome, "measurement already recorded; not inserted".to_string());
    }
    RowStep::Done(outcome)
}

/// 批内身份键: 规范化姓名 + 首个邮箱（无邮箱时用出生年份）
///
/// 姓名缺失时返回 None（不做批内合并）
fn batch_identity(record: &MappedRecord) -> Option<String> {
    let first = normalize_name(record.first_name.as_deref()?);
    let last = normalize_name(record.last_name.as_deref()?);
    if first.is_empty() || last.is_empty() {
        return None;
    }
    let discriminator = match record.emails.first() {
        Some(email) => email.trim().to_lowercase(),
        None => record
            .effective_birth_year()
            .map(|y| y.to_string())
            .unwrap_or_default(),
    };
    Some(format!("{}\u{1f}{}\u{1f}{}", first, last, discriminator))
}

fn pending(row: &PreviewRow, item: &ImportReviewItem, prefix: &str) -> RowOutcome {
    RowOutcome {
        row_index: row.row_index,
        action: ImportAction::PendingReview,
        detail: format!("{} (review item {})", prefix, item.id),
        entity_id: None,
    }
}
