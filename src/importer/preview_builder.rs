// ==========================================
// 运动员名册导入系统 - 预览构建器
// ==========================================
// 阶段 5: 逐行 校验 → 匹配 → PreviewRow,汇总由行列表推导
// 顺序: 输出与输入行顺序一致（按 concurrency 分块并发,块内 join_all 保序）
// 红线: 有 error 的行不触发实体查找；不写任何数据
// ==========================================

use crate::domain::import_row::{FieldMapping, FieldValidation, RawRow};
use crate::domain::preview::{MatchOutcome, PreviewResult, PreviewRow};
use crate::domain::types::ImportKind;
use crate::importer::entity_matcher::EntityMatcher;
use crate::importer::importer_trait::RowValidator;
use crate::repository::person_repo::PersonStore;
use futures::future::join_all;

pub struct PreviewBuilder {
    validator: Box<dyn RowValidator>,
    matcher: EntityMatcher,
    /// 同时进行的实体查找数（>= 1）
    concurrency: usize,
}

impl PreviewBuilder {
    pub fn new(validator: Box<dyn RowValidator>, matcher: EntityMatcher, concurrency: usize) -> Self {
        Self {
            validator,
            matcher,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn build<S>(
        &self,
        store: &S,
        kind: ImportKind,
        rows: &[RawRow],
        mapping: &[FieldMapping],
    ) -> PreviewResult
    where
        S: PersonStore + ?Sized,
    {
        let mut preview_rows: Vec<PreviewRow> = Vec::with_capacity(rows.len());
        for chunk in rows.chunks(self.concurrency) {
            let batch = join_all(chunk.iter().map(|row| self.preview_row(store, kind, row, mapping))).await;
            preview_rows.extend(batch);
        }

        let result = PreviewResult::new(preview_rows);
        tracing::info!(
            kind = %kind,
            total = result.summary.total,
            will_create = result.summary.will_create,
            will_match = result.summary.will_match,
            duplicate = result.summary.duplicate,
            errors = result.summary.errors,
            warnings = result.summary.warnings,
            "preview built"
        );
        result
    }

    async fn preview_row<S>(
        &self,
        store: &S,
        kind: ImportKind,
        row: &RawRow,
        mapping: &[FieldMapping],
    ) -> PreviewRow
    where
        S: PersonStore + ?Sized,
    {
        let validated = self.validator.validate_and_normalize(row, mapping, kind);
        let has_errors = validated.has_errors();
        let record = validated.record;
        let mut validations = validated.validations;

        let outcome = if has_errors {
            MatchOutcome::error()
        } else {
            match self.matcher.match_record(store, &record).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!(row = row.index.0, error = %e, "identity lookup failed");
                    validations.push(FieldValidation::identity_error(
                        row.index,
                        format!("Identity lookup failed: {}", e),
                    ));
                    MatchOutcome::error()
                }
            }
        };

        PreviewRow {
            row_index: row.index,
            data: row.clone(),
            record,
            validations,
            match_status: outcome.status,
            matched_entity_id: outcome.best.as_ref().map(|b| b.entity_id.clone()),
            matched_entity_name: outcome.best.as_ref().map(|b| b.display_name.clone()),
            match_confidence: outcome.best.as_ref().map(|b| b.confidence),
            match_reason: outcome.best.as_ref().map(|b| b.reason.clone()),
            alternatives: outcome.alternatives,
        }
    }
}
