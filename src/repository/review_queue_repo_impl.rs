// ==========================================
// 运动员名册导入系统 - 复核队列 Repository 实现
// ==========================================
// 职责: import_review_item 表的读写
// 并发: 决定与落实都使用条件 UPDATE,以受影响行数判定胜负
// ==========================================

use crate::db::{init_schema, open_sqlite_connection};
use crate::domain::import_row::RowIndex;
use crate::domain::review::{
    ImportReviewItem, NewReviewItem, ReviewDecision, ReviewDecisionKind, ReviewFilter,
};
use crate::domain::types::{ImportKind, ReviewStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::review_queue_repo::ReviewQueueRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

const ITEM_COLUMNS: &str = "id, batch_id, import_kind, row_index, original_data_json, \
     matching_criteria_json, suggested_match_json, alternatives_json, status, resolved_entity_id, \
     created_at, created_by, reviewed_at, reviewed_by, review_notes, applied_at";

// ==========================================
// ReviewQueueRepositoryImpl
// ==========================================
pub struct ReviewQueueRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl ReviewQueueRepositoryImpl {
    /// 按路径打开数据库（自动建表）
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

#[async_trait]
impl ReviewQueueRepository for ReviewQueueRepositoryImpl {
    async fn enqueue(&self, item: NewReviewItem) -> RepositoryResult<ImportReviewItem> {
        let conn = self.get_conn()?;
        let id = Uuid::new_v4().to_string();

        conn.execute(
            r#"
            INSERT INTO import_review_item (
                id, batch_id, import_kind, row_index, original_data_json, matching_criteria_json,
                suggested_match_json, alternatives_json, status, created_at, created_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 'PENDING', ?9, ?10)
            "#,
            params![
                id,
                item.batch_id,
                item.import_kind.as_str(),
                item.row_index.0 as i64,
                serde_json::to_string(&item.original_data)?,
                serde_json::to_string(&item.matching_criteria)?,
                item.suggested_match
                    .as_ref()
                    .map(|c| serde_json::to_string(c))
                    .transpose()?,
                serde_json::to_string(&item.alternatives)?,
                Utc::now(),
                item.created_by,
            ],
        )?;

        tracing::info!(review_item_id = %id, batch_id = %item.batch_id, row_index = %item.row_index, "review item enqueued");
        load_item(&conn, &id)?.ok_or_else(|| RepositoryError::not_found("import_review_item", id))
    }

    async fn get(&self, id: &str) -> RepositoryResult<Option<ImportReviewItem>> {
        let conn = self.get_conn()?;
        load_item(&conn, id)
    }

    async fn decide(&self, id: &str, decision: &ReviewDecision) -> RepositoryResult<ImportReviewItem> {
        let conn = self.get_conn()?;
        let item = load_item(&conn, id)?
            .ok_or_else(|| RepositoryError::not_found("import_review_item", id))?;

        if item.status.is_terminal() {
            return Err(RepositoryError::DecisionConflict {
                id: id.to_string(),
                status: item.status.to_string(),
            });
        }

        let resolved_entity_id = match &decision.kind {
            ReviewDecisionKind::Approve => Some(
                item.suggested_match
                    .as_ref()
                    .map(|c| c.entity_id.clone())
                    .ok_or_else(|| {
                        RepositoryError::ValidationError(format!(
                            "review item {} has no suggested match to approve",
                            id
                        ))
                    })?,
            ),
            ReviewDecisionKind::SelectAlternative(entity_id) => {
                if !item.offers_candidate(entity_id) {
                    return Err(RepositoryError::ValidationError(format!(
                        "entity {} is not a candidate of review item {}",
                        entity_id, id
                    )));
                }
                Some(entity_id.clone())
            }
            ReviewDecisionKind::Reject => None,
        };

        let target = decision.target_status();
        let affected = conn.execute(
            r#"
            UPDATE import_review_item
            SET status = ?2,
                resolved_entity_id = ?3,
                reviewed_at = ?4,
                reviewed_by = ?5,
                review_notes = ?6
            WHERE id = ?1 AND status = 'PENDING'
            "#,
            params![
                id,
                target.as_str(),
                resolved_entity_id,
                Utc::now(),
                decision.reviewed_by,
                decision.notes,
            ],
        )?;

        if affected == 0 {
            let current = load_item(&conn, id)?
                .map(|i| i.status.to_string())
                .unwrap_or_else(|| "MISSING".to_string());
            tracing::warn!(review_item_id = %id, current = %current, "concurrent review decision lost");
            return Err(RepositoryError::DecisionConflict {
                id: id.to_string(),
                status: current,
            });
        }

        tracing::info!(review_item_id = %id, status = %target, reviewed_by = %decision.reviewed_by, "review item decided");
        load_item(&conn, id)?.ok_or_else(|| RepositoryError::not_found("import_review_item", id))
    }

    async fn list_pending(&self, filter: &ReviewFilter) -> RepositoryResult<Vec<ImportReviewItem>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT {}
            FROM import_review_item
            WHERE status = 'PENDING'
              AND (?1 IS NULL OR batch_id = ?1)
              AND (?2 IS NULL OR import_kind = ?2)
              AND (?3 IS NULL OR created_by = ?3)
            ORDER BY created_at ASC, rowid ASC
            LIMIT ?4 OFFSET ?5
            "#,
            ITEM_COLUMNS
        );

        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(
                params![
                    filter.batch_id,
                    filter.import_kind.map(|k| k.as_str()),
                    filter.created_by,
                    filter.clamped_limit() as i64,
                    i64::try_from(filter.offset).unwrap_or(i64::MAX),
                ],
                map_item_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    async fn mark_applied(&self, id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            UPDATE import_review_item
            SET applied_at = ?2
            WHERE id = ?1 AND applied_at IS NULL AND status != 'PENDING'
            "#,
            params![id, Utc::now()],
        )?;
        Ok(affected == 1)
    }
}

fn load_item(conn: &Connection, id: &str) -> RepositoryResult<Option<ImportReviewItem>> {
    let sql = format!("SELECT {} FROM import_review_item WHERE id = ?1", ITEM_COLUMNS);
    Ok(conn.query_row(&sql, params![id], map_item_row).optional()?)
}

fn json_column<T: serde::de::DeserializeOwned>(idx: usize, raw: &str) -> rusqlite::Result<T> {
    serde_json::from_str(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn map_item_row(row: &Row) -> rusqlite::Result<ImportReviewItem> {
    let kind_raw: String = row.get(2)?;
    let import_kind = ImportKind::parse(&kind_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            Type::Text,
            format!("unknown import kind: {}", kind_raw).into(),
        )
    })?;

    let row_index: i64 = row.get(3)?;
    let row_index = usize::try_from(row_index)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Integer, Box::new(e)))?;

    let original_data: String = row.get(4)?;
    let criteria: String = row.get(5)?;
    let suggested: Option<String> = row.get(6)?;
    let alternatives: String = row.get(7)?;
    let status_raw: String = row.get(8)?;
    let status = ReviewStatus::parse(&status_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            8,
            Type::Text,
            format!("unknown review status: {}", status_raw).into(),
        )
    })?;

    Ok(ImportReviewItem {
        id: row.get(0)?,
        batch_id: row.get(1)?,
        import_kind,
        row_index: RowIndex(row_index),
        original_data: json_column(4, &original_data)?,
        matching_criteria: json_column(5, &criteria)?,
        suggested_match: suggested.map(|s| json_column(6, &s)).transpose()?,
        alternatives: json_column(7, &alternatives)?,
        status,
        resolved_entity_id: row.get(9)?,
        created_at: row.get::<_, DateTime<Utc>>(10)?,
        created_by: row.get(11)?,
        reviewed_at: row.get::<_, Option<DateTime<Utc>>>(12)?,
        reviewed_by: row.get(13)?,
        review_notes: row.get(14)?,
        applied_at: row.get::<_, Option<DateTime<Utc>>>(15)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::person::MatchingCriteria;
    use crate::domain::preview::MatchCandidate;
    use indexmap::IndexMap;

    fn repo() -> ReviewQueueRepositoryImpl {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        ReviewQueueRepositoryImpl::from_connection(Arc::new(Mutex::new(conn)))
    }

    fn candidate(id: &str, confidence: f64) -> MatchCandidate {
        MatchCandidate {
            entity_id: id.to_string(),
            display_name: format!("Person {}", id),
            confidence,
            reason: "name".to_string(),
            created_seq: 0,
        }
    }

    fn new_item(batch: &str, row: usize) -> NewReviewItem {
        let mut data = IndexMap::new();
        data.insert("First Name".to_string(), "John".to_string());
        NewReviewItem {
            batch_id: batch.to_string(),
            import_kind: ImportKind::Athletes,
            row_index: RowIndex(row),
            original_data: data,
            matching_criteria: MatchingCriteria {
                first_name: Some("John".to_string()),
                ..Default::default()
            },
            suggested_match: Some(candidate("p-1", 0.6)),
            alternatives: vec![candidate("p-2", 0.55)],
            created_by: "coach".to_string(),
        }
    }

    fn decision(kind: ReviewDecisionKind) -> ReviewDecision {
        ReviewDecision {
            kind,
            reviewed_by: "admin".to_string(),
            notes: Some("checked".to_string()),
        }
    }

    #[tokio::test]
    async fn test_enqueue_round_trips_json_columns() {
        let repo = repo();
        let item = repo.enqueue(new_item("b1", 3)).await.unwrap();
        assert_eq!(item.status, ReviewStatus::Pending);
        assert_eq!(item.row_index, RowIndex(3));
        assert_eq!(item.original_data.get("First Name").map(String::as_str), Some("John"));
        assert_eq!(item.alternatives.len(), 1);
        assert_eq!(repo.get(&item.id).await.unwrap(), Some(item));
    }

    #[tokio::test]
    async fn test_decide_twice_conflicts() {
        let repo = repo();
        let item = repo.enqueue(new_item("b1", 0)).await.unwrap();

        let decided = repo.decide(&item.id, &decision(ReviewDecisionKind::Approve)).await.unwrap();
        assert_eq!(decided.status, ReviewStatus::Approved);
        assert_eq!(decided.resolved_entity_id.as_deref(), Some("p-1"));
        assert_eq!(decided.reviewed_by.as_deref(), Some("admin"));

        let err = repo
            .decide(&item.id, &decision(ReviewDecisionKind::Reject))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::DecisionConflict { .. }));

        // 首次决定不被覆盖
        let stored = repo.get(&item.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ReviewStatus::Approved);
    }

    #[tokio::test]
    async fn test_select_alternative_must_be_a_candidate() {
        let repo = repo();
        let item = repo.enqueue(new_item("b1", 0)).await.unwrap();

        let err = repo
            .decide(&item.id, &decision(ReviewDecisionKind::SelectAlternative("p-9".into())))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::ValidationError(_)));

        let decided = repo
            .decide(&item.id, &decision(ReviewDecisionKind::SelectAlternative("p-2".into())))
            .await
            .unwrap();
        assert_eq!(decided.status, ReviewStatus::Approved);
        assert_eq!(decided.resolved_entity_id.as_deref(), Some("p-2"));
    }

    #[tokio::test]
    async fn test_decide_unknown_item_is_not_found() {
        let err = repo()
            .decide("nope", &decision(ReviewDecisionKind::Reject))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_pending_filters_and_paginates() {
        let repo = repo();
        for row in 0..3 {
            repo.enqueue(new_item("b1", row)).await.unwrap();
        }
        let other = repo.enqueue(new_item("b2", 0)).await.unwrap();
        repo.decide(&other.id, &decision(ReviewDecisionKind::Reject)).await.unwrap();

        let b1 = repo.list_pending(&ReviewFilter::for_batch("b1")).await.unwrap();
        assert_eq!(b1.iter().map(|i| i.row_index.0).collect::<Vec<_>>(), vec![0, 1, 2]);

        let b2 = repo.list_pending(&ReviewFilter::for_batch("b2")).await.unwrap();
        assert!(b2.is_empty());

        let page = repo
            .list_pending(&ReviewFilter {
                limit: 2,
                offset: 1,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.len(), 2);

        let measurements = repo
            .list_pending(&ReviewFilter {
                import_kind: Some(ImportKind::Measurements),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(measurements.is_empty());
    }

    #[tokio::test]
    async fn test_list_pending_with_offset_past_i64_is_empty() {
        let repo = repo();
        repo.enqueue(new_item("b1", 0)).await.unwrap();

        let page = repo
            .list_pending(&ReviewFilter {
                offset: usize::MAX,
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(page.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_stored_status_is_rejected_not_reopened() {
        let repo = repo();
        let item = repo.enqueue(new_item("b1", 0)).await.unwrap();
        repo.get_conn()
            .unwrap()
            .execute(
                "UPDATE import_review_item SET status = 'ARCHIVED' WHERE id = ?1",
                params![item.id],
            )
            .unwrap();

        let err = repo.get(&item.id).await.unwrap_err();
        assert!(matches!(err, RepositoryError::DatabaseQueryError(ref msg) if msg.contains("ARCHIVED")));
    }

    #[tokio::test]
    async fn test_mark_applied_only_once_and_only_when_decided() {
        let repo = repo();
        let item = repo.enqueue(new_item("b1", 0)).await.unwrap();
        assert!(!repo.mark_applied(&item.id).await.unwrap());

        repo.decide(&item.id, &decision(ReviewDecisionKind::Reject)).await.unwrap();
        assert!(repo.mark_applied(&item.id).await.unwrap());
        assert!(!repo.mark_applied(&item.id).await.unwrap());
        assert!(repo.get(&item.id).await.unwrap().unwrap().applied_at.is_some());
    }
}
