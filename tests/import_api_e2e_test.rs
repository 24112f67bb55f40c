// ==========================================
// ImportApi 端到端测试
// ==========================================
// 覆盖: parse_csv → preview → commit → list_review_queue → decide_review_item
// 数据库: 临时 SQLite 文件（API 自行打开连接）
// ==========================================


use roster_import::api::{ApiError, CommitRequest, ImportApi, PreviewRequest};
use roster_import::config::{config_keys, ConfigManager};
use roster_import::domain::types::{ImportAction, ImportKind, ReviewStatus};
use roster_import::domain::{ReviewDecision, ReviewDecisionKind, ReviewDecisionRef, ReviewFilter};
use roster_import::repository::{PersonRepositoryImpl, PersonStore};
use test_helpers::{create_test_db, new_person};

const ROSTER: &str = "First Name,Last Name,Email,Birth Year\n\
                      John,Doe,,2008\n\
                      Mia,Park,mia@example.com,2009\n\
                      Leo,Cruz,leo@example.com,2007\n\
                      ,Nameless,,2008";

fn approve(by: &str) -> ReviewDecision {
    ReviewDecision {
        kind: ReviewDecisionKind::Approve,
        reviewed_by: by.to_string(),
        notes: Some("same athlete".to_string()),
    }
}

#[tokio::test]
async fn test_parse_csv_returns_samples_and_mappings() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let api = ImportApi::new(&db_path).unwrap();

    let parsed = api.parse_csv(ROSTER, ImportKind::Athletes).await.unwrap();
    assert_eq!(parsed.headers.len(), 4);
    assert_eq!(parsed.total_rows, 4);
    assert_eq!(parsed.rows.len(), 4);
    assert_eq!(parsed.sample_rows.len(), 4);
    assert_eq!(parsed.suggested_mappings.len(), 4);
    assert!(parsed.suggested_mappings.iter().all(|m| m.auto_detected));

    let err = api.parse_csv("\u{feff}  \n", ImportKind::Athletes).await.unwrap_err();
    assert!(matches!(err, ApiError::ImportError(_)), "{err}");
}

#[tokio::test]
async fn test_preview_is_truncated_but_summary_is_complete() {
    let (_tmp, db_path) = create_test_db().unwrap();
    ConfigManager::new(&db_path)
        .unwrap()
        .set_global_config_value(config_keys::PREVIEW_ROW_LIMIT, "2")
        .unwrap();
    let api = ImportApi::new(&db_path).unwrap();

    let parsed = api.parse_csv(ROSTER, ImportKind::Athletes).await.unwrap();
    let preview = api
        .preview(&PreviewRequest {
            kind: ImportKind::Athletes,
            rows: parsed.rows,
            mapping: parsed.suggested_mappings,
        })
        .await
        .unwrap();

    assert!(preview.truncated);
    assert_eq!(preview.preview_rows.len(), 2);
    assert_eq!(preview.summary.total, 4);
    assert_eq!(preview.summary.will_create, 3);
    assert_eq!(preview.summary.errors, 1);
}

#[tokio::test]
async fn test_commit_requires_created_by() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let api = ImportApi::new(&db_path).unwrap();
    let parsed = api.parse_csv(ROSTER, ImportKind::Athletes).await.unwrap();

    let err = api
        .commit(&CommitRequest {
            kind: ImportKind::Athletes,
            rows: parsed.rows,
            mapping: parsed.suggested_mappings,
            review_decisions: vec![],
            created_by: "   ".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));
}

#[test]
fn test_commit_request_defaults_review_decisions() {
    let request = CommitRequest {
        kind: ImportKind::Athletes,
        rows: vec![],
        mapping: vec![],
        review_decisions: vec![],
        created_by: "coach".to_string(),
    };
    let mut value = serde_json::to_value(&request).unwrap();
    value.as_object_mut().unwrap().remove("review_decisions");

    let back: CommitRequest = serde_json::from_value(value).unwrap();
    assert!(back.review_decisions.is_empty());
    assert_eq!(back.created_by, "coach");
}

#[tokio::test]
async fn test_full_review_flow_through_api() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let persons = PersonRepositoryImpl::new(&db_path).unwrap();
    let seeded = persons
        .create_person(&new_person("John", "Doe", Some("john@example.com"), None))
        .await
        .unwrap();
    let api = ImportApi::new(&db_path).unwrap();

    // === 第一次提交: John Doe 进入复核队列 ===
    let parsed = api.parse_csv(ROSTER, ImportKind::Athletes).await.unwrap();
    let request = CommitRequest {
        kind: ImportKind::Athletes,
        rows: parsed.rows.clone(),
        mapping: parsed.suggested_mappings.clone(),
        review_decisions: vec![],
        created_by: "coach".to_string(),
    };
    let first = api.commit(&request).await.unwrap();
    assert_eq!(first.summary.pending_review, 1);
    assert_eq!(first.summary.created, 2);
    assert_eq!(first.summary.errors, 1);
    assert_eq!(first.outcomes.len() + first.errors.len(), first.total_rows);

    let queue = api.list_review_queue(&ReviewFilter::default()).await.unwrap();
    assert_eq!(queue.len(), 1);
    let item = &queue[0];
    assert_eq!(item.batch_id, first.batch_id);
    assert_eq!(
        item.suggested_match.as_ref().map(|c| c.entity_id.as_str()),
        Some(seeded.person_id.as_str())
    );

    // === 复核决定 ===
    let decided = api.decide_review_item(&item.id, &approve("head-coach")).await.unwrap();
    assert_eq!(decided.status, ReviewStatus::Approved);
    assert_eq!(decided.review_notes.as_deref(), Some("same athlete"));

    let conflict = api.decide_review_item(&item.id, &approve("assistant")).await.unwrap_err();
    assert!(matches!(conflict, ApiError::Conflict(_)), "{conflict}");

    let missing = api.decide_review_item("no-such-item", &approve("head-coach")).await.unwrap_err();
    assert!(matches!(missing, ApiError::NotFound(_)));

    let blank = api.decide_review_item(&item.id, &approve(" ")).await.unwrap_err();
    assert!(matches!(blank, ApiError::InvalidInput(_)));

    assert!(api.list_review_queue(&ReviewFilter::default()).await.unwrap().is_empty());

    // === 第二次提交: 带复核引用,已新建的行改为匹配 ===
    let second = api
        .commit(&CommitRequest {
            review_decisions: vec![ReviewDecisionRef {
                row_index: item.row_index,
                review_item_id: item.id.clone(),
            }],
            ..request
        })
        .await
        .unwrap();

    let john = second.outcome_for(item.row_index).expect("john outcome");
    assert_eq!(john.action, ImportAction::Matched);
    assert_eq!(john.entity_id.as_deref(), Some(seeded.person_id.as_str()));
    assert_eq!(second.summary.matched, 3);
    assert_eq!(second.summary.created, 0);
    assert_eq!(persons.count_persons().unwrap(), 3);
}
