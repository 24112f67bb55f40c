// ==========================================
// 运动员名册导入系统 - 人员存储实现
// ==========================================
// 职责: PersonStore 的 SQLite 实现
// 表: person / person_email / person_team / invitation / measurement
// ==========================================

use crate::db::{init_schema, open_sqlite_connection};
use crate::domain::person::{
    normalize_name, MatchingCriteria, NewMeasurement, NewPerson, PersonRecord, PersonWrite,
};
use crate::domain::types::Gender;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::person_repo::PersonStore;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// 单次粗筛的候选上限
const CANDIDATE_SCAN_LIMIT: i64 = 200;

const PERSON_COLUMNS: &str = "person_id, created_seq, first_name, last_name, phone_numbers_json, \
     birth_date, birth_year, gender, graduation_year, sports, height, weight, school, \
     competitive_level, created_at";

// ==========================================
// PersonRepositoryImpl
// ==========================================
pub struct PersonRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl PersonRepositoryImpl {
    /// 按路径打开数据库（自动建表）
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 与其他仓储共享连接
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 登记一条待处理邀请
    pub fn create_invitation(&self, email: &str, team_name: Option<&str>) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        let invitation_id = Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO invitation (invitation_id, email, team_name, status, created_at)
             VALUES (?1, ?2, ?3, 'PENDING', ?4)",
            params![invitation_id, email.trim().to_lowercase(), team_name, Utc::now()],
        )?;
        Ok(invitation_id)
    }

    pub fn invitation_status(&self, invitation_id: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let status = conn
            .query_row(
                "SELECT status FROM invitation WHERE invitation_id = ?1",
                params![invitation_id],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(status)
    }

    pub fn count_persons(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM person", [], |row| row.get(0))?)
    }

    pub fn count_measurements(&self, person_id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM measurement WHERE person_id = ?1",
            params![person_id],
            |row| row.get(0),
        )?)
    }
}

#[async_trait]
impl PersonStore for PersonRepositoryImpl {
    async fn find_candidates(&self, criteria: &MatchingCriteria) -> RepositoryResult<Vec<PersonRecord>> {
        let conn = self.get_conn()?;
        let mut ids: BTreeSet<String> = BTreeSet::new();

        let first = criteria.first_name.as_deref().map(normalize_name);
        let last = criteria.last_name.as_deref().map(normalize_name);

        // 全名命中不受粗筛上限影响（同名常见时仍能找到本人）
        if let (Some(first), Some(last)) = (first.as_deref(), last.as_deref()) {
            let mut stmt = conn.prepare(
                "SELECT person_id FROM person
                 WHERE first_name_norm = ?1 AND last_name_norm = ?2
                 ORDER BY created_seq",
            )?;
            let rows = stmt.query_map(params![first, last], |row| row.get::<_, String>(0))?;
            for id in rows {
                ids.insert(id?);
            }
        }

        if first.is_some() || last.is_some() {
            let mut stmt = conn.prepare(
                "SELECT person_id FROM person
                 WHERE last_name_norm = ?1 OR first_name_norm = ?2
                 ORDER BY created_seq LIMIT ?3",
            )?;
            let rows = stmt.query_map(params![last, first, CANDIDATE_SCAN_LIMIT], |row| {
                row.get::<_, String>(0)
            })?;
            for id in rows {
                ids.insert(id?);
            }
        }

        if !criteria.emails.is_empty() {
            let placeholders = vec!["?"; criteria.emails.len()].join(", ");
            let sql = format!(
                "SELECT person_id FROM person_email WHERE email IN ({})",
                placeholders
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(criteria.emails.iter()), |row| {
                row.get::<_, String>(0)
            })?;
            for id in rows {
                ids.insert(id?);
            }
        }

        let mut candidates = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(person) = load_person(&conn, &id)? {
                candidates.push(person);
            }
        }
        candidates.sort_by_key(|p| p.created_seq);

        tracing::debug!(candidates = candidates.len(), "candidate scan complete");
        Ok(candidates)
    }

    async fn get_person(&self, person_id: &str) -> RepositoryResult<Option<PersonRecord>> {
        let conn = self.get_conn()?;
        load_person(&conn, person_id)
    }

    async fn create_person(&self, person: &NewPerson) -> RepositoryResult<PersonRecord> {
        let mut conn = self.get_conn()?;
        let person_id = {
            let tx = conn.transaction()?;
            let person_id = insert_person(&tx, person)?;
            tx.commit()?;
            person_id
        };

        tracing::info!(person_id = %person_id, "person created");
        load_person(&conn, &person_id)?.ok_or_else(|| RepositoryError::not_found("person", person_id))
    }

    async fn merge_into_person(&self, person_id: &str, incoming: &NewPerson) -> RepositoryResult<PersonRecord> {
        let mut conn = self.get_conn()?;
        {
            let tx = conn.transaction()?;
            merge_person(&tx, person_id, incoming)?;
            tx.commit()?;
        }

        load_person(&conn, person_id)?.ok_or_else(|| RepositoryError::not_found("person", person_id))
    }

    async fn record_new_person(
        &self,
        person: &NewPerson,
        measurement: Option<&NewMeasurement>,
    ) -> RepositoryResult<PersonWrite> {
        let mut conn = self.get_conn()?;
        let (person_id, measurement_inserted) = {
            let tx = conn.transaction()?;
            let person_id = insert_person(&tx, person)?;
            let inserted = measurement
                .map(|m| insert_measurement(&tx, &person_id, m))
                .transpose()?;
            tx.commit()?;
            (person_id, inserted)
        };

        tracing::info!(person_id = %person_id, ?measurement_inserted, "person created");
        let person = load_person(&conn, &person_id)?.ok_or_else(|| RepositoryError::not_found("person", person_id))?;
        Ok(PersonWrite {
            person,
            closed_invitations: 0,
            measurement_inserted,
        })
    }

    async fn record_matched_person(
        &self,
        person_id: &str,
        incoming: &NewPerson,
        measurement: Option<&NewMeasurement>,
    ) -> RepositoryResult<PersonWrite> {
        let mut conn = self.get_conn()?;
        let (closed_invitations, measurement_inserted) = {
            let tx = conn.transaction()?;
            merge_person(&tx, person_id, incoming)?;

            // 行内邮箱与人员已登记邮箱都用于关闭邀请
            let mut stmt = tx.prepare("SELECT email FROM person_email WHERE person_id = ?1")?;
            let mut emails = stmt
                .query_map(params![person_id], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            drop(stmt);
            emails.extend(incoming.emails.iter().cloned());

            let closed = close_invitations(&tx, person_id, &emails)?;
            let inserted = measurement
                .map(|m| insert_measurement(&tx, person_id, m))
                .transpose()?;
            tx.commit()?;
            (closed, inserted)
        };

        if closed_invitations > 0 {
            tracing::info!(person_id = %person_id, closed = closed_invitations, "pending invitations closed");
        }
        let person = load_person(&conn, person_id)?.ok_or_else(|| RepositoryError::not_found("person", person_id))?;
        Ok(PersonWrite {
            person,
            closed_invitations,
            measurement_inserted,
        })
    }
}

// ==========================================
// 事务内写入步骤（调用方负责提交）
// ==========================================

fn insert_person(conn: &Connection, person: &NewPerson) -> RepositoryResult<String> {
    let person_id = Uuid::new_v4().to_string();
    let seq: i64 = conn.query_row(
        "SELECT COALESCE(MAX(created_seq), 0) + 1 FROM person",
        [],
        |row| row.get(0),
    )?;

    conn.execute(
        r#"
        INSERT INTO person (
            person_id, created_seq, first_name, last_name, first_name_norm, last_name_norm,
            phone_numbers_json, birth_date, birth_year, gender, graduation_year, sports,
            height, weight, school, competitive_level, created_by, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
        "#,
        params![
            person_id,
            seq,
            person.first_name.trim(),
            person.last_name.trim(),
            normalize_name(&person.first_name),
            normalize_name(&person.last_name),
            serde_json::to_string(&person.phone_numbers)?,
            person.birth_date,
            person.birth_year,
            person.gender.map(|g| g.as_str()),
            person.graduation_year,
            person.sports,
            person.height,
            person.weight,
            person.school,
            person.competitive_level,
            person.created_by,
            Utc::now(),
        ],
    )?;

    for email in unique_lowercase(&person.emails) {
        conn.execute(
            "INSERT INTO person_email (email, person_id) VALUES (?1, ?2)",
            params![email, person_id],
        )?;
    }

    if let Some(team) = person.team_name.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        conn.execute(
            "INSERT OR IGNORE INTO person_team (person_id, team_name) VALUES (?1, ?2)",
            params![person_id, team],
        )?;
    }

    Ok(person_id)
}

fn merge_person(conn: &Connection, person_id: &str, incoming: &NewPerson) -> RepositoryResult<()> {
    let phones_json: Option<String> = conn
        .query_row(
            "SELECT phone_numbers_json FROM person WHERE person_id = ?1",
            params![person_id],
            |row| row.get(0),
        )
        .optional()?;
    let phones_json = phones_json.ok_or_else(|| RepositoryError::not_found("person", person_id))?;

    let mut phones: Vec<String> = serde_json::from_str(&phones_json)?;
    for phone in &incoming.phone_numbers {
        if !phones.contains(phone) {
            phones.push(phone.clone());
        }
    }

    conn.execute(
        r#"
        UPDATE person SET
            phone_numbers_json = ?2,
            birth_date = COALESCE(birth_date, ?3),
            birth_year = COALESCE(birth_year, ?4),
            gender = COALESCE(gender, ?5),
            graduation_year = COALESCE(graduation_year, ?6),
            sports = COALESCE(sports, ?7),
            height = COALESCE(height, ?8),
            weight = COALESCE(weight, ?9),
            school = COALESCE(school, ?10),
            competitive_level = COALESCE(competitive_level, ?11)
        WHERE person_id = ?1
        "#,
        params![
            person_id,
            serde_json::to_string(&phones)?,
            incoming.birth_date,
            incoming.birth_year,
            incoming.gender.map(|g| g.as_str()),
            incoming.graduation_year,
            incoming.sports,
            incoming.height,
            incoming.weight,
            incoming.school,
            incoming.competitive_level,
        ],
    )?;

    // 已归属其他人员的邮箱保持原归属
    for email in unique_lowercase(&incoming.emails) {
        conn.execute(
            "INSERT OR IGNORE INTO person_email (email, person_id) VALUES (?1, ?2)",
            params![email, person_id],
        )?;
    }

    if let Some(team) = incoming.team_name.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        conn.execute(
            "INSERT OR IGNORE INTO person_team (person_id, team_name) VALUES (?1, ?2)",
            params![person_id, team],
        )?;
    }
    Ok(())
}

fn close_invitations(conn: &Connection, person_id: &str, emails: &[String]) -> RepositoryResult<usize> {
    let emails = unique_lowercase(emails);
    if emails.is_empty() {
        return Ok(0);
    }

    let placeholders = vec!["?"; emails.len()].join(", ");
    let sql = format!(
        "UPDATE invitation SET status = 'CLOSED', closed_at = ?, closed_by_person_id = ?
         WHERE status = 'PENDING' AND email IN ({})",
        placeholders
    );

    let mut values: Vec<String> = vec![Utc::now().to_rfc3339(), person_id.to_string()];
    values.extend(emails);
    Ok(conn.execute(&sql, params_from_iter(values.iter()))?)
}

/// 返回 false 表示同一成绩（人员/项目/日期/数值）已存在
fn insert_measurement(conn: &Connection, person_id: &str, measurement: &NewMeasurement) -> RepositoryResult<bool> {
    let affected = conn.execute(
        r#"
        INSERT OR IGNORE INTO measurement (
            measurement_id, person_id, metric, value, units, measured_on, age,
            fly_in_distance, notes, team_name, created_by, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
        params![
            Uuid::new_v4().to_string(),
            person_id,
            measurement.metric.as_str(),
            measurement.value,
            measurement.units.as_str(),
            measurement.measured_on,
            measurement.age,
            measurement.fly_in_distance,
            measurement.notes,
            measurement.team_name,
            measurement.created_by,
            Utc::now(),
        ],
    )?;
    Ok(affected == 1)
}

fn unique_lowercase(values: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    values
        .iter()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty() && seen.insert(v.clone()))
        .collect()
}

fn load_person(conn: &Connection, person_id: &str) -> RepositoryResult<Option<PersonRecord>> {
    let sql = format!("SELECT {} FROM person WHERE person_id = ?1", PERSON_COLUMNS);
    let person = conn
        .query_row(&sql, params![person_id], map_person_row)
        .optional()?;

    let Some(mut person) = person else {
        return Ok(None);
    };

    let mut stmt = conn.prepare("SELECT email FROM person_email WHERE person_id = ?1 ORDER BY rowid")?;
    person.emails = stmt
        .query_map(params![person_id], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut stmt = conn.prepare("SELECT team_name FROM person_team WHERE person_id = ?1 ORDER BY rowid")?;
    person.team_names = stmt
        .query_map(params![person_id], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(Some(person))
}

fn map_person_row(row: &Row) -> rusqlite::Result<PersonRecord> {
    let phones_json: String = row.get(4)?;
    let phone_numbers: Vec<String> = serde_json::from_str(&phones_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let gender: Option<String> = row.get(7)?;

    Ok(PersonRecord {
        person_id: row.get(0)?,
        created_seq: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        emails: Vec::new(),
        phone_numbers,
        birth_date: row.get::<_, Option<NaiveDate>>(5)?,
        birth_year: row.get(6)?,
        gender: gender.as_deref().and_then(Gender::parse),
        graduation_year: row.get(8)?,
        sports: row.get(9)?,
        height: row.get(10)?,
        weight: row.get(11)?,
        school: row.get(12)?,
        competitive_level: row.get(13)?,
        team_names: Vec::new(),
        created_at: row.get::<_, DateTime<Utc>>(14)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{MeasurementUnit, MetricType};

    fn repo() -> PersonRepositoryImpl {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        PersonRepositoryImpl::from_connection(Arc::new(Mutex::new(conn)))
    }

    fn new_person(first: &str, last: &str, email: Option<&str>) -> NewPerson {
        NewPerson {
            first_name: first.to_string(),
            last_name: last.to_string(),
            emails: email.map(|e| vec![e.to_string()]).unwrap_or_default(),
            phone_numbers: vec![],
            birth_date: None,
            birth_year: Some(2008),
            gender: Some(Gender::Male),
            graduation_year: None,
            sports: None,
            height: None,
            weight: None,
            school: None,
            competitive_level: None,
            team_name: Some("Varsity".to_string()),
            created_by: "test".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_find_by_name_and_email() {
        let repo = repo();
        let john = repo
            .create_person(&new_person("John", "Doe", Some("John@Example.com")))
            .await
            .unwrap();
        assert_eq!(john.created_seq, 1);
        assert_eq!(john.emails, vec!["john@example.com"]);
        assert_eq!(john.team_names, vec!["Varsity"]);

        let by_name = repo
            .find_candidates(&MatchingCriteria {
                last_name: Some(" doe ".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_name.len(), 1);

        let by_email = repo
            .find_candidates(&MatchingCriteria {
                first_name: Some("Nobody".to_string()),
                emails: vec!["john@example.com".to_string()],
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_email[0].person_id, john.person_id);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_constraint_violation() {
        let repo = repo();
        repo.create_person(&new_person("A", "One", Some("same@x.io"))).await.unwrap();
        let err = repo
            .create_person(&new_person("B", "Two", Some("same@x.io")))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));
        assert_eq!(repo.count_persons().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_merge_is_idempotent_and_fills_gaps() {
        let repo = repo();
        let mut base = new_person("Ann", "Lee", None);
        base.school = None;
        let ann = repo.create_person(&base).await.unwrap();

        let mut incoming = new_person("Ann", "Lee", Some("ann@lee.org"));
        incoming.school = Some("North High".to_string());
        incoming.birth_year = Some(1999);
        incoming.phone_numbers = vec!["5551234567".to_string()];

        let once = repo.merge_into_person(&ann.person_id, &incoming).await.unwrap();
        let twice = repo.merge_into_person(&ann.person_id, &incoming).await.unwrap();

        assert_eq!(once, twice);
        assert_eq!(twice.school.as_deref(), Some("North High"));
        // 已有值不被覆盖
        assert_eq!(twice.birth_year, Some(2008));
        assert_eq!(twice.phone_numbers, vec!["5551234567"]);
        assert_eq!(twice.emails, vec!["ann@lee.org"]);
    }

    #[tokio::test]
    async fn test_merge_unknown_person_is_not_found() {
        let repo = repo();
        let err = repo
            .merge_into_person("missing", &new_person("X", "Y", None))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }

    fn measurement(value: f64) -> NewMeasurement {
        NewMeasurement {
            metric: MetricType::Fly10Time,
            value,
            units: MeasurementUnit::Seconds,
            measured_on: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            age: None,
            fly_in_distance: None,
            notes: None,
            team_name: None,
            created_by: "test".to_string(),
        }
    }

    fn reject_measurement_inserts(repo: &PersonRepositoryImpl) {
        repo.get_conn()
            .unwrap()
            .execute_batch(
                "CREATE TRIGGER reject_measurement BEFORE INSERT ON measurement
                 BEGIN SELECT RAISE(ABORT, 'measurement rejected'); END;",
            )
            .unwrap();
    }

    #[tokio::test]
    async fn test_matched_person_closes_pending_invitations() {
        let repo = repo();
        let p = repo.create_person(&new_person("Kim", "Park", None)).await.unwrap();
        let inv = repo.create_invitation("kim@park.io", Some("Varsity")).unwrap();

        let write = repo
            .record_matched_person(&p.person_id, &new_person("Kim", "Park", Some("KIM@park.io")), None)
            .await
            .unwrap();
        assert_eq!(write.closed_invitations, 1);
        assert_eq!(write.measurement_inserted, None);
        assert_eq!(write.person.emails, vec!["kim@park.io"]);
        assert_eq!(repo.invitation_status(&inv).unwrap().as_deref(), Some("CLOSED"));

        let again = repo
            .record_matched_person(&p.person_id, &new_person("Kim", "Park", None), None)
            .await
            .unwrap();
        assert_eq!(again.closed_invitations, 0);
    }

    #[tokio::test]
    async fn test_same_measurement_is_reported_not_inserted() {
        let repo = repo();
        let write = repo
            .record_new_person(&new_person("Ann", "Lee", None), Some(&measurement(1.31)))
            .await
            .unwrap();
        assert_eq!(write.measurement_inserted, Some(true));

        let again = repo
            .record_matched_person(&write.person.person_id, &new_person("Ann", "Lee", None), Some(&measurement(1.31)))
            .await
            .unwrap();
        assert_eq!(again.measurement_inserted, Some(false));
        assert_eq!(repo.count_measurements(&write.person.person_id).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failed_measurement_rolls_back_new_person() {
        let repo = repo();
        reject_measurement_inserts(&repo);

        let err = repo
            .record_new_person(&new_person("Ann", "Lee", Some("ann@lee.io")), Some(&measurement(1.31)))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::DatabaseQueryError(ref msg) if msg.contains("measurement rejected")));
        assert_eq!(repo.count_persons().unwrap(), 0);

        // 邮箱未被占用,后续可正常新建
        repo.create_person(&new_person("Ann", "Lee", Some("ann@lee.io"))).await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_measurement_rolls_back_merge_and_invitation_close() {
        let repo = repo();
        let p = repo.create_person(&new_person("Kim", "Park", None)).await.unwrap();
        let inv = repo.create_invitation("kim@park.io", None).unwrap();
        reject_measurement_inserts(&repo);

        let mut incoming = new_person("Kim", "Park", Some("kim@park.io"));
        incoming.school = Some("North High".to_string());
        repo.record_matched_person(&p.person_id, &incoming, Some(&measurement(1.4)))
            .await
            .unwrap_err();

        let stored = repo.get_person(&p.person_id).await.unwrap().unwrap();
        assert_eq!(stored, p);
        assert_eq!(repo.invitation_status(&inv).unwrap().as_deref(), Some("PENDING"));
    }

    #[tokio::test]
    async fn test_full_name_found_behind_many_shared_first_names() {
        let repo = repo();
        for n in 0..CANDIDATE_SCAN_LIMIT {
            repo.create_person(&new_person("John", &format!("Other{}", n), None))
                .await
                .unwrap();
        }
        let doe = repo.create_person(&new_person("John", "Doe", None)).await.unwrap();

        let found = repo
            .find_candidates(&MatchingCriteria {
                first_name: Some("John".to_string()),
                last_name: Some("Doe".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(found.iter().any(|p| p.person_id == doe.person_id));
    }
}
