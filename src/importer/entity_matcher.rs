// ==========================================
// 运动员名册导入系统 - 实体匹配器
// ==========================================
// 阶段 4: 行身份 → 已有人员候选 + 处置状态
// 评分: 各命中信号权重累加,截断到 [0, 1]
// 处置:
// - 无候选高于下限 → WillCreate
// - 唯一高置信且领先次佳 ≥ margin → WillMatch
// - 其余 → Duplicate（交人工复核）
// 红线: 只读查询,不写实体存储；查找超时转为行级错误
// ==========================================

use crate::config::MatcherConfig;
use crate::domain::import_row::MappedRecord;
use crate::domain::person::{normalize_name, MatchingCriteria, PersonRecord};
use crate::domain::preview::{MatchCandidate, MatchOutcome};
use crate::domain::types::MatchStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::person_repo::PersonStore;
use chrono::Datelike;
use std::cmp::Ordering;
use std::time::Duration;

pub struct EntityMatcher {
    config: MatcherConfig,
    timeout: Duration,
}

impl EntityMatcher {
    pub fn new(config: MatcherConfig, timeout: Duration) -> Self {
        Self { config, timeout }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// 为一条已通过校验的记录查找候选并给出处置
    ///
    /// # 错误
    /// - Timeout: 存储查询超过配置的超时
    /// - 其他存储错误原样返回（调用方转为行级错误）
    pub async fn match_record<S>(&self, store: &S, record: &MappedRecord) -> RepositoryResult<MatchOutcome>
    where
        S: PersonStore + ?Sized,
    {
        let criteria = MatchingCriteria::from_record(record);
        if !criteria.is_searchable() {
            return Ok(MatchOutcome::will_create());
        }

        let persons = tokio::time::timeout(self.timeout, store.find_candidates(&criteria))
            .await
            .map_err(|_| RepositoryError::Timeout(self.timeout.as_millis() as u64))??;

        let scored: Vec<MatchCandidate> = persons
            .iter()
            .map(|p| score_candidate(&self.config, &criteria, p))
            .collect();
        let outcome = classify(&self.config, scored);

        tracing::debug!(
            status = %outcome.status,
            best = ?outcome.best.as_ref().map(|b| b.confidence),
            alternatives = outcome.alternatives.len(),
            "entity match resolved"
        );
        Ok(outcome)
    }
}

/// 四位小数
fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

fn same_name(a: Option<&str>, b: &str) -> bool {
    match a {
        Some(a) => {
            let a = normalize_name(a);
            !a.is_empty() && a == normalize_name(b)
        }
        None => false,
    }
}

/// 单个候选评分
///
/// 只加不减: 命中的信号越多,分数不会更低
pub fn score_candidate(config: &MatcherConfig, criteria: &MatchingCriteria, person: &PersonRecord) -> MatchCandidate {
    let w = &config.weights;
    let mut score: f64 = 0.0;
    let mut reasons: Vec<&str> = Vec::new();

    if same_name(criteria.first_name.as_deref(), &person.first_name) {
        score += w.first_name;
        reasons.push("first name");
    }
    if same_name(criteria.last_name.as_deref(), &person.last_name) {
        score += w.last_name;
        reasons.push("last name");
    }
    if criteria
        .emails
        .iter()
        .any(|e| person.emails.iter().any(|pe| pe.eq_ignore_ascii_case(e)))
    {
        score += w.email;
        reasons.push("email");
    }
    let person_birth_year = person.birth_year.or_else(|| person.birth_date.map(|d| d.year()));
    if criteria.birth_year.is_some() && criteria.birth_year == person_birth_year {
        score += w.birth_year;
        reasons.push("birth year");
    }
    if let Some(team) = criteria.team_name.as_deref() {
        let team = normalize_name(team);
        if !team.is_empty() && person.team_names.iter().any(|t| normalize_name(t) == team) {
            score += w.team;
            reasons.push("team");
        }
    }
    if criteria.gender.is_some() && criteria.gender == person.gender {
        score += w.gender;
        reasons.push("gender");
    }

    MatchCandidate {
        entity_id: person.person_id.clone(),
        display_name: person.display_name(),
        confidence: round4(score.clamp(0.0, 1.0)),
        reason: if reasons.is_empty() {
            "no identity field matched".to_string()
        } else {
            reasons.join(", ")
        },
        created_seq: person.created_seq,
    }
}

/// 候选排序: 置信度降序,同分按创建顺序升序
fn rank(a: &MatchCandidate, b: &MatchCandidate) -> Ordering {
    b.confidence
        .partial_cmp(&a.confidence)
        .unwrap_or(Ordering::Equal)
        .then(a.created_seq.cmp(&b.created_seq))
}

/// 根据已评分候选给出处置
pub fn classify(config: &MatcherConfig, scored: Vec<MatchCandidate>) -> MatchOutcome {
    let mut above: Vec<MatchCandidate> = scored
        .into_iter()
        .filter(|c| c.confidence > config.low_floor)
        .collect();
    if above.is_empty() {
        return MatchOutcome::will_create();
    }
    above.sort_by(rank);

    let best = above.remove(0);
    let clear_lead = match above.first() {
        Some(second) => round4(best.confidence - second.confidence) >= config.ambiguity_margin,
        None => true,
    };
    let status = if best.confidence >= config.high_confidence && clear_lead {
        MatchStatus::WillMatch
    } else {
        MatchStatus::Duplicate
    };

    MatchOutcome {
        status,
        best: Some(best),
        alternatives: above,
    }
}
