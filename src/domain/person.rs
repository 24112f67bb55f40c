// ==========================================
// 运动员名册导入系统 - 人员领域模型
// ==========================================
// 用途: 实体存储中的人员 / 测试成绩 / 匹配条件
// 红线: 导入层只通过 PersonStore 读写,不直接拼 SQL
// ==========================================

use crate::domain::import_row::MappedRecord;
use crate::domain::types::{Gender, MeasurementUnit, MetricType};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// 姓名比较口径: 去首尾空白 + 小写 + 折叠内部空白
pub fn normalize_name(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// ==========================================
// PersonRecord - 已存在的人员
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonRecord {
    pub person_id: String,
    pub first_name: String,
    pub last_name: String,
    pub emails: Vec<String>,
    pub phone_numbers: Vec<String>,
    pub birth_date: Option<NaiveDate>,
    pub birth_year: Option<i32>,
    pub gender: Option<Gender>,
    pub graduation_year: Option<i32>,
    pub sports: Option<String>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub school: Option<String>,
    pub competitive_level: Option<u8>,
    pub team_names: Vec<String>,
    /// 创建顺序（同分候选的确定性排序依据）
    pub created_seq: i64,
    pub created_at: DateTime<Utc>,
}

impl PersonRecord {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

// ==========================================
// NewPerson - 待新建人员
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPerson {
    pub first_name: String,
    pub last_name: String,
    pub emails: Vec<String>,
    pub phone_numbers: Vec<String>,
    pub birth_date: Option<NaiveDate>,
    pub birth_year: Option<i32>,
    pub gender: Option<Gender>,
    pub graduation_year: Option<i32>,
    pub sports: Option<String>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub school: Option<String>,
    pub competitive_level: Option<u8>,
    pub team_name: Option<String>,
    pub created_by: String,
}

impl NewPerson {
    pub fn from_record(record: &MappedRecord, created_by: &str) -> Self {
        Self {
            first_name: record.first_name.clone().unwrap_or_default(),
            last_name: record.last_name.clone().unwrap_or_default(),
            emails: record.emails.clone(),
            phone_numbers: record.phone_numbers.clone(),
            birth_date: record.birth_date,
            birth_year: record.effective_birth_year(),
            gender: record.gender,
            graduation_year: record.graduation_year,
            sports: record.sports.clone(),
            height: record.height,
            weight: record.weight,
            school: record.school.clone(),
            competitive_level: record.competitive_level,
            team_name: record.team_name.clone(),
            created_by: created_by.to_string(),
        }
    }
}

// ==========================================
// NewMeasurement - 待写入测试成绩（归属人员由写入方指定）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMeasurement {
    pub metric: MetricType,
    pub value: f64,
    pub units: MeasurementUnit,
    pub measured_on: NaiveDate,
    pub age: Option<i32>,
    pub fly_in_distance: Option<f64>,
    pub notes: Option<String>,
    pub team_name: Option<String>,
    pub created_by: String,
}

// ==========================================
// PersonWrite - 单行写入结果
// ==========================================
// 人员 / 邀请 / 成绩在同一事务内落库
#[derive(Debug, Clone, PartialEq)]
pub struct PersonWrite {
    pub person: PersonRecord,
    pub closed_invitations: usize,
    /// None: 本行不含成绩；Some(false): 同一成绩已存在,未写入
    pub measurement_inserted: Option<bool>,
}

// ==========================================
// MatchingCriteria - 身份匹配条件
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchingCriteria {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub emails: Vec<String>,
    pub birth_year: Option<i32>,
    pub team_name: Option<String>,
    pub gender: Option<Gender>,
}

impl MatchingCriteria {
    pub fn from_record(record: &MappedRecord) -> Self {
        Self {
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            emails: record.emails.iter().map(|e| e.to_lowercase()).collect(),
            birth_year: record.effective_birth_year(),
            team_name: record.team_name.clone(),
            gender: record.gender,
        }
    }

    /// 是否有可用于检索的身份信息
    pub fn is_searchable(&self) -> bool {
        self.first_name.is_some() || self.last_name.is_some() || !self.emails.is_empty()
    }
}
