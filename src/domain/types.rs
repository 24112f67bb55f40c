// ==========================================
// 运动员名册导入系统 - 领域类型定义
// ==========================================
// 职责: 导入类型 / 系统字段 / 处置状态 / 枚举值域
// 约束: 所有处置状态为封闭枚举,消费方必须穷举处理
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 导入类型 (Import Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    Athletes,     // 运动员名册
    Measurements, // 测试成绩
}

impl ImportKind {
    /// 该导入类型可映射的系统字段（顺序即列名自动识别的优先级）
    pub fn system_fields(&self) -> &'static [SystemField] {
        use SystemField::*;
        match self {
            ImportKind::Athletes => &[
                FirstName,
                LastName,
                BirthDate,
                BirthYear,
                GraduationYear,
                Gender,
                Emails,
                PhoneNumbers,
                ContactInfo,
                Sports,
                Height,
                Weight,
                School,
                TeamName,
                CompetitiveLevel,
            ],
            ImportKind::Measurements => &[
                FirstName,
                LastName,
                Gender,
                TeamName,
                Emails,
                BirthYear,
                Date,
                Age,
                Metric,
                Value,
                Units,
                FlyInDistance,
                Notes,
            ],
        }
    }

    /// 必填系统字段（未映射时禁止提交，但预览照常进行）
    pub fn required_fields(&self) -> &'static [SystemField] {
        use SystemField::*;
        match self {
            ImportKind::Athletes => &[FirstName, LastName],
            ImportKind::Measurements => &[FirstName, LastName, Metric, Value],
        }
    }

    pub fn is_required(&self, field: SystemField) -> bool {
        self.required_fields().contains(&field)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImportKind::Athletes => "ATHLETES",
            ImportKind::Measurements => "MEASUREMENTS",
        }
    }

    pub fn parse(s: &str) -> Option<ImportKind> {
        match s.trim().to_uppercase().as_str() {
            "ATHLETES" | "ATHLETE" | "ROSTER" => Some(ImportKind::Athletes),
            "MEASUREMENTS" | "MEASUREMENT" => Some(ImportKind::Measurements),
            _ => None,
        }
    }
}

impl fmt::Display for ImportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 系统字段 (System Field)
// ==========================================
// 序列化格式: camelCase（与上传模板列名一致）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SystemField {
    FirstName,
    LastName,
    BirthDate,
    BirthYear,
    GraduationYear,
    Gender,
    Emails,
    PhoneNumbers,
    ContactInfo,
    Sports,
    Height,
    Weight,
    School,
    TeamName,
    CompetitiveLevel,
    Date,
    Age,
    Metric,
    Value,
    Units,
    FlyInDistance,
    Notes,
}

impl SystemField {
    /// 字段键（与序列化格式一致）
    pub fn key(&self) -> &'static str {
        match self {
            SystemField::FirstName => "firstName",
            SystemField::LastName => "lastName",
            SystemField::BirthDate => "birthDate",
            SystemField::BirthYear => "birthYear",
            SystemField::GraduationYear => "graduationYear",
            SystemField::Gender => "gender",
            SystemField::Emails => "emails",
            SystemField::PhoneNumbers => "phoneNumbers",
            SystemField::ContactInfo => "contactInfo",
            SystemField::Sports => "sports",
            SystemField::Height => "height",
            SystemField::Weight => "weight",
            SystemField::School => "school",
            SystemField::TeamName => "teamName",
            SystemField::CompetitiveLevel => "competitiveLevel",
            SystemField::Date => "date",
            SystemField::Age => "age",
            SystemField::Metric => "metric",
            SystemField::Value => "value",
            SystemField::Units => "units",
            SystemField::FlyInDistance => "flyInDistance",
            SystemField::Notes => "notes",
        }
    }

    /// 面向用户的字段名（错误消息使用）
    pub fn label(&self) -> &'static str {
        match self {
            SystemField::FirstName => "First name",
            SystemField::LastName => "Last name",
            SystemField::BirthDate => "Birth date",
            SystemField::BirthYear => "Birth year",
            SystemField::GraduationYear => "Graduation year",
            SystemField::Gender => "Gender",
            SystemField::Emails => "Email",
            SystemField::PhoneNumbers => "Phone number",
            SystemField::ContactInfo => "Contact info",
            SystemField::Sports => "Sports",
            SystemField::Height => "Height",
            SystemField::Weight => "Weight",
            SystemField::School => "School",
            SystemField::TeamName => "Team name",
            SystemField::CompetitiveLevel => "Competitive level",
            SystemField::Date => "Date",
            SystemField::Age => "Age",
            SystemField::Metric => "Metric",
            SystemField::Value => "Value",
            SystemField::Units => "Units",
            SystemField::FlyInDistance => "Fly-in distance",
            SystemField::Notes => "Notes",
        }
    }

    pub fn from_key(key: &str) -> Option<SystemField> {
        ALL_SYSTEM_FIELDS.iter().copied().find(|f| f.key() == key)
    }

    /// 联系方式类字段（参与智能归位）
    pub fn is_contact(&self) -> bool {
        matches!(
            self,
            SystemField::Emails | SystemField::PhoneNumbers | SystemField::ContactInfo
        )
    }
}

const ALL_SYSTEM_FIELDS: [SystemField; 22] = [
    SystemField::FirstName,
    SystemField::LastName,
    SystemField::BirthDate,
    SystemField::BirthYear,
    SystemField::GraduationYear,
    SystemField::Gender,
    SystemField::Emails,
    SystemField::PhoneNumbers,
    SystemField::ContactInfo,
    SystemField::Sports,
    SystemField::Height,
    SystemField::Weight,
    SystemField::School,
    SystemField::TeamName,
    SystemField::CompetitiveLevel,
    SystemField::Date,
    SystemField::Age,
    SystemField::Metric,
    SystemField::Value,
    SystemField::Units,
    SystemField::FlyInDistance,
    SystemField::Notes,
];

impl fmt::Display for SystemField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

// ==========================================
// 行处置状态 (Match Status)
// ==========================================
// 红线: 每行恰好一个处置状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    WillCreate, // 无匹配,将新建
    WillMatch,  // 高置信唯一匹配
    Duplicate,  // 疑似重复,需人工复核
    Error,      // 校验失败,不参与匹配
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchStatus::WillCreate => write!(f, "will_create"),
            MatchStatus::WillMatch => write!(f, "will_match"),
            MatchStatus::Duplicate => write!(f, "duplicate"),
            MatchStatus::Error => write!(f, "error"),
        }
    }
}

// ==========================================
// 字段校验级别
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Valid,
    Warning,
    Error,
}

// ==========================================
// 测试项目 (Metric)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricType {
    TopSpeed,
    #[serde(rename = "FLY10_TIME")]
    Fly10Time,
    VerticalJump,
    #[serde(rename = "AGILITY_505")]
    Agility505,
    Rsi,
    TTest,
}

impl MetricType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::TopSpeed => "TOP_SPEED",
            MetricType::Fly10Time => "FLY10_TIME",
            MetricType::VerticalJump => "VERTICAL_JUMP",
            MetricType::Agility505 => "AGILITY_505",
            MetricType::Rsi => "RSI",
            MetricType::TTest => "T_TEST",
        }
    }

    pub fn parse(s: &str) -> Option<MetricType> {
        match s.trim().to_uppercase().as_str() {
            "TOP_SPEED" => Some(MetricType::TopSpeed),
            "FLY10_TIME" => Some(MetricType::Fly10Time),
            "VERTICAL_JUMP" => Some(MetricType::VerticalJump),
            "AGILITY_505" => Some(MetricType::Agility505),
            "RSI" => Some(MetricType::Rsi),
            "T_TEST" => Some(MetricType::TTest),
            _ => None,
        }
    }

    /// 标准单位
    pub fn canonical_unit(&self) -> MeasurementUnit {
        match self {
            MetricType::TopSpeed => MeasurementUnit::Mph,
            MetricType::Fly10Time | MetricType::Agility505 | MetricType::TTest => {
                MeasurementUnit::Seconds
            }
            MetricType::VerticalJump => MeasurementUnit::Inches,
            MetricType::Rsi => MeasurementUnit::Unitless,
        }
    }

    /// 合理取值区间（标准单位下,超出只告警）
    pub fn plausible_range(&self) -> (f64, f64) {
        match self {
            MetricType::TopSpeed => (5.0, 30.0),
            MetricType::Fly10Time => (1.0, 1.7),
            MetricType::VerticalJump => (12.0, 32.0),
            MetricType::Agility505 => (2.1, 3.5),
            MetricType::Rsi => (1.0, 4.5),
            MetricType::TTest => (7.5, 13.5),
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 计量单位
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeasurementUnit {
    #[serde(rename = "s")]
    Seconds,
    #[serde(rename = "in")]
    Inches,
    #[serde(rename = "cm")]
    Centimeters,
    #[serde(rename = "mph")]
    Mph,
    #[serde(rename = "m/s")]
    MetersPerSecond,
    #[serde(rename = "ft")]
    Feet,
    #[serde(rename = "")]
    Unitless,
}

impl MeasurementUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeasurementUnit::Seconds => "s",
            MeasurementUnit::Inches => "in",
            MeasurementUnit::Centimeters => "cm",
            MeasurementUnit::Mph => "mph",
            MeasurementUnit::MetersPerSecond => "m/s",
            MeasurementUnit::Feet => "ft",
            MeasurementUnit::Unitless => "",
        }
    }

    pub fn parse(s: &str) -> Option<MeasurementUnit> {
        match s.trim().to_lowercase().as_str() {
            "s" | "sec" | "secs" | "seconds" => Some(MeasurementUnit::Seconds),
            "in" | "inch" | "inches" => Some(MeasurementUnit::Inches),
            "cm" => Some(MeasurementUnit::Centimeters),
            "mph" => Some(MeasurementUnit::Mph),
            "m/s" | "mps" => Some(MeasurementUnit::MetersPerSecond),
            "ft" | "feet" => Some(MeasurementUnit::Feet),
            "" => Some(MeasurementUnit::Unitless),
            _ => None,
        }
    }
}

// ==========================================
// 性别
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    #[serde(rename = "Not Specified")]
    NotSpecified,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::NotSpecified => "Not Specified",
        }
    }

    pub fn parse(s: &str) -> Option<Gender> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" => Some(Gender::Male),
            "female" | "f" => Some(Gender::Female),
            "not specified" | "unspecified" | "x" => Some(Gender::NotSpecified),
            _ => None,
        }
    }
}

// ==========================================
// 复核项状态
// ==========================================
// 状态机: PENDING → APPROVED | REJECTED（终态不可再流转）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "PENDING",
            ReviewStatus::Approved => "APPROVED",
            ReviewStatus::Rejected => "REJECTED",
        }
    }

    pub fn parse(s: &str) -> Option<ReviewStatus> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Some(ReviewStatus::Pending),
            "APPROVED" => Some(ReviewStatus::Approved),
            "REJECTED" => Some(ReviewStatus::Rejected),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReviewStatus::Pending)
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 提交动作 (Import Action)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportAction {
    Created,
    Matched,
    MatchedAndDeactivated,
    PendingReview,
}

impl fmt::Display for ImportAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportAction::Created => write!(f, "created"),
            ImportAction::Matched => write!(f, "matched"),
            ImportAction::MatchedAndDeactivated => write!(f, "matched_and_deactivated"),
            ImportAction::PendingReview => write!(f, "pending_review"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_fields_are_system_fields() {
        for kind in [ImportKind::Athletes, ImportKind::Measurements] {
            for field in kind.required_fields() {
                assert!(kind.system_fields().contains(field), "{:?} {:?}", kind, field);
            }
        }
    }

    #[test]
    fn test_system_field_key_matches_serde() {
        let json = serde_json::to_string(&SystemField::PhoneNumbers).unwrap();
        assert_eq!(json, "\"phoneNumbers\"");
        assert_eq!(SystemField::from_key("flyInDistance"), Some(SystemField::FlyInDistance));
        assert_eq!(SystemField::from_key("nope"), None);
    }

    #[test]
    fn test_match_status_serde_snake_case() {
        let json = serde_json::to_string(&MatchStatus::WillCreate).unwrap();
        assert_eq!(json, "\"will_create\"");
    }

    #[test]
    fn test_metric_parse_case_insensitive() {
        assert_eq!(MetricType::parse("top_speed"), Some(MetricType::TopSpeed));
        assert_eq!(MetricType::parse(" FLY10_TIME "), Some(MetricType::Fly10Time));
        assert_eq!(MetricType::parse("BENCH"), None);
        assert_eq!(
            serde_json::to_string(&MetricType::Agility505).unwrap(),
            "\"AGILITY_505\""
        );
    }

    #[test]
    fn test_review_status_terminal() {
        assert!(!ReviewStatus::Pending.is_terminal());
        assert!(ReviewStatus::Approved.is_terminal());
        assert_eq!(ReviewStatus::parse("rejected"), Some(ReviewStatus::Rejected));
        assert_eq!(ReviewStatus::parse(" pending"), Some(ReviewStatus::Pending));
        // 未知状态不能回落为 PENDING（否则已决项会被重新打开）
        assert_eq!(ReviewStatus::parse("ARCHIVED"), None);
        assert_eq!(ReviewStatus::parse(""), None);
    }
}
