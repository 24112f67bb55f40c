// ==========================================
// 运动员名册导入系统 - 行校验器实现
// ==========================================
// 阶段 3: 结构/业务规则校验（不依赖已有数据）
// - 必填、日期格式、数值区间、枚举成员
// - 联系方式智能归位（邮箱/电话放错列时移动并告警）
// - 跨字段一致性（毕业年份、成绩合理区间、单位）
// 红线: 从不失败；无法解析的值产生 error 级校验结果
// ==========================================

use crate::config::ValidationRanges;
use crate::domain::import_row::{FieldMapping, FieldValidation, MappedRecord, RawRow, RowIndex};
use crate::domain::types::{Gender, ImportKind, MeasurementUnit, MetricType, SystemField};
use crate::importer::importer_trait::{RowValidator, ValidatedRow};
use chrono::{Datelike, NaiveDate, Utc};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid regex"));

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+'\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
        .expect("valid regex")
});

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9()\-.\s]+$").expect("valid regex"));

static CONTACT_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[;,|]+").expect("valid regex"));

const PHONE_DIGITS: std::ops::RangeInclusive<usize> = 7..=15;

/// 毕业年份与 出生年份+18 的容许偏差
const GRADUATION_TOLERANCE_YEARS: i32 = 2;
const GRADUATION_AGE: i32 = 18;

// ==========================================
// RowValidatorImpl
// ==========================================
pub struct RowValidatorImpl {
    ranges: ValidationRanges,
    /// 固定"今天"（测试用）；None 时取 UTC 当天
    today: Option<NaiveDate>,
}

impl RowValidatorImpl {
    pub fn new(ranges: ValidationRanges) -> Self {
        Self { ranges, today: None }
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Utc::now().date_naive())
    }
}

impl Default for RowValidatorImpl {
    fn default() -> Self {
        Self::new(ValidationRanges::default())
    }
}

impl RowValidator for RowValidatorImpl {
    fn validate_and_normalize(
        &self,
        row: &RawRow,
        mapping: &[FieldMapping],
        kind: ImportKind,
    ) -> ValidatedRow {
        let mut check = RowCheck::new(row.index);
        let mut record = MappedRecord::for_kind(kind);
        let mut contacts = ContactSorter::default();

        let applicable: Vec<&FieldMapping> = mapping
            .iter()
            .filter(|m| kind.system_fields().contains(&m.system_field))
            .collect();

        // 未映射列原样保留
        let mapped_columns: HashSet<&str> =
            applicable.iter().map(|m| m.source_column.as_str()).collect();
        for (column, value) in &row.values {
            if !mapped_columns.contains(column.as_str()) && !value.is_empty() {
                record.extras.insert(column.clone(), value.clone());
            }
        }

        // 必填字段未映射: 每行都报错,预览仍可生成
        for field in kind.required_fields() {
            if !applicable.iter().any(|m| m.system_field == *field) {
                check.error(*field, format!("{} is required", field.label()));
            }
        }

        for m in &applicable {
            let field = m.system_field;
            let raw = row.get(&m.source_column).unwrap_or("").trim();

            if field.is_contact() {
                contacts.scan(field, raw);
                continue;
            }
            if raw.is_empty() {
                if kind.is_required(field) {
                    check.error(field, format!("{} is required", field.label()));
                }
                continue;
            }
            self.check_field(&mut check, &mut record, field, raw);
        }

        contacts.apply(&mut check, &mut record);
        self.check_cross_field(&mut check, &record);

        ValidatedRow {
            record,
            validations: check.into_validations(),
        }
    }
}

impl RowValidatorImpl {
    fn check_field(&self, check: &mut RowCheck, record: &mut MappedRecord, field: SystemField, raw: &str) {
        let r = self.ranges;
        match field {
            SystemField::FirstName => {
                record.first_name = Some(raw.to_string());
                check.valid(field);
            }
            SystemField::LastName => {
                record.last_name = Some(raw.to_string());
                check.valid(field);
            }
            SystemField::TeamName => {
                record.team_name = Some(raw.to_string());
                check.valid(field);
            }
            SystemField::School => {
                record.school = Some(raw.to_string());
                check.valid(field);
            }
            SystemField::Sports => {
                record.sports = Some(raw.to_string());
                check.valid(field);
            }
            SystemField::BirthDate => {
                if let Some(d) = self.check_date(check, field, raw) {
                    record.birth_date = Some(d);
                }
            }
            SystemField::BirthYear => {
                if let Some(y) = check_int_range(check, field, raw, r.birth_year) {
                    record.birth_year = Some(y);
                }
            }
            SystemField::GraduationYear => match parse_int(raw) {
                Some(y) => {
                    record.graduation_year = Some(y);
                    check.valid(field);
                }
                None => check.error(field, format!("{} must be a whole number", field.label())),
            },
            SystemField::Gender => match Gender::parse(raw) {
                Some(g) => {
                    record.gender = Some(g);
                    check.valid(field);
                }
                None => check.warning(
                    field,
                    format!(
                        "Gender '{}' is not recognized; expected Male, Female or Not Specified",
                        raw
                    ),
                ),
            },
            SystemField::Height => {
                record.height = check_number_range(check, field, raw, r.height);
            }
            SystemField::Weight => {
                record.weight = check_number_range(check, field, raw, r.weight);
            }
            SystemField::CompetitiveLevel => {
                let (min, max) = r.competitive_level;
                if let Some(level) = check_int_range(check, field, raw, (min as i32, max as i32)) {
                    record.competitive_level = u8::try_from(level).ok();
                }
            }
            SystemField::Date => {
                if let Some(d) = self.check_date(check, field, raw) {
                    measurement(record).date = Some(d);
                }
            }
            SystemField::Age => {
                if let Some(a) = check_int_range(check, field, raw, r.age) {
                    measurement(record).age = Some(a);
                }
            }
            SystemField::Metric => match MetricType::parse(raw) {
                Some(metric) => {
                    measurement(record).metric = Some(metric);
                    check.valid(field);
                }
                None => check.error(
                    field,
                    format!(
                        "Metric '{}' is not one of TOP_SPEED, FLY10_TIME, VERTICAL_JUMP, AGILITY_505, RSI, T_TEST",
                        raw
                    ),
                ),
            },
            SystemField::Value => match parse_number(raw) {
                Some(v) if v > 0.0 => {
                    measurement(record).value = Some(v);
                    check.valid(field);
                }
                _ => check.error(field, "Value must be a positive number"),
            },
            SystemField::Units => match MeasurementUnit::parse(raw) {
                Some(unit) => {
                    measurement(record).units = Some(unit);
                    check.valid(field);
                }
                None => check.error(field, format!("Units '{}' is not a recognized unit", raw)),
            },
            SystemField::FlyInDistance => match parse_number(raw) {
                Some(v) if v >= 0.0 => {
                    measurement(record).fly_in_distance = Some(v);
                    check.valid(field);
                }
                _ => check.error(field, "Fly-in distance must be a non-negative number"),
            },
            SystemField::Notes => {
                measurement(record).notes = Some(raw.to_string());
                check.valid(field);
            }
            // 联系方式在 ContactSorter 中处理
            SystemField::Emails | SystemField::PhoneNumbers | SystemField::ContactInfo => {}
        }
    }

    fn check_date(&self, check: &mut RowCheck, field: SystemField, raw: &str) -> Option<NaiveDate> {
        if !DATE_RE.is_match(raw) {
            check.error(field, format!("{} must be in YYYY-MM-DD format", field.label()));
            return None;
        }
        let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") else {
            check.error(field, format!("{} '{}' is not a valid calendar date", field.label(), raw));
            return None;
        };
        if date > self.today() {
            check.error(field, format!("{} cannot be in the future", field.label()));
            return None;
        }
        check.valid(field);
        Some(date)
    }

    fn check_cross_field(&self, check: &mut RowCheck, record: &MappedRecord) {
        if let (Some(date), Some(year)) = (record.birth_date, record.birth_year) {
            if date.year() != year {
                check.warning(
                    SystemField::BirthYear,
                    format!("Birth year {} does not match birth date {}", year, date),
                );
            }
        }

        if let (Some(grad), Some(born)) = (record.graduation_year, record.effective_birth_year()) {
            let expected = born + GRADUATION_AGE;
            if (grad - expected).abs() > GRADUATION_TOLERANCE_YEARS {
                check.warning(
                    SystemField::GraduationYear,
                    format!(
                        "Graduation year {} is unusual for birth year {} (expected about {})",
                        grad, born, expected
                    ),
                );
            }
        }

        let Some(m) = &record.measurement else {
            return;
        };
        let Some(metric) = m.metric else {
            return;
        };
        let canonical = metric.canonical_unit();

        if let Some(unit) = m.units {
            if unit != canonical {
                check.warning(
                    SystemField::Units,
                    format!(
                        "Units '{}' differ from the standard unit '{}' for {}",
                        unit.as_str(),
                        canonical.as_str(),
                        metric
                    ),
                );
            }
        }

        if let Some(value) = m.value {
            let (lo, hi) = metric.plausible_range();
            let same_unit = m.units.map_or(true, |u| u == canonical);
            if same_unit && (value < lo || value > hi) {
                check.warning(
                    SystemField::Value,
                    format!(
                        "Value {} is outside the typical range {} to {} for {}; check the units",
                        value, lo, hi, metric
                    ),
                );
            }
        }
    }
}

fn measurement(record: &mut MappedRecord) -> &mut crate::domain::import_row::MeasurementFields {
    record.measurement.get_or_insert_with(Default::default)
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// 整数解析（兼容表格导出的 "2008.0"）
fn parse_int(raw: &str) -> Option<i32> {
    if let Ok(v) = raw.parse::<i32>() {
        return Some(v);
    }
    match parse_number(raw) {
        Some(v) if v.fract() == 0.0 && v >= i32::MIN as f64 && v <= i32::MAX as f64 => Some(v as i32),
        _ => None,
    }
}

fn check_int_range(check: &mut RowCheck, field: SystemField, raw: &str, (min, max): (i32, i32)) -> Option<i32> {
    match parse_int(raw) {
        Some(v) if (min..=max).contains(&v) => {
            check.valid(field);
            Some(v)
        }
        Some(_) => {
            check.error(field, format!("{} must be between {} and {}", field.label(), min, max));
            None
        }
        None => {
            check.error(field, format!("{} must be a whole number", field.label()));
            None
        }
    }
}

fn check_number_range(check: &mut RowCheck, field: SystemField, raw: &str, (min, max): (f64, f64)) -> Option<f64> {
    match parse_number(raw) {
        Some(v) if v >= min && v <= max => {
            check.valid(field);
            Some(v)
        }
        Some(_) => {
            check.error(field, format!("{} must be between {} and {}", field.label(), min, max));
            None
        }
        None => {
            check.error(field, format!("{} must be a number", field.label()));
            None
        }
    }
}

// ==========================================
// RowCheck - 单行校验结果收集
// ==========================================
struct RowCheck {
    row_index: RowIndex,
    out: Vec<FieldValidation>,
}

impl RowCheck {
    fn new(row_index: RowIndex) -> Self {
        Self {
            row_index,
            out: Vec::new(),
        }
    }

    fn valid(&mut self, field: SystemField) {
        self.out.push(FieldValidation::valid(self.row_index, field));
    }

    fn warning(&mut self, field: SystemField, message: impl Into<String>) {
        self.out.push(FieldValidation::warning(self.row_index, field, message));
    }

    fn error(&mut self, field: SystemField, message: impl Into<String>) {
        self.out.push(FieldValidation::error(self.row_index, field, message));
    }

    fn into_validations(self) -> Vec<FieldValidation> {
        self.out
    }
}

// ==========================================
// ContactSorter - 联系方式归位
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContactKind {
    Email,
    Phone,
    Unknown,
}

#[derive(Default)]
struct ContactSorter {
    tokens: Vec<(SystemField, String, ContactKind)>,
    seen_fields: Vec<SystemField>,
}

impl ContactSorter {
    fn scan(&mut self, field: SystemField, raw: &str) {
        if raw.is_empty() {
            return;
        }
        self.seen_fields.push(field);
        for chunk in CONTACT_SPLIT_RE.split(raw) {
            let chunk = chunk.trim();
            if chunk.is_empty() {
                continue;
            }
            let kind = classify_contact(chunk);
            if kind != ContactKind::Unknown {
                self.tokens.push((field, chunk.to_string(), kind));
                continue;
            }
            // 整段不可识别时再按空白细分
            for token in chunk.split_whitespace() {
                self.tokens.push((field, token.to_string(), classify_contact(token)));
            }
        }
    }

    fn apply(self, check: &mut RowCheck, record: &mut MappedRecord) {
        let mut flagged: HashSet<SystemField> = HashSet::new();

        for (source, token, kind) in self.tokens {
            match kind {
                ContactKind::Email => {
                    let email = strip_sanitizer_quote(&token).to_lowercase();
                    if source == SystemField::PhoneNumbers {
                        check.warning(
                            source,
                            format!(
                                "Email address '{}' found in {} was moved to emails",
                                email,
                                source.key()
                            ),
                        );
                        flagged.insert(source);
                    }
                    if !record.emails.contains(&email) {
                        record.emails.push(email);
                    }
                }
                ContactKind::Phone => {
                    let phone = normalize_phone(&token);
                    if source == SystemField::Emails {
                        check.warning(
                            source,
                            format!(
                                "Phone number '{}' found in {} was moved to phoneNumbers",
                                token.trim(),
                                source.key()
                            ),
                        );
                        flagged.insert(source);
                    }
                    if !record.phone_numbers.contains(&phone) {
                        record.phone_numbers.push(phone);
                    }
                }
                ContactKind::Unknown => {
                    check.warning(
                        source,
                        format!(
                            "Unrecognized contact value '{}' in {} was kept for manual review",
                            token,
                            source.key()
                        ),
                    );
                    flagged.insert(source);
                    record.unrecognized_contacts.push(token);
                }
            }
        }

        for field in self.seen_fields {
            if !flagged.contains(&field) {
                check.valid(field);
                flagged.insert(field);
            }
        }
    }
}

fn strip_sanitizer_quote(token: &str) -> &str {
    token.strip_prefix('\'').unwrap_or(token)
}

fn classify_contact(token: &str) -> ContactKind {
    let token = strip_sanitizer_quote(token.trim());
    if EMAIL_RE.is_match(token) {
        return ContactKind::Email;
    }
    if PHONE_RE.is_match(token) {
        let digits = token.chars().filter(|c| c.is_ascii_digit()).count();
        if PHONE_DIGITS.contains(&digits) {
            return ContactKind::Phone;
        }
    }
    ContactKind::Unknown
}

/// 电话归一: 保留前导 + 与数字
fn normalize_phone(token: &str) -> String {
    let token = strip_sanitizer_quote(token.trim());
    let mut out = String::with_capacity(token.len());
    if token.starts_with('+') {
        out.push('+');
    }
    out.extend(token.chars().filter(|c| c.is_ascii_digit()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::ValidationStatus;
    use indexmap::IndexMap;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn validator() -> RowValidatorImpl {
        RowValidatorImpl::default().with_today(today())
    }

    fn row(pairs: &[(&str, &str)]) -> RawRow {
        let values: IndexMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RawRow::new(0, values)
    }

    fn identity_mapping(kind: ImportKind, pairs: &[(&str, &str)]) -> Vec<FieldMapping> {
        pairs
            .iter()
            .filter_map(|(k, _)| SystemField::from_key(k))
            .map(|f| FieldMapping {
                source_column: f.key().to_string(),
                system_field: f,
                is_required: kind.is_required(f),
                auto_detected: true,
            })
            .collect()
    }

    fn run(kind: ImportKind, pairs: &[(&str, &str)]) -> ValidatedRow {
        validator().validate_and_normalize(&row(pairs), &identity_mapping(kind, pairs), kind)
    }

    fn messages(v: &ValidatedRow, status: ValidationStatus) -> Vec<String> {
        v.validations
            .iter()
            .filter(|f| f.status == status)
            .filter_map(|f| f.message.clone())
            .collect()
    }

    #[test]
    fn test_clean_athlete_row() {
        let v = run(
            ImportKind::Athletes,
            &[
                ("firstName", "John"),
                ("lastName", "Doe"),
                ("birthDate", "2008-04-02"),
                ("gender", "male"),
                ("height", "70"),
                ("competitiveLevel", "3"),
            ],
        );
        assert!(!v.has_errors(), "{:?}", v.validations);
        assert_eq!(v.record.first_name.as_deref(), Some("John"));
        assert_eq!(v.record.gender, Some(Gender::Male));
        assert_eq!(v.record.effective_birth_year(), Some(2008));
        assert_eq!(v.record.competitive_level, Some(3));
        assert!(v.validations.iter().all(|f| f.status == ValidationStatus::Valid));
    }

    #[test]
    fn test_empty_required_field_message() {
        let v = run(ImportKind::Athletes, &[("firstName", ""), ("lastName", "Smith")]);
        let errors: Vec<_> = v.validations.iter().filter(|f| f.is_error()).collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "firstName");
        assert_eq!(errors[0].message.as_deref(), Some("First name is required"));
    }

    #[test]
    fn test_unmapped_required_field_is_row_error() {
        let v = run(ImportKind::Athletes, &[("firstName", "Ann")]);
        assert_eq!(messages(&v, ValidationStatus::Error), vec!["Last name is required"]);
    }

    #[test]
    fn test_empty_optional_field_is_skipped() {
        let v = run(
            ImportKind::Athletes,
            &[("firstName", "A"), ("lastName", "B"), ("weight", "")],
        );
        assert!(v.validations.iter().all(|f| f.field != "weight"));
    }

    #[test]
    fn test_date_rules() {
        let bad_format = run(
            ImportKind::Athletes,
            &[("firstName", "A"), ("lastName", "B"), ("birthDate", "04/02/2008")],
        );
        assert_eq!(
            messages(&bad_format, ValidationStatus::Error),
            vec!["Birth date must be in YYYY-MM-DD format"]
        );

        let bad_calendar = run(
            ImportKind::Athletes,
            &[("firstName", "A"), ("lastName", "B"), ("birthDate", "2008-02-30")],
        );
        assert!(bad_calendar.has_errors());

        let future = run(
            ImportKind::Athletes,
            &[("firstName", "A"), ("lastName", "B"), ("birthDate", "2024-06-02")],
        );
        assert_eq!(
            messages(&future, ValidationStatus::Error),
            vec!["Birth date cannot be in the future"]
        );
    }

    #[test]
    fn test_numeric_ranges() {
        let v = run(
            ImportKind::Athletes,
            &[
                ("firstName", "A"),
                ("lastName", "B"),
                ("birthYear", "1989"),
                ("height", "tall"),
                ("weight", "401"),
                ("competitiveLevel", "6"),
            ],
        );
        let errors = messages(&v, ValidationStatus::Error);
        assert!(errors.contains(&"Birth year must be between 1990 and 2020".to_string()));
        assert!(errors.contains(&"Height must be a number".to_string()));
        assert!(errors.contains(&"Weight must be between 50 and 400".to_string()));
        assert!(errors.contains(&"Competitive level must be between 1 and 5".to_string()));
        assert_eq!(v.record.birth_year, None);
    }

    #[test]
    fn test_email_in_phone_column_is_moved() {
        let v = run(
            ImportKind::Athletes,
            &[("firstName", "John"), ("lastName", "Doe"), ("phoneNumbers", "john@example.com")],
        );
        assert_eq!(v.record.emails, vec!["john@example.com"]);
        assert!(v.record.phone_numbers.is_empty());
        let warning = v
            .validations
            .iter()
            .find(|f| f.is_warning())
            .expect("relocation warning");
        assert_eq!(warning.field, "phoneNumbers");
        assert!(warning.message.as_deref().unwrap_or("").contains("moved to emails"));
        assert!(!v.has_errors());
    }

    #[test]
    fn test_phone_in_email_column_is_moved() {
        let v = run(
            ImportKind::Athletes,
            &[("firstName", "J"), ("lastName", "D"), ("emails", "(555) 123-4567; j@d.io")],
        );
        assert_eq!(v.record.phone_numbers, vec!["5551234567"]);
        assert_eq!(v.record.emails, vec!["j@d.io"]);
        let warnings = messages(&v, ValidationStatus::Warning);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("moved to phoneNumbers"));
    }

    #[test]
    fn test_contact_info_sorted_without_warning() {
        let v = run(
            ImportKind::Athletes,
            &[("firstName", "J"), ("lastName", "D"), ("contactInfo", "+1 555 123 4567 | a@b.co")],
        );
        assert_eq!(v.record.emails, vec!["a@b.co"]);
        assert_eq!(v.record.phone_numbers, vec!["+15551234567"]);
        assert!(messages(&v, ValidationStatus::Warning).is_empty());
    }

    #[test]
    fn test_unrecognized_contact_is_warning_and_kept() {
        let v = run(
            ImportKind::Athletes,
            &[("firstName", "J"), ("lastName", "D"), ("emails", "call-me-maybe")],
        );
        assert!(!v.has_errors());
        assert_eq!(v.record.unrecognized_contacts, vec!["call-me-maybe"]);
        assert_eq!(messages(&v, ValidationStatus::Warning).len(), 1);
    }

    #[test]
    fn test_unknown_gender_is_warning() {
        let v = run(
            ImportKind::Athletes,
            &[("firstName", "J"), ("lastName", "D"), ("gender", "robot")],
        );
        assert!(!v.has_errors());
        assert_eq!(v.record.gender, None);
        assert_eq!(messages(&v, ValidationStatus::Warning).len(), 1);
    }

    #[test]
    fn test_graduation_year_plausibility() {
        let v = run(
            ImportKind::Athletes,
            &[
                ("firstName", "J"),
                ("lastName", "D"),
                ("birthYear", "2008"),
                ("graduationYear", "2031"),
            ],
        );
        let warnings = messages(&v, ValidationStatus::Warning);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("expected about 2026"));

        let ok = run(
            ImportKind::Athletes,
            &[
                ("firstName", "J"),
                ("lastName", "D"),
                ("birthYear", "2008"),
                ("graduationYear", "2027"),
            ],
        );
        assert!(messages(&ok, ValidationStatus::Warning).is_empty());
    }

    #[test]
    fn test_measurement_row() {
        let v = run(
            ImportKind::Measurements,
            &[
                ("firstName", "John"),
                ("lastName", "Doe"),
                ("date", "2024-05-01"),
                ("metric", "fly10_time"),
                ("value", "1.32"),
                ("units", "s"),
                ("flyInDistance", "20"),
            ],
        );
        assert!(!v.has_errors(), "{:?}", v.validations);
        let m = v.record.measurement.expect("measurement fields");
        assert_eq!(m.metric, Some(MetricType::Fly10Time));
        assert_eq!(m.value, Some(1.32));
        assert_eq!(m.fly_in_distance, Some(20.0));
    }

    #[test]
    fn test_measurement_value_rules() {
        let v = run(
            ImportKind::Measurements,
            &[
                ("firstName", "John"),
                ("lastName", "Doe"),
                ("date", "2024-05-01"),
                ("metric", "BENCH_PRESS"),
                ("value", "-3"),
                ("units", "furlongs"),
            ],
        );
        let errors = messages(&v, ValidationStatus::Error);
        assert_eq!(errors.len(), 3, "{:?}", errors);
        assert!(errors.contains(&"Value must be a positive number".to_string()));
    }

    #[test]
    fn test_implausible_value_and_unit_mismatch_warn() {
        let v = run(
            ImportKind::Measurements,
            &[
                ("firstName", "John"),
                ("lastName", "Doe"),
                ("date", "2024-05-01"),
                ("metric", "TOP_SPEED"),
                ("value", "45"),
            ],
        );
        assert!(!v.has_errors());
        assert_eq!(messages(&v, ValidationStatus::Warning).len(), 1);

        let mismatch = run(
            ImportKind::Measurements,
            &[
                ("firstName", "John"),
                ("lastName", "Doe"),
                ("date", "2024-05-01"),
                ("metric", "TOP_SPEED"),
                ("value", "8"),
                ("units", "m/s"),
            ],
        );
        let warnings = messages(&mismatch, ValidationStatus::Warning);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("standard unit 'mph'"));
    }

    #[test]
    fn test_unmapped_columns_land_in_extras() {
        let mut r = row(&[("firstName", "A"), ("lastName", "B"), ("Jersey", "23")]);
        r.index = RowIndex(4);
        let mapping = identity_mapping(ImportKind::Athletes, &[("firstName", ""), ("lastName", "")]);
        let v = validator().validate_and_normalize(&r, &mapping, ImportKind::Athletes);
        assert_eq!(v.record.extras.get("Jersey").map(String::as_str), Some("23"));
        assert!(v.validations.iter().all(|f| f.row_index == RowIndex(4)));
    }

    #[test]
    fn test_validate_returns_only_validations() {
        let pairs = [("firstName", "A"), ("lastName", "B")];
        let validations = validator().validate(
            &row(&pairs),
            &identity_mapping(ImportKind::Athletes, &pairs),
            ImportKind::Athletes,
        );
        assert_eq!(validations.len(), 2);
    }
}
