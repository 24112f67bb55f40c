// ==========================================
// 运动员名册导入系统 - 列映射器实现
// ==========================================
// 阶段 2: 源表头 → 系统字段
// 规则: 归一化（小写、去空白/连字符/下划线）后相等或互为子串
// 约束: 只比较列名,不做容错拼写匹配（值的近似匹配由实体匹配器负责）
// ==========================================

use crate::domain::import_row::FieldMapping;
use crate::domain::types::{ImportKind, SystemField};
use crate::importer::error::{ImportError, PipelineResult};
use crate::importer::importer_trait::FieldMapper;
use std::collections::HashSet;

/// 子串匹配的最短归一化长度（避免 "id"、"x" 之类误配）
const MIN_SUBSTRING_LEN: usize = 3;

/// 表头归一化
pub fn normalize_header(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

fn is_substring_match(header: &str, field: &str) -> bool {
    header.len() >= MIN_SUBSTRING_LEN && (field.contains(header) || header.contains(field))
}

pub struct HeaderFieldMapper;

impl FieldMapper for HeaderFieldMapper {
    fn suggest_mappings(&self, headers: &[String], kind: ImportKind) -> Vec<FieldMapping> {
        let fields: Vec<(SystemField, String)> = kind
            .system_fields()
            .iter()
            .map(|f| (*f, normalize_header(f.key())))
            .collect();

        let mut claimed: HashSet<SystemField> = HashSet::new();
        let mut assigned: Vec<Option<SystemField>> = vec![None; headers.len()];

        // 第一轮: 精确相等；第二轮: 子串
        for exact in [true, false] {
            for (idx, header) in headers.iter().enumerate() {
                if assigned[idx].is_some() {
                    continue;
                }
                let normalized = normalize_header(header);
                if normalized.is_empty() {
                    continue;
                }
                let hit = fields.iter().find(|(field, key)| {
                    !claimed.contains(field)
                        && if exact {
                            normalized == *key
                        } else {
                            is_substring_match(&normalized, key)
                        }
                });
                if let Some((field, _)) = hit {
                    claimed.insert(*field);
                    assigned[idx] = Some(*field);
                }
            }
        }

        let mappings: Vec<FieldMapping> = headers
            .iter()
            .zip(assigned)
            .filter_map(|(header, field)| {
                field.map(|f| FieldMapping {
                    source_column: header.clone(),
                    system_field: f,
                    is_required: kind.is_required(f),
                    auto_detected: true,
                })
            })
            .collect();

        tracing::debug!(
            kind = %kind,
            headers = headers.len(),
            mapped = mappings.len(),
            "mapping suggestions built"
        );
        mappings
    }
}

/// 未被映射的必填字段
pub fn missing_required(kind: ImportKind, mapping: &[FieldMapping]) -> Vec<SystemField> {
    kind.required_fields()
        .iter()
        .copied()
        .filter(|f| !mapping.iter().any(|m| m.system_field == *f))
        .collect()
}

/// 检查调用方提交的映射集合
///
/// 源列唯一、系统字段唯一、字段属于该导入类型、源列存在于表头
pub fn check_mapping(kind: ImportKind, mapping: &[FieldMapping], headers: &[String]) -> PipelineResult<()> {
    let mut columns = HashSet::new();
    let mut fields = HashSet::new();
    for m in mapping {
        if !columns.insert(m.source_column.as_str()) {
            return Err(ImportError::DuplicateSourceColumn(m.source_column.clone()));
        }
        if !fields.insert(m.system_field) {
            return Err(ImportError::DuplicateSystemField(m.system_field));
        }
        if !kind.system_fields().contains(&m.system_field) {
            return Err(ImportError::FieldNotApplicable {
                kind,
                field: m.system_field,
            });
        }
        if !headers.is_empty() && !headers.iter().any(|h| *h == m.source_column) {
            return Err(ImportError::UnknownSourceColumn(m.source_column.clone()));
        }
    }
    Ok(())
}

/// 人工改写某一列的映射（None 表示取消映射）
///
/// 目标系统字段已被其他列占用时,原占用被移除
pub fn override_mapping(
    kind: ImportKind,
    mapping: &[FieldMapping],
    source_column: &str,
    field: Option<SystemField>,
) -> Vec<FieldMapping> {
    let mut result: Vec<FieldMapping> = mapping
        .iter()
        .filter(|m| m.source_column != source_column && Some(m.system_field) != field)
        .cloned()
        .collect();

    if let Some(f) = field {
        result.push(FieldMapping {
            source_column: source_column.to_string(),
            system_field: f,
            is_required: kind.is_required(f),
            auto_detected: false,
        });
    }
    result
}

/// 提交前的映射完整性检查
pub fn ensure_required_mapped(kind: ImportKind, mapping: &[FieldMapping]) -> PipelineResult<()> {
    let missing = missing_required(kind, mapping);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ImportError::MissingRequiredMapping {
            kind,
            fields: missing,
        })
    }
}
