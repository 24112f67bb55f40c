// ==========================================
// 运动员名册导入系统 - 文件解析器实现
// ==========================================
// 阶段 1: 文本 → 原始行（列名 → 值）+ 公式注入清洗
// 模式:
// - Simple: 按行、按逗号切分,不识别引号（已知限制）
// - Rfc4180: csv crate 解析,支持引号字段
// 红线: 纯函数,不理解业务字段
// ==========================================

use crate::config::ParserMode;
use crate::domain::import_row::RawRow;
use crate::importer::error::PipelineResult;
use crate::importer::importer_trait::FileParser;
use csv::{ReaderBuilder, Trim};
use indexmap::IndexMap;
use regex::Regex;
use std::sync::LazyLock;

/// 合法的有符号数（不做清洗）
static SIGNED_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?$").expect("valid regex")
});

/// 电子表格会当作公式执行的首字符
const FORMULA_TRIGGERS: [char; 4] = ['=', '+', '-', '@'];

/// 公式注入清洗
///
/// 以 `= + - @` 开头且不是合法数字的值前置单引号；其余原样返回
pub fn sanitize(value: &str) -> String {
    match value.chars().next() {
        Some(c) if FORMULA_TRIGGERS.contains(&c) && !SIGNED_NUMBER_RE.is_match(value) => {
            format!("'{}", value)
        }
        _ => value.to_string(),
    }
}

// ==========================================
// ParsedFile - 解析结果
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedFile {
    /// 去重后的表头（保留首次出现顺序）
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

/// Simple 模式解析,空输入返回空列表
pub fn parse(text: &str) -> Vec<RawRow> {
    parse_simple(text).rows
}

pub fn parse_simple(text: &str) -> ParsedFile {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut lines = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.trim().is_empty());

    let Some(header_line) = lines.next() else {
        return ParsedFile::default();
    };
    let raw_headers: Vec<String> = header_line.split(',').map(|h| h.trim().to_string()).collect();

    let rows = lines
        .enumerate()
        .map(|(idx, line)| {
            let fields: Vec<&str> = line.split(',').collect();
            build_row(idx, &raw_headers, |col| fields.get(col).copied())
        })
        .collect();

    ParsedFile {
        headers: unique_headers(&raw_headers),
        rows,
    }
}

pub fn parse_rfc4180(text: &str) -> PipelineResult<ParsedFile> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true) // 允许行长度不一致
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let raw_headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
    if raw_headers.iter().all(|h| h.is_empty()) {
        return Ok(ParsedFile::default());
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        if record.iter().all(|v| v.trim().is_empty()) && record.len() <= 1 {
            continue;
        }
        let idx = rows.len();
        rows.push(build_row(idx, &raw_headers, |col| record.get(col)));
    }

    Ok(ParsedFile {
        headers: unique_headers(&raw_headers),
        rows,
    })
}

fn build_row<'a, F>(idx: usize, headers: &[String], field_at: F) -> RawRow
where
    F: Fn(usize) -> Option<&'a str>,
{
    let mut values = IndexMap::with_capacity(headers.len());
    for (col, header) in headers.iter().enumerate() {
        // 重名列保留第一列
        if values.contains_key(header) {
            continue;
        }
        let raw = field_at(col).map(str::trim).unwrap_or("");
        values.insert(header.clone(), sanitize(raw));
    }
    RawRow::new(idx, values)
}

fn unique_headers(headers: &[String]) -> Vec<String> {
    let mut seen = indexmap::IndexSet::new();
    for h in headers {
        seen.insert(h.clone());
    }
    seen.into_iter().collect()
}

/// 以 Simple 格式写回文本（不加引号）
pub fn render_csv(headers: &[String], rows: &[RawRow]) -> String {
    let mut out = headers.join(",");
    for row in rows {
        out.push('\n');
        let line = headers
            .iter()
            .map(|h| row.get(h).unwrap_or(""))
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&line);
    }
    out
}

// ==========================================
// CsvFileParser - FileParser 实现
// ==========================================
pub struct CsvFileParser {
    mode: ParserMode,
}

impl CsvFileParser {
    pub fn new(mode: ParserMode) -> Self {
        Self { mode }
    }
}

impl Default for CsvFileParser {
    fn default() -> Self {
        Self::new(ParserMode::Simple)
    }
}

impl FileParser for CsvFileParser {
    fn parse_text(&self, text: &str) -> PipelineResult<ParsedFile> {
        let parsed = match self.mode {
            ParserMode::Simple => parse_simple(text),
            ParserMode::Rfc4180 => parse_rfc4180(text)?,
        };
        tracing::debug!(
            mode = ?self.mode,
            headers = parsed.headers.len(),
            rows = parsed.rows.len(),
            "csv text parsed"
        );
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_yields_no_rows() {
        assert!(parse("").is_empty());
        assert!(parse("\n  \n\r\n").is_empty());
        assert_eq!(parse_simple("").headers.len(), 0);
    }

    #[test]
    fn test_header_only_yields_headers_and_no_rows() {
        let parsed = parse_simple("First Name, Last Name ");
        assert_eq!(parsed.headers, vec!["First Name", "Last Name"]);
        assert!(parsed.rows.is_empty());
    }

    #[test]
    fn test_rows_align_positionally_and_pad_missing_fields() {
        let rows = parse("a,b,c\n1,2\n\n 4 , 5 , 6 , 7\r\n");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("a"), Some("1"));
        assert_eq!(rows[0].get("c"), Some(""));
        assert_eq!(rows[1].get("a"), Some("4"));
        assert_eq!(rows[1].get("c"), Some("6"));
        assert_eq!(rows[1].index.0, 1);
    }

    #[test]
    fn test_blank_line_skipped_but_comma_only_line_kept() {
        let rows = parse("a,b\n   \n,\n");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("a"), Some(""));
    }

    #[test]
    fn test_duplicate_headers_keep_first_column() {
        let parsed = parse_simple("email,email\nx@y.io,other");
        assert_eq!(parsed.headers, vec!["email"]);
        assert_eq!(parsed.rows[0].get("email"), Some("x@y.io"));
    }

    #[test]
    fn test_sanitize_formula_triggers() {
        assert_eq!(sanitize("=SUM(A1:A2)"), "'=SUM(A1:A2)");
        assert_eq!(sanitize("@cmd"), "'@cmd");
        assert_eq!(sanitize("-1+1"), "'-1+1");
        assert_eq!(sanitize("+"), "'+");
        assert_eq!(sanitize("-"), "'-");
    }

    #[test]
    fn test_sanitize_leaves_numbers_and_plain_text() {
        for s in ["-1234", "+5", "-0.5", "-.5", "+1e10", "-3.2E-4", "18.5", "John", ""] {
            assert_eq!(sanitize(s), s, "{}", s);
        }
    }

    #[test]
    fn test_sanitize_applied_during_parse() {
        let rows = parse("name,value\n=HYPERLINK(\"x\"),-12");
        assert_eq!(rows[0].get("name"), Some("'=HYPERLINK(\"x\")"));
        assert_eq!(rows[0].get("value"), Some("-12"));
    }

    #[test]
    fn test_render_then_parse_is_stable() {
        let text = "First Name,Last Name,Value\nJohn,Doe,18.5\nAnn,,=1+1\n,Smith,-3";
        let first = parse_simple(text);
        let rendered = render_csv(&first.headers, &first.rows);
        let second = parse_simple(&rendered);
        assert_eq!(first, second);
    }

    #[test]
    fn test_rfc4180_handles_quotes() {
        let parsed = parse_rfc4180("name,notes\n\"Doe, John\",\"said \"\"hi\"\"\"\n").unwrap();
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].get("name"), Some("Doe, John"));
        assert_eq!(parsed.rows[0].get("notes"), Some("said \"hi\""));
    }

    #[test]
    fn test_rfc4180_sanitizes_and_pads() {
        let parsed = parse_rfc4180("a,b,c\n@x\n").unwrap();
        assert_eq!(parsed.rows[0].get("a"), Some("'@x"));
        assert_eq!(parsed.rows[0].get("c"), Some(""));
    }

    #[test]
    fn test_simple_mode_does_not_understand_quotes() {
        let rows = parse("name,team\n\"Doe, John\",A");
        assert_eq!(rows[0].get("name"), Some("\"Doe"));
        assert_eq!(rows[0].get("team"), Some("John\""));
    }

    #[test]
    fn test_parser_trait_dispatches_on_mode() {
        let text = "name\n\"a,b\"";
        let simple = CsvFileParser::new(ParserMode::Simple).parse_text(text).unwrap();
        let rfc = CsvFileParser::new(ParserMode::Rfc4180).parse_text(text).unwrap();
        assert_eq!(simple.rows[0].get("name"), Some("\"a"));
        assert_eq!(rfc.rows[0].get("name"), Some("a,b"));
    }
}
