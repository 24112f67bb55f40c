// ==========================================
// 运动员名册导入系统 - 导入配置
// ==========================================
// 职责: 上传上限 / 预览截断 / 存储超时 / 匹配阈值 / 校验区间
// 说明: 全部参数可由 config_kv 覆写,缺省值见 Default 实现
// ==========================================

use serde::{Deserialize, Serialize};
use std::time::Duration;

// ==========================================
// 解析模式
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParserMode {
    /// 逐行按逗号切分（不支持引号与跨行字段）
    #[default]
    Simple,
    /// RFC 4180（引号字段、字段内逗号）
    Rfc4180,
}

impl ParserMode {
    pub fn parse(s: &str) -> Option<ParserMode> {
        match s.trim().to_uppercase().as_str() {
            "SIMPLE" => Some(ParserMode::Simple),
            "RFC4180" | "RFC_4180" => Some(ParserMode::Rfc4180),
            _ => None,
        }
    }
}

// ==========================================
// 匹配权重
// ==========================================
// 各信号独立累加后截断到 [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchWeights {
    pub first_name: f64,
    pub last_name: f64,
    pub email: f64,
    pub birth_year: f64,
    pub team: f64,
    pub gender: f64,
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            first_name: 0.25,
            last_name: 0.30,
            email: 0.60,
            birth_year: 0.15,
            team: 0.15,
            gender: 0.05,
        }
    }
}

impl MatchWeights {
    fn all(&self) -> [f64; 6] {
        [
            self.first_name,
            self.last_name,
            self.email,
            self.birth_year,
            self.team,
            self.gender,
        ]
    }
}

// ==========================================
// MatcherConfig - 实体匹配阈值
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// 自动匹配阈值
    pub high_confidence: f64,
    /// 候选下限（严格大于才算候选）
    pub low_floor: f64,
    /// 最佳与次佳候选的最小差距
    pub ambiguity_margin: f64,
    pub weights: MatchWeights,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            high_confidence: 0.85,
            low_floor: 0.3,
            ambiguity_margin: 0.1,
            weights: MatchWeights::default(),
        }
    }
}

impl MatcherConfig {
    pub fn validate(&self) -> Result<(), String> {
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        if !in_unit(self.high_confidence) || !in_unit(self.low_floor) {
            return Err("thresholds must be within [0, 1]".to_string());
        }
        if self.low_floor >= self.high_confidence {
            return Err(format!(
                "low_floor {} must be below high_confidence {}",
                self.low_floor, self.high_confidence
            ));
        }
        if !(0.0..=1.0).contains(&self.ambiguity_margin) {
            return Err("ambiguity_margin must be within [0, 1]".to_string());
        }
        if self.weights.all().iter().any(|w| *w < 0.0 || !w.is_finite()) {
            return Err("weights must be finite and non-negative".to_string());
        }
        Ok(())
    }
}

// ==========================================
// ValidationRanges - 数值校验区间（闭区间）
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidationRanges {
    pub birth_year: (i32, i32),
    pub age: (i32, i32),
    pub height: (f64, f64),
    pub weight: (f64, f64),
    pub competitive_level: (u8, u8),
}

impl Default for ValidationRanges {
    fn default() -> Self {
        Self {
            birth_year: (1990, 2020),
            age: (10, 25),
            height: (36.0, 84.0),
            weight: (50.0, 400.0),
            competitive_level: (1, 5),
        }
    }
}

// ==========================================
// ImportConfig - 导入配置全集
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub max_rows: usize,
    pub max_file_bytes: usize,
    pub preview_row_limit: usize,
    pub store_timeout_ms: u64,
    pub match_concurrency: usize,
    pub parser_mode: ParserMode,
    pub matcher: MatcherConfig,
    pub ranges: ValidationRanges,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            max_rows: 5_000,
            max_file_bytes: 5 * 1024 * 1024,
            preview_row_limit: 200,
            store_timeout_ms: 5_000,
            match_concurrency: 4,
            parser_mode: ParserMode::Simple,
            matcher: MatcherConfig::default(),
            ranges: ValidationRanges::default(),
        }
    }
}

impl ImportConfig {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ImportConfig::default();
        assert_eq!(config.max_rows, 5000);
        assert_eq!(config.max_file_bytes, 5_242_880);
        assert_eq!(config.store_timeout(), Duration::from_secs(5));
        assert!(config.matcher.validate().is_ok());
    }

    #[test]
    fn test_matcher_config_rejects_inverted_thresholds() {
        let config = MatcherConfig {
            high_confidence: 0.3,
            low_floor: 0.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config: ImportConfig = serde_json::from_str(r#"{"max_rows": 10}"#).unwrap();
        assert_eq!(config.max_rows, 10);
        assert_eq!(config.preview_row_limit, 200);
    }

    #[test]
    fn test_parser_mode_parse() {
        assert_eq!(ParserMode::parse("rfc4180"), Some(ParserMode::Rfc4180));
        assert_eq!(ParserMode::parse("simple"), Some(ParserMode::Simple));
        assert_eq!(ParserMode::parse("xlsx"), None);
    }
}
