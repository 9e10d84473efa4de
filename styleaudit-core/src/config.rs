use crate::error::AuditError;
use crate::types::{Language, StyleKind};
use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_similarity_threshold() -> f64 {
    0.6
}

fn default_max_heading_chars() -> usize {
    120
}

fn default_merge_gap() -> usize {
    1
}

fn default_styles() -> Vec<StyleKind> {
    StyleKind::ALL.to_vec()
}

/// Parse a comma separated style list such as "bold,underline"
pub fn parse_styles(list: &str) -> std::result::Result<Vec<StyleKind>, AuditError> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| match s.to_ascii_lowercase().as_str() {
            "bold" | "b" => Ok(StyleKind::Bold),
            "underline" | "u" => Ok(StyleKind::Underline),
            other => Err(AuditError::Config(format!("unknown style '{other}'"))),
        })
        .collect()
}

fn default_report_title() -> String {
    "Chinese-English Document Comparison Report".to_string()
}

fn default_source_label() -> String {
    "Chinese".to_string()
}

fn default_target_label() -> String {
    "English".to_string()
}

fn default_output_path() -> String {
    "report.html".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default)]
    pub alignment: AlignmentConfig,
    #[serde(default)]
    pub segmentation: SegmentationConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

// ===== ALIGNMENT =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentMode {
    /// Greedy best-match on section labels
    #[default]
    Fuzzy,
    /// Pair the n-th source section with the n-th target section
    Ordinal,
}

impl std::str::FromStr for AlignmentMode {
    type Err = AuditError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fuzzy" => Ok(AlignmentMode::Fuzzy),
            "ordinal" => Ok(AlignmentMode::Ordinal),
            other => Err(AuditError::Config(format!("unknown alignment mode '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// 2*LCS / (|a| + |b|)
    #[default]
    IndelRatio,
    /// 1 - levenshtein / max(|a|, |b|)
    NormalizedLevenshtein,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentConfig {
    #[serde(default)]
    pub mode: AlignmentMode,
    /// Minimum similarity (0.0-1.0) for a fuzzy match to be accepted
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    #[serde(default)]
    pub metric: MetricKind,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            mode: AlignmentMode::Fuzzy,
            similarity_threshold: default_similarity_threshold(),
            metric: MetricKind::IndelRatio,
        }
    }
}

// ===== SEGMENTATION =====

/// What to do with a non-empty document in which no heading was detected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingHeadingsPolicy {
    /// Abort with a segmentation error
    #[default]
    Fail,
    /// Treat the whole document as a single section
    WholeDocument,
}

/// Per-language table-of-contents settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TocConfig {
    /// Text that identifies the TOC table within its first rows
    pub toc_keyword: String,
    /// Regex a TOC line must match to start a section title
    pub title_pattern: String,
}

impl TocConfig {
    pub fn source_default() -> Self {
        Self {
            toc_keyword: "頁碼".to_string(),
            title_pattern: r"^[甲乙丙丁戊己庚辛壬癸(（].*部\s*[：:]".to_string(),
        }
    }

    pub fn target_default() -> Self {
        Self {
            toc_keyword: "Page".to_string(),
            title_pattern: r"^Part.*[：:]".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentationConfig {
    #[serde(default = "TocConfig::source_default")]
    pub source: TocConfig,
    #[serde(default = "TocConfig::target_default")]
    pub target: TocConfig,
    /// Drive segmentation from the TOC table when one is found
    #[serde(default = "default_true")]
    pub use_toc: bool,
    /// Treat "Heading N" / "Title" paragraph styles as headings
    #[serde(default = "default_true")]
    pub use_styles: bool,
    /// Extra style ids that mark headings
    #[serde(default)]
    pub heading_styles: Vec<String>,
    /// Extra regex patterns that mark headings in body text
    #[serde(default)]
    pub heading_patterns: Vec<String>,
    /// Paragraphs longer than this are never pattern headings
    #[serde(default = "default_max_heading_chars")]
    pub max_heading_chars: usize,
    #[serde(default)]
    pub on_missing_headings: MissingHeadingsPolicy,
}

impl SegmentationConfig {
    pub fn toc_for(&self, language: Language) -> &TocConfig {
        match language {
            Language::Source => &self.source,
            Language::Target => &self.target,
        }
    }
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            source: TocConfig::source_default(),
            target: TocConfig::target_default(),
            use_toc: true,
            use_styles: true,
            heading_styles: Vec::new(),
            heading_patterns: Vec::new(),
            max_heading_chars: default_max_heading_chars(),
            on_missing_headings: MissingHeadingsPolicy::Fail,
        }
    }
}

// ===== EXTRACTION =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Styles to audit
    #[serde(default = "default_styles")]
    pub styles: Vec<StyleKind>,
    /// Max chars of whitespace/punctuation between same-style runs that still merge
    #[serde(default = "default_merge_gap")]
    pub merge_gap: usize,
    /// Extract spans from table cells as well as body paragraphs
    #[serde(default = "default_true")]
    pub include_tables: bool,
}

impl ExtractionConfig {
    pub fn audited_styles(&self) -> Vec<StyleKind> {
        let mut styles = self.styles.clone();
        styles.sort();
        styles.dedup();
        styles
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            styles: default_styles(),
            merge_gap: default_merge_gap(),
            include_tables: true,
        }
    }
}

// ===== REPORT =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    #[default]
    Html,
    Json,
}

impl std::str::FromStr for ReportFormat {
    type Err = AuditError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "html" => Ok(ReportFormat::Html),
            "json" => Ok(ReportFormat::Json),
            other => Err(AuditError::Config(format!("unknown report format '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_report_title")]
    pub title: String,
    /// Column heading for the source document ("Chinese")
    #[serde(default = "default_source_label")]
    pub source_label: String,
    /// Column heading for the target document ("English")
    #[serde(default = "default_target_label")]
    pub target_label: String,
    #[serde(default)]
    pub format: ReportFormat,
    #[serde(default = "default_output_path")]
    pub output_path: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: default_report_title(),
            source_label: default_source_label(),
            target_label: default_target_label(),
            format: ReportFormat::Html,
            output_path: default_output_path(),
        }
    }
}

impl AuditConfig {
    /// Load config from file path (functional approach)
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: AuditConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Built-in presets, selectable by name from the CLI
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "default" => Some(Self::default()),
            // Tender packs: sections paired by position, one section when
            // no TOC exists.
            "tender" => {
                let mut config = Self::default();
                config.alignment.mode = AlignmentMode::Ordinal;
                config.segmentation.on_missing_headings = MissingHeadingsPolicy::WholeDocument;
                config.extraction.merge_gap = 0;
                Some(config)
            }
            "lenient" => {
                let mut config = Self::default();
                config.alignment.similarity_threshold = 0.45;
                config.extraction.merge_gap = 3;
                config.segmentation.on_missing_headings = MissingHeadingsPolicy::WholeDocument;
                Some(config)
            }
            _ => None,
        }
    }

    pub fn preset_names() -> &'static [&'static str] {
        &["default", "tender", "lenient"]
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> std::result::Result<(), AuditError> {
        let tau = self.alignment.similarity_threshold;
        if !(0.0..=1.0).contains(&tau) || tau.is_nan() {
            return Err(AuditError::Config(format!(
                "similarity_threshold must be within [0, 1], got {tau}"
            )));
        }
        if self.extraction.styles.is_empty() {
            return Err(AuditError::Config("no styles selected for audit".to_string()));
        }
        let patterns = self
            .segmentation
            .heading_patterns
            .iter()
            .chain([
                &self.segmentation.source.title_pattern,
                &self.segmentation.target.title_pattern,
            ]);
        for pattern in patterns {
            Regex::new(pattern)
                .map_err(|e| AuditError::Config(format!("bad pattern '{pattern}': {e}")))?;
        }
        Ok(())
    }

    /// Styles to audit, deduplicated and in canonical order
    pub fn audited_styles(&self) -> Vec<StyleKind> {
        self.extraction.audited_styles()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AuditConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.alignment.similarity_threshold, 0.6);
        assert_eq!(config.extraction.merge_gap, 1);
        assert_eq!(config.audited_styles(), vec![StyleKind::Bold, StyleKind::Underline]);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = r#"
alignment:
  similarity_threshold: 0.5
  mode: ordinal
extraction:
  styles: [underline]
"#;
        let config: AuditConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.alignment.similarity_threshold, 0.5);
        assert_eq!(config.alignment.mode, AlignmentMode::Ordinal);
        assert_eq!(config.alignment.metric, MetricKind::IndelRatio);
        assert_eq!(config.audited_styles(), vec![StyleKind::Underline]);
        assert_eq!(config.segmentation.target.toc_keyword, "Page");
        assert_eq!(config.report.format, ReportFormat::Html);
    }

    #[test]
    fn test_validate_rejects_bad_threshold_and_pattern() {
        let mut config = AuditConfig::default();
        config.alignment.similarity_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = AuditConfig::default();
        config.segmentation.heading_patterns.push("(unclosed".to_string());
        assert!(matches!(config.validate(), Err(AuditError::Config(_))));
    }

    #[test]
    fn test_presets() {
        for name in AuditConfig::preset_names() {
            let preset = AuditConfig::preset(name).unwrap();
            assert!(preset.validate().is_ok(), "preset {name} invalid");
        }
        assert_eq!(
            AuditConfig::preset("tender").unwrap().alignment.mode,
            AlignmentMode::Ordinal
        );
        assert!(AuditConfig::preset("nope").is_none());
    }

    #[test]
    fn test_parse_cli_values() {
        assert_eq!(parse_styles("bold, Underline").unwrap(), vec![StyleKind::Bold, StyleKind::Underline]);
        assert_eq!(parse_styles("u").unwrap(), vec![StyleKind::Underline]);
        assert!(parse_styles("italic").is_err());
        assert_eq!("Ordinal".parse::<AlignmentMode>().unwrap(), AlignmentMode::Ordinal);
        assert_eq!("json".parse::<ReportFormat>().unwrap(), ReportFormat::Json);
        assert!("pdf".parse::<ReportFormat>().is_err());
    }

    #[test]
    fn test_load_from_file_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("styleaudit.yaml");
        std::fs::write(&path, "alignment:\n  similarity_threshold: 2.0\n").unwrap();
        assert!(AuditConfig::load_from_file(path.to_str().unwrap()).is_err());

        std::fs::write(&path, "alignment:\n  mode: ordinal\n").unwrap();
        let config = AuditConfig::load_from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(config.alignment.mode, AlignmentMode::Ordinal);
        assert!(AuditConfig::load_from_file("/definitely/not/here.yaml").is_err());
    }
}
