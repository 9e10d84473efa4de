use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// The schema version stamped on every JSON report.
/// Bump this when the output shape changes.
pub const SCHEMA_VERSION: &str = "0.1.0";

// ===== DOCUMENT MODEL =====
// Constructed once by the preprocessor + extractor + segmenter and never
// mutated afterwards. Sections reference paragraphs by index.

/// Which side of the comparison a document sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Source,
    Target,
}

impl Language {
    pub fn other(self) -> Self {
        match self {
            Language::Source => Language::Target,
            Language::Target => Language::Source,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Source => write!(f, "source"),
            Language::Target => write!(f, "target"),
        }
    }
}

/// Emphasis styles the auditor knows how to compare.
/// Ordering matters: discrepancies are sorted Bold before Underline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleKind {
    Bold,
    Underline,
}

impl StyleKind {
    pub const ALL: [StyleKind; 2] = [StyleKind::Bold, StyleKind::Underline];

    pub fn label(&self) -> &'static str {
        match self {
            StyleKind::Bold => "Bold",
            StyleKind::Underline => "Underline",
        }
    }
}

impl fmt::Display for StyleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Direct formatting of a single run after style resolution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFormat {
    pub bold: bool,
    pub underline: bool,
}

impl RunFormat {
    pub fn has(&self, style: StyleKind) -> bool {
        match style {
            StyleKind::Bold => self.bold,
            StyleKind::Underline => self.underline,
        }
    }
}

/// A run as it appears in the source markup (text + resolved formatting)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub text: String,
    pub format: RunFormat,
}

impl Run {
    pub fn new(text: impl Into<String>, format: RunFormat) -> Self {
        Self {
            text: text.into(),
            format,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, RunFormat::default())
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self::new(
            text,
            RunFormat {
                bold: true,
                underline: false,
            },
        )
    }

    pub fn underline(text: impl Into<String>) -> Self {
        Self::new(
            text,
            RunFormat {
                bold: false,
                underline: true,
            },
        )
    }
}

/// Where a paragraph came from in the document body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParagraphOrigin {
    Body,
    TableCell { table: usize, row: usize, cell: usize },
}

/// A merged emphasis span inside one paragraph.
/// Offsets are char offsets into `Paragraph::text`, end exclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub paragraph: usize,
    pub start: usize,
    pub end: usize,
    pub style: StyleKind,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paragraph {
    pub index: usize,
    pub text: String,
    pub style_id: Option<String>,
    /// Outline level derived from the paragraph style ("Heading 2" -> 2)
    pub heading_level: Option<u32>,
    pub origin: ParagraphOrigin,
    pub spans: Vec<Span>,
}

impl Paragraph {
    pub fn spans_of(&self, style: StyleKind) -> impl Iterator<Item = &Span> {
        self.spans.iter().filter(move |s| s.style == style)
    }
}

/// A heading-delimited region of a document, the unit of alignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub label: String,
    pub ordinal: usize,
    pub level: Option<u32>,
    pub is_preamble: bool,
    /// Indices into the owning document's paragraph list
    pub paragraphs: Range<usize>,
}

impl Section {
    pub fn paragraph_count(&self) -> usize {
        self.paragraphs.len()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub creator: Option<String>,
    pub last_modified_by: Option<String>,
    pub modified: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Display name, usually the input file name
    pub name: String,
    pub language: Language,
    /// Hex SHA-256 of the input bytes
    pub digest: String,
    pub metadata: DocumentMetadata,
    pub paragraphs: Vec<Paragraph>,
    pub sections: Vec<Section>,
}

impl Document {
    pub fn section_paragraphs(&self, section: &Section) -> &[Paragraph] {
        &self.paragraphs[section.paragraphs.clone()]
    }

    /// All spans of one style inside a section, in document order
    pub fn section_spans(&self, section: &Section, style: StyleKind) -> Vec<&Span> {
        self.section_paragraphs(section)
            .iter()
            .flat_map(|p| p.spans_of(style))
            .collect()
    }

    pub fn span_count(&self, style: StyleKind) -> usize {
        self.paragraphs.iter().map(|p| p.spans_of(style).count()).sum()
    }
}

// ===== PREPROCESSOR OUTPUT =====

/// A paragraph as read from the container, before span extraction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawParagraph {
    pub runs: Vec<Run>,
    pub style_id: Option<String>,
    pub heading_level: Option<u32>,
    pub origin: ParagraphOrigin,
}

impl RawParagraph {
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

/// Complete output from document preprocessing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessorOutput {
    /// Body paragraphs and table-cell paragraphs in reading order
    pub paragraphs: Vec<RawParagraph>,
    pub metadata: DocumentMetadata,
    /// Cell text of every table, in document order
    pub tables: Vec<RawTable>,
}

/// Plain cell text of one table; paragraphs inside a cell are joined by '\n'
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTable {
    pub index: usize,
    pub rows: Vec<Vec<String>>,
}

// ===== ALIGNMENT =====

/// Pairing of one source section with zero or one target section.
/// For unmatched sections `score` is the best rejected candidate score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alignment {
    pub source: usize,
    pub target: Option<usize>,
    pub score: f64,
}

impl Alignment {
    pub fn is_matched(&self) -> bool {
        self.target.is_some()
    }
}

/// Non-fatal: a section was left without a counterpart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentWarning {
    pub language: Language,
    pub section: usize,
    pub label: String,
    pub best_score: f64,
}

impl fmt::Display for AlignmentWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} section {} '{}' has no counterpart (best score {:.2})",
            self.language, self.section, self.label, self.best_score
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlignmentResult {
    /// One entry per source section, in source order
    pub alignments: Vec<Alignment>,
    pub unmatched_source: Vec<usize>,
    pub unmatched_target: Vec<usize>,
    pub warnings: Vec<AlignmentWarning>,
}

impl AlignmentResult {
    pub fn matched(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.alignments
            .iter()
            .filter_map(|a| a.target.map(|t| (a.source, t, a.score)))
    }

    pub fn target_for(&self, source: usize) -> Option<&Alignment> {
        self.alignments.iter().find(|a| a.source == source)
    }
}

// ===== DISCREPANCIES =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancyKind {
    /// Styled content present in the source section only
    MissingInTarget,
    /// Styled content present in the target section only
    MissingInSource,
    /// Whole section without a counterpart on the other side
    NoCounterpart { side: Language },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discrepancy {
    /// Source ordinal, or target ordinal for target-only sections. Target-only
    /// entries are listed after all source-keyed ones.
    pub section_ordinal: usize,
    pub source_section: Option<usize>,
    pub target_section: Option<usize>,
    /// None for section-level discrepancies
    pub style: Option<StyleKind>,
    pub kind: DiscrepancyKind,
    pub text: Option<String>,
    pub description: String,
    pub severity: Severity,
}

impl Discrepancy {
    pub fn is_section_level(&self) -> bool {
        self.style.is_none()
    }
}

// ===== REPORT =====

/// Short per-document summary carried by the report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub name: String,
    pub digest: String,
    pub title: Option<String>,
    pub paragraphs: usize,
    pub sections: usize,
    pub bold_spans: usize,
    pub underline_spans: usize,
}

impl DocumentSummary {
    pub fn from_document(document: &Document) -> Self {
        Self {
            name: document.name.clone(),
            digest: document.digest.clone(),
            title: document.metadata.title.clone(),
            paragraphs: document.paragraphs.len(),
            sections: document.sections.len(),
            bold_spans: document.span_count(StyleKind::Bold),
            underline_spans: document.span_count(StyleKind::Underline),
        }
    }
}

/// Everything the report renderer needs, finalized
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    pub styles: Vec<StyleKind>,
    pub source: Document,
    pub target: Document,
    pub alignment: AlignmentResult,
    pub discrepancies: Vec<Discrepancy>,
}

impl ComparisonReport {
    pub fn new(
        source: Document,
        target: Document,
        alignment: AlignmentResult,
        discrepancies: Vec<Discrepancy>,
        styles: Vec<StyleKind>,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            generated_at: Utc::now(),
            styles,
            source,
            target,
            alignment,
            discrepancies,
        }
    }

    pub fn warning_count(&self) -> usize {
        self.discrepancies
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }
}
