//! Heading detectors.
//!
//! A detector decides whether a paragraph opens a new section and, if so,
//! which label that section carries. Detectors may keep state across calls
//! (the TOC detector walks its title list with a cursor), so they are fed
//! paragraphs strictly in document order.

use super::toc::TableOfContents;
use crate::similarity::{IndelRatio, SimilarityMetric};
use crate::types::{Paragraph, ParagraphOrigin};
use regex::{Regex, RegexBuilder};

pub trait HeadingDetector {
    fn name(&self) -> &str {
        "custom"
    }

    /// Section label when `paragraph` is a heading
    fn detect(&mut self, paragraph: &Paragraph) -> Option<String>;
}

/// Any predicate works as a detector; the label is the trimmed paragraph text.
impl<F> HeadingDetector for F
where
    F: FnMut(&Paragraph) -> bool,
{
    fn detect(&mut self, paragraph: &Paragraph) -> Option<String> {
        let label = paragraph.text.trim();
        (!label.is_empty() && self(paragraph)).then(|| label.to_string())
    }
}

// ===== PATTERN =====

pub struct PatternHeadingDetector {
    patterns: Vec<Regex>,
    max_chars: Option<usize>,
}

impl PatternHeadingDetector {
    pub fn new(patterns: &[String]) -> Result<Self, regex::Error> {
        let patterns = patterns
            .iter()
            .map(|p| RegexBuilder::new(p).case_insensitive(true).build())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            patterns,
            max_chars: None,
        })
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = Some(max_chars);
        self
    }
}

impl HeadingDetector for PatternHeadingDetector {
    fn name(&self) -> &str {
        "pattern"
    }

    fn detect(&mut self, paragraph: &Paragraph) -> Option<String> {
        let text = paragraph.text.trim();
        if text.is_empty() {
            return None;
        }
        if self.max_chars.is_some_and(|max| text.chars().count() > max) {
            return None;
        }
        self.patterns
            .iter()
            .any(|p| p.is_match(text))
            .then(|| text.to_string())
    }
}

// ===== STYLE =====

/// Fires on paragraphs whose style resolves to a heading level, or whose
/// style id is listed explicitly.
#[derive(Debug, Default)]
pub struct StyleHeadingDetector {
    style_ids: Vec<String>,
}

impl StyleHeadingDetector {
    pub fn new(style_ids: Vec<String>) -> Self {
        Self { style_ids }
    }
}

impl HeadingDetector for StyleHeadingDetector {
    fn name(&self) -> &str {
        "style"
    }

    fn detect(&mut self, paragraph: &Paragraph) -> Option<String> {
        let text = paragraph.text.trim();
        if text.is_empty() {
            return None;
        }
        let listed = paragraph
            .style_id
            .as_ref()
            .is_some_and(|id| self.style_ids.iter().any(|s| s.eq_ignore_ascii_case(id)));
        (paragraph.heading_level.is_some() || listed).then(|| text.to_string())
    }
}

// ===== TOC =====

/// Body text length may differ from the TOC title by this factor either way
const LENGTH_RATIO_RANGE: std::ops::RangeInclusive<f64> = 0.8..=1.2;
const FUZZY_TITLE_THRESHOLD: f64 = 0.8;

/// Walks the TOC titles in order. Each body paragraph is compared only with
/// the next expected title; a match labels the section with the TOC title
/// and moves on to the following one.
pub struct TocHeadingDetector {
    titles: Vec<String>,
    cursor: usize,
    toc_table: usize,
}

impl TocHeadingDetector {
    pub fn new(toc: TableOfContents) -> Self {
        Self {
            titles: toc.titles,
            cursor: 0,
            toc_table: toc.table,
        }
    }

    /// Titles not yet found in the body
    pub fn remaining(&self) -> &[String] {
        &self.titles[self.cursor.min(self.titles.len())..]
    }

    fn matches_title(title: &str, text: &str) -> bool {
        let title_key: String = title.chars().filter(|c| !c.is_whitespace()).collect();
        let text_key: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        if title_key.to_lowercase() == text_key.to_lowercase() {
            return true;
        }

        let title_len = title_key.chars().count();
        if title_len == 0 {
            return false;
        }
        let ratio = text_key.chars().count() as f64 / title_len as f64;
        LENGTH_RATIO_RANGE.contains(&ratio)
            && IndelRatio.score_normalized(&title.to_lowercase(), &text.to_lowercase())
                >= FUZZY_TITLE_THRESHOLD
    }
}

impl HeadingDetector for TocHeadingDetector {
    fn name(&self) -> &str {
        "toc"
    }

    fn detect(&mut self, paragraph: &Paragraph) -> Option<String> {
        if matches!(paragraph.origin, ParagraphOrigin::TableCell { table, .. } if table == self.toc_table) {
            return None;
        }
        let text = paragraph.text.trim();
        let title = self.titles.get(self.cursor)?;
        if text.is_empty() || !Self::matches_title(title, text) {
            return None;
        }
        let label = title.clone();
        self.cursor += 1;
        Some(label)
    }
}

// ===== COMPOSITE =====

/// First detector that fires names the heading. Every detector is still
/// run on every paragraph, so stateful detectors (TOC cursor) advance past
/// headings that an earlier detector claimed.
#[derive(Default)]
pub struct CompositeHeadingDetector {
    detectors: Vec<Box<dyn HeadingDetector + Send>>,
}

impl CompositeHeadingDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, detector: impl HeadingDetector + Send + 'static) -> Self {
        self.detectors.push(Box::new(detector));
        self
    }

    pub fn push(&mut self, detector: Box<dyn HeadingDetector + Send>) {
        self.detectors.push(detector);
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }
}

impl HeadingDetector for CompositeHeadingDetector {
    fn name(&self) -> &str {
        "composite"
    }

    fn detect(&mut self, paragraph: &Paragraph) -> Option<String> {
        let mut label = None;
        for detector in &mut self.detectors {
            let found = detector.detect(paragraph);
            if label.is_none() {
                label = found;
            }
        }
        label
    }
}
