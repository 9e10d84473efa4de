//! Run extraction: raw runs → merged emphasis spans.
//!
//! For each audited style, consecutive styled runs form one interval. Leading
//! and trailing whitespace is trimmed off, whitespace-only intervals are
//! dropped, and intervals separated by a short gap of whitespace/punctuation
//! (at most `merge_gap` chars) are merged into one logical span.

use crate::config::ExtractionConfig;
use crate::types::*;
use std::ops::Range;

/// Gap characters that never break a merge: whitespace and punctuation
fn is_gap_char(c: char) -> bool {
    c.is_whitespace() || !c.is_alphanumeric()
}

#[derive(Debug, Clone)]
pub struct RunExtractor {
    styles: Vec<StyleKind>,
    merge_gap: usize,
    include_tables: bool,
}

impl Default for RunExtractor {
    fn default() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }
}

impl RunExtractor {
    /// Duplicate styles are dropped so each span is produced once
    pub fn new(mut styles: Vec<StyleKind>, merge_gap: usize) -> Self {
        styles.sort();
        styles.dedup();
        Self {
            styles,
            merge_gap,
            include_tables: true,
        }
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new(config.audited_styles(), config.merge_gap).with_tables(config.include_tables)
    }

    pub fn with_tables(mut self, include_tables: bool) -> Self {
        self.include_tables = include_tables;
        self
    }

    /// Build the immutable paragraph list for a document
    pub fn extract(&self, raw: &[RawParagraph]) -> Vec<Paragraph> {
        raw.iter()
            .enumerate()
            .map(|(index, p)| self.extract_paragraph(index, p))
            .collect()
    }

    pub fn extract_paragraph(&self, index: usize, raw: &RawParagraph) -> Paragraph {
        let text = raw.text();
        let chars: Vec<char> = text.chars().collect();

        let skip = !self.include_tables && matches!(raw.origin, ParagraphOrigin::TableCell { .. });
        let mut spans = Vec::new();
        if !skip {
            for &style in &self.styles {
                for range in self.style_ranges(&raw.runs, &chars, style) {
                    spans.push(Span {
                        paragraph: index,
                        start: range.start,
                        end: range.end,
                        style,
                        text: chars[range].iter().collect(),
                    });
                }
            }
        }
        spans.sort_by_key(|s| (s.start, s.style));

        Paragraph {
            index,
            text,
            style_id: raw.style_id.clone(),
            heading_level: raw.heading_level,
            origin: raw.origin,
            spans,
        }
    }

    /// Char ranges of merged spans of one style
    fn style_ranges(&self, runs: &[Run], chars: &[char], style: StyleKind) -> Vec<Range<usize>> {
        // Contiguous styled runs first
        let mut raw_ranges: Vec<Range<usize>> = Vec::new();
        let mut offset = 0;
        for run in runs {
            let len = run.text.chars().count();
            if run.format.has(style) && len > 0 {
                match raw_ranges.last_mut() {
                    Some(last) if last.end == offset => last.end = offset + len,
                    _ => raw_ranges.push(offset..offset + len),
                }
            }
            offset += len;
        }

        let trimmed = raw_ranges.into_iter().filter_map(|r| trim_range(chars, r));
        merge_ranges(chars, trimmed, self.merge_gap)
    }
}

fn trim_range(chars: &[char], range: Range<usize>) -> Option<Range<usize>> {
    let mut start = range.start;
    let mut end = range.end;
    while start < end && chars[start].is_whitespace() {
        start += 1;
    }
    while end > start && chars[end - 1].is_whitespace() {
        end -= 1;
    }
    (start < end).then_some(start..end)
}

/// Merge ranges whose gap is short and made only of whitespace/punctuation
pub fn merge_ranges(
    chars: &[char],
    ranges: impl IntoIterator<Item = Range<usize>>,
    merge_gap: usize,
) -> Vec<Range<usize>> {
    let mut merged: Vec<Range<usize>> = Vec::new();
    for range in ranges {
        if let Some(last) = merged.last_mut() {
            let gap = &chars[last.end..range.start];
            if gap.len() <= merge_gap && gap.iter().all(|&c| is_gap_char(c)) {
                last.end = range.end;
                continue;
            }
        }
        merged.push(range);
    }
    merged
}
