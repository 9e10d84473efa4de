//! Span comparison across aligned sections.
//!
//! Spans are compared as content, not strings: two spans match when their
//! texts are equal after lowercasing and removing all whitespace. Each style
//! is compared on its own, with set semantics.

use crate::similarity::content_key;
use crate::types::*;
use std::collections::HashSet;

pub struct Comparator {
    styles: Vec<StyleKind>,
}

impl Default for Comparator {
    fn default() -> Self {
        Self::new(StyleKind::ALL.to_vec())
    }
}

/// Distinct spans of a section in document order, keyed by normalized content
struct SpanSet<'a> {
    entries: Vec<(String, &'a Span)>,
    keys: HashSet<String>,
}

impl<'a> SpanSet<'a> {
    fn collect(document: &'a Document, section: &Section, style: StyleKind) -> Self {
        let mut entries = Vec::new();
        let mut keys = HashSet::new();
        for span in document.section_spans(section, style) {
            let key = content_key(&span.text);
            if !key.is_empty() && keys.insert(key.clone()) {
                entries.push((key, span));
            }
        }
        Self { entries, keys }
    }

    /// Spans whose content does not occur in `other`
    fn missing_from(&self, other: &SpanSet<'_>) -> Vec<&'a Span> {
        self.entries
            .iter()
            .filter(|(key, _)| !other.keys.contains(key))
            .map(|(_, span)| *span)
            .collect()
    }
}

impl Comparator {
    pub fn new(styles: Vec<StyleKind>) -> Self {
        Self { styles }
    }

    /// Discrepancies for every alignment entry and every unmatched target
    /// section. Entries keyed by a source section come first, sorted by
    /// section ordinal then style (section-level first); target-only
    /// sections follow in target order.
    pub fn compare(&self, source: &Document, target: &Document, alignment: &AlignmentResult) -> Vec<Discrepancy> {
        let mut discrepancies = Vec::new();

        for entry in &alignment.alignments {
            let Some(src) = source.sections.get(entry.source) else {
                log::warn!("Alignment refers to missing source section {}", entry.source);
                continue;
            };
            match entry.target.and_then(|j| target.sections.get(j)) {
                Some(tgt) => {
                    for &style in &self.styles {
                        self.compare_pair(source, src, target, tgt, style, &mut discrepancies);
                    }
                }
                None => discrepancies.push(no_counterpart(Language::Source, src)),
            }
        }

        for &j in &alignment.unmatched_target {
            if let Some(tgt) = target.sections.get(j) {
                discrepancies.push(no_counterpart(Language::Target, tgt));
            }
        }

        // Stable: spans keep document order within a (section, style) group
        discrepancies.sort_by_key(|d| (d.source_section.is_none(), d.section_ordinal, d.style));
        log::info!("Comparison found {} discrepancies", discrepancies.len());
        discrepancies
    }

    fn compare_pair(
        &self,
        source: &Document,
        src: &Section,
        target: &Document,
        tgt: &Section,
        style: StyleKind,
        out: &mut Vec<Discrepancy>,
    ) {
        let src_set = SpanSet::collect(source, src, style);
        let tgt_set = SpanSet::collect(target, tgt, style);

        // Equal counts with different content usually means translated text
        let severity = if src_set.entries.len() == tgt_set.entries.len() {
            Severity::Info
        } else {
            Severity::Warning
        };

        let make = |span: &Span, kind: DiscrepancyKind| {
            let (here, there) = match kind {
                DiscrepancyKind::MissingInSource => (tgt, src),
                _ => (src, tgt),
            };
            Discrepancy {
                section_ordinal: src.ordinal,
                source_section: Some(src.ordinal),
                target_section: Some(tgt.ordinal),
                style: Some(style),
                kind,
                text: Some(span.text.clone()),
                description: format!(
                    "{style} text \"{}\" in section '{}' has no {style} counterpart in '{}'",
                    span.text, here.label, there.label
                ),
                severity,
            }
        };

        out.extend(
            src_set
                .missing_from(&tgt_set)
                .into_iter()
                .map(|span| make(span, DiscrepancyKind::MissingInTarget)),
        );
        out.extend(
            tgt_set
                .missing_from(&src_set)
                .into_iter()
                .map(|span| make(span, DiscrepancyKind::MissingInSource)),
        );
    }
}

fn no_counterpart(side: Language, section: &Section) -> Discrepancy {
    let (source_section, target_section) = match side {
        Language::Source => (Some(section.ordinal), None),
        Language::Target => (None, Some(section.ordinal)),
    };
    Discrepancy {
        section_ordinal: section.ordinal,
        source_section,
        target_section,
        style: None,
        kind: DiscrepancyKind::NoCounterpart { side },
        text: None,
        description: format!("{side} section '{}': no counterpart found", section.label),
        severity: Severity::Warning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One paragraph per section, holding the given spans
    fn document(language: Language, sections: &[(&str, &[(StyleKind, &str)])]) -> Document {
        let mut paragraphs = Vec::new();
        let mut secs = Vec::new();
        for (ordinal, (label, spans)) in sections.iter().enumerate() {
            let text = spans.iter().map(|(_, t)| *t).collect::<Vec<_>>().join(" ");
            let mut offset = 0;
            let spans = spans
                .iter()
                .map(|(style, t)| {
                    let len = t.chars().count();
                    let span = Span {
                        paragraph: ordinal,
                        start: offset,
                        end: offset + len,
                        style: *style,
                        text: t.to_string(),
                    };
                    offset += len + 1;
                    span
                })
                .collect();
            paragraphs.push(Paragraph {
                index: ordinal,
                text,
                style_id: None,
                heading_level: None,
                origin: ParagraphOrigin::Body,
                spans,
            });
            secs.push(Section {
                label: label.to_string(),
                ordinal,
                level: None,
                is_preamble: false,
                paragraphs: ordinal..ordinal + 1,
            });
        }
        Document {
            name: format!("{language}.docx"),
            language,
            digest: String::new(),
            metadata: DocumentMetadata::default(),
            paragraphs,
            sections: secs,
        }
    }

    fn aligned(pairs: &[(usize, Option<usize>)], unmatched_target: Vec<usize>) -> AlignmentResult {
        AlignmentResult {
            alignments: pairs
                .iter()
                .map(|&(source, target)| Alignment {
                    source,
                    target,
                    score: 1.0,
                })
                .collect(),
            unmatched_source: pairs.iter().filter(|p| p.1.is_none()).map(|p| p.0).collect(),
            unmatched_target,
            warnings: Vec::new(),
        }
    }

    use crate::types::StyleKind::{Bold, Underline};

    #[test]
    fn test_content_comparison_ignores_case_and_whitespace() {
        let source = document(Language::Source, &[("Scope", &[(Bold, "Total Amount"), (Bold, "NOTE")])]);
        let target = document(Language::Target, &[("Scope", &[(Bold, "total  amount"), (Bold, "Note")])]);
        let result = Comparator::default().compare(&source, &target, &aligned(&[(0, Some(0))], vec![]));
        assert!(result.is_empty());
    }

    #[test]
    fn test_span_missing_on_each_side() {
        let source = document(Language::Source, &[("Pricing", &[(Bold, "30 days"), (Underline, "net")])]);
        let target = document(
            Language::Target,
            &[("Pricing", &[(Bold, "30 days"), (Bold, "penalty"), (Underline, "gross")])],
        );
        let result = Comparator::default().compare(&source, &target, &aligned(&[(0, Some(0))], vec![]));

        assert_eq!(result.len(), 3);
        assert_eq!(result[0].style, Some(Bold));
        assert_eq!(result[0].kind, DiscrepancyKind::MissingInSource);
        assert_eq!(result[0].text.as_deref(), Some("penalty"));
        assert_eq!(result[0].severity, Severity::Warning);

        // One underline span each side: likely translated, reported as info
        assert_eq!(result[1].style, Some(Underline));
        assert_eq!(result[1].kind, DiscrepancyKind::MissingInTarget);
        assert_eq!(result[1].severity, Severity::Info);
        assert_eq!(result[2].kind, DiscrepancyKind::MissingInSource);
    }

    #[test]
    fn test_styles_are_independent() {
        let source = document(Language::Source, &[("A", &[(Bold, "Deadline")])]);
        let target = document(Language::Target, &[("A", &[(Underline, "Deadline")])]);
        let result = Comparator::new(vec![Bold]).compare(&source, &target, &aligned(&[(0, Some(0))], vec![]));
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].kind, DiscrepancyKind::MissingInTarget);
    }

    #[test]
    fn test_unmatched_sections_yield_single_section_discrepancy() {
        let source = document(
            Language::Source,
            &[("A", &[(Bold, "x")]), ("B", &[(Bold, "y"), (Bold, "z")])],
        );
        let target = document(Language::Target, &[("A", &[(Bold, "x")]), ("C", &[(Bold, "w")])]);
        let result = Comparator::default().compare(&source, &target, &aligned(&[(0, Some(0)), (1, None)], vec![1]));

        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|d| d.is_section_level()));
        assert_eq!(result[0].kind, DiscrepancyKind::NoCounterpart { side: Language::Source });
        assert_eq!(result[1].kind, DiscrepancyKind::NoCounterpart { side: Language::Target });
        assert_eq!(result[1].target_section, Some(1));
    }

    #[test]
    fn test_target_only_sections_sort_after_source_sections() {
        let source = document(
            Language::Source,
            &[("A", &[]), ("B", &[]), ("C", &[]), ("D", &[(Bold, "d")])],
        );
        let target = document(Language::Target, &[("X", &[]), ("A", &[]), ("Y", &[])]);
        let alignment = aligned(&[(0, Some(1)), (1, None), (2, None), (3, None)], vec![0, 2]);
        let result = Comparator::default().compare(&source, &target, &alignment);

        let order: Vec<_> = result.iter().map(|d| (d.section_ordinal, d.kind)).collect();
        assert_eq!(
            order,
            vec![
                (1, DiscrepancyKind::NoCounterpart { side: Language::Source }),
                (2, DiscrepancyKind::NoCounterpart { side: Language::Source }),
                (3, DiscrepancyKind::NoCounterpart { side: Language::Source }),
                (0, DiscrepancyKind::NoCounterpart { side: Language::Target }),
                (2, DiscrepancyKind::NoCounterpart { side: Language::Target }),
            ]
        );
    }

    #[test]
    fn test_sorted_and_idempotent() {
        let source = document(
            Language::Source,
            &[("A", &[(Underline, "u1"), (Bold, "b1")]), ("B", &[(Bold, "b2")])],
        );
        let target = document(Language::Target, &[("A", &[]), ("B", &[])]);
        let alignment = aligned(&[(0, Some(0)), (1, Some(1))], vec![]);
        let comparator = Comparator::default();

        let first = comparator.compare(&source, &target, &alignment);
        let keys: Vec<_> = first.iter().map(|d| (d.section_ordinal, d.style)).collect();
        assert_eq!(keys, vec![(0, Some(Bold)), (0, Some(Underline)), (1, Some(Bold))]);
        assert_eq!(comparator.compare(&source, &target, &alignment), first);
    }
}
