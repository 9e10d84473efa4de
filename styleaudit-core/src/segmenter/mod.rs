//! Section segmentation.
//!
//! Partitions a document's paragraphs into contiguous, non-overlapping
//! sections. Headings come from an injected [`HeadingDetector`]; the
//! paragraphs before the first heading form a preamble section.

pub mod detectors;
pub mod toc;

pub use detectors::{
    CompositeHeadingDetector, HeadingDetector, PatternHeadingDetector, StyleHeadingDetector,
    TocHeadingDetector,
};
pub use toc::{find_toc, TableOfContents};

use crate::config::SegmentationConfig;
use crate::error::{AuditError, SegmentationError};
use crate::types::{Language, Paragraph, RawTable, Section};
use regex::RegexBuilder;

pub const PREAMBLE_LABEL: &str = "Preamble";

/// Split `paragraphs` into sections.
///
/// Every paragraph lands in exactly one section. An empty document yields no
/// sections; a non-empty one without any heading is an error.
pub fn segment(
    paragraphs: &[Paragraph],
    detector: &mut dyn HeadingDetector,
) -> Result<Vec<Section>, SegmentationError> {
    let mut sections: Vec<Section> = Vec::new();

    for (i, paragraph) in paragraphs.iter().enumerate() {
        let Some(label) = detector.detect(paragraph) else {
            continue;
        };

        match sections.last_mut() {
            Some(open) => open.paragraphs.end = i,
            None if i > 0 => sections.push(Section {
                label: PREAMBLE_LABEL.to_string(),
                ordinal: 0,
                level: None,
                is_preamble: true,
                paragraphs: 0..i,
            }),
            None => {}
        }

        log::debug!("Heading at paragraph {i} via {}: {label}", detector.name());
        sections.push(Section {
            label,
            ordinal: sections.len(),
            level: paragraph.heading_level,
            is_preamble: false,
            paragraphs: i..i,
        });
    }

    if paragraphs.is_empty() {
        return Ok(sections);
    }
    let Some(last) = sections.last_mut() else {
        return Err(SegmentationError);
    };
    last.paragraphs.end = paragraphs.len();

    Ok(sections)
}

/// One section spanning the whole document
pub fn whole_document(name: &str, paragraph_count: usize) -> Vec<Section> {
    vec![Section {
        label: format!("Whole Document ({name})"),
        ordinal: 0,
        level: None,
        is_preamble: false,
        paragraphs: 0..paragraph_count,
    }]
}

/// Assemble the detector chain for one document: TOC titles (when a TOC
/// table is found), heading styles, then extra patterns.
pub fn build_detector(
    config: &SegmentationConfig,
    language: Language,
    tables: &[RawTable],
) -> Result<CompositeHeadingDetector, AuditError> {
    let toc_config = config.toc_for(language);
    let mut detector = CompositeHeadingDetector::new();

    if config.use_toc {
        let title_pattern = RegexBuilder::new(&toc_config.title_pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| AuditError::Config(format!("bad title_pattern: {e}")))?;
        match find_toc(tables, &toc_config.toc_keyword, &title_pattern) {
            Some(toc) => {
                log::info!(
                    "{language}: TOC table {} lists {} titles",
                    toc.table,
                    toc.titles.len()
                );
                detector.push(Box::new(TocHeadingDetector::new(toc)));
            }
            None => log::debug!("{language}: no TOC table with keyword '{}'", toc_config.toc_keyword),
        }
    }

    if config.use_styles || !config.heading_styles.is_empty() {
        let style_ids = config.heading_styles.clone();
        if config.use_styles {
            detector.push(Box::new(StyleHeadingDetector::new(style_ids)));
        } else {
            // Listed style ids only, ignore outline levels
            detector.push(Box::new(move |p: &Paragraph| {
                p.style_id
                    .as_ref()
                    .is_some_and(|id| style_ids.iter().any(|s| s.eq_ignore_ascii_case(id)))
            }));
        }
    }

    if !config.heading_patterns.is_empty() {
        let patterns = PatternHeadingDetector::new(&config.heading_patterns)
            .map_err(|e| AuditError::Config(format!("bad heading pattern: {e}")))?
            .with_max_chars(config.max_heading_chars);
        detector.push(Box::new(patterns));
    }

    Ok(detector)
}
