// Styleaudit Core Library
//
// Audits bold/underline emphasis between a source-language document and its
// target-language translation: DOCX → paragraphs and spans → sections →
// aligned section pairs → discrepancies → report.

pub mod types;
pub mod error;
pub mod config;
pub mod preprocessors;
pub mod extractor;
pub mod segmenter;
pub mod similarity;
pub mod aligner;
pub mod comparator;
pub mod report;
pub mod processor;

// Re-export main types and functions for easy use
pub use types::*;
pub use error::{AuditError, SegmentationError, Stage};
pub use config::AuditConfig;
pub use preprocessors::{DocxPreprocessor, Preprocessor};
pub use extractor::RunExtractor;
pub use segmenter::{segment, HeadingDetector};
pub use similarity::SimilarityMetric;
pub use aligner::SectionAligner;
pub use comparator::Comparator;
pub use report::{render_html, render_json, save_report};
pub use processor::{AuditProcessor, PipelineStages};
