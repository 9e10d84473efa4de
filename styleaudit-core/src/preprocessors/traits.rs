// Preprocessor abstraction for document processing
//
// This module defines the boundary between container parsing (DOCX -> raw
// paragraphs with runs) and everything after it (spans, sections, alignment).
// Everything past this trait is format-agnostic.

use crate::types::*;
use anyhow::Result;
use std::path::Path;

/// Raw markup parts pulled out of a document container
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct DocumentMarkup {
    /// Main body markup (word/document.xml for DOCX)
    pub body: String,
    /// Style definitions, if the container carries them
    pub styles: Option<String>,
    /// Core properties (title, creator, ...)
    pub properties: Option<String>,
}

/// Preprocessor trait - converts documents to raw paragraphs
///
/// The preprocessing happens in two clear steps:
/// 1. Container -> Markup (e.g. DOCX zip -> WordprocessingML strings)
/// 2. Markup -> PreprocessorOutput (paragraphs, runs, tables, metadata)
///
/// Implementations must be shareable across threads; both documents of a
/// pair are preprocessed in parallel.
pub trait Preprocessor: Send + Sync {
    /// Step 1: Unpack the container into markup
    fn extract_markup(&self, bytes: &[u8]) -> Result<DocumentMarkup>;

    /// Step 2: Convert markup to structured output
    fn parse_markup(&self, markup: &DocumentMarkup) -> Result<PreprocessorOutput>;

    /// Convenience method: full processing (combines both steps)
    fn process(&self, bytes: &[u8]) -> Result<PreprocessorOutput> {
        let markup = self.extract_markup(bytes)?;
        self.parse_markup(&markup)
    }

    /// Convenience method: process from file path
    fn process_file(&self, input: &Path) -> Result<PreprocessorOutput> {
        let bytes = std::fs::read(input)?;
        self.process(&bytes)
    }

    /// Get preprocessor name for debugging/logging
    fn name(&self) -> &str;

    /// Check if preprocessor supports the given file type
    fn supports_file_type(&self, path: &Path) -> bool;
}
