//! Document Preprocessors
//!
//! Converts document containers into a unified `PreprocessorOutput` that feeds
//! the run extractor and the section segmenter.
//!
//! ```text
//! Document (.docx)
//!     ↓
//! [Format-specific Preprocessor]
//!     ↓
//! PreprocessorOutput (paragraphs + runs + tables)
//!     ↓
//! [Extractor → Segmenter]
//!     ↓
//! Document
//! ```

pub mod docx;
pub mod traits;

pub use docx::DocxPreprocessor;
pub use traits::{DocumentMarkup, Preprocessor};
