use std::fmt;
use thiserror::Error;

/// Pipeline stage in which a fatal error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Read,
    Unzip,
    Parse,
    Segment,
    Config,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Read => "read",
            Stage::Unzip => "unzip",
            Stage::Parse => "parse",
            Stage::Segment => "segment",
            Stage::Config => "config",
        };
        f.write_str(name)
    }
}

/// Fatal errors. Any of these prevents report generation.
///
/// Unmatched sections are not errors: they are recorded as
/// [`AlignmentWarning`](crate::types::AlignmentWarning)s and shown in the report.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Missing or corrupt input file
    #[error("{document}: {stage} failed: {message}")]
    Input {
        document: String,
        stage: Stage,
        message: String,
    },

    /// Non-empty document without a single detectable heading
    #[error("{document}: segment failed: no section headings detected")]
    Segmentation { document: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl AuditError {
    pub fn input(document: impl Into<String>, stage: Stage, message: impl fmt::Display) -> Self {
        AuditError::Input {
            document: document.into(),
            stage,
            message: message.to_string(),
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            AuditError::Input { stage, .. } => *stage,
            AuditError::Segmentation { .. } => Stage::Segment,
            AuditError::Config(_) => Stage::Config,
        }
    }

    pub fn document(&self) -> Option<&str> {
        match self {
            AuditError::Input { document, .. } | AuditError::Segmentation { document } => {
                Some(document)
            }
            AuditError::Config(_) => None,
        }
    }
}

/// Returned by the segmenter; the caller attaches document identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no section headings detected in a non-empty document")]
pub struct SegmentationError;

impl SegmentationError {
    pub fn for_document(self, document: impl Into<String>) -> AuditError {
        AuditError::Segmentation {
            document: document.into(),
        }
    }
}
