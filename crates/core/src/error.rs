//! Error types shared by every deck crate.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building, editing or persisting a deck.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to read or write a file.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Two evidence records claimed the same id in one pass.
    #[error("Duplicate evidence id: {0}")]
    DuplicateEvidence(String),

    /// An evidence id is empty or contains whitespace/control characters.
    #[error("Invalid evidence id: {0:?}")]
    InvalidEvidenceId(String),

    /// A mutation tried to cite evidence that is not in the current index.
    #[error("Slide '{slide_id}' cannot reference unknown evidence '{evidence_id}'")]
    DanglingReference {
        slide_id: String,
        evidence_id: String,
    },

    /// No slide with the given id exists in the deck.
    #[error("Unknown slide: {0}")]
    UnknownSlide(String),

    /// The slide's type does not carry the field being edited.
    #[error("Slide '{slide_id}' has no field '{field}'")]
    InvalidField { slide_id: String, field: String },

    /// A reorder target lies outside the deck.
    #[error("Cannot move slide '{slide_id}' to index {index} (deck has {len} slides)")]
    SlideIndexOutOfRange {
        slide_id: String,
        index: usize,
        len: usize,
    },

    /// Attaching another visual would exceed the per-slide maximum.
    #[error("Slide '{slide_id}' already holds the maximum of {max} visual(s)")]
    VisualLimit { slide_id: String, max: usize },

    /// Strict quality gate rejected the deck.
    #[error("Quality gate failed:\n{}", format_gate_errors(.0))]
    QualityGateFailed(Vec<String>),

    /// Invalid configuration value or unreadable config file.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Session file could not be read or written.
    #[error("Session I/O error: {0}")]
    SessionIoError(String),

    /// Project scanning failed.
    #[error("Scan error: {0}")]
    ScanError(String),

    /// Rendering an output format failed.
    #[error("Render error: {0}")]
    RenderError(String),

    /// Building a package archive failed.
    #[error("Package error: {0}")]
    PackageError(String),

    /// A path escaped the project directory.
    #[error("Path must stay within the project directory: {0}")]
    UnsafePath(String),

    /// JSON (de)serialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl Error {
    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Error::DanglingReference { .. } => "DANGLING_REFERENCE",
            Error::DuplicateEvidence(_) | Error::InvalidEvidenceId(_) => "CONSTRUCTION_ERROR",
            Error::UnknownSlide(_)
            | Error::InvalidField { .. }
            | Error::SlideIndexOutOfRange { .. }
            | Error::VisualLimit { .. }
            | Error::UnsafePath(_) => "INVALID_INPUT",
            Error::QualityGateFailed(_) => "QUALITY_GATE_FAILED",
            Error::ConfigError(_) => "CONFIG_ERROR",
            Error::IoError(_) | Error::SessionIoError(_) => "IO_ERROR",
            Error::SerializationError(_) => "PARSE_ERROR",
            Error::ScanError(_) | Error::RenderError(_) | Error::PackageError(_) => {
                "RUNTIME_ERROR"
            }
        }
    }
}

fn format_gate_errors(errors: &[String]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_failure_lists_every_error() {
        let err = Error::QualityGateFailed(vec![
            "Slide 'problem' has no evidence references".to_string(),
            "Deck has no slides".to_string(),
        ]);
        let text = err.to_string();
        assert!(text.contains("  - Slide 'problem' has no evidence references"));
        assert!(text.contains("  - Deck has no slides"));
    }

    #[test]
    fn test_error_codes() {
        let err = Error::DanglingReference {
            slide_id: "tech".into(),
            evidence_id: "repo.nope".into(),
        };
        assert_eq!(err.code(), "DANGLING_REFERENCE");
        assert_eq!(Error::ConfigError("x".into()).code(), "CONFIG_ERROR");
    }
}
