//! Failure taxonomy shared by every component of the synchronizer.
//!
//! Each [`ErrorType`] maps to a fixed severity, a fixed recoverability flag and
//! a list of suggestions through the static [`TAXONOMY`] table.

mod handler;
mod log;

pub use handler::{ErrorHandler, RecoveryFn};
pub use log::{ErrorLog, ErrorStats};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};
use ts_rs::TS;

/// Free-form key/value details attached to an error report.
pub type ErrorDetails = BTreeMap<String, String>;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, TS,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    PdfLoadError,
    BrowserCompatibilityError,
    TextExtractionError,
    AudioSynthesisError,
    SynchronizationError,
    OcrError,
    PageNavigationError,
    PerformanceError,
    ValidationError,
    NetworkError,
}

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, TS,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ErrorSeverity::Low => "low",
            ErrorSeverity::Medium => "medium",
            ErrorSeverity::High => "high",
            ErrorSeverity::Critical => "critical",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug)]
pub struct ErrorProfile {
    pub error_type: ErrorType,
    pub severity: ErrorSeverity,
    pub recoverable: bool,
    pub user_message: &'static str,
    pub suggestions: &'static [&'static str],
}

/// Indexed by `ErrorType as usize`.
pub const TAXONOMY: [ErrorProfile; 10] = [
    ErrorProfile {
        error_type: ErrorType::PdfLoadError,
        severity: ErrorSeverity::Critical,
        recoverable: false,
        user_message: "The document could not be opened.",
        suggestions: &["Check that the file is a valid PDF", "Try opening another document"],
    },
    ErrorProfile {
        error_type: ErrorType::BrowserCompatibilityError,
        severity: ErrorSeverity::Critical,
        recoverable: false,
        user_message: "This environment lacks a required capability.",
        suggestions: &["Use an environment with speech synthesis support"],
    },
    ErrorProfile {
        error_type: ErrorType::TextExtractionError,
        severity: ErrorSeverity::High,
        recoverable: true,
        user_message: "Text could not be extracted from part of the document.",
        suggestions: &["Enable OCR for scanned pages", "Try a text-based PDF"],
    },
    ErrorProfile {
        error_type: ErrorType::AudioSynthesisError,
        severity: ErrorSeverity::High,
        recoverable: true,
        user_message: "Narration failed for the current sentence.",
        suggestions: &["Select a different voice", "Reset the speech rate"],
    },
    ErrorProfile {
        error_type: ErrorType::SynchronizationError,
        severity: ErrorSeverity::High,
        recoverable: true,
        user_message: "Narration and page view went out of sync.",
        suggestions: &["Restart narration from the current page"],
    },
    ErrorProfile {
        error_type: ErrorType::OcrError,
        severity: ErrorSeverity::Medium,
        recoverable: true,
        user_message: "Text recognition failed on a scanned page.",
        suggestions: &["Continue with the text layer", "Retry with a clearer scan"],
    },
    ErrorProfile {
        error_type: ErrorType::PageNavigationError,
        severity: ErrorSeverity::Medium,
        recoverable: true,
        user_message: "That page could not be opened.",
        suggestions: &["Choose a page within the document"],
    },
    ErrorProfile {
        error_type: ErrorType::PerformanceError,
        severity: ErrorSeverity::Medium,
        recoverable: true,
        user_message: "The document is responding slowly.",
        suggestions: &["Wait for the current operation to finish"],
    },
    ErrorProfile {
        error_type: ErrorType::ValidationError,
        severity: ErrorSeverity::Low,
        recoverable: true,
        user_message: "A setting was out of range and has been adjusted.",
        suggestions: &["Review narration settings"],
    },
    ErrorProfile {
        error_type: ErrorType::NetworkError,
        severity: ErrorSeverity::Low,
        recoverable: true,
        user_message: "A network resource is unavailable.",
        suggestions: &["Check the connection"],
    },
];

impl ErrorType {
    pub const ALL: [ErrorType; 10] = [
        ErrorType::PdfLoadError,
        ErrorType::BrowserCompatibilityError,
        ErrorType::TextExtractionError,
        ErrorType::AudioSynthesisError,
        ErrorType::SynchronizationError,
        ErrorType::OcrError,
        ErrorType::PageNavigationError,
        ErrorType::PerformanceError,
        ErrorType::ValidationError,
        ErrorType::NetworkError,
    ];

    pub fn profile(self) -> &'static ErrorProfile {
        &TAXONOMY[self as usize]
    }

    pub fn severity(self) -> ErrorSeverity {
        self.profile().severity
    }

    pub fn is_recoverable(self) -> bool {
        self.profile().recoverable
    }
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ErrorType::PdfLoadError => "PDF_LOAD_ERROR",
            ErrorType::BrowserCompatibilityError => "BROWSER_COMPATIBILITY_ERROR",
            ErrorType::TextExtractionError => "TEXT_EXTRACTION_ERROR",
            ErrorType::AudioSynthesisError => "AUDIO_SYNTHESIS_ERROR",
            ErrorType::SynchronizationError => "SYNCHRONIZATION_ERROR",
            ErrorType::OcrError => "OCR_ERROR",
            ErrorType::PageNavigationError => "PAGE_NAVIGATION_ERROR",
            ErrorType::PerformanceError => "PERFORMANCE_ERROR",
            ErrorType::ValidationError => "VALIDATION_ERROR",
            ErrorType::NetworkError => "NETWORK_ERROR",
        };
        write!(f, "{}", label)
    }
}

/// One entry of the error log.
#[derive(Debug, Clone, Serialize, PartialEq, TS)]
pub struct ErrorInfo {
    pub error_type: ErrorType,
    pub severity: ErrorSeverity,
    pub message: String,
    pub context: Option<String>,
    pub details: ErrorDetails,
    #[ts(type = "number")]
    pub timestamp_ms: u64,
    pub recoverable: bool,
    pub recovery_actions: Vec<String>,
}

impl ErrorInfo {
    pub fn new(
        error_type: ErrorType,
        message: impl Into<String>,
        context: Option<&str>,
        details: ErrorDetails,
    ) -> Self {
        let profile = error_type.profile();
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0);
        Self {
            error_type,
            severity: profile.severity,
            message: message.into(),
            context: context.map(str::to_string),
            details,
            timestamp_ms,
            recoverable: profile.recoverable,
            recovery_actions: profile
                .suggestions
                .iter()
                .map(|label| label.to_string())
                .collect(),
        }
    }

    /// Short text suitable for a banner or dialog.
    pub fn user_message(&self) -> String {
        let headline = self.error_type.profile().user_message;
        match self.recovery_actions.first() {
            Some(hint) => format!("{headline} {hint}."),
            None => headline.to_string(),
        }
    }

    /// Critical errors, and high-severity ones that could not be recovered,
    /// stop the current operation. Everything else is advisory.
    pub fn halts_operation(&self, recovered: bool) -> bool {
        match self.severity {
            ErrorSeverity::Critical => true,
            ErrorSeverity::High => !recovered,
            ErrorSeverity::Medium | ErrorSeverity::Low => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_is_indexed_by_discriminant() {
        for (idx, error_type) in ErrorType::ALL.iter().enumerate() {
            assert_eq!(*error_type as usize, idx);
            assert_eq!(TAXONOMY[idx].error_type, *error_type);
        }
    }

    #[test]
    fn severity_and_recoverability_follow_the_table() {
        let expected = [
            (ErrorType::PdfLoadError, ErrorSeverity::Critical, false),
            (ErrorType::BrowserCompatibilityError, ErrorSeverity::Critical, false),
            (ErrorType::TextExtractionError, ErrorSeverity::High, true),
            (ErrorType::AudioSynthesisError, ErrorSeverity::High, true),
            (ErrorType::SynchronizationError, ErrorSeverity::High, true),
            (ErrorType::OcrError, ErrorSeverity::Medium, true),
            (ErrorType::PageNavigationError, ErrorSeverity::Medium, true),
            (ErrorType::PerformanceError, ErrorSeverity::Medium, true),
            (ErrorType::ValidationError, ErrorSeverity::Low, true),
            (ErrorType::NetworkError, ErrorSeverity::Low, true),
        ];
        for (error_type, severity, recoverable) in expected {
            assert_eq!(error_type.severity(), severity, "{error_type}");
            assert_eq!(error_type.is_recoverable(), recoverable, "{error_type}");
        }
    }

    #[test]
    fn info_derives_fields_from_type() {
        let info = ErrorInfo::new(
            ErrorType::OcrError,
            "scan unreadable",
            Some("page 4"),
            ErrorDetails::new(),
        );
        assert_eq!(info.severity, ErrorSeverity::Medium);
        assert!(info.recoverable);
        assert_eq!(info.context.as_deref(), Some("page 4"));
        assert!(!info.recovery_actions.is_empty());
        assert!(info.user_message().starts_with("Text recognition failed"));
    }

    #[test]
    fn halting_policy_depends_on_severity_and_outcome() {
        let critical = ErrorInfo::new(ErrorType::PdfLoadError, "x", None, ErrorDetails::new());
        let high = ErrorInfo::new(ErrorType::AudioSynthesisError, "x", None, ErrorDetails::new());
        let low = ErrorInfo::new(ErrorType::ValidationError, "x", None, ErrorDetails::new());
        assert!(critical.halts_operation(true));
        assert!(high.halts_operation(false));
        assert!(!high.halts_operation(true));
        assert!(!low.halts_operation(false));
    }

    #[test]
    fn serializes_with_screaming_case_labels() {
        let json = serde_json::to_string(&ErrorType::PageNavigationError).unwrap();
        assert_eq!(json, "\"PAGE_NAVIGATION_ERROR\"");
        assert_eq!(ErrorType::PageNavigationError.to_string(), "PAGE_NAVIGATION_ERROR");
    }
}
