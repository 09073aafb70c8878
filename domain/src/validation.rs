//! Structured configuration issues.
//!
//! Configuration is validated in one pass that collects every problem
//! instead of stopping at the first. Callers abort on any
//! [`Severity::Error`] and print warnings.
//!
//! ```
//! use roundtable_domain::validation::{ConfigIssue, ConfigIssueCode, Severity, has_errors};
//!
//! let issues = vec![ConfigIssue::warning(
//!     ConfigIssueCode::UnknownPersona { field: "discussion.participants".into(), id: "cfo".into() },
//!     "discussion.participants: 'cfo' is not in the persona catalog and will be ignored",
//! )];
//! assert!(!has_errors(&issues));
//! ```

/// Severity level of a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fatal: the configuration cannot work at all.
    Error,
    /// Non-fatal: the configuration works but may not behave as expected.
    Warning,
}

/// Identifies a specific configuration issue.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigIssueCode {
    /// Numeric value outside its accepted range.
    OutOfRange { field: String, value: f64 },
    /// Persona id that the catalog does not know.
    UnknownPersona { field: String, id: String },
    /// Provider name that is not supported.
    UnknownProvider { field: String, value: String },
    /// Empty model name.
    EmptyModel { field: String },
    /// A provider in use has no API key.
    MissingApiKey { provider: String, env: String },
}

/// A detected issue in the configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub code: ConfigIssueCode,
    pub message: String,
}

impl ConfigIssue {
    pub fn error(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }

    pub fn warning(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// True if any issue is fatal
pub fn has_errors(issues: &[ConfigIssue]) -> bool {
    issues.iter().any(ConfigIssue::is_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_errors() {
        let warning = ConfigIssue::warning(
            ConfigIssueCode::EmptyModel {
                field: "default_llm.model".to_string(),
            },
            "empty",
        );
        let error = ConfigIssue::error(
            ConfigIssueCode::OutOfRange {
                field: "discussion.max_rounds".to_string(),
                value: 9.0,
            },
            "too many",
        );
        assert!(!has_errors(std::slice::from_ref(&warning)));
        assert!(has_errors(&[warning, error]));
    }
}
