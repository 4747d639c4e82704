//! Failure taxonomy: classification of failed outcomes.
//!
//! Pure functions, no state. Error codes are checked before free-text
//! messages, and categories are tried in a fixed order so that a message
//! like "invalid token" classifies as authentication rather than input.

use serde::{Deserialize, Serialize};

/// Fixed set of failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Authentication,
    Permission,
    Timeout,
    NotFound,
    InvalidInput,
    RateLimit,
    Other,
}

/// How serious a failure category is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classification order; the first category whose markers match wins.
const CLASSIFICATION_ORDER: [ErrorCategory; 6] = [
    ErrorCategory::RateLimit,
    ErrorCategory::Timeout,
    ErrorCategory::Authentication,
    ErrorCategory::Permission,
    ErrorCategory::NotFound,
    ErrorCategory::InvalidInput,
];

impl ErrorCategory {
    pub fn as_str(&self) -> &str {
        match self {
            ErrorCategory::Authentication => "authentication",
            ErrorCategory::Permission => "permission",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::NotFound => "not_found",
            ErrorCategory::InvalidInput => "invalid_input",
            ErrorCategory::RateLimit => "rate_limit",
            ErrorCategory::Other => "other",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            ErrorCategory::Authentication | ErrorCategory::Permission => Severity::High,
            ErrorCategory::NotFound => Severity::Low,
            ErrorCategory::Timeout
            | ErrorCategory::InvalidInput
            | ErrorCategory::RateLimit
            | ErrorCategory::Other => Severity::Medium,
        }
    }

    pub fn remediation(&self) -> &'static str {
        match self {
            ErrorCategory::Authentication => {
                "Verify credentials or tokens for this tool and re-authenticate before retrying."
            }
            ErrorCategory::Permission => {
                "Request the required permissions or choose a tool that operates within the granted scope."
            }
            ErrorCategory::Timeout => {
                "Retry with a longer timeout or reduce the size of the request."
            }
            ErrorCategory::NotFound => {
                "Check that the referenced resource exists and the identifier is spelled correctly."
            }
            ErrorCategory::InvalidInput => {
                "Validate parameters against the tool's expected schema before invoking it."
            }
            ErrorCategory::RateLimit => {
                "Back off and retry later, or spread requests over a longer window."
            }
            ErrorCategory::Other => {
                "Inspect the error details; no automatic remediation is known for this failure."
            }
        }
    }

    /// Upper-case error-code markers, matched as substrings of the code.
    fn code_markers(&self) -> &'static [&'static str] {
        match self {
            ErrorCategory::Authentication => &[
                "UNAUTHENTICATED",
                "UNAUTHORIZED",
                "AUTH",
                "INVALID_TOKEN",
                "401",
            ],
            ErrorCategory::Permission => &["PERMISSION", "FORBIDDEN", "ACCESS_DENIED", "EACCES", "403"],
            ErrorCategory::Timeout => &["TIMEOUT", "TIMED_OUT", "ETIMEDOUT", "DEADLINE", "408", "504"],
            ErrorCategory::NotFound => &["NOT_FOUND", "ENOENT", "404"],
            ErrorCategory::InvalidInput => &["INVALID", "VALIDATION", "BAD_REQUEST", "400"],
            ErrorCategory::RateLimit => &["RATE_LIMIT", "TOO_MANY_REQUESTS", "THROTTL", "QUOTA", "429"],
            ErrorCategory::Other => &[],
        }
    }

    /// Lower-case message keywords.
    fn message_markers(&self) -> &'static [&'static str] {
        match self {
            ErrorCategory::Authentication => &[
                "authentication",
                "unauthorized",
                "unauthenticated",
                "invalid token",
                "expired token",
                "api key",
                "credential",
            ],
            ErrorCategory::Permission => &["permission", "forbidden", "access denied", "not allowed"],
            ErrorCategory::Timeout => &["timed out", "timeout", "deadline exceeded"],
            ErrorCategory::NotFound => &["not found", "no such", "does not exist"],
            ErrorCategory::InvalidInput => &[
                "invalid",
                "malformed",
                "missing required",
                "validation",
                "bad request",
            ],
            ErrorCategory::RateLimit => &[
                "rate limit",
                "too many requests",
                "throttl",
                "quota exceeded",
            ],
            ErrorCategory::Other => &[],
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classify a failure from its error code and message.
///
/// The error code is authoritative when it matches any category; the message
/// is only consulted when the code is absent or unrecognised.
pub fn classify_failure(error_code: Option<&str>, message: Option<&str>) -> ErrorCategory {
    if let Some(code) = error_code {
        let code = code.to_uppercase();
        if let Some(category) = CLASSIFICATION_ORDER
            .iter()
            .find(|c| c.code_markers().iter().any(|m| code.contains(m)))
        {
            return *category;
        }
    }

    if let Some(message) = message {
        let lower = message.to_lowercase();
        if let Some(category) = CLASSIFICATION_ORDER
            .iter()
            .find(|c| c.message_markers().iter().any(|m| lower.contains(m)))
        {
            return *category;
        }
    }

    ErrorCategory::Other
}

/// Failure diagnosis attached to an unsuccessful evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureAnalysis {
    pub error_category: ErrorCategory,
    pub severity: Severity,
    pub remediation: String,
}

impl FailureAnalysis {
    pub fn for_category(category: ErrorCategory) -> Self {
        Self {
            error_category: category,
            severity: category.severity(),
            remediation: category.remediation().to_string(),
        }
    }

    pub fn analyze(error_code: Option<&str>, message: Option<&str>) -> Self {
        Self::for_category(classify_failure(error_code, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_code() {
        let analysis = FailureAnalysis::analyze(Some("PERMISSION_DENIED"), None);
        assert_eq!(analysis.error_category, ErrorCategory::Permission);
        assert_eq!(analysis.severity, Severity::High);
        assert!(!analysis.remediation.is_empty());
    }

    #[test]
    fn test_codes_map_to_categories() {
        let cases = [
            ("UNAUTHORIZED", ErrorCategory::Authentication),
            ("TIMEOUT", ErrorCategory::Timeout),
            ("NOT_FOUND", ErrorCategory::NotFound),
            ("INVALID_ARGUMENT", ErrorCategory::InvalidInput),
            ("RATE_LIMITED", ErrorCategory::RateLimit),
            ("429", ErrorCategory::RateLimit),
            ("EXECUTION_FAILED", ErrorCategory::Other),
        ];
        for (code, expected) in cases {
            assert_eq!(classify_failure(Some(code), None), expected, "code {}", code);
        }
    }

    #[test]
    fn test_message_keywords() {
        assert_eq!(
            classify_failure(None, Some("Request timed out after 30s")),
            ErrorCategory::Timeout
        );
        assert_eq!(
            classify_failure(None, Some("Invalid token supplied")),
            ErrorCategory::Authentication
        );
        assert_eq!(
            classify_failure(None, Some("File does not exist")),
            ErrorCategory::NotFound
        );
        assert_eq!(
            classify_failure(None, Some("Too many requests")),
            ErrorCategory::RateLimit
        );
        assert_eq!(classify_failure(None, Some("boom")), ErrorCategory::Other);
        assert_eq!(classify_failure(None, None), ErrorCategory::Other);
    }

    #[test]
    fn test_unrecognised_code_falls_back_to_message() {
        assert_eq!(
            classify_failure(Some("E_GENERIC"), Some("access denied for user")),
            ErrorCategory::Permission
        );
    }

    #[test]
    fn test_severities() {
        assert_eq!(ErrorCategory::Authentication.severity(), Severity::High);
        assert_eq!(ErrorCategory::NotFound.severity(), Severity::Low);
        assert_eq!(ErrorCategory::Other.severity(), Severity::Medium);
    }

    #[test]
    fn test_category_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ErrorCategory::InvalidInput).unwrap(),
            "\"invalid_input\""
        );
    }
}
