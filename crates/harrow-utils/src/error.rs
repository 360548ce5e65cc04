//! User-facing error reporting shared by every harrow crate.
//!
//! Each crate owns a `thiserror` enum for its failure modes. Those enums
//! implement [`UserFriendlyError`] so the CLI can render a message, optional
//! context, and actionable suggestions without knowing about every variant.

use std::fmt;

/// Trait for providing user-friendly error reporting with context and suggestions
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get contextual information about the error
    fn context(&self) -> Option<String> {
        None
    }

    /// Get suggested actions to resolve the error
    fn suggestions(&self) -> Vec<String> {
        Vec::new()
    }

    /// Get the error category for grouping similar errors
    fn category(&self) -> ErrorCategory;
}

/// Categories of errors for better organization and handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    SuiteDefinition,
    Execution,
    FileSystem,
    Storage,
    Interrupted,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "Configuration"),
            Self::SuiteDefinition => write!(f, "Suite Definition"),
            Self::Execution => write!(f, "Execution"),
            Self::FileSystem => write!(f, "File System"),
            Self::Storage => write!(f, "Storage"),
            Self::Interrupted => write!(f, "Interrupted"),
        }
    }
}

/// Render an error for humans: message, then context and suggestions if any.
#[must_use]
pub fn render_for_user(err: &dyn UserFriendlyError) -> String {
    let mut out = format!("✗ {}: {}", err.category(), err.user_message());
    if let Some(context) = err.context() {
        out.push_str("\n  ");
        out.push_str(&context);
    }
    let suggestions = err.suggestions();
    if !suggestions.is_empty() {
        out.push_str("\n  Suggestions:");
        for suggestion in suggestions {
            out.push_str("\n    - ");
            out.push_str(&suggestion);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sample;

    impl UserFriendlyError for Sample {
        fn user_message(&self) -> String {
            "store is locked".to_string()
        }

        fn suggestions(&self) -> Vec<String> {
            vec!["retry later".to_string()]
        }

        fn category(&self) -> ErrorCategory {
            ErrorCategory::Storage
        }
    }

    #[test]
    fn test_render_for_user_includes_suggestions() {
        let rendered = render_for_user(&Sample);
        assert!(rendered.starts_with("✗ Storage: store is locked"));
        assert!(rendered.contains("- retry later"));
    }

    #[test]
    fn test_category_display() {
        assert_eq!(ErrorCategory::SuiteDefinition.to_string(), "Suite Definition");
        assert_eq!(ErrorCategory::Interrupted.to_string(), "Interrupted");
    }
}
