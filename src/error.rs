// src/error.rs

//! Unified error handling for list synchronization.

use std::fmt;

use thiserror::Error;

/// Result type alias for fillersync operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing or rejected catalog credentials
    #[error("Authentication error: {0}")]
    Auth(String),

    /// A library title could not be mapped to a roster show
    #[error("Could not resolve show '{title}'{}", format_suggestions(.suggestions))]
    Resolve {
        title: String,
        suggestions: Vec<String>,
    },

    /// Upstream service answered with something unusable
    #[error("Upstream error for {context}: {message}")]
    Upstream { context: String, message: String },
}

fn format_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" (did you mean: {})", suggestions.join(", "))
    }
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an authentication error.
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    /// Create a show resolution error with candidate suggestions.
    pub fn resolve(title: impl Into<String>, suggestions: Vec<String>) -> Self {
        Self::Resolve {
            title: title.into(),
            suggestions,
        }
    }

    /// Create an upstream error with context.
    pub fn upstream(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Upstream {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Whether retrying the same request later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}
