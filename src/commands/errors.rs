//! # Command Error Handling
//!
//! This module provides error handling utilities for chipctl CLI commands
//! using the handled crate for consistent error property extraction.

use handled::Handle;

/// User-friendly error information that can be extracted from various error types
#[derive(Debug, Clone)]
pub struct UserError {
    /// The main error message to display to the user
    pub message: String,
    /// Optional usage hint to help the user correct the error
    pub usage_hint: Option<String>,
}

impl std::fmt::Display for UserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Implements Handle<UserError> for itself to allow extraction
impl Handle<UserError> for UserError {
    fn handle(&self) -> Option<UserError> {
        Some(self.clone())
    }
}

/// Identifier parsing errors that provide user-friendly messages
#[derive(Debug)]
pub struct IdParseError {
    /// The input string that failed to parse
    pub input: String,
    /// The kind of identifier being parsed, e.g. "account ID"
    pub id_type: String,
    /// The reason why parsing failed
    pub reason: String,
}

impl std::fmt::Display for IdParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Invalid {} '{}': {}",
            self.id_type, self.input, self.reason
        )
    }
}

impl std::error::Error for IdParseError {}

impl Handle<UserError> for IdParseError {
    fn handle(&self) -> Option<UserError> {
        Some(UserError {
            message: format!("Invalid {} '{}': {}", self.id_type, self.input, self.reason),
            usage_hint: Some(
                "Identifiers are the positive integers the service assigns at creation"
                    .to_string(),
            ),
        })
    }
}

/// Validation error for command arguments
#[derive(Debug)]
pub struct ValidationError {
    /// The field name that failed validation
    pub field: String,
    /// The value that was invalid
    pub value: String,
    /// The reason why validation failed
    pub reason: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Invalid {}: '{}' - {}",
            self.field, self.value, self.reason
        )
    }
}

impl std::error::Error for ValidationError {}

impl Handle<UserError> for ValidationError {
    fn handle(&self) -> Option<UserError> {
        Some(UserError {
            message: format!("Invalid {}: '{}' - {}", self.field, self.value, self.reason),
            usage_hint: Some("Check the command usage for valid argument formats".to_string()),
        })
    }
}
