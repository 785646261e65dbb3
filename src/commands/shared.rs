//! # Shared Command Utilities
//!
//! This module provides shared validation, parsing, and utility functions
//! used across multiple command handlers to reduce code duplication.

use crate::cli_utils;
use crate::commands::errors::{IdParseError, UserError, ValidationError};
use handled::Handle;

/// Exits through the user-facing form of an error, falling back to its
/// Display output when no user-facing form is available.
fn exit_with_user_error<E>(error: E) -> !
where
    E: Handle<UserError> + std::fmt::Display,
{
    if let Some(user_error) = error.handle() {
        if let Some(ref hint) = user_error.usage_hint {
            cli_utils::exit_with_usage_error(&user_error.message, hint);
        } else {
            cli_utils::exit_with_error(&user_error.message);
        }
    } else {
        cli_utils::exit_with_error(&format!("{}", error));
    }
}

/// Parses a positive integer identifier or exits with an enhanced error
/// message.
///
/// # Arguments
/// * `id_str` - The string representation of the identifier
/// * `id_type` - The kind of identifier for error messages, e.g. "account ID"
pub fn parse_positive_id_or_exit(id_str: &str, id_type: &str) -> i32 {
    let id = id_str.parse::<i32>().unwrap_or_else(|e| {
        exit_with_user_error(IdParseError {
            input: id_str.to_string(),
            id_type: id_type.to_string(),
            reason: e.to_string(),
        })
    });
    if id <= 0 {
        exit_with_user_error(IdParseError {
            input: id_str.to_string(),
            id_type: id_type.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    id
}

/// Parses a floating-point argument or exits with an error message.
pub fn parse_f64_or_exit(field: &str, value_str: &str) -> f64 {
    value_str.parse::<f64>().unwrap_or_else(|e| {
        exit_with_user_error(ValidationError {
            field: field.to_string(),
            value: value_str.to_string(),
            reason: e.to_string(),
        })
    })
}

/// Parses a comma-separated list of animal type identifiers.
pub fn parse_type_ids_or_exit(value_str: &str) -> Vec<i32> {
    value_str
        .split(',')
        .map(|part| parse_positive_id_or_exit(part.trim(), "animal type ID"))
        .collect()
}

/// Validates both minimum and maximum argument counts.
///
/// # Arguments
/// * `args` - The command arguments array
/// * `min_count` - The minimum number of arguments required (including subcommand)
/// * `max_count` - The maximum number of arguments allowed (including subcommand)
/// * `command` - The command name for error message
/// * `usage` - The usage string to display
pub fn validate_args_count_or_exit(
    args: &[String],
    min_count: usize,
    max_count: usize,
    command: &str,
    usage: &str,
) {
    if args.len() < min_count {
        cli_utils::exit_with_usage_error(
            &format!("{} command requires more arguments", command),
            usage,
        );
    }
    if args.len() > max_count {
        cli_utils::exit_with_usage_error(
            &format!("{} command has too many arguments", command),
            usage,
        );
    }
}

/// Appends an optional raw query string to a path.
pub fn path_with_query(path: &str, query: Option<&String>) -> String {
    match query {
        Some(query) if !query.is_empty() => format!("{}?{}", path, query),
        _ => path.to_string(),
    }
}

/// Macro to generate command dispatcher boilerplate.
macro_rules! dispatch_command {
    ($command_name:expr, $usage:expr, $args:expr, $client:expr, $output_format:expr, {
        $($subcommand:expr => $handler:expr),* $(,)?
    }) => {
        if $args.is_empty() {
            crate::cli_utils::exit_with_usage_error(
                &format!("{} command requires a subcommand", $command_name),
                $usage,
            );
        }

        match $args[0].as_str() {
            $(
                $subcommand => $handler($args, $client, $output_format).await,
            )*
            _ => {
                let available_subcommands = vec![$($subcommand),*];
                crate::cli_utils::exit_with_error(&format!(
                    "Unknown {} subcommand '{}'. Available subcommands: {}",
                    $command_name,
                    $args[0],
                    available_subcommands.join(", ")
                ));
            }
        }
    };
}

pub(crate) use dispatch_command;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_with_query_appends_only_when_present() {
        assert_eq!(path_with_query("accounts/search", None), "accounts/search");
        assert_eq!(
            path_with_query("accounts/search", Some(&String::new())),
            "accounts/search"
        );
        assert_eq!(
            path_with_query("accounts/search", Some(&"size=5".to_string())),
            "accounts/search?size=5"
        );
    }
}
