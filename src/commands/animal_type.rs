//! # Animal Type Command Handler
//!
//! This module handles animal type CLI commands including creation, lookup,
//! update, and deletion.

use crate::{
    AnimalTypeRequest, AnimalTypeResponse, cli_utils,
    commands::shared::{dispatch_command, parse_positive_id_or_exit, validate_args_count_or_exit},
    http_utils,
};

const TYPE_USAGE: &str = "Usage: chipctl type <create|get|update|delete> [args...]";

/// Handles all animal type commands.
///
/// # Arguments
/// * `args` - Command arguments (first element is the subcommand)
/// * `client` - HTTP client for API communication
/// * `output_format` - Output format for get commands
pub async fn handle_animal_type_command(
    args: &[String],
    client: &http_utils::ChiptrackClient,
    output_format: cli_utils::OutputFormat,
) {
    dispatch_command!("type", TYPE_USAGE, args, client, output_format, {
        "create" => handle_type_create,
        "get" => handle_type_get,
        "update" => handle_type_update,
        "delete" => handle_type_delete,
    });
}

/// Handles animal type creation.
async fn handle_type_create(
    args: &[String],
    client: &http_utils::ChiptrackClient,
    _output_format: cli_utils::OutputFormat,
) {
    validate_args_count_or_exit(args, 2, 2, "create", "Usage: chipctl type create <name>");
    let request = AnimalTypeRequest {
        name: Some(args[1].clone()),
    };

    let animal_type = http_utils::execute_or_exit(
        || client.post::<AnimalTypeRequest, AnimalTypeResponse>("animals/types", &request),
        "Failed to create animal type",
    )
    .await;

    println!("Created animal type {} ({})", animal_type.id, animal_type.name);
}

/// Handles animal type lookup by ID.
async fn handle_type_get(
    args: &[String],
    client: &http_utils::ChiptrackClient,
    output_format: cli_utils::OutputFormat,
) {
    validate_args_count_or_exit(args, 2, 2, "get", "Usage: chipctl type get <type-id>");
    let type_id = parse_positive_id_or_exit(&args[1], "animal type ID");
    let path = format!("animals/types/{}", type_id);

    let animal_type = http_utils::execute_or_exit(
        || client.get::<AnimalTypeResponse>(&path),
        "Failed to get animal type",
    )
    .await;

    cli_utils::print_formatted_or_exit(&animal_type, output_format, "animal type");
}

/// Handles animal type rename.
async fn handle_type_update(
    args: &[String],
    client: &http_utils::ChiptrackClient,
    _output_format: cli_utils::OutputFormat,
) {
    validate_args_count_or_exit(
        args,
        3,
        3,
        "update",
        "Usage: chipctl type update <type-id> <name>",
    );
    let type_id = parse_positive_id_or_exit(&args[1], "animal type ID");
    let request = AnimalTypeRequest {
        name: Some(args[2].clone()),
    };
    let path = format!("animals/types/{}", type_id);

    let animal_type = http_utils::execute_or_exit(
        || client.put::<AnimalTypeRequest, AnimalTypeResponse>(&path, &request),
        "Failed to update animal type",
    )
    .await;

    println!("Updated animal type {}", animal_type.id);
}

/// Handles animal type deletion.
async fn handle_type_delete(
    args: &[String],
    client: &http_utils::ChiptrackClient,
    _output_format: cli_utils::OutputFormat,
) {
    validate_args_count_or_exit(args, 2, 2, "delete", "Usage: chipctl type delete <type-id>");
    let type_id = parse_positive_id_or_exit(&args[1], "animal type ID");
    let path = format!("animals/types/{}", type_id);

    http_utils::execute_or_exit(|| client.delete(&path), "Failed to delete animal type").await;

    cli_utils::print_success(&format!("Deleted animal type {}", type_id));
}
