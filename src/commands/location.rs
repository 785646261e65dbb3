//! # Location Command Handler
//!
//! This module handles location point CLI commands including creation,
//! lookup, update, and deletion.

use crate::{
    Location, LocationRequest, cli_utils,
    commands::shared::{
        dispatch_command, parse_f64_or_exit, parse_positive_id_or_exit,
        validate_args_count_or_exit,
    },
    http_utils,
};

const LOCATION_USAGE: &str = "Usage: chipctl location <create|get|update|delete> [args...]";

/// Handles all location point commands.
///
/// # Arguments
/// * `args` - Command arguments (first element is the subcommand)
/// * `client` - HTTP client for API communication
/// * `output_format` - Output format for get commands
pub async fn handle_location_command(
    args: &[String],
    client: &http_utils::ChiptrackClient,
    output_format: cli_utils::OutputFormat,
) {
    dispatch_command!("location", LOCATION_USAGE, args, client, output_format, {
        "create" => handle_location_create,
        "get" => handle_location_get,
        "update" => handle_location_update,
        "delete" => handle_location_delete,
    });
}

/// Handles location point creation.
async fn handle_location_create(
    args: &[String],
    client: &http_utils::ChiptrackClient,
    _output_format: cli_utils::OutputFormat,
) {
    validate_args_count_or_exit(
        args,
        3,
        3,
        "create",
        "Usage: chipctl location create <latitude> <longitude>",
    );
    let request = LocationRequest {
        latitude: Some(parse_f64_or_exit("latitude", &args[1])),
        longitude: Some(parse_f64_or_exit("longitude", &args[2])),
    };

    let location = http_utils::execute_or_exit(
        || client.post::<LocationRequest, Location>("locations", &request),
        "Failed to create location point",
    )
    .await;

    println!("Created location point {}", location.id);
}

/// Handles location point lookup by ID.
async fn handle_location_get(
    args: &[String],
    client: &http_utils::ChiptrackClient,
    output_format: cli_utils::OutputFormat,
) {
    validate_args_count_or_exit(args, 2, 2, "get", "Usage: chipctl location get <point-id>");
    let point_id = parse_positive_id_or_exit(&args[1], "location point ID");
    let path = format!("locations/{}", point_id);

    let location = http_utils::execute_or_exit(
        || client.get::<Location>(&path),
        "Failed to get location point",
    )
    .await;

    cli_utils::print_formatted_or_exit(&location, output_format, "location point");
}

/// Handles location point update.
async fn handle_location_update(
    args: &[String],
    client: &http_utils::ChiptrackClient,
    _output_format: cli_utils::OutputFormat,
) {
    validate_args_count_or_exit(
        args,
        4,
        4,
        "update",
        "Usage: chipctl location update <point-id> <latitude> <longitude>",
    );
    let point_id = parse_positive_id_or_exit(&args[1], "location point ID");
    let request = LocationRequest {
        latitude: Some(parse_f64_or_exit("latitude", &args[2])),
        longitude: Some(parse_f64_or_exit("longitude", &args[3])),
    };
    let path = format!("locations/{}", point_id);

    let location = http_utils::execute_or_exit(
        || client.put::<LocationRequest, Location>(&path, &request),
        "Failed to update location point",
    )
    .await;

    println!("Updated location point {}", location.id);
}

/// Handles location point deletion.
async fn handle_location_delete(
    args: &[String],
    client: &http_utils::ChiptrackClient,
    _output_format: cli_utils::OutputFormat,
) {
    validate_args_count_or_exit(
        args,
        2,
        2,
        "delete",
        "Usage: chipctl location delete <point-id>",
    );
    let point_id = parse_positive_id_or_exit(&args[1], "location point ID");
    let path = format!("locations/{}", point_id);

    http_utils::execute_or_exit(|| client.delete(&path), "Failed to delete location point").await;

    cli_utils::print_success(&format!("Deleted location point {}", point_id));
}
