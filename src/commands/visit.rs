//! # Visit Command Handler
//!
//! This module handles visited-location CLI commands: listing an animal's
//! movement history and recording, re-pointing, or removing visits.

use crate::{
    UpdateVisitRequest, VisitedLocationResponse, cli_utils,
    commands::shared::{
        dispatch_command, parse_positive_id_or_exit, path_with_query, validate_args_count_or_exit,
    },
    http_utils,
};

const VISIT_USAGE: &str = "Usage: chipctl visit <list|add|move|remove> [args...]";

/// Handles all visited-location commands.
///
/// # Arguments
/// * `args` - Command arguments (first element is the subcommand)
/// * `client` - HTTP client for API communication
/// * `output_format` - Output format for list commands
pub async fn handle_visit_command(
    args: &[String],
    client: &http_utils::ChiptrackClient,
    output_format: cli_utils::OutputFormat,
) {
    dispatch_command!("visit", VISIT_USAGE, args, client, output_format, {
        "list" => handle_visit_list,
        "add" => handle_visit_add,
        "move" => handle_visit_move,
        "remove" => handle_visit_remove,
    });
}

/// Handles listing an animal's visits. The optional second argument is a raw
/// query string, e.g. 'startDateTime=2023-01-01T00:00:00Z&size=50'.
async fn handle_visit_list(
    args: &[String],
    client: &http_utils::ChiptrackClient,
    output_format: cli_utils::OutputFormat,
) {
    validate_args_count_or_exit(
        args,
        2,
        3,
        "list",
        "Usage: chipctl visit list <animal-id> [query]",
    );
    let animal_id = parse_positive_id_or_exit(&args[1], "animal ID");
    let path = path_with_query(&format!("animals/{}/locations", animal_id), args.get(2));

    let visits = http_utils::execute_or_exit(
        || client.get::<Vec<VisitedLocationResponse>>(&path),
        "Failed to list visits",
    )
    .await;

    if visits.is_empty() {
        println!("No visits found");
    } else {
        cli_utils::print_formatted_or_exit(&visits, output_format, "visits");
    }
}

/// Handles recording that an animal moved to a location point.
async fn handle_visit_add(
    args: &[String],
    client: &http_utils::ChiptrackClient,
    _output_format: cli_utils::OutputFormat,
) {
    validate_args_count_or_exit(
        args,
        3,
        3,
        "add",
        "Usage: chipctl visit add <animal-id> <point-id>",
    );
    let animal_id = parse_positive_id_or_exit(&args[1], "animal ID");
    let point_id = parse_positive_id_or_exit(&args[2], "location point ID");
    let path = format!("animals/{}/locations/{}", animal_id, point_id);

    let visit = http_utils::execute_or_exit(
        || client.post_empty::<VisitedLocationResponse>(&path),
        "Failed to record visit",
    )
    .await;

    println!(
        "Recorded visit {} at location point {}",
        visit.id, visit.location_point_id
    );
}

/// Handles re-pointing one of an animal's visits at a different location.
async fn handle_visit_move(
    args: &[String],
    client: &http_utils::ChiptrackClient,
    _output_format: cli_utils::OutputFormat,
) {
    validate_args_count_or_exit(
        args,
        4,
        4,
        "move",
        "Usage: chipctl visit move <animal-id> <visit-id> <point-id>",
    );
    let animal_id = parse_positive_id_or_exit(&args[1], "animal ID");
    let request = UpdateVisitRequest {
        visited_location_point_id: Some(parse_positive_id_or_exit(&args[2], "visit ID")),
        location_point_id: Some(parse_positive_id_or_exit(&args[3], "location point ID")),
    };
    let path = format!("animals/{}/locations", animal_id);

    let visit = http_utils::execute_or_exit(
        || client.put::<UpdateVisitRequest, VisitedLocationResponse>(&path, &request),
        "Failed to move visit",
    )
    .await;

    println!(
        "Moved visit {} to location point {}",
        visit.id, visit.location_point_id
    );
}

/// Handles removing a visit from an animal's history.
async fn handle_visit_remove(
    args: &[String],
    client: &http_utils::ChiptrackClient,
    _output_format: cli_utils::OutputFormat,
) {
    validate_args_count_or_exit(
        args,
        3,
        3,
        "remove",
        "Usage: chipctl visit remove <animal-id> <visit-id>",
    );
    let animal_id = parse_positive_id_or_exit(&args[1], "animal ID");
    let visit_id = parse_positive_id_or_exit(&args[2], "visit ID");
    let path = format!("animals/{}/locations/{}", animal_id, visit_id);

    http_utils::execute_or_exit(|| client.delete(&path), "Failed to remove visit").await;

    cli_utils::print_success(&format!("Removed visit {}", visit_id));
}
