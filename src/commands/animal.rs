//! # Animal Command Handler
//!
//! This module handles animal CLI commands: chipping, lookup, search,
//! lifecycle updates, deletion, and type attachment maintenance.

use crate::{
    AnimalResponse, CreateAnimalRequest, ReplaceTypeRequest, UpdateAnimalRequest, cli_utils,
    commands::shared::{
        dispatch_command, parse_f64_or_exit, parse_positive_id_or_exit, parse_type_ids_or_exit,
        path_with_query, validate_args_count_or_exit,
    },
    http_utils,
};

const ANIMAL_USAGE: &str = "Usage: chipctl animal \
<create|get|search|update|delete|attach-type|replace-type|detach-type> [args...]";

/// Handles all animal commands.
///
/// # Arguments
/// * `args` - Command arguments (first element is the subcommand)
/// * `client` - HTTP client for API communication
/// * `output_format` - Output format for get/search commands
pub async fn handle_animal_command(
    args: &[String],
    client: &http_utils::ChiptrackClient,
    output_format: cli_utils::OutputFormat,
) {
    dispatch_command!("animal", ANIMAL_USAGE, args, client, output_format, {
        "create" => handle_animal_create,
        "get" => handle_animal_get,
        "search" => handle_animal_search,
        "update" => handle_animal_update,
        "delete" => handle_animal_delete,
        "attach-type" => handle_animal_attach_type,
        "replace-type" => handle_animal_replace_type,
        "detach-type" => handle_animal_detach_type,
    });
}

/// Handles animal creation (chipping). Type IDs are comma-separated.
async fn handle_animal_create(
    args: &[String],
    client: &http_utils::ChiptrackClient,
    _output_format: cli_utils::OutputFormat,
) {
    validate_args_count_or_exit(
        args,
        8,
        8,
        "create",
        "Usage: chipctl animal create <type-ids> <length> <weight> <height> \
<gender> <chipper-id> <chipping-location-id>",
    );
    let request = CreateAnimalRequest {
        animal_types: Some(parse_type_ids_or_exit(&args[1])),
        length: Some(parse_f64_or_exit("length", &args[2])),
        weight: Some(parse_f64_or_exit("weight", &args[3])),
        height: Some(parse_f64_or_exit("height", &args[4])),
        gender: Some(args[5].clone()),
        chipper_id: Some(parse_positive_id_or_exit(&args[6], "chipper account ID")),
        chipping_location_id: Some(parse_positive_id_or_exit(
            &args[7],
            "chipping location point ID",
        )),
    };

    let animal = http_utils::execute_or_exit(
        || client.post::<CreateAnimalRequest, AnimalResponse>("animals", &request),
        "Failed to create animal",
    )
    .await;

    println!("Created animal {}", animal.id);
}

/// Handles animal lookup by ID.
async fn handle_animal_get(
    args: &[String],
    client: &http_utils::ChiptrackClient,
    output_format: cli_utils::OutputFormat,
) {
    validate_args_count_or_exit(args, 2, 2, "get", "Usage: chipctl animal get <animal-id>");
    let animal_id = parse_positive_id_or_exit(&args[1], "animal ID");
    let path = format!("animals/{}", animal_id);

    let animal = http_utils::execute_or_exit(
        || client.get::<AnimalResponse>(&path),
        "Failed to get animal",
    )
    .await;

    cli_utils::print_formatted_or_exit(&animal, output_format, "animal");
}

/// Handles animal search. The optional argument is a raw query string, e.g.
/// 'chipperId=3&lifeStatus=ALIVE&size=20'.
async fn handle_animal_search(
    args: &[String],
    client: &http_utils::ChiptrackClient,
    output_format: cli_utils::OutputFormat,
) {
    validate_args_count_or_exit(args, 1, 2, "search", "Usage: chipctl animal search [query]");
    let path = path_with_query("animals/search", args.get(1));

    let animals = http_utils::execute_or_exit(
        || client.get::<Vec<AnimalResponse>>(&path),
        "Failed to search animals",
    )
    .await;

    if animals.is_empty() {
        println!("No animals found");
    } else {
        cli_utils::print_formatted_or_exit(&animals, output_format, "animals");
    }
}

/// Handles animal update.
async fn handle_animal_update(
    args: &[String],
    client: &http_utils::ChiptrackClient,
    _output_format: cli_utils::OutputFormat,
) {
    validate_args_count_or_exit(
        args,
        9,
        9,
        "update",
        "Usage: chipctl animal update <animal-id> <length> <weight> <height> \
<gender> <life-status> <chipper-id> <chipping-location-id>",
    );
    let animal_id = parse_positive_id_or_exit(&args[1], "animal ID");
    let request = UpdateAnimalRequest {
        length: Some(parse_f64_or_exit("length", &args[2])),
        weight: Some(parse_f64_or_exit("weight", &args[3])),
        height: Some(parse_f64_or_exit("height", &args[4])),
        gender: Some(args[5].clone()),
        life_status: Some(args[6].clone()),
        chipper_id: Some(parse_positive_id_or_exit(&args[7], "chipper account ID")),
        chipping_location_id: Some(parse_positive_id_or_exit(
            &args[8],
            "chipping location point ID",
        )),
    };
    let path = format!("animals/{}", animal_id);

    let animal = http_utils::execute_or_exit(
        || client.put::<UpdateAnimalRequest, AnimalResponse>(&path, &request),
        "Failed to update animal",
    )
    .await;

    println!("Updated animal {}", animal.id);
}

/// Handles animal deletion.
async fn handle_animal_delete(
    args: &[String],
    client: &http_utils::ChiptrackClient,
    _output_format: cli_utils::OutputFormat,
) {
    validate_args_count_or_exit(
        args,
        2,
        2,
        "delete",
        "Usage: chipctl animal delete <animal-id>",
    );
    let animal_id = parse_positive_id_or_exit(&args[1], "animal ID");
    let path = format!("animals/{}", animal_id);

    http_utils::execute_or_exit(|| client.delete(&path), "Failed to delete animal").await;

    cli_utils::print_success(&format!("Deleted animal {}", animal_id));
}

/// Handles attaching an animal type to an animal.
async fn handle_animal_attach_type(
    args: &[String],
    client: &http_utils::ChiptrackClient,
    _output_format: cli_utils::OutputFormat,
) {
    validate_args_count_or_exit(
        args,
        3,
        3,
        "attach-type",
        "Usage: chipctl animal attach-type <animal-id> <type-id>",
    );
    let animal_id = parse_positive_id_or_exit(&args[1], "animal ID");
    let type_id = parse_positive_id_or_exit(&args[2], "animal type ID");
    let path = format!("animals/{}/types/{}", animal_id, type_id);

    let animal = http_utils::execute_or_exit(
        || client.post_empty::<AnimalResponse>(&path),
        "Failed to attach animal type",
    )
    .await;

    println!(
        "Attached type {} to animal {} (now {:?})",
        type_id, animal.id, animal.animal_types
    );
}

/// Handles replacing one of an animal's types with another.
async fn handle_animal_replace_type(
    args: &[String],
    client: &http_utils::ChiptrackClient,
    _output_format: cli_utils::OutputFormat,
) {
    validate_args_count_or_exit(
        args,
        4,
        4,
        "replace-type",
        "Usage: chipctl animal replace-type <animal-id> <old-type-id> <new-type-id>",
    );
    let animal_id = parse_positive_id_or_exit(&args[1], "animal ID");
    let request = ReplaceTypeRequest {
        old_type_id: Some(parse_positive_id_or_exit(&args[2], "animal type ID")),
        new_type_id: Some(parse_positive_id_or_exit(&args[3], "animal type ID")),
    };
    let path = format!("animals/{}/types", animal_id);

    let animal = http_utils::execute_or_exit(
        || client.put::<ReplaceTypeRequest, AnimalResponse>(&path, &request),
        "Failed to replace animal type",
    )
    .await;

    println!(
        "Replaced type on animal {} (now {:?})",
        animal.id, animal.animal_types
    );
}

/// Handles detaching an animal type from an animal.
async fn handle_animal_detach_type(
    args: &[String],
    client: &http_utils::ChiptrackClient,
    _output_format: cli_utils::OutputFormat,
) {
    validate_args_count_or_exit(
        args,
        3,
        3,
        "detach-type",
        "Usage: chipctl animal detach-type <animal-id> <type-id>",
    );
    let animal_id = parse_positive_id_or_exit(&args[1], "animal ID");
    let type_id = parse_positive_id_or_exit(&args[2], "animal type ID");
    let path = format!("animals/{}/types/{}", animal_id, type_id);

    http_utils::execute_or_exit(|| client.delete(&path), "Failed to detach animal type").await;

    println!("Detached type {} from animal {}", type_id, animal_id);
}
