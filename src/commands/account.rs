//! # Account Command Handler
//!
//! This module handles account-related CLI commands including registration,
//! lookup, search, update, and deletion.

use crate::{
    AccountRequest, AccountResponse, cli_utils,
    commands::shared::{
        dispatch_command, parse_positive_id_or_exit, path_with_query, validate_args_count_or_exit,
    },
    http_utils,
};

const ACCOUNT_USAGE: &str = "Usage: chipctl account <register|get|search|update|delete> [args...]";

/// Handles all account-related commands.
///
/// # Arguments
/// * `args` - Command arguments (first element is the subcommand)
/// * `client` - HTTP client for API communication
/// * `output_format` - Output format for get/search commands
pub async fn handle_account_command(
    args: &[String],
    client: &http_utils::ChiptrackClient,
    output_format: cli_utils::OutputFormat,
) {
    dispatch_command!("account", ACCOUNT_USAGE, args, client, output_format, {
        "register" => handle_account_register,
        "get" => handle_account_get,
        "search" => handle_account_search,
        "update" => handle_account_update,
        "delete" => handle_account_delete,
    });
}

/// Handles account registration. Registration is rejected for authenticated
/// callers, so run it without --email/--password.
async fn handle_account_register(
    args: &[String],
    client: &http_utils::ChiptrackClient,
    _output_format: cli_utils::OutputFormat,
) {
    validate_args_count_or_exit(
        args,
        5,
        5,
        "register",
        "Usage: chipctl account register <first-name> <last-name> <email> <password>",
    );
    let request = AccountRequest {
        first_name: Some(args[1].clone()),
        last_name: Some(args[2].clone()),
        email: Some(args[3].clone()),
        password: Some(args[4].clone()),
    };

    let account = http_utils::execute_or_exit(
        || client.post::<AccountRequest, AccountResponse>("registration", &request),
        "Failed to register account",
    )
    .await;

    println!("Registered account {} ({})", account.id, account.email);
}

/// Handles account lookup by ID.
async fn handle_account_get(
    args: &[String],
    client: &http_utils::ChiptrackClient,
    output_format: cli_utils::OutputFormat,
) {
    validate_args_count_or_exit(args, 2, 2, "get", "Usage: chipctl account get <account-id>");
    let account_id = parse_positive_id_or_exit(&args[1], "account ID");
    let path = format!("accounts/{}", account_id);

    let account = http_utils::execute_or_exit(
        || client.get::<AccountResponse>(&path),
        "Failed to get account",
    )
    .await;

    cli_utils::print_formatted_or_exit(&account, output_format, "account");
}

/// Handles account search. The optional argument is a raw query string, e.g.
/// 'firstName=An&size=5'.
async fn handle_account_search(
    args: &[String],
    client: &http_utils::ChiptrackClient,
    output_format: cli_utils::OutputFormat,
) {
    validate_args_count_or_exit(
        args,
        1,
        2,
        "search",
        "Usage: chipctl account search [query]",
    );
    let path = path_with_query("accounts/search", args.get(1));

    let accounts = http_utils::execute_or_exit(
        || client.get::<Vec<AccountResponse>>(&path),
        "Failed to search accounts",
    )
    .await;

    if accounts.is_empty() {
        println!("No accounts found");
    } else {
        cli_utils::print_formatted_or_exit(&accounts, output_format, "accounts");
    }
}

/// Handles account update. Only the authenticated account can be updated.
async fn handle_account_update(
    args: &[String],
    client: &http_utils::ChiptrackClient,
    _output_format: cli_utils::OutputFormat,
) {
    validate_args_count_or_exit(
        args,
        6,
        6,
        "update",
        "Usage: chipctl account update <account-id> <first-name> <last-name> <email> <password>",
    );
    let account_id = parse_positive_id_or_exit(&args[1], "account ID");
    let request = AccountRequest {
        first_name: Some(args[2].clone()),
        last_name: Some(args[3].clone()),
        email: Some(args[4].clone()),
        password: Some(args[5].clone()),
    };
    let path = format!("accounts/{}", account_id);

    let account = http_utils::execute_or_exit(
        || client.put::<AccountRequest, AccountResponse>(&path, &request),
        "Failed to update account",
    )
    .await;

    println!("Updated account {}", account.id);
}

/// Handles account deletion.
async fn handle_account_delete(
    args: &[String],
    client: &http_utils::ChiptrackClient,
    _output_format: cli_utils::OutputFormat,
) {
    validate_args_count_or_exit(
        args,
        2,
        2,
        "delete",
        "Usage: chipctl account delete <account-id>",
    );
    let account_id = parse_positive_id_or_exit(&args[1], "account ID");
    let path = format!("accounts/{}", account_id);

    http_utils::execute_or_exit(|| client.delete(&path), "Failed to delete account").await;

    cli_utils::print_success(&format!("Deleted account {}", account_id));
}
