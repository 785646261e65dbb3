use arrrg::CommandLine;
use arrrg_derive::CommandLine;

use chiptrack::{
    cli_utils::{self, OutputFormat},
    commands::{
        handle_account_command, handle_animal_command, handle_animal_type_command,
        handle_location_command, handle_visit_command,
    },
    http_utils,
};

#[derive(CommandLine, Default, PartialEq, Eq)]
struct Options {
    #[arrrg(optional, "Base URL of the chiptrackd API server")]
    base_url: String,
    #[arrrg(optional, "Account email for Basic authentication")]
    email: Option<String>,
    #[arrrg(optional, "Account password for Basic authentication")]
    password: Option<String>,
    #[arrrg(
        optional,
        "Output format for get/list commands: json or yaml (default: json)"
    )]
    output: OutputFormat,
}

const USAGE: &str = r#"Usage: chipctl [options] <command> [args...]

Options:
  --base-url <url>     Base URL of the chiptrackd API server (default: http://localhost:8080)
  --email <email>      Account email for Basic authentication
  --password <pass>    Account password for Basic authentication
  --output <format>    Output format for get/list commands: json or yaml (default: json)

Commands:
  account register <first> <last> <email> <password>     Register a new account
  account get <account-id>                                Get an account by ID
  account search [query]                                  Search accounts
  account update <account-id> <first> <last> <email> <password>
                                                          Update an account
  account delete <account-id>                             Delete an account
  location create <latitude> <longitude>                  Create a location point
  location get <point-id>                                 Get a location point by ID
  location update <point-id> <latitude> <longitude>       Update a location point
  location delete <point-id>                              Delete a location point
  type create <name>                                      Create an animal type
  type get <type-id>                                      Get an animal type by ID
  type update <type-id> <name>                            Rename an animal type
  type delete <type-id>                                   Delete an animal type
  animal create <type-ids> <length> <weight> <height> <gender> <chipper-id> <location-id>
                                                          Chip a new animal
  animal get <animal-id>                                  Get an animal by ID
  animal search [query]                                   Search animals
  animal update <animal-id> <length> <weight> <height> <gender> <life-status> <chipper-id> <location-id>
                                                          Update an animal
  animal delete <animal-id>                               Delete an animal
  animal attach-type <animal-id> <type-id>                Attach a type to an animal
  animal replace-type <animal-id> <old-id> <new-id>       Replace a type on an animal
  animal detach-type <animal-id> <type-id>                Detach a type from an animal
  visit list <animal-id> [query]                          List an animal's visits
  visit add <animal-id> <point-id>                        Record a visit
  visit move <animal-id> <visit-id> <point-id>            Re-point a visit
  visit remove <animal-id> <visit-id>                     Remove a visit

Search queries are raw query strings, e.g. 'firstName=An&size=5'.
Every command except 'account register' requires --email and --password."#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (options, free) = Options::from_command_line_relaxed("USAGE: chipctl <command> [args...]");

    if free.is_empty() {
        cli_utils::exit_with_usage_error("No command specified", USAGE);
    }

    let base_url = if options.base_url.is_empty() {
        "http://localhost:8080".to_string()
    } else {
        options.base_url
    };

    let client = http_utils::ChiptrackClient::new(base_url);
    let client = match (&options.email, &options.password) {
        (Some(email), Some(password)) => client.with_credentials(email, password),
        (None, None) => client,
        _ => cli_utils::exit_with_error("--email and --password must be provided together"),
    };

    match free[0].as_str() {
        "account" => {
            handle_account_command(&free[1..], &client, options.output).await;
        }
        "location" => {
            handle_location_command(&free[1..], &client, options.output).await;
        }
        "type" => {
            handle_animal_type_command(&free[1..], &client, options.output).await;
        }
        "animal" => {
            handle_animal_command(&free[1..], &client, options.output).await;
        }
        "visit" => {
            handle_visit_command(&free[1..], &client, options.output).await;
        }
        _ => {
            cli_utils::exit_with_error(&format!(
                "Unknown command '{}'. Available commands: account, location, type, animal, visit",
                free[0]
            ));
        }
    }

    Ok(())
}
