use arrrg::CommandLine;
use arrrg_derive::CommandLine;
use sqlx::postgres::PgPool;
use tokio::net::TcpListener;
use tokio::signal;

use chiptrack::{ServerConfig, cli_utils, create_router};

#[derive(CommandLine, Default, PartialEq, Eq)]
struct Args {
    #[arrrg(optional, "Path to a YAML configuration file")]
    config: Option<String>,
    #[arrrg(optional, "Host to bind the HTTP server")]
    host: Option<String>,
    #[arrrg(optional, "Port to bind the HTTP server")]
    port: Option<u16>,
    #[arrrg(optional, "PostgreSQL connection URL")]
    database_url: Option<String>,
    #[arrrg(flag, "Enable verbose logging")]
    verbose: bool,
}

const HELP_TEXT: &str = r#"chiptrackd - Animal tracking daemon

USAGE:
    chiptrackd [OPTIONS]

OPTIONS:
    --config <PATH>          Path to a YAML configuration file
    --host <HOST>            Host to bind the HTTP server [default: 127.0.0.1]
    --port <PORT>            Port to bind the HTTP server [default: 8080]
    --database-url <URL>     PostgreSQL connection URL [default: $DATABASE_URL]
    --verbose                Enable verbose logging

DESCRIPTION:
    Runs the animal tracking daemon. Pending migrations are applied at
    startup, then the HTTP API is served until SIGTERM or Ctrl+C.

    Command-line flags override the configuration file; the DATABASE_URL
    environment variable fills the database URL when neither sets one.

API ENDPOINTS:
    Account Management:
      POST   /registration               Register a new account
      GET    /accounts/search            Search accounts
      GET    /accounts/{id}              Get a specific account
      PUT    /accounts/{id}              Update an account
      DELETE /accounts/{id}              Delete an account

    Location Points:
      POST   /locations                  Create a location point
      GET    /locations/{id}             Get a specific location point
      PUT    /locations/{id}             Update a location point
      DELETE /locations/{id}             Delete a location point

    Animal Types:
      POST   /animals/types              Create an animal type
      GET    /animals/types/{id}         Get a specific animal type
      PUT    /animals/types/{id}         Update an animal type
      DELETE /animals/types/{id}         Delete an animal type

    Animals:
      POST   /animals                    Chip a new animal
      GET    /animals/search             Search animals
      GET    /animals/{id}               Get a specific animal
      PUT    /animals/{id}               Update an animal
      DELETE /animals/{id}               Delete an animal
      POST   /animals/{id}/types/{tid}   Attach an animal type
      PUT    /animals/{id}/types         Replace an animal type
      DELETE /animals/{id}/types/{tid}   Detach an animal type

    Visited Locations:
      GET    /animals/{id}/locations           List an animal's visits
      PUT    /animals/{id}/locations           Re-point a visit
      POST   /animals/{id}/locations/{pid}     Record a visit
      DELETE /animals/{id}/locations/{vid}     Remove a visit"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, free) = Args::from_command_line("USAGE: chiptrackd [OPTIONS]");

    if !free.is_empty() && free[0] == "help" {
        println!("{}", HELP_TEXT);
        return Ok(());
    }

    let verbose = args.verbose;
    let config = resolve_config(args);

    let Some(database_url) = config.database_url.clone() else {
        cli_utils::exit_with_error(
            "no database URL configured (use --database-url, DATABASE_URL, or the config file)",
        );
    };

    if verbose {
        println!("Chiptrack daemon starting with configuration:");
        println!("  Bind address: {}", config.bind_addr());
        println!("  Database URL: {}", database_url);
    }

    let pool = PgPool::connect(&database_url)
        .await
        .map_err(|e| format!("Failed to connect to PostgreSQL: {}", e))?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| format!("Failed to apply migrations: {}", e))?;

    if verbose {
        println!("Applied pending migrations");
    }

    let app = create_router(pool);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", addr, e))?;

    println!("🚀 Chiptrack daemon started successfully!");
    println!("📡 Server listening on: http://{}", addr);
    println!("💾 Connected to PostgreSQL");
    println!("🔄 Ready to accept API requests");

    if verbose {
        print_api_endpoints();
    }

    println!("💡 Use Ctrl+C or send SIGTERM for graceful shutdown");
    println!();

    // Set up graceful shutdown
    let shutdown_signal = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    // Run server with graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                eprintln!("❌ Server error: {}", e);
                std::process::exit(1);
            }
        }
        () = shutdown_signal => {
            println!();
            println!("🛑 Shutdown signal received, stopping server gracefully...");
            println!("👋 Chiptrack daemon stopped");
        }
    }

    Ok(())
}

fn resolve_config(args: Args) -> ServerConfig {
    let mut config = match &args.config {
        Some(path) => {
            ServerConfig::load(path).unwrap_or_else(|e| cli_utils::exit_with_error(&e))
        }
        None => ServerConfig::default(),
    };
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(database_url) = args.database_url {
        config.database_url = Some(database_url);
    }
    config.apply_env();
    config
}

fn print_api_endpoints() {
    println!();
    println!("📋 Available API endpoints:");
    println!();
    println!("  Account Management:");
    println!("    POST   /registration               Register a new account");
    println!("    GET    /accounts/search            Search accounts");
    println!("    GET    /accounts/{{id}}              Get a specific account");
    println!("    PUT    /accounts/{{id}}              Update an account");
    println!("    DELETE /accounts/{{id}}              Delete an account");
    println!();
    println!("  Location Points:");
    println!("    POST   /locations                  Create a location point");
    println!("    GET    /locations/{{id}}             Get a specific location point");
    println!("    PUT    /locations/{{id}}             Update a location point");
    println!("    DELETE /locations/{{id}}             Delete a location point");
    println!();
    println!("  Animal Types:");
    println!("    POST   /animals/types              Create an animal type");
    println!("    GET    /animals/types/{{id}}         Get a specific animal type");
    println!("    PUT    /animals/types/{{id}}         Update an animal type");
    println!("    DELETE /animals/types/{{id}}         Delete an animal type");
    println!();
    println!("  Animals:");
    println!("    POST   /animals                    Chip a new animal");
    println!("    GET    /animals/search             Search animals");
    println!("    GET    /animals/{{id}}               Get a specific animal");
    println!("    PUT    /animals/{{id}}               Update an animal");
    println!("    DELETE /animals/{{id}}               Delete an animal");
    println!("    POST   /animals/{{id}}/types/{{tid}}   Attach an animal type");
    println!("    PUT    /animals/{{id}}/types         Replace an animal type");
    println!("    DELETE /animals/{{id}}/types/{{tid}}   Detach an animal type");
    println!();
    println!("  Visited Locations:");
    println!("    GET    /animals/{{id}}/locations           List an animal's visits");
    println!("    PUT    /animals/{{id}}/locations           Re-point a visit");
    println!("    POST   /animals/{{id}}/locations/{{pid}}     Record a visit");
    println!("    DELETE /animals/{{id}}/locations/{{vid}}     Remove a visit");
    println!();
}
