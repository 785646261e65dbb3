//! # Command Handlers
//!
//! This module contains organized command handlers for the chipctl CLI
//! application. Each command type is implemented in a dedicated submodule for
//! better organization and maintainability.
//!
//! ## Structure
//!
//! - `account` - Account commands (register, get, search, update, delete)
//! - `location` - Location point commands (create, get, update, delete)
//! - `animal_type` - Animal type commands (create, get, update, delete)
//! - `animal` - Animal commands (create, get, search, update, delete, type maintenance)
//! - `visit` - Visited-location commands (list, add, move, remove)
//! - `shared` - Shared utilities and validation functions

pub mod account;
pub mod animal;
pub mod animal_type;
pub mod errors;
pub mod location;
pub mod shared;
pub mod visit;

pub use account::handle_account_command;
pub use animal::handle_animal_command;
pub use animal_type::handle_animal_type_command;
pub use location::handle_location_command;
pub use visit::handle_visit_command;
