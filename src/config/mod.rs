//! Configuration module for statefix.
//!
//! This module handles run configuration:
//! - The parameter bundle passed to the runner
//! - Path resolution against the working directory
//! - Loading `.env` files

mod dotenv;
mod run;

pub use dotenv::load_dotenv;
pub use run::RunConfig;
