// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![forbid(unsafe_code)]               // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Statefix
//!
//! Corrects a Terraform state with a list of change operations, then shows
//! what a plan would still do against the corrected state.
//!
//! ## Overview
//!
//! Refactoring Terraform code (turning `count` into `for_each`, moving
//! resources between modules, switching providers) makes plans destroy and
//! recreate resources that did not really change. Statefix lets you:
//!
//! - Describe the corresponding state edits in a YAML change file
//! - Apply them to a copy of the state, with optional validation predicates
//! - See which planned creates and deletes remain real
//! - Write the corrected state for `terraform state push`
//!
//! ## Architecture
//!
//! 1. **Documents**: plan, state and change file are loaded
//! 2. **Change engine**: operations are applied to the state, in order
//! 3. **Normalization**: resources and instances are put in canonical order
//! 4. **Diff engine**: planned creates and deletes are classified against the state
//!
//! ## Modules
//!
//! - [`state`]: State model, addresses, lookup and ordering
//! - [`change`]: Change files, validation predicates and the change engine
//! - [`planner`]: Plan documents and the diff engine
//! - [`documents`]: Document parsing and storage backends
//! - [`config`]: Run configuration
//! - [`runner`]: Coordinates a run
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! operations:
//!   - operation: count_to_map
//!     address: aws_instance.web
//!     count:
//!       - index: 0
//!         key: blue
//!         validate: '{{ eq .Attributes.name "web-blue" }}'
//!   - operation: provider_replace
//!     replace: provider["registry.terraform.io/hashicorp/aws"]
//!     with: provider["registry.terraform.io/hashicorp/aws"].west
//!     replace_type: exact
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod change;
pub mod cli;
pub mod config;
pub mod documents;
pub mod error;
pub mod planner;
pub mod runner;
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use change::{ChangeEngine, ChangeFile, ChangeOperation, ChangeReport};
pub use cli::{Cli, Commands, OutputFormatter};
pub use config::RunConfig;
pub use documents::{DocumentStore, LocalDocumentStore, MemoryDocumentStore};
pub use error::{Result, StatefixError};
pub use planner::{DiffEngine, DiffResult, PlanDocument};
pub use runner::{RunReport, Runner};
pub use state::{IndexKey, ParsedAddress, State};
