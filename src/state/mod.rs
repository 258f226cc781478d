//! Terraform state model.
//!
//! This module holds the in-memory representation of a state document,
//! address parsing and formatting, and the lookup and ordering operations
//! the change engine and diff engine work against.

mod address;
mod store;
mod types;

pub use address::{format_address, ParsedAddress, ResourceAddress};
pub use types::{
    EachMode, IndexKey, InstanceState, Mode, OutputState, ResourceState, State, StateVersion,
    STATE_VERSION,
};
