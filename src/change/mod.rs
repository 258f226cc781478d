//! Change files and the engine that applies them.

mod engine;
pub mod predicate;
mod types;

pub use engine::{ChangeEngine, ChangeReport, OperationOutcome, ValidationWarning};
pub use predicate::{Predicate, PredicateContext};
pub use types::{ChangeFile, ChangeOperation, CountMapping, ReplaceMode};
