//! Plan document types.
//!
//! Only the parts of a `terraform show -json` plan that the diff needs are
//! modeled: each resource change's address and its action verbs.

use serde::{Deserialize, Serialize};

/// A provisioning plan.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanDocument {
    /// Planned resource changes, in plan order.
    #[serde(default)]
    pub resource_changes: Vec<ResourceChange>,
}

/// One planned resource change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceChange {
    /// Instance address the change applies to.
    pub address: String,
    /// The change itself.
    #[serde(default)]
    pub change: ChangeDetail,
}

/// Action verbs of a resource change.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeDetail {
    /// Actions, e.g. `["delete", "create"]` for a replacement.
    #[serde(default)]
    pub actions: Vec<Action>,
}

/// A plan action verb.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Action {
    /// Resource will be created.
    Create,
    /// Resource will be destroyed.
    Delete,
    /// Resource will be updated in place.
    Update,
    /// Data source will be read.
    Read,
    /// Nothing happens.
    NoOp,
    /// A verb this version does not know.
    Other(String),
}

/// A planned change reduced to what the diff cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedChange<'a> {
    /// Instance address.
    pub address: &'a str,
    /// Whether the plan creates the address.
    pub creates: bool,
    /// Whether the plan deletes the address.
    pub deletes: bool,
}

impl PlanDocument {
    /// Returns every resource change that creates or deletes something.
    #[must_use]
    pub fn planned_changes(&self) -> Vec<PlannedChange<'_>> {
        self.resource_changes
            .iter()
            .map(|rc| PlannedChange {
                address: rc.address.as_str(),
                creates: rc.change.actions.contains(&Action::Create),
                deletes: rc.change.actions.contains(&Action::Delete),
            })
            .filter(|c| c.creates || c.deletes)
            .collect()
    }
}

impl Action {
    /// Returns the verb as written in plan documents.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Create => "create",
            Self::Delete => "delete",
            Self::Update => "update",
            Self::Read => "read",
            Self::NoOp => "no-op",
            Self::Other(verb) => verb,
        }
    }
}

impl From<String> for Action {
    fn from(verb: String) -> Self {
        match verb.as_str() {
            "create" => Self::Create,
            "delete" => Self::Delete,
            "update" => Self::Update,
            "read" => Self::Read,
            "no-op" => Self::NoOp,
            _ => Self::Other(verb),
        }
    }
}

impl From<Action> for String {
    fn from(action: Action) -> Self {
        match action {
            Action::Other(verb) => verb,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
