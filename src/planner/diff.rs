//! Diff engine for comparing a plan against a state.
//!
//! This module classifies every address a plan creates or deletes by
//! whether the (already corrected) state holds it.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::debug;

use crate::state::State;

use super::plan::PlanDocument;

/// Engine for computing diffs between a plan and a state.
#[derive(Debug, Default)]
pub struct DiffEngine;

/// Classification of one planned address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceDiff {
    /// Instance address from the plan.
    pub address: String,
    /// How the address was classified.
    pub diff_type: DiffType,
}

/// Type of difference detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffType {
    /// Planned create, absent from state.
    Addition,
    /// Planned delete, present in state.
    Removal,
    /// Planned delete, already absent from state.
    AlreadyAbsent,
    /// Planned create, already present in state.
    AlreadyPresent,
}

/// Complete diff result.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiffResult {
    /// Removal pass followed by addition pass, each sorted by address.
    pub diffs: Vec<ResourceDiff>,
    /// Addresses the plan both deletes and creates, sorted.
    pub replacements: Vec<String>,
    /// Number of additions.
    pub additions: usize,
    /// Number of removals.
    pub removals: usize,
    /// Number of anomalous entries reported as updates.
    pub updates: usize,
}

impl DiffEngine {
    /// Creates a new diff engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes the diff between a plan and a state.
    ///
    /// Deletions are reported before additions. Within each pass addresses
    /// are sorted, whatever order the plan lists them in.
    #[must_use]
    pub fn compute_diff(&self, plan: &PlanDocument, state: &State) -> DiffResult {
        let mut creates = BTreeSet::new();
        let mut deletes = BTreeSet::new();

        for change in plan.planned_changes() {
            if change.creates {
                creates.insert(change.address);
            }
            if change.deletes {
                deletes.insert(change.address);
            }
        }

        let replacements: Vec<String> = creates
            .intersection(&deletes)
            .map(|a| (*a).to_string())
            .collect();
        for address in &replacements {
            debug!("{address} is replaced, not classified");
        }

        let mut diffs = Vec::with_capacity(creates.len() + deletes.len());

        for address in deletes.difference(&creates) {
            let diff_type = if state.contains_address(address) {
                DiffType::Removal
            } else {
                debug!("{address} is planned for deletion but absent from state");
                DiffType::AlreadyAbsent
            };
            diffs.push(ResourceDiff {
                address: (*address).to_string(),
                diff_type,
            });
        }

        for address in creates.difference(&deletes) {
            let diff_type = if state.contains_address(address) {
                debug!("{address} is planned for creation but present in state");
                DiffType::AlreadyPresent
            } else {
                DiffType::Addition
            };
            diffs.push(ResourceDiff {
                address: (*address).to_string(),
                diff_type,
            });
        }

        let additions = diffs.iter().filter(|d| d.diff_type == DiffType::Addition).count();
        let removals = diffs.iter().filter(|d| d.diff_type == DiffType::Removal).count();
        let updates = diffs.iter().filter(|d| d.diff_type.is_update()).count();

        DiffResult {
            diffs,
            replacements,
            additions,
            removals,
            updates,
        }
    }
}

impl DiffType {
    /// Returns true for the anomalous classifications reported as updates.
    #[must_use]
    pub const fn is_update(self) -> bool {
        matches!(self, Self::AlreadyAbsent | Self::AlreadyPresent)
    }

    /// Returns the symbol printed in front of the address.
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Self::Addition => '+',
            Self::Removal => '-',
            Self::AlreadyAbsent | Self::AlreadyPresent => '*',
        }
    }

    /// Returns the action tag used in reports.
    #[must_use]
    pub const fn action(self) -> &'static str {
        match self {
            Self::Addition => "add",
            Self::Removal => "remove",
            Self::AlreadyAbsent | Self::AlreadyPresent => "update",
        }
    }
}

impl DiffResult {
    /// Returns true if there are any changes.
    #[must_use]
    pub const fn has_changes(&self) -> bool {
        self.additions > 0 || self.removals > 0 || self.updates > 0
    }

    /// Returns the total number of classified changes.
    #[must_use]
    pub const fn total_changes(&self) -> usize {
        self.additions + self.removals + self.updates
    }

    /// Returns the diffs to report, without updates if `hide_updates` is set.
    #[must_use]
    pub fn visible(&self, hide_updates: bool) -> Vec<&ResourceDiff> {
        self.diffs
            .iter()
            .filter(|d| !(hide_updates && d.diff_type.is_update()))
            .collect()
    }
}

impl std::fmt::Display for DiffType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Addition => "addition",
            Self::Removal => "removal",
            Self::AlreadyAbsent => "already absent",
            Self::AlreadyPresent => "already present",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for ResourceDiff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.diff_type.symbol(), self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::plan::{Action, ChangeDetail, ResourceChange};
    use crate::state::{IndexKey, InstanceState, ResourceState};
    use serde_json::json;

    fn plan(changes: &[(&str, &[Action])]) -> PlanDocument {
        PlanDocument {
            resource_changes: changes
                .iter()
                .map(|(address, actions)| ResourceChange {
                    address: (*address).to_string(),
                    change: ChangeDetail {
                        actions: actions.to_vec(),
                    },
                })
                .collect(),
        }
    }

    fn state(resources: &[(&str, &str, IndexKey)]) -> State {
        State {
            resources: resources
                .iter()
                .map(|(resource_type, name, key)| {
                    ResourceState::managed(resource_type, name, "aws")
                        .with_instance(InstanceState::new(key.clone(), json!({})))
                })
                .collect(),
            ..State::default()
        }
    }

    fn render(result: &DiffResult, hide_updates: bool) -> Vec<String> {
        result
            .visible(hide_updates)
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn test_removals_come_before_additions() {
        let plan = plan(&[
            ("aws_instance.web", &[Action::Create]),
            ("aws_instance.old", &[Action::Delete]),
        ]);
        let state = state(&[("aws_instance", "old", IndexKey::None)]);

        let result = DiffEngine::new().compute_diff(&plan, &state);
        assert_eq!(render(&result, false), vec!["- aws_instance.old", "+ aws_instance.web"]);
        assert_eq!(result.additions, 1);
        assert_eq!(result.removals, 1);
        assert_eq!(result.updates, 0);
    }

    #[test]
    fn test_each_pass_is_sorted() {
        let plan = plan(&[
            ("b.two", &[Action::Create]),
            ("z.gone", &[Action::Delete]),
            ("a.one", &[Action::Create]),
            ("c.gone", &[Action::Delete]),
        ]);
        let state = state(&[("z", "gone", IndexKey::Int(0)), ("c", "gone", IndexKey::Int(0))]);

        let result = DiffEngine::new().compute_diff(&plan, &state);
        assert_eq!(
            render(&result, false),
            vec!["- c.gone", "- z.gone", "+ a.one", "+ b.two"]
        );
    }

    #[test]
    fn test_anomalies_are_updates() {
        let plan = plan(&[
            (r#"aws_instance.app["blue"]"#, &[Action::Create]),
            ("aws_instance.missing", &[Action::Delete]),
        ]);
        let state = state(&[("aws_instance", "app", IndexKey::string("blue"))]);

        let result = DiffEngine::new().compute_diff(&plan, &state);
        assert_eq!(
            result.diffs,
            vec![
                ResourceDiff {
                    address: String::from("aws_instance.missing"),
                    diff_type: DiffType::AlreadyAbsent,
                },
                ResourceDiff {
                    address: String::from(r#"aws_instance.app["blue"]"#),
                    diff_type: DiffType::AlreadyPresent,
                },
            ]
        );
        assert_eq!(result.updates, 2);
        assert!(result.visible(true).is_empty());
        assert_eq!(render(&result, false)[0], "* aws_instance.missing");
    }

    #[test]
    fn test_replacements_are_not_classified() {
        let plan = plan(&[
            ("aws_instance.web", &[Action::Delete, Action::Create]),
            ("aws_instance.db", &[Action::Update]),
        ]);
        let state = state(&[("aws_instance", "web", IndexKey::None)]);

        let result = DiffEngine::new().compute_diff(&plan, &state);
        assert!(result.diffs.is_empty());
        assert!(!result.has_changes());
        assert_eq!(result.replacements, vec![String::from("aws_instance.web")]);
    }

    #[test]
    fn test_bare_address_matches_index_zero() {
        let plan = plan(&[("aws_instance.web", &[Action::Delete])]);
        let state = state(&[("aws_instance", "web", IndexKey::Int(0))]);

        let result = DiffEngine::new().compute_diff(&plan, &state);
        assert_eq!(result.diffs[0].diff_type, DiffType::Removal);
        assert_eq!(result.total_changes(), 1);
    }

    #[test]
    fn test_duplicate_plan_entries_are_reported_once() {
        let plan = plan(&[
            ("aws_instance.web", &[Action::Create]),
            ("aws_instance.web", &[Action::Create]),
        ]);
        let result = DiffEngine::new().compute_diff(&plan, &State::default());
        assert_eq!(render(&result, false), vec!["+ aws_instance.web"]);
    }
}
