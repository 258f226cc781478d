//! Change operation engine.
//!
//! Applies the operations of a change file to a state, in order. A failing
//! `move_instance` aborts the whole change file; a failing validation
//! predicate on a `count_to_map` entry only produces a warning.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{ChangeError, Result};
use crate::state::{EachMode, IndexKey, InstanceState, ParsedAddress, ResourceState, State};

use super::predicate::{self, PredicateContext};
use super::types::{ChangeFile, ChangeOperation, CountMapping, ReplaceMode};

/// Engine applying change files to a state.
#[derive(Debug, Default)]
pub struct ChangeEngine;

/// What applying a change file did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChangeReport {
    /// One entry per recognized operation, in order.
    pub operations: Vec<OperationOutcome>,
    /// Number of operations skipped because their kind is unknown.
    pub skipped: usize,
    /// Instances that failed their validation predicate.
    pub warnings: Vec<ValidationWarning>,
}

/// Outcome of a single operation.
#[derive(Debug, Clone, Serialize)]
pub struct OperationOutcome {
    /// 1-based position in the change file.
    pub index: usize,
    /// Operation kind.
    pub kind: &'static str,
    /// What the operation targeted.
    pub target: String,
    /// Short description of the effect.
    pub summary: String,
}

/// A `count_to_map` entry whose predicate rendered false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationWarning {
    /// Address of the re-keyed instance.
    pub address: String,
    /// The predicate that failed.
    pub expression: String,
}

impl ChangeEngine {
    /// Creates a new change engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Applies every operation of `change` to `state`, in order.
    ///
    /// Unknown operation kinds are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if a `move_instance` cannot be carried out, an
    /// instance's attributes cannot be decoded, or a validation predicate
    /// is malformed. The state is left as far as the failing operation got.
    pub fn apply(&self, state: &mut State, change: &ChangeFile) -> Result<ChangeReport> {
        let mut report = ChangeReport::default();

        for (i, operation) in change.operations.iter().enumerate() {
            let index = i + 1;
            let summary = match operation {
                ChangeOperation::UpgradeTerraform { terraform_version } => {
                    Self::upgrade_terraform(state, terraform_version)
                }
                ChangeOperation::ProviderReplace {
                    replace,
                    with,
                    replace_type,
                } => Self::provider_replace(state, replace, with, *replace_type),
                ChangeOperation::CountToMap { address, count } => {
                    Self::count_to_map(state, address, count, &mut report.warnings)?
                }
                ChangeOperation::AddResource { resource } => Self::add_resource(state, resource),
                ChangeOperation::RemoveResource { address } => Self::remove_resource(state, address),
                ChangeOperation::MoveInstance {
                    address,
                    new_address,
                    new_name,
                } => Self::move_instance(state, address, new_address, new_name.as_deref())?,
                ChangeOperation::Unknown => {
                    debug!("Skipping unknown operation #{index}");
                    report.skipped += 1;
                    continue;
                }
            };

            info!("#{index} {} {}: {summary}", operation.kind(), operation.target());
            report.operations.push(OperationOutcome {
                index,
                kind: operation.kind(),
                target: operation.target(),
                summary,
            });
        }

        Ok(report)
    }

    fn upgrade_terraform(state: &mut State, version: &str) -> String {
        let previous = std::mem::replace(&mut state.terraform_version, version.to_string());
        format!("{previous} -> {version}")
    }

    fn provider_replace(state: &mut State, replace: &str, with: &str, mode: ReplaceMode) -> String {
        let mut updated = 0;
        for resource in &mut state.resources {
            let replacement = match mode {
                ReplaceMode::Exact => (resource.provider_config == replace).then(|| with.to_string()),
                ReplaceMode::Prefix => resource
                    .provider_config
                    .strip_prefix(replace)
                    .map(|rest| format!("{with}{rest}")),
            };

            if let Some(provider) = replacement {
                debug!(
                    "{}: provider {} -> {provider}",
                    resource.addr(),
                    resource.provider_config
                );
                resource.provider_config = provider;
                updated += 1;
            }
        }
        format!("{updated} resource(s) updated ({mode} match)")
    }

    fn count_to_map(
        state: &mut State,
        address: &str,
        count: &[CountMapping],
        warnings: &mut Vec<ValidationWarning>,
    ) -> Result<String> {
        let mut matched = false;
        let mut rekeyed = 0;

        for resource in &mut state.resources {
            if resource.addr() != address {
                continue;
            }
            matched = true;
            resource.each_mode = Some(EachMode::Map);

            let mut instances = std::mem::take(&mut resource.instances);
            let result = Self::rekey_instances(resource, &mut instances, count, warnings);
            resource.instances = instances;
            rekeyed += result?;
        }

        if !matched {
            warn!("count_to_map: no resource at {address}");
        }
        Ok(format!("{rekeyed} instance(s) re-keyed"))
    }

    fn rekey_instances(
        resource: &ResourceState,
        instances: &mut [InstanceState],
        count: &[CountMapping],
        warnings: &mut Vec<ValidationWarning>,
    ) -> Result<usize> {
        let mut rekeyed = 0;

        for instance in instances.iter_mut() {
            let IndexKey::Int(current) = instance.index_key else {
                continue;
            };

            let mut hit = false;
            for entry in count.iter().filter(|e| e.index == current) {
                hit = true;
                instance.index_key = IndexKey::string(&entry.key);
                let instance_address = resource.instance_addr(&instance.index_key);
                debug!("{} -> {instance_address}", resource.address(&IndexKey::Int(current)));

                let Some(expression) = entry.validate.as_deref().filter(|e| !e.trim().is_empty()) else {
                    continue;
                };

                let attributes = instance.decoded_attributes().map_err(|message| {
                    ChangeError::AttributeDecode {
                        address: instance_address.clone(),
                        message,
                    }
                })?;
                let context = PredicateContext::new(instance, entry, attributes);
                if !predicate::evaluate(expression, &context)? {
                    warn!("{instance_address} failed validation");
                    warnings.push(ValidationWarning {
                        address: instance_address,
                        expression: expression.to_string(),
                    });
                }
            }

            if hit {
                rekeyed += 1;
            }
        }

        Ok(rekeyed)
    }

    fn add_resource(state: &mut State, resource: &ResourceState) -> String {
        let summary = format!("added with {} instance(s)", resource.instances.len());
        state.add_resource(resource.clone());
        summary
    }

    fn remove_resource(state: &mut State, address: &str) -> String {
        let removed = state.remove_resource(address);
        if removed == 0 {
            warn!("remove_resource: no resource at {address}");
        }
        format!("{removed} resource(s) removed")
    }

    fn move_instance(
        state: &mut State,
        address: &str,
        new_address: &str,
        new_name: Option<&str>,
    ) -> Result<String> {
        let source = ParsedAddress::parse(address);
        let Some(source_base) = source.base() else {
            return Err(ChangeError::InvalidAddress {
                address: address.to_string(),
            }
            .into());
        };

        let ParsedAddress::Indexed {
            base: target_base,
            key: new_key,
        } = ParsedAddress::parse(new_address)
        else {
            return Err(ChangeError::InvalidNewAddress {
                address: new_address.to_string(),
            }
            .into());
        };

        let target_index = state
            .position_of(&target_base)
            .ok_or_else(|| ChangeError::TargetNotFound {
                address: target_base.clone(),
            })?;

        let mut moved = Vec::new();
        for resource in &mut state.resources {
            if resource.addr() != source_base {
                continue;
            }
            let taken = std::mem::take(&mut resource.instances);
            let (matching, remaining): (Vec<_>, Vec<_>) = taken
                .into_iter()
                .partition(|i| resource.instance_addr(&i.index_key) == address);
            resource.instances = remaining;
            moved.extend(matching);
        }

        if moved.is_empty() {
            warn!("move_instance: no instance at {address}");
        }

        let count = moved.len();
        let target = &mut state.resources[target_index];
        for mut instance in moved {
            if let Some(name) = new_name.filter(|n| !n.is_empty()) {
                instance
                    .set_attribute("name", Value::String(name.to_string()))
                    .map_err(|message| ChangeError::SetAttributeFailed {
                        address: address.to_string(),
                        message,
                    })?;
            }
            instance.index_key = new_key.clone();
            target.instances.push(instance);
        }

        Ok(format!("{count} instance(s) moved to {new_address}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PredicateError, StatefixError};
    use serde_json::json;

    fn instance(key: IndexKey, name: &str) -> InstanceState {
        InstanceState::new(key, json!({ "name": name }))
    }

    fn counted(resource_type: &str, name: &str, keys: &[i64]) -> ResourceState {
        keys.iter().fold(
            ResourceState::managed(resource_type, name, "provider"),
            |resource, k| resource.with_instance(instance(IndexKey::Int(*k), &format!("{name}-{k}"))),
        )
    }

    fn apply(state: &mut State, operations: Vec<ChangeOperation>) -> Result<ChangeReport> {
        ChangeEngine::new().apply(state, &ChangeFile { operations })
    }

    fn mapping(index: i64, key: &str, validate: Option<&str>) -> CountMapping {
        CountMapping {
            index,
            key: key.to_string(),
            validate: validate.map(str::to_string),
        }
    }

    #[test]
    fn test_upgrade_terraform() {
        let mut state = State {
            terraform_version: String::from("0.14.0"),
            ..State::default()
        };
        apply(
            &mut state,
            vec![ChangeOperation::UpgradeTerraform {
                terraform_version: String::from("1.5.7"),
            }],
        )
        .unwrap();
        assert_eq!(state.terraform_version, "1.5.7");
    }

    #[test]
    fn test_provider_replace_prefix() {
        let mut state = State {
            resources: vec![
                ResourceState::managed("null_resource", "a", "module.p1.provider"),
                ResourceState::managed("null_resource", "b", "module.p3.provider"),
            ],
            ..State::default()
        };
        apply(
            &mut state,
            vec![ChangeOperation::ProviderReplace {
                replace: String::from("module.p1"),
                with: String::from("module.p2"),
                replace_type: ReplaceMode::Prefix,
            }],
        )
        .unwrap();
        assert_eq!(state.resources[0].provider_config, "module.p2.provider");
        assert_eq!(state.resources[1].provider_config, "module.p3.provider");
    }

    #[test]
    fn test_provider_replace_exact() {
        let mut state = State {
            resources: vec![
                ResourceState::managed("null_resource", "a", "module.p1.provider"),
                ResourceState::managed("null_resource", "b", "module.p1"),
            ],
            ..State::default()
        };
        apply(
            &mut state,
            vec![ChangeOperation::ProviderReplace {
                replace: String::from("module.p1"),
                with: String::from("module.p2"),
                replace_type: ReplaceMode::Exact,
            }],
        )
        .unwrap();
        assert_eq!(state.resources[0].provider_config, "module.p1.provider");
        assert_eq!(state.resources[1].provider_config, "module.p2");
    }

    #[test]
    fn test_count_to_map() {
        let mut state = State {
            resources: vec![counted("aws_instance", "r", &[0, 1, 2])],
            ..State::default()
        };
        let report = apply(
            &mut state,
            vec![ChangeOperation::CountToMap {
                address: String::from("aws_instance.r"),
                count: vec![mapping(0, "x", None), mapping(1, "y", None)],
            }],
        )
        .unwrap();

        let resource = &state.resources[0];
        assert_eq!(resource.each_mode, Some(EachMode::Map));
        assert_eq!(
            resource.index_keys(),
            vec![&IndexKey::string("x"), &IndexKey::string("y"), &IndexKey::Int(2)]
        );
        assert_eq!(report.operations[0].summary, "2 instance(s) re-keyed");
    }

    #[test]
    fn test_count_to_map_validation_warning_is_not_fatal() {
        let mut state = State {
            resources: vec![counted("aws_instance", "r", &[0, 1])],
            ..State::default()
        };
        let report = apply(
            &mut state,
            vec![ChangeOperation::CountToMap {
                address: String::from("aws_instance.r"),
                count: vec![
                    mapping(0, "x", Some(r#"{{ eq .Attributes.name "r-0" }}"#)),
                    mapping(1, "y", Some(r#"{{ eq .Attributes.name "wrong" }}"#)),
                ],
            }],
        )
        .unwrap();

        assert_eq!(
            report.warnings,
            vec![ValidationWarning {
                address: String::from(r#"aws_instance.r["y"]"#),
                expression: String::from(r#"{{ eq .Attributes.name "wrong" }}"#),
            }]
        );
        assert_eq!(state.resources[0].instances[1].index_key, IndexKey::string("y"));
    }

    #[test]
    fn test_count_to_map_predicate_sees_new_key() {
        let mut state = State {
            resources: vec![counted("aws_instance", "r", &[0])],
            ..State::default()
        };
        let report = apply(
            &mut state,
            vec![ChangeOperation::CountToMap {
                address: String::from("aws_instance.r"),
                count: vec![mapping(0, "x", Some(r#"{{ eq .Instance.IndexKey "x" }}"#))],
            }],
        )
        .unwrap();
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_count_to_map_malformed_predicate_is_fatal() {
        let mut state = State {
            resources: vec![counted("aws_instance", "r", &[0])],
            ..State::default()
        };
        let err = apply(
            &mut state,
            vec![ChangeOperation::CountToMap {
                address: String::from("aws_instance.r"),
                count: vec![mapping(0, "x", Some("{{ .Attributes.name }}"))],
            }],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            StatefixError::Predicate(PredicateError::NotBoolean { .. })
        ));
    }

    #[test]
    fn test_remove_then_add_leaves_one_resource() {
        let mut state = State {
            resources: vec![counted("aws_instance", "web", &[0])],
            ..State::default()
        };
        let replacement = ResourceState::managed("aws_instance", "web", "new-provider");
        apply(
            &mut state,
            vec![
                ChangeOperation::RemoveResource {
                    address: String::from("aws_instance.web"),
                },
                ChangeOperation::AddResource {
                    resource: replacement.clone(),
                },
            ],
        )
        .unwrap();
        assert_eq!(state.resources, vec![replacement]);
    }

    #[test]
    fn test_move_instance() {
        let mut state = State {
            resources: vec![
                counted("foo", "bar", &[0, 1]),
                ResourceState::managed("foo", "baz", "provider"),
            ],
            ..State::default()
        };
        apply(
            &mut state,
            vec![ChangeOperation::MoveInstance {
                address: String::from("foo.bar[0]"),
                new_address: String::from(r#"foo.baz["a"]"#),
                new_name: None,
            }],
        )
        .unwrap();

        assert_eq!(state.resources[0].index_keys(), vec![&IndexKey::Int(1)]);
        let moved = &state.resources[1].instances;
        assert_eq!(moved.len(), 1);
        assert_eq!(moved[0].index_key, IndexKey::string("a"));
        assert_eq!(moved[0].attributes, Some(json!({"name": "bar-0"})));
    }

    #[test]
    fn test_move_instance_rewrites_name() {
        let mut state = State {
            resources: vec![
                counted("foo", "bar", &[0]),
                ResourceState::managed("foo", "baz", "provider"),
            ],
            ..State::default()
        };
        apply(
            &mut state,
            vec![ChangeOperation::MoveInstance {
                address: String::from("foo.bar[0]"),
                new_address: String::from("foo.baz[3]"),
                new_name: Some(String::from("renamed")),
            }],
        )
        .unwrap();
        let moved = &state.resources[1].instances[0];
        assert_eq!(moved.index_key, IndexKey::Int(3));
        assert_eq!(moved.attributes, Some(json!({"name": "renamed"})));
    }

    #[test]
    fn test_move_instance_missing_target_is_fatal() {
        let mut state = State {
            resources: vec![counted("foo", "bar", &[0])],
            ..State::default()
        };
        let err = apply(
            &mut state,
            vec![ChangeOperation::MoveInstance {
                address: String::from("foo.bar[0]"),
                new_address: String::from(r#"foo.baz["a"]"#),
                new_name: None,
            }],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            StatefixError::Change(ChangeError::TargetNotFound { ref address }) if address == "foo.baz"
        ));
    }

    #[test]
    fn test_move_instance_requires_indexed_new_address() {
        let mut state = State {
            resources: vec![counted("foo", "bar", &[0])],
            ..State::default()
        };
        let err = apply(
            &mut state,
            vec![ChangeOperation::MoveInstance {
                address: String::from("foo.bar[0]"),
                new_address: String::from("foo.bar"),
                new_name: None,
            }],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            StatefixError::Change(ChangeError::InvalidNewAddress { .. })
        ));
    }

    #[test]
    fn test_move_instance_attribute_rewrite_failure_is_fatal() {
        let mut broken = ResourceState::managed("foo", "bar", "provider");
        broken
            .instances
            .push(InstanceState::new(IndexKey::Int(0), json!("not an object")));
        let mut state = State {
            resources: vec![broken, ResourceState::managed("foo", "baz", "provider")],
            ..State::default()
        };
        let err = apply(
            &mut state,
            vec![ChangeOperation::MoveInstance {
                address: String::from("foo.bar[0]"),
                new_address: String::from("foo.baz[0]"),
                new_name: Some(String::from("x")),
            }],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            StatefixError::Change(ChangeError::SetAttributeFailed { .. })
        ));
    }

    #[test]
    fn test_count_to_map_undecodable_attributes_are_fatal() {
        let mut broken = ResourceState::managed("aws_instance", "r", "provider");
        broken
            .instances
            .push(InstanceState::new(IndexKey::Int(0), json!(["not", "an", "object"])));
        let mut state = State {
            resources: vec![broken],
            ..State::default()
        };
        let err = apply(
            &mut state,
            vec![ChangeOperation::CountToMap {
                address: String::from("aws_instance.r"),
                count: vec![mapping(0, "x", Some("{{ true }}"))],
            }],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            StatefixError::Change(ChangeError::AttributeDecode { ref address, .. })
                if address == r#"aws_instance.r["x"]"#
        ));
    }

    #[test]
    fn test_count_to_map_without_predicate_ignores_attribute_shape() {
        let mut broken = ResourceState::managed("aws_instance", "r", "provider");
        broken
            .instances
            .push(InstanceState::new(IndexKey::Int(0), json!("scalar")));
        let mut state = State {
            resources: vec![broken],
            ..State::default()
        };
        apply(
            &mut state,
            vec![ChangeOperation::CountToMap {
                address: String::from("aws_instance.r"),
                count: vec![mapping(0, "x", None)],
            }],
        )
        .unwrap();
        assert_eq!(state.resources[0].instances[0].index_key, IndexKey::string("x"));
    }

    #[test]
    fn test_move_instance_invalid_source_is_fatal() {
        let mut state = State {
            resources: vec![counted("foo", "bar", &[0]), counted("foo", "baz", &[])],
            ..State::default()
        };
        let err = apply(
            &mut state,
            vec![ChangeOperation::MoveInstance {
                address: String::from("foo.bar[x]"),
                new_address: String::from(r#"foo.baz["a"]"#),
                new_name: None,
            }],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            StatefixError::Change(ChangeError::InvalidAddress { ref address })
                if address == "foo.bar[x]"
        ));
        assert_eq!(state.resources[0].instances.len(), 1);
        assert!(state.resources[1].instances.is_empty());
    }

    #[test]
    fn test_unknown_operations_are_skipped() {
        let mut state = State::default();
        let report = apply(
            &mut state,
            vec![
                ChangeOperation::Unknown,
                ChangeOperation::UpgradeTerraform {
                    terraform_version: String::from("1.6.0"),
                },
            ],
        )
        .unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(report.operations.len(), 1);
        assert_eq!(report.operations[0].index, 2);
    }
}
