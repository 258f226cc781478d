//! Change file types.
//!
//! A change file is a YAML document listing corrective operations to apply
//! to a state before it is compared with a plan:
//!
//! ```yaml
//! operations:
//!   - operation: count_to_map
//!     address: aws_instance.web
//!     count:
//!       - index: 0
//!         key: blue
//!         validate: '{{ eq .Attributes.name "web-blue" }}'
//!   - operation: move_instance
//!     address: aws_instance.web[1]
//!     new_address: aws_instance.app["green"]
//! ```

use serde::{Deserialize, Serialize};

use crate::state::ResourceState;

/// An ordered list of change operations.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChangeFile {
    /// Operations, applied in order.
    #[serde(default)]
    pub operations: Vec<ChangeOperation>,
}

/// A single state mutation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum ChangeOperation {
    /// Overwrite the state's Terraform version.
    UpgradeTerraform {
        /// New Terraform version.
        #[serde(deserialize_with = "scalar::string")]
        terraform_version: String,
    },

    /// Rewrite provider configuration addresses.
    ProviderReplace {
        /// Value (or prefix) to look for.
        #[serde(deserialize_with = "scalar::string")]
        replace: String,
        /// Replacement value.
        #[serde(deserialize_with = "scalar::string")]
        with: String,
        /// How `replace` is matched.
        #[serde(default)]
        replace_type: ReplaceMode,
    },

    /// Convert a `count` resource into a `for_each` resource.
    CountToMap {
        /// Bare address of the resource.
        #[serde(deserialize_with = "scalar::string")]
        address: String,
        /// Index to key mapping.
        #[serde(default)]
        count: Vec<CountMapping>,
    },

    /// Append a fully specified resource.
    AddResource {
        /// The resource to add.
        resource: ResourceState,
    },

    /// Remove every resource at an address.
    RemoveResource {
        /// Bare address of the resource.
        #[serde(deserialize_with = "scalar::string")]
        address: String,
    },

    /// Move one instance to another resource under a new key.
    MoveInstance {
        /// Address of the instance to move.
        #[serde(deserialize_with = "scalar::string")]
        address: String,
        /// Indexed address the instance moves to.
        #[serde(deserialize_with = "scalar::string")]
        new_address: String,
        /// Optional replacement for the instance's `name` attribute.
        #[serde(
            default,
            deserialize_with = "scalar::option",
            skip_serializing_if = "Option::is_none"
        )]
        new_name: Option<String>,
    },

    /// Any operation kind this version does not know. Skipped.
    #[serde(other)]
    Unknown,
}

/// Matching strategy for `provider_replace`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReplaceMode {
    /// Provider string must equal `replace`.
    Exact,
    /// Provider string must start with `replace`; the rest is kept.
    #[default]
    Prefix,
}

/// One `count` index to `for_each` key mapping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CountMapping {
    /// Existing `count` index.
    pub index: i64,
    /// New `for_each` key.
    #[serde(deserialize_with = "scalar::string")]
    pub key: String,
    /// Optional validation predicate for the re-keyed instance.
    #[serde(
        default,
        deserialize_with = "scalar::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub validate: Option<String>,
}

impl ChangeOperation {
    /// Returns the operation kind as written in change files.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::UpgradeTerraform { .. } => "upgrade_terraform",
            Self::ProviderReplace { .. } => "provider_replace",
            Self::CountToMap { .. } => "count_to_map",
            Self::AddResource { .. } => "add_resource",
            Self::RemoveResource { .. } => "remove_resource",
            Self::MoveInstance { .. } => "move_instance",
            Self::Unknown => "unknown",
        }
    }

    /// Returns a short description of what the operation targets.
    #[must_use]
    pub fn target(&self) -> String {
        match self {
            Self::UpgradeTerraform { terraform_version } => terraform_version.clone(),
            Self::ProviderReplace { replace, .. } => replace.clone(),
            Self::CountToMap { address, .. }
            | Self::RemoveResource { address }
            | Self::MoveInstance { address, .. } => address.clone(),
            Self::AddResource { resource } => resource.addr(),
            Self::Unknown => String::new(),
        }
    }
}

/// Lenient string fields.
///
/// Operations are buffered before dispatch on `operation`, so a plain YAML
/// scalar such as `1.6` or `2021` reaches a field still typed as a number.
/// These helpers take any scalar and keep its text.
mod scalar {
    use serde::de::{self, Deserializer, Visitor};
    use serde::Deserialize;
    use std::fmt;

    struct ScalarString(String);

    struct ScalarVisitor;

    impl Visitor<'_> for ScalarVisitor {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a string, number or boolean")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_string<E: de::Error>(self, v: String) -> Result<String, E> {
            Ok(v)
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<String, E> {
            Ok(v.to_string())
        }
    }

    impl<'de> Deserialize<'de> for ScalarString {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            deserializer.deserialize_any(ScalarVisitor).map(Self)
        }
    }

    pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        ScalarString::deserialize(deserializer).map(|s| s.0)
    }

    pub fn option<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        Option::<ScalarString>::deserialize(deserializer).map(|s| s.map(|s| s.0))
    }
}

impl std::fmt::Display for ReplaceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Exact => "exact",
            Self::Prefix => "prefix",
        };
        write!(f, "{s}")
    }
}
