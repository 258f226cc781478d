//! Terraform state (format version 4) types.
//!
//! These types mirror the JSON layout of a `terraform.tfstate` file closely
//! enough that a load/save round trip only changes what a change file
//! touched. Attribute payloads are carried as raw JSON with key order
//! preserved.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// The only state format version this crate reads and writes.
pub const STATE_VERSION: u64 = 4;

/// Marker for the fixed `"version": 4` field.
///
/// Always serializes as `4`. Loading a document with any other version fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateVersion;

/// The root of a state document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct State {
    /// State format version.
    pub version: StateVersion,
    /// Terraform version that last wrote the state.
    #[serde(default)]
    pub terraform_version: String,
    /// Revision counter.
    #[serde(default)]
    pub serial: u64,
    /// Identifier shared by all revisions of this state.
    #[serde(default)]
    pub lineage: String,
    /// Root module outputs.
    #[serde(default)]
    pub outputs: BTreeMap<String, OutputState>,
    /// Resources, in document order until normalized.
    #[serde(default)]
    pub resources: Vec<ResourceState>,
}

/// A root module output value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputState {
    /// Output value.
    pub value: Value,
    /// Output type descriptor.
    #[serde(rename = "type")]
    pub value_type: Value,
    /// Whether the value is sensitive.
    #[serde(default, skip_serializing_if = "is_false")]
    pub sensitive: bool,
}

/// Resource mode.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// A managed resource (`resource` block).
    #[default]
    Managed,
    /// A data source (`data` block).
    Data,
}

/// How a resource's instances are keyed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EachMode {
    /// Instances created with `count`.
    List,
    /// Instances created with `for_each`.
    Map,
}

/// A resource and all of its instances.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResourceState {
    /// Module path (`module.a.module.b`), empty for the root module.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub module: String,
    /// Resource mode.
    pub mode: Mode,
    /// Resource type (`aws_instance`).
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Resource name.
    pub name: String,
    /// Instance keying mode, absent for single-instance resources.
    #[serde(rename = "each", default, skip_serializing_if = "Option::is_none")]
    pub each_mode: Option<EachMode>,
    /// Provider configuration address.
    #[serde(rename = "provider", default)]
    pub provider_config: String,
    /// Instances owned by this resource.
    #[serde(default)]
    pub instances: Vec<InstanceState>,
}

/// Key distinguishing the instances of one resource.
///
/// The derived ordering is the canonical instance order: `None` first, then
/// integer keys numerically, then string keys lexically. Every string key
/// sorts after every integer key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndexKey {
    /// No key (single instance).
    #[default]
    None,
    /// `count` index.
    Int(i64),
    /// `for_each` key.
    Str(String),
}

/// One realized instance of a resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InstanceState {
    /// Instance key.
    #[serde(default, skip_serializing_if = "IndexKey::is_none")]
    pub index_key: IndexKey,
    /// Instance status (`tainted`).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub status: String,
    /// Deposed object key.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub deposed: String,
    /// Provider schema version of the attributes.
    #[serde(default)]
    pub schema_version: u64,
    /// Raw attribute object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Value>,
    /// Legacy flatmap attributes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes_flat: Option<BTreeMap<String, String>>,
    /// Sensitive attribute paths.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensitive_attributes: Option<Value>,
    /// Opaque provider private data (base64).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private: Option<String>,
    /// Addresses this instance depends on.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    /// Whether the instance is replaced create-before-destroy.
    #[serde(default, skip_serializing_if = "is_false")]
    pub create_before_destroy: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_false(value: &bool) -> bool {
    !*value
}

impl Mode {
    /// Returns the mode as written in state documents.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Managed => "managed",
            Self::Data => "data",
        }
    }
}

impl IndexKey {
    /// Returns true if no key is present.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Creates a string key.
    #[must_use]
    pub fn string(key: impl Into<String>) -> Self {
        Self::Str(key.into())
    }
}

impl ResourceState {
    /// Creates a managed resource in the root module with no instances.
    #[must_use]
    pub fn managed(resource_type: &str, name: &str, provider: &str) -> Self {
        Self {
            mode: Mode::Managed,
            resource_type: resource_type.to_string(),
            name: name.to_string(),
            provider_config: provider.to_string(),
            ..Self::default()
        }
    }

    /// Adds an instance, builder style.
    #[must_use]
    pub fn with_instance(mut self, instance: InstanceState) -> Self {
        self.instances.push(instance);
        self
    }

    /// Returns the instance keys in their current order.
    #[must_use]
    pub fn index_keys(&self) -> Vec<&IndexKey> {
        self.instances.iter().map(|i| &i.index_key).collect()
    }
}

impl InstanceState {
    /// Creates an instance with the given key and attributes.
    #[must_use]
    pub fn new(index_key: IndexKey, attributes: Value) -> Self {
        Self {
            index_key,
            attributes: Some(attributes),
            ..Self::default()
        }
    }

    /// Decodes the attribute payload into an object.
    ///
    /// Absent attributes decode to an empty object.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem if the payload is not an object.
    pub fn decoded_attributes(&self) -> std::result::Result<Map<String, Value>, String> {
        match &self.attributes {
            None | Some(Value::Null) => Ok(Map::new()),
            Some(Value::Object(map)) => Ok(map.clone()),
            Some(other) => Err(format!("expected an object, found {}", json_kind(other))),
        }
    }

    /// Sets a top-level attribute, creating the attribute object if needed.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem if the payload is not an object.
    pub fn set_attribute(&mut self, key: &str, value: Value) -> std::result::Result<(), String> {
        let attributes = self
            .attributes
            .get_or_insert_with(|| Value::Object(Map::new()));
        if attributes.is_null() {
            *attributes = Value::Object(Map::new());
        }

        match attributes {
            Value::Object(map) => {
                map.insert(key.to_string(), value);
                Ok(())
            }
            other => Err(format!("expected an object, found {}", json_kind(other))),
        }
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl Serialize for StateVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u64(STATE_VERSION)
    }
}

impl<'de> Deserialize<'de> for StateVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let found = u64::deserialize(deserializer)?;
        if found == STATE_VERSION {
            Ok(Self)
        } else {
            Err(D::Error::custom(format!(
                "unsupported state version {found}, expected {STATE_VERSION}"
            )))
        }
    }
}

impl Serialize for IndexKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::None => serializer.serialize_none(),
            Self::Int(n) => serializer.serialize_i64(*n),
            Self::Str(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for IndexKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawKey {
            Int(i64),
            Str(String),
        }

        Ok(match Option::<RawKey>::deserialize(deserializer)? {
            None => Self::None,
            Some(RawKey::Int(n)) => Self::Int(n),
            Some(RawKey::Str(s)) => Self::Str(s),
        })
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => Ok(()),
            Self::Int(n) => write!(f, "{n}"),
            Self::Str(s) => write!(f, "{s}"),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SAMPLE: &str = r#"{
  "version": 4,
  "terraform_version": "1.5.7",
  "serial": 12,
  "lineage": "3f1c0a2e",
  "outputs": {
    "ip": { "value": "10.0.0.1", "type": "string" }
  },
  "resources": [
    {
      "module": "module.net",
      "mode": "managed",
      "type": "aws_instance",
      "name": "web",
      "each": "list",
      "provider": "provider[\"registry.terraform.io/hashicorp/aws\"]",
      "instances": [
        {
          "index_key": 0,
          "schema_version": 1,
          "attributes": { "name": "web-0", "ami": "ami-123" },
          "dependencies": ["aws_vpc.main"]
        },
        {
          "index_key": "blue",
          "schema_version": 1,
          "attributes": { "name": "web-blue" },
          "create_before_destroy": true
        }
      ]
    }
  ]
}"#;

    #[test]
    fn test_deserialize_state() {
        let state: State = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(state.terraform_version, "1.5.7");
        assert_eq!(state.serial, 12);
        assert_eq!(state.resources.len(), 1);

        let resource = &state.resources[0];
        assert_eq!(resource.module, "module.net");
        assert_eq!(resource.mode, Mode::Managed);
        assert_eq!(resource.each_mode, Some(EachMode::List));
        assert_eq!(resource.instances[0].index_key, IndexKey::Int(0));
        assert_eq!(resource.instances[1].index_key, IndexKey::string("blue"));
        assert!(resource.instances[1].create_before_destroy);
    }

    #[test]
    fn test_rejects_other_versions() {
        let result = serde_json::from_str::<State>(r#"{"version": 3, "resources": []}"#);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unsupported state version 3"));
    }

    #[test]
    fn test_serialize_omits_empty_fields() {
        let state = State {
            resources: vec![ResourceState::managed("aws_s3_bucket", "logs", "aws")
                .with_instance(InstanceState::new(IndexKey::None, json!({"bucket": "logs"})))],
            ..State::default()
        };

        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["version"], json!(4));

        let resource = &value["resources"][0];
        assert!(resource.get("module").is_none());
        assert!(resource.get("each").is_none());

        let instance = &resource["instances"][0];
        assert!(instance.get("index_key").is_none());
        assert!(instance.get("deposed").is_none());
        assert!(instance.get("dependencies").is_none());
        assert!(instance.get("create_before_destroy").is_none());
    }

    #[test]
    fn test_attribute_key_order_preserved() {
        let state: State = serde_json::from_str(SAMPLE).unwrap();
        let out = serde_json::to_string(&state).unwrap();
        let name = out.find("\"name\":\"web-0\"").unwrap();
        let ami = out.find("\"ami\":\"ami-123\"").unwrap();
        assert!(name < ami);
    }

    #[test]
    fn test_index_key_order() {
        let mut keys = vec![
            IndexKey::string("b"),
            IndexKey::Int(10),
            IndexKey::None,
            IndexKey::string("a"),
            IndexKey::Int(2),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                IndexKey::None,
                IndexKey::Int(2),
                IndexKey::Int(10),
                IndexKey::string("a"),
                IndexKey::string("b"),
            ]
        );
    }

    #[test]
    fn test_set_attribute() {
        let mut instance = InstanceState::default();
        instance.set_attribute("name", json!("primary")).unwrap();
        assert_eq!(instance.attributes, Some(json!({"name": "primary"})));

        let mut broken = InstanceState::new(IndexKey::None, json!([1, 2]));
        assert!(broken.set_attribute("name", json!("x")).is_err());
        assert!(broken.decoded_attributes().is_err());
    }
}
