//! Document parsing and rendering.
//!
//! Plans and states are JSON. Change files are YAML, which also accepts
//! JSON change files.

use std::path::Path;

use tracing::debug;

use crate::change::ChangeFile;
use crate::error::{InputError, Result};
use crate::planner::PlanDocument;
use crate::state::State;

/// Parses a plan document.
///
/// # Errors
///
/// Returns a parse error if the JSON is malformed.
pub fn parse_plan(content: &str, source: Option<&Path>) -> Result<PlanDocument> {
    let plan: PlanDocument = serde_json::from_str(content)
        .map_err(|e| json_error("plan", &e, source))?;
    debug!("Parsed plan with {} resource change(s)", plan.resource_changes.len());
    Ok(plan)
}

/// Parses a state document.
///
/// # Errors
///
/// Returns a parse error if the JSON is malformed or the state version is
/// not supported.
pub fn parse_state(content: &str, source: Option<&Path>) -> Result<State> {
    let state: State = serde_json::from_str(content)
        .map_err(|e| json_error("state", &e, source))?;
    debug!(
        "Parsed state serial {} with {} resource(s)",
        state.serial,
        state.resources.len()
    );
    Ok(state)
}

/// Parses a change file.
///
/// # Errors
///
/// Returns a parse error if the YAML is malformed.
pub fn parse_change(content: &str, source: Option<&Path>) -> Result<ChangeFile> {
    let change: ChangeFile = serde_yaml::from_str(content).map_err(|e| {
        let location = e.location().map(|l| {
            format_location(source, l.line(), l.column())
        });
        InputError::parse("change", e.to_string(), location)
    })?;
    debug!("Parsed change file with {} operation(s)", change.operations.len());
    Ok(change)
}

/// Renders a state as pretty JSON with two-space indentation.
///
/// # Errors
///
/// Returns a serialization error if the state cannot be encoded.
pub fn render_state(state: &State) -> Result<String> {
    let mut content = serde_json::to_string_pretty(state).map_err(|e| {
        InputError::SerializationError {
            message: e.to_string(),
        }
    })?;
    content.push('\n');
    Ok(content)
}

fn json_error(document: &str, error: &serde_json::Error, source: Option<&Path>) -> InputError {
    InputError::parse(
        document,
        error.to_string(),
        Some(format_location(source, error.line(), error.column())),
    )
}

fn format_location(source: Option<&Path>, line: usize, column: usize) -> String {
    source.map_or_else(
        || format!("{line}:{column}"),
        |path| format!("{}:{line}:{column}", path.display()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StatefixError;

    const STATE: &str = r#"{
  "version": 4,
  "terraform_version": "1.5.7",
  "serial": 3,
  "lineage": "abc",
  "outputs": {},
  "resources": [
    {
      "mode": "managed",
      "type": "aws_instance",
      "name": "web",
      "provider": "provider[\"registry.terraform.io/hashicorp/aws\"]",
      "instances": [
        {
          "schema_version": 1,
          "attributes": {
            "name": "web",
            "ami": "ami-123"
          }
        }
      ]
    }
  ]
}
"#;

    #[test]
    fn test_state_render_round_trip() {
        let state = parse_state(STATE, None).unwrap();
        assert_eq!(state.serial, 3);
        assert_eq!(render_state(&state).unwrap(), STATE);
    }

    #[test]
    fn test_state_version_is_checked() {
        let content = STATE.replace("\"version\": 4", "\"version\": 3");
        let err = parse_state(&content, Some(Path::new("/tmp/state.json"))).unwrap_err();
        assert!(err.is_input_error());
        assert!(err.to_string().contains("unsupported state version 3"));
    }

    #[test]
    fn test_malformed_plan_reports_location() {
        let err = parse_plan("{\n  \"resource_changes\": [", Some(Path::new("plan.json")))
            .unwrap_err();
        let StatefixError::Input(InputError::ParseError {
            document, location, ..
        }) = err
        else {
            panic!("expected a parse error");
        };
        assert_eq!(document, "plan");
        assert!(location.unwrap().starts_with("plan.json:2:"));

        let err = parse_state("{", Some(Path::new("/work/state.json"))).unwrap_err();
        assert!(err.to_string().contains("failed to parse state file at /work/state.json:1:"));
    }

    #[test]
    fn test_change_file_accepts_json() {
        let change = parse_change(
            r#"{"operations": [{"operation": "remove_resource", "address": "aws_instance.web"}]}"#,
            None,
        )
        .unwrap();
        assert_eq!(change.operations.len(), 1);
    }

    #[test]
    fn test_malformed_change_file() {
        let err = parse_change("operations: [", None).unwrap_err();
        assert!(err.to_string().contains("failed to parse change file at "));
    }
}
