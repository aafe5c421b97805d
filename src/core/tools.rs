//! Tools the model may call, and validation of the calls it makes.

use serde_json::{json, Value};
use std::fmt;

use crate::api::{ToolCall, ToolDefinition};

pub const MANIFEST_CHARACTER: &str = "manifest_character";

const MANIFEST_REQUIRED: [&str; 3] = ["name", "image_url", "description"];

pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![ToolDefinition {
        name: MANIFEST_CHARACTER.to_string(),
        description: "Manifest a new AI character from a name, a portrait image URL, and a \
                      personality description. Call this when the user asks to summon, create, \
                      or become a specific character."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "The character's display name"
                },
                "image_url": {
                    "type": "string",
                    "description": "URL of an image depicting the character"
                },
                "description": {
                    "type": "string",
                    "description": "Personality, speaking style, and background of the character"
                }
            },
            "required": MANIFEST_REQUIRED,
        }),
    }]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestRequest {
    pub name: String,
    pub image_url: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolInvocation {
    ManifestCharacter(ManifestRequest),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCallError {
    UnknownTool(String),
    MissingArguments {
        tool: String,
        missing: Vec<&'static str>,
    },
}

impl fmt::Display for ToolCallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolCallError::UnknownTool(name) => write!(f, "Unknown tool requested: {name}"),
            ToolCallError::MissingArguments { missing, .. } => write!(
                f,
                "Missing required parameters ({})",
                missing.join(", ")
            ),
        }
    }
}

impl std::error::Error for ToolCallError {}

fn string_argument(call: &ToolCall, key: &str) -> Option<String> {
    call.arguments
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Validates a single call against the known tools.
pub fn parse_tool_call(call: &ToolCall) -> Result<ToolInvocation, ToolCallError> {
    if call.name != MANIFEST_CHARACTER {
        return Err(ToolCallError::UnknownTool(call.name.clone()));
    }

    let values: Vec<Option<String>> = MANIFEST_REQUIRED
        .iter()
        .map(|key| string_argument(call, key))
        .collect();
    let missing: Vec<&'static str> = MANIFEST_REQUIRED
        .iter()
        .zip(&values)
        .filter(|(_, value)| value.is_none())
        .map(|(key, _)| *key)
        .collect();
    if !missing.is_empty() {
        return Err(ToolCallError::MissingArguments {
            tool: call.name.clone(),
            missing,
        });
    }

    let mut values = values.into_iter().flatten();
    match (values.next(), values.next(), values.next()) {
        (Some(name), Some(image_url), Some(description)) => {
            Ok(ToolInvocation::ManifestCharacter(ManifestRequest {
                name,
                image_url,
                description,
            }))
        }
        _ => Err(ToolCallError::MissingArguments {
            tool: call.name.clone(),
            missing: MANIFEST_REQUIRED.to_vec(),
        }),
    }
}

/// Picks the first actionable call. When none is actionable, returns the
/// error of the first call.
pub fn select_invocation(calls: &[ToolCall]) -> Option<Result<ToolInvocation, ToolCallError>> {
    let mut first_error = None;
    for call in calls {
        match parse_tool_call(call) {
            Ok(invocation) => return Some(Ok(invocation)),
            Err(err) => {
                first_error.get_or_insert(err);
            }
        }
    }
    first_error.map(Err)
}
