//! Tool definitions, invocation requests and the tagged tool result.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Arguments passed to a tool: a JSON object keyed by parameter name.
pub type ToolArguments = serde_json::Map<String, Value>;

// ─── Input Schema ────────────────────────────────────────────────────────────

/// JSON type of a declared tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
}

impl ParamType {
    /// The JSON Schema `type` keyword for this parameter type.
    pub fn schema_name(self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Object => "object",
            ParamType::Array => "array",
        }
    }

    /// Whether `value` is an instance of this type.
    pub fn matches(self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            // Handlers read integers as i64, so larger unsigned values are rejected.
            ParamType::Integer => value.is_i64(),
            ParamType::Number => value.is_number(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::Object => value.is_object(),
            ParamType::Array => value.is_array(),
        }
    }

    /// Convert a raw query-string value into this type.
    ///
    /// Returns `None` when the text does not parse as the declared type.
    pub fn coerce_str(self, raw: &str) -> Option<Value> {
        let trimmed = raw.trim();
        match self {
            ParamType::String => Some(Value::from(raw)),
            ParamType::Integer => trimmed.parse::<i64>().ok().map(Value::from),
            ParamType::Number => trimmed
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number),
            ParamType::Boolean => match trimmed {
                "true" | "1" => Some(Value::Bool(true)),
                "false" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
            ParamType::Object | ParamType::Array => serde_json::from_str::<Value>(trimmed)
                .ok()
                .filter(|v| self.matches(v)),
        }
    }
}

/// One declared parameter of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub param_type: ParamType,
    pub required: bool,
    #[serde(default)]
    pub description: String,
}

/// Name, description and ordered input schema of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
}

impl ToolDefinition {
    /// Start a definition with no parameters.
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            params: Vec::new(),
        }
    }

    /// Declare a required parameter.
    pub fn required(mut self, name: &str, param_type: ParamType, description: &str) -> Self {
        self.params.push(ParamSpec {
            name: name.to_string(),
            param_type,
            required: true,
            description: description.to_string(),
        });
        self
    }

    /// Declare an optional parameter.
    pub fn optional(mut self, name: &str, param_type: ParamType, description: &str) -> Self {
        self.params.push(ParamSpec {
            name: name.to_string(),
            param_type,
            required: false,
            description: description.to_string(),
        });
        self
    }

    /// Look up a declared parameter by name.
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Render the parameters as a JSON Schema object (MCP `inputSchema`).
    pub fn input_schema(&self) -> Value {
        let properties: serde_json::Map<String, Value> = self
            .params
            .iter()
            .map(|p| {
                let mut prop = serde_json::json!({ "type": p.param_type.schema_name() });
                if !p.description.is_empty() {
                    prop["description"] = Value::from(p.description.clone());
                }
                (p.name.clone(), prop)
            })
            .collect();

        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

// ─── Invocation ──────────────────────────────────────────────────────────────

/// A request to run one tool, as received by a transport adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocationRequest {
    pub tool_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<ToolArguments>,
}

impl ToolInvocationRequest {
    pub fn new(tool_name: &str, arguments: Option<ToolArguments>) -> Self {
        Self {
            tool_name: tool_name.to_string(),
            arguments,
        }
    }
}

// ─── Results ─────────────────────────────────────────────────────────────────

/// An unstructured content chunk returned by a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    Resource {
        uri: String,
        #[serde(rename = "mimeType", default, skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
}

impl ContentBlock {
    /// A plain text block.
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    /// The block's textual payload, if it carries one.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { text } => Some(text),
            ContentBlock::Resource { text, .. } => text.as_deref(),
            ContentBlock::Image { .. } => None,
        }
    }
}

/// The outcome of a tool call. Exactly one shape per result.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolResult {
    /// Native mapping payload.
    Structured(serde_json::Map<String, Value>),
    /// Unstructured content blocks, in the order the tool produced them.
    RawContent(Vec<ContentBlock>),
    /// Tool-reported failure message.
    Error(String),
}

impl ToolResult {
    /// Wrap an arbitrary JSON value.
    ///
    /// Objects become `Structured`; anything else is carried as a single text
    /// block holding its JSON serialization.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(map) => ToolResult::Structured(map),
            other => ToolResult::RawContent(vec![ContentBlock::text(other.to_string())]),
        }
    }

    /// A single text block.
    pub fn text(text: impl Into<String>) -> Self {
        ToolResult::RawContent(vec![ContentBlock::text(text)])
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ToolResult::Error(_))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_schema_lists_required_in_order() {
        let def = ToolDefinition::new("get_user", "Fetch a user")
            .required("app_id", ParamType::Integer, "Application id")
            .required("user_id", ParamType::Integer, "")
            .optional("verbose", ParamType::Boolean, "");
        let schema = def.input_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], serde_json::json!(["app_id", "user_id"]));
        assert_eq!(schema["properties"]["app_id"]["type"], "integer");
        assert_eq!(schema["properties"]["app_id"]["description"], "Application id");
        assert!(schema["properties"]["user_id"].get("description").is_none());
        assert_eq!(schema["properties"]["verbose"]["type"], "boolean");
    }

    #[test]
    fn test_integer_matches_rejects_floats_and_strings() {
        assert!(ParamType::Integer.matches(&serde_json::json!(2)));
        assert!(!ParamType::Integer.matches(&serde_json::json!(2.5)));
        assert!(!ParamType::Integer.matches(&serde_json::json!("2")));
        assert!(ParamType::Integer.matches(&serde_json::json!(i64::MAX)));
        assert!(!ParamType::Integer.matches(&serde_json::json!(u64::MAX)));
        assert!(ParamType::Number.matches(&serde_json::json!(2.5)));
    }

    #[test]
    fn test_coerce_str() {
        assert_eq!(ParamType::Integer.coerce_str(" 2 "), Some(serde_json::json!(2)));
        assert_eq!(ParamType::Integer.coerce_str("two"), None);
        assert_eq!(ParamType::Boolean.coerce_str("true"), Some(serde_json::json!(true)));
        assert_eq!(ParamType::Boolean.coerce_str("yes"), None);
        assert_eq!(ParamType::String.coerce_str("a b"), Some(serde_json::json!("a b")));
        assert_eq!(
            ParamType::Array.coerce_str("[1,2]"),
            Some(serde_json::json!([1, 2]))
        );
        assert_eq!(ParamType::Object.coerce_str("[1,2]"), None);
    }

    #[test]
    fn test_content_block_wire_format() {
        let block = ContentBlock::text("hi");
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json, serde_json::json!({"type": "text", "text": "hi"}));

        let image: ContentBlock = serde_json::from_value(serde_json::json!({
            "type": "image", "data": "aGk=", "mimeType": "image/png"
        }))
        .unwrap();
        assert!(image.as_text().is_none());
    }

    #[test]
    fn test_from_json_non_object_becomes_text() {
        let result = ToolResult::from_json(serde_json::json!([1, 2]));
        assert_eq!(result, ToolResult::text("[1,2]"));

        let result = ToolResult::from_json(serde_json::json!({"a": 1}));
        assert!(matches!(result, ToolResult::Structured(_)));
    }
}
