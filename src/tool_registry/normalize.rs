//! Result normalizer. One canonical JSON form for every tool result.
//!
//! Priority:
//! 1. `Structured` payload, as-is
//! 2. first textual block of `RawContent`, parsed as JSON when it parses,
//!    otherwise as a plain string
//! 3. `Error` message as `{"error": message}`
//! 4. `{}` for anything else (empty content, content without text)
//!
//! Total and deterministic: never panics, never fails.

use serde_json::Value;

use super::types::ToolResult;

/// Convert a tool result into its canonical JSON response.
pub fn normalize(result: ToolResult) -> Value {
    match result {
        ToolResult::Structured(map) => Value::Object(map),
        ToolResult::RawContent(blocks) => blocks
            .iter()
            .find_map(|block| block.as_text())
            .map(parse_text_payload)
            .unwrap_or_else(empty_object),
        ToolResult::Error(message) => serde_json::json!({ "error": message }),
    }
}

/// JSON text becomes the parsed value; anything else stays a string.
fn parse_text_payload(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

// Unrecognized shapes fall back to an empty object rather than failing.
fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool_registry::types::ContentBlock;
    use serde_json::json;

    #[test]
    fn test_structured_returned_unchanged() {
        let value = json!({"business_units": [{"id": 1, "name": "Editorial"}]});
        let Value::Object(map) = value.clone() else {
            unreachable!()
        };
        assert_eq!(normalize(ToolResult::Structured(map)), value);
    }

    #[test]
    fn test_structured_is_idempotent_when_rewrapped() {
        let Value::Object(map) = json!({"users": [], "count": 0}) else {
            unreachable!()
        };
        let once = normalize(ToolResult::Structured(map));
        let twice = normalize(ToolResult::from_json(once.clone()));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_raw_json_text_is_parsed() {
        let result = ToolResult::text(r#"{"id": 434369, "name": "Dana"}"#);
        assert_eq!(normalize(result), json!({"id": 434369, "name": "Dana"}));
    }

    #[test]
    fn test_raw_plain_text_stays_string() {
        assert_eq!(normalize(ToolResult::text("hello world")), json!("hello world"));
    }

    #[test]
    fn test_first_textual_block_wins() {
        let result = ToolResult::RawContent(vec![
            ContentBlock::Image {
                data: "aGk=".into(),
                mime_type: "image/png".into(),
            },
            ContentBlock::text("[1, 2]"),
            ContentBlock::text("ignored"),
        ]);
        assert_eq!(normalize(result), json!([1, 2]));
    }

    #[test]
    fn test_resource_text_counts_as_textual() {
        let result = ToolResult::RawContent(vec![ContentBlock::Resource {
            uri: "file:///a.txt".into(),
            mime_type: Some("text/plain".into()),
            text: Some("42".into()),
        }]);
        assert_eq!(normalize(result), json!(42));
    }

    #[test]
    fn test_error_variant() {
        assert_eq!(
            normalize(ToolResult::Error("upstream down".into())),
            json!({"error": "upstream down"})
        );
    }

    #[test]
    fn test_empty_and_textless_content_fall_back_to_empty_object() {
        assert_eq!(normalize(ToolResult::RawContent(vec![])), json!({}));
        let images_only = ToolResult::RawContent(vec![ContentBlock::Image {
            data: String::new(),
            mime_type: "image/png".into(),
        }]);
        assert_eq!(normalize(images_only), json!({}));
    }
}
