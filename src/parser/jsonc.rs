//! JSONC (JSON with comments) parser
//!
//! Builds a [`serde_json::Value`] from a tree-sitter JSON syntax tree. The
//! tree-sitter grammar treats `//` and `/* */` comments as extras, so they are
//! simply skipped while walking the tree.

use serde_json::{Map, Value};
use tracing::warn;

use crate::parser::ParseError;

/// Parse JSONC content into a JSON value
pub fn parse_jsonc(content: &str) -> Result<Value, ParseError> {
    let mut parser = tree_sitter::Parser::new();
    let language = tree_sitter_json::LANGUAGE;
    parser.set_language(&language.into()).map_err(|e| {
        warn!("Failed to set JSON language for tree-sitter: {}", e);
        ParseError::TreeSitter(e.to_string())
    })?;

    let tree = parser.parse(content, None).ok_or_else(|| {
        warn!("Failed to parse JSONC content");
        ParseError::ParseFailed("Failed to parse JSONC".to_string())
    })?;

    let root = tree.root_node();
    if root.has_error() {
        let (line, column) = first_error_position(root).unwrap_or((0, 0));
        return Err(ParseError::InvalidSyntax(format!(
            "unexpected token at line {}, column {}",
            line + 1,
            column + 1
        )));
    }

    let mut cursor = root.walk();
    let mut values = root
        .named_children(&mut cursor)
        .filter(|node| node.kind() != "comment");
    let Some(document) = values.next() else {
        return Err(ParseError::InvalidSyntax("empty document".to_string()));
    };
    if values.next().is_some() {
        return Err(ParseError::InvalidSyntax(
            "more than one top-level value".to_string(),
        ));
    }

    node_to_value(document, content)
}

fn node_to_value(node: tree_sitter::Node, content: &str) -> Result<Value, ParseError> {
    let text = &content[node.byte_range()];
    match node.kind() {
        "object" => {
            let mut map = Map::new();
            let mut cursor = node.walk();
            for pair in node.named_children(&mut cursor) {
                if pair.kind() != "pair" {
                    continue;
                }
                let (Some(key), Some(value)) = (
                    pair.child_by_field_name("key"),
                    pair.child_by_field_name("value"),
                ) else {
                    continue;
                };
                let key = decode_string(&content[key.byte_range()])?;
                map.insert(key, node_to_value(value, content)?);
            }
            Ok(Value::Object(map))
        }
        "array" => {
            let mut cursor = node.walk();
            node.named_children(&mut cursor)
                .filter(|child| child.kind() != "comment")
                .map(|child| node_to_value(child, content))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        "string" => decode_string(text).map(Value::String),
        "number" => serde_json::from_str::<serde_json::Number>(text)
            .map(Value::Number)
            .map_err(|e| ParseError::InvalidSyntax(format!("invalid number {}: {}", text, e))),
        "true" => Ok(Value::Bool(true)),
        "false" => Ok(Value::Bool(false)),
        "null" => Ok(Value::Null),
        kind => Err(ParseError::InvalidSyntax(format!(
            "unexpected node '{}' at line {}",
            kind,
            node.start_position().row + 1
        ))),
    }
}

/// Decode a quoted JSON string literal, resolving escape sequences
fn decode_string(literal: &str) -> Result<String, ParseError> {
    serde_json::from_str::<String>(literal)
        .map_err(|e| ParseError::InvalidSyntax(format!("invalid string {}: {}", literal, e)))
}

fn first_error_position(node: tree_sitter::Node) -> Option<(usize, usize)> {
    if node.is_error() || node.is_missing() {
        let point = node.start_position();
        return Some((point.row, point.column));
    }
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .filter(|child| child.has_error())
        .find_map(first_error_position)
}
