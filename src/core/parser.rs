use std::borrow::Cow;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tree_sitter::{Node, Parser, Tree};

use crate::error::{ReqtreeError, Result};

static SHEBANG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#!.*\n").unwrap());

/// JavaScript parser built on Tree-sitter.
pub struct JsParser {
    parser: Parser,
}

impl JsParser {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        let javascript_language = tree_sitter_javascript::language();
        parser
            .set_language(&javascript_language)
            .map_err(|e| ReqtreeError::Parser(format!("Failed to set JavaScript language: {}", e)))?;

        Ok(Self { parser })
    }

    /// Parse a file's source text. Any syntax error is fatal and carries
    /// the offending file path.
    pub fn parse(&mut self, source: &str, path: &Path) -> Result<Tree> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| ReqtreeError::Parse {
                path: path.to_path_buf(),
            })?;

        if tree.root_node().has_error() {
            return Err(ReqtreeError::Parse {
                path: path.to_path_buf(),
            });
        }

        Ok(tree)
    }
}

/// Remove a leading interpreter directive line, if present.
pub fn strip_shebang(source: &str) -> Cow<'_, str> {
    SHEBANG.replace(source, "")
}

/// Source text of a node. This is the re-serialization primitive: a
/// node's byte range in the original text is its generated form.
pub fn node_text<'a>(node: Node, source: &'a str) -> &'a str {
    &source[node.byte_range()]
}

/// Decode the value of a `string` literal node, resolving the common
/// escape sequences.
pub fn decode_string_literal(node: Node, source: &str) -> String {
    let mut value = String::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "string_fragment" => value.push_str(node_text(child, source)),
            "escape_sequence" => value.push_str(&unescape(node_text(child, source))),
            _ => {}
        }
    }
    value
}

fn unescape(sequence: &str) -> String {
    let mut chars = sequence.chars();
    if chars.next() != Some('\\') {
        return sequence.to_string();
    }
    match chars.next() {
        Some('n') => "\n".to_string(),
        Some('t') => "\t".to_string(),
        Some('r') => "\r".to_string(),
        Some('0') => "\0".to_string(),
        Some(c) => c.to_string(),
        None => String::new(),
    }
}
