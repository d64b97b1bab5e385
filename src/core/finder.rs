use tree_sitter::Node;

use super::parser::{decode_string_literal, node_text};

/// How many enclosing nodes are kept as speculative-execution
/// candidates for a dynamic load call.
pub const ANCESTRY_LIMIT: usize = 16;

/// One scanned loader argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadReference {
    /// The argument was a string literal; the decoded value.
    Literal(String),
    /// Any other argument expression; the source text of the whole
    /// call, used as a stable label when resolution fails.
    Dynamic(String),
}

/// A matched load call together with the context the dynamic resolver
/// needs: the source text of each enclosing node, nearest first.
#[derive(Debug, Clone)]
pub struct FoundCall {
    pub reference: LoadReference,
    pub ancestry: Vec<String>,
}

/// Finds every `loader("...")` invocation in an AST, in document order.
pub struct CallFinder {
    loader: String,
}

impl CallFinder {
    pub fn new(loader: &str) -> Self {
        Self {
            loader: loader.to_string(),
        }
    }

    /// Collect all load calls under `root`. Pure function of the tree.
    pub fn find(&self, root: Node, source: &str) -> Vec<FoundCall> {
        let mut found = Vec::new();
        let mut ancestors = Vec::new();
        self.visit(root, source, &mut ancestors, &mut found);
        found
    }

    fn visit<'t>(
        &self,
        node: Node<'t>,
        source: &str,
        ancestors: &mut Vec<Node<'t>>,
        found: &mut Vec<FoundCall>,
    ) {
        if node.kind() == "call_expression" {
            if let Some(reference) = self.match_load_call(node, source) {
                // A matched call is not traversed into; its argument
                // expression belongs to the match.
                found.push(FoundCall {
                    ancestry: match reference {
                        LoadReference::Dynamic(_) => ancestors
                            .iter()
                            .rev()
                            .take(ANCESTRY_LIMIT)
                            .map(|n| node_text(*n, source).to_string())
                            .collect(),
                        LoadReference::Literal(_) => Vec::new(),
                    },
                    reference,
                });
                return;
            }
        }

        ancestors.push(node);
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.visit(child, source, ancestors, found);
        }
        ancestors.pop();
    }

    /// A node matches when it is a call whose callee is a plain
    /// identifier equal to the loader name, with at least one argument.
    fn match_load_call(&self, node: Node, source: &str) -> Option<LoadReference> {
        let callee = node.child_by_field_name("function")?;
        if callee.kind() != "identifier" || node_text(callee, source) != self.loader {
            return None;
        }

        let arguments = node.child_by_field_name("arguments")?;
        if arguments.kind() != "arguments" {
            return None;
        }

        let mut cursor = arguments.walk();
        let first = arguments
            .named_children(&mut cursor)
            .find(|c| c.kind() != "comment")?;

        if first.kind() == "string" {
            Some(LoadReference::Literal(decode_string_literal(first, source)))
        } else {
            Some(LoadReference::Dynamic(node_text(node, source).to_string()))
        }
    }
}
