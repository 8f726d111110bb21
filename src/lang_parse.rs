// src/lang_parse.rs
//! Owned AST: a thin copy of tree-sitter's tree that doesn't borrow
//! the parser, so `fingerprint::ast_hash` can walk and hash it after
//! the `Parser`/`Tree` have gone out of scope. Comment nodes are
//! dropped during the copy for the same reason they're dropped from
//! the token stream: adding or removing a comment must not change the
//! fingerprint.

use super::lang_tokenize::is_literal_container;
use tree_sitter::Node;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AstNode {
    pub kind: String,
    pub children: Vec<AstNode>,
    pub start_line: usize,
    pub end_line: usize,
    /// Count of normalized tokens in this subtree, at the same
    /// granularity `lang::tokenize` produces (a literal container
    /// counts as one token, not one per internal fragment).
    pub token_count: usize,
}

impl AstNode {
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

pub fn build_ast(node: Node, source: &str) -> AstNode {
    let kind = node.kind().to_string();
    let start_line = node.start_position().row + 1;
    let end_line = node.end_position().row + 1;

    if is_literal_container(&kind) {
        return AstNode { kind, children: Vec::new(), start_line, end_line, token_count: 1 };
    }

    let mut children = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind().contains("comment") {
            continue;
        }
        children.push(build_ast(child, source));
    }

    let token_count = if children.is_empty() {
        usize::from(node.child_count() == 0)
    } else {
        children.iter().map(|c| c.token_count).sum()
    };

    AstNode { kind, children, start_line, end_line, token_count }
}
