// src/lang.rs
//! Language adapter: maps a language tag to a tree-sitter grammar and
//! exposes the two capability operations the rest of the engine needs
//! (`tokenize`, `parse`). Represented as a tagged `Lang` enum with
//! inherent methods rather than a trait-object registry — every
//! supported language is known at compile time.

use crate::error::{EngineError, Result};
use tree_sitter::{Language, Parser};

#[path = "lang_tokenize.rs"]
mod lang_tokenize;
#[path = "lang_parse.rs"]
mod lang_parse;

pub use lang_parse::AstNode;
pub use lang_tokenize::{Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    Python,
    JavaScript,
    TypeScript,
    C,
    Cpp,
    Java,
    Go,
    Rust,
}

impl Lang {
    /// Parses a language tag as it appears on the wire (§6 `language`
    /// field), not a file extension — the submission surface already
    /// knows the language, this is not extension sniffing.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "python" | "py" => Some(Self::Python),
            "javascript" | "js" => Some(Self::JavaScript),
            "typescript" | "ts" => Some(Self::TypeScript),
            "c" => Some(Self::C),
            "cpp" | "c++" => Some(Self::Cpp),
            "java" => Some(Self::Java),
            "go" | "golang" => Some(Self::Go),
            "rust" | "rs" => Some(Self::Rust),
            _ => None,
        }
    }

    pub fn parse_tag(tag: &str) -> Result<Self> {
        Self::from_tag(tag).ok_or_else(|| EngineError::UnsupportedLanguage(tag.to_string()))
    }

    #[must_use]
    pub fn as_tag(self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::C => "c",
            Self::Cpp => "cpp",
            Self::Java => "java",
            Self::Go => "go",
            Self::Rust => "rust",
        }
    }

    #[must_use]
    pub fn grammar(self) -> Language {
        match self {
            Self::Python => tree_sitter_python::LANGUAGE.into(),
            Self::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Self::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Self::C => tree_sitter_c::LANGUAGE.into(),
            Self::Cpp => tree_sitter_cpp::LANGUAGE.into(),
            Self::Java => tree_sitter_java::LANGUAGE.into(),
            Self::Go => tree_sitter_go::LANGUAGE.into(),
            Self::Rust => tree_sitter_rust::LANGUAGE.into(),
        }
    }

    fn new_parser(self) -> Result<Parser> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.grammar())
            .map_err(|e| EngineError::Other(anyhow::anyhow!("grammar init failed: {e}")))?;
        Ok(parser)
    }

    /// Normalized token stream. Identifiers collapse to a single
    /// placeholder kind, literals collapse per kind, comments and
    /// whitespace are dropped — see [`lang_tokenize`] for the per-node
    /// normalization table.
    pub fn tokenize(self, filename: &str, source: &str) -> Result<Vec<Token>> {
        let mut parser = self.new_parser()?;
        let tree = parser.parse(source, None).ok_or_else(|| {
            EngineError::TokenizeError {
                file: filename.to_string(),
                source: anyhow::anyhow!("tree-sitter produced no tree"),
            }
        })?;
        Ok(lang_tokenize::normalized_tokens(self, tree.root_node(), source))
    }

    /// Owned AST, detached from the tree-sitter `Tree` borrow so the
    /// hasher can walk it without keeping the parser alive.
    pub fn parse(self, filename: &str, source: &str) -> Result<AstNode> {
        let mut parser = self.new_parser()?;
        let tree = parser.parse(source, None).ok_or_else(|| EngineError::ParseError {
            file: filename.to_string(),
            source: anyhow::anyhow!("tree-sitter produced no tree"),
        })?;
        Ok(lang_parse::build_ast(tree.root_node(), source))
    }
}
