//! # Composer JSONC
//!
//! Comment-preserving, path-addressed JSON documents.
//!
//! ```text
//! source text ──lex──> tokens ──parse──> span tree (Node)
//!      ^                                      │
//!      └──── splice (TextEdit) <── JsonPath ──┘
//! ```
//!
//! Edits never re-serialize the whole document. Each `mutate`/`delete`
//! resolves its path against the live span tree, splices the smallest
//! region of text it can, and re-parses. Everything outside the spliced
//! region stays byte-identical, comments included.

pub mod ast;
pub mod document;
pub mod edit;
pub mod error;
pub mod format;
pub mod lexer;
pub mod parser;
pub mod path;

pub use ast::{Element, Member, Node, NodeKind, Span};
pub use document::{JsoncDocument, MutateOptions};
pub use edit::{EditScript, TextEdit};
pub use error::{DocumentError, DocumentResult, ParseError, ParseResult};
pub use format::Formatting;
pub use parser::parse;
pub use path::{JsonPath, PathSegment};
