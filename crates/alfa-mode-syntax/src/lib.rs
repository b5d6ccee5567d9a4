//! # alfa-mode-syntax
//!
//! The language side of the ALFA editor mode: everything the editor asks
//! about the text itself, as opposed to snippet expansion.
//!
//! ## Architecture Overview
//!
//! A mode is a [`LanguageMode`] value built from named parts:
//!
//! ```text
//! LanguageMode
//! ├── tokenizer   line → tokens + state for the next line   (lexer)
//! ├── indent      next-line indent, outdent on `}`          (indent)
//! ├── behaviour   bracket/quote auto-pairing                (behaviour)
//! ├── folding     fold widgets and ranges                   (folding)
//! └── comments    line/block comment delimiters
//! ```
//!
//! All parts work on lines. The editor hands them its lines through the
//! [`LineSource`] trait; nothing here owns a document. Bracket auto-pairing
//! remembers recent insertions in a [`BracketState`] that the caller keeps
//! per editing session.
//!
//! ## Quick Start
//!
//! ```
//! use alfa_mode_syntax::{LanguageMode, LineState};
//!
//! let mode = LanguageMode::alfa();
//! let lines = ["policy p {"];
//!
//! assert_eq!(mode.next_line_indent(&lines[..], 0, lines[0], "    "), "    ");
//!
//! let tokens = mode.tokenize(lines[0], LineState::Start).tokens;
//! assert_eq!(tokens.last().map(|t| t.kind.class()), Some("paren.lparen"));
//! ```
//!
//! The policy language's keyword and function tables are not modelled;
//! identifiers are tokenized generically.

pub mod behaviour;
pub mod brackets;
pub mod folding;
pub mod indent;
pub mod lexer;
pub mod mode;

pub use behaviour::{BracketBehaviour, BracketState, InsertContext, Insertion, LineSnapshot};
pub use brackets::{LineSource, Point, find_closing, find_opening, state_at};
pub use folding::{FoldMode, FoldRange, FoldStyle, FoldWidget};
pub use indent::{IndentPolicy, OutdentEdit, indent_of};
pub use lexer::{LineState, LineTokens, Token, TokenKind, tokenize_line};
pub use mode::{CommentTokens, LanguageMode};
