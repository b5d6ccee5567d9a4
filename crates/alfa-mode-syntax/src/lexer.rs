//! # Lexer - Tokenizing Source Lines
//!
//! The editor asks for tokens one line at a time, so this lexer works on a
//! single line plus the [`LineState`] carried over from the line above. The
//! only construct that spans lines is a `/* ... */` block comment.
//!
//! Token recognition is done by [Logos]; block comments are finished by hand
//! because their end may be several lines away.
//!
//! [Logos]: https://docs.rs/logos
//!
//! ## The Lossless Guarantee
//!
//! Every byte of the line appears in exactly one token:
//!
//! ```
//! use alfa_mode_syntax::lexer::{tokenize_line, LineState};
//!
//! let line = r#"rule r1 { permit condition stringEqual(a, "x") } // done"#;
//! let tokens = tokenize_line(line, LineState::Start).tokens;
//!
//! let reconstructed: String = tokens.iter().map(|t| t.text).collect();
//! assert_eq!(line, reconstructed);
//! ```
//!
//! ## Token classes
//!
//! Tokens are kept to generic C-style classes. The lexer does not know the
//! policy language's keywords; identifiers are just identifiers. The class
//! names returned by [`TokenKind::class`] are the ones bracket behaviour and
//! highlighting hosts key on (`paren.lparen`, `comment`, `string`, ...).

use logos::Logos;

/// Raw tokens recognised by Logos.
///
/// Anything Logos cannot match is reported as an error and becomes
/// [`TokenKind::Text`].
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
enum RawToken {
    #[regex(r"[ \t\r\f]+")]
    Whitespace,

    #[regex(r"//[^\n]*")]
    LineComment,

    #[token("/*")]
    BlockCommentStart,

    /// Double-quoted string; an unterminated string runs to the end of the line
    #[regex(r#""([^"\\\n]|\\.)*"?"#)]
    String,

    #[regex(r"[\[({]")]
    LParen,

    #[regex(r"[\])}]")]
    RParen,

    #[regex(r"[a-zA-Z_$][a-zA-Z0-9_$]*")]
    Identifier,

    #[regex(r"[0-9]+(\.[0-9]+)?")]
    Number,

    #[regex(r"===|!==|==|!=|<=|>=|&&|\|\||\+\+|--|[!%&*+\-~=<>?:^|]")]
    Operator,
}

/// Token classes handed to the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Whitespace,
    Comment,
    String,
    LParen,
    RParen,
    Operator,
    Identifier,
    Number,
    Text,
}

impl TokenKind {
    /// Highlight class name of the token.
    pub fn class(self) -> &'static str {
        match self {
            TokenKind::Whitespace | TokenKind::Text => "text",
            TokenKind::Comment => "comment",
            TokenKind::String => "string",
            TokenKind::LParen => "paren.lparen",
            TokenKind::RParen => "paren.rparen",
            TokenKind::Operator => "keyword.operator",
            TokenKind::Identifier => "identifier",
            TokenKind::Number => "constant.numeric",
        }
    }

    /// Tokens an auto-inserted closing bracket may be typed inside of.
    pub fn is_safe_insert_in(self) -> bool {
        matches!(
            self,
            TokenKind::Whitespace | TokenKind::Text | TokenKind::RParen
        )
    }

    /// Tokens an auto-inserted closing bracket may sit in front of.
    pub fn is_safe_insert_before(self) -> bool {
        self.is_safe_insert_in() || self == TokenKind::Comment
    }
}

impl From<RawToken> for TokenKind {
    fn from(raw: RawToken) -> Self {
        match raw {
            RawToken::Whitespace => TokenKind::Whitespace,
            RawToken::LineComment | RawToken::BlockCommentStart => TokenKind::Comment,
            RawToken::String => TokenKind::String,
            RawToken::LParen => TokenKind::LParen,
            RawToken::RParen => TokenKind::RParen,
            RawToken::Identifier => TokenKind::Identifier,
            RawToken::Number => TokenKind::Number,
            RawToken::Operator => TokenKind::Operator,
        }
    }
}

/// Tokenizer state at a line boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LineState {
    #[default]
    Start,
    /// Inside a `/* ... */` comment that has not been closed yet
    BlockComment,
}

/// A token with its class, text and starting byte column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub start: usize,
}

impl Token<'_> {
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }
}

/// The tokens of one line and the state the next line starts in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineTokens<'a> {
    pub tokens: Vec<Token<'a>>,
    pub state: LineState,
}

/// Tokenize one line (without its terminator).
pub fn tokenize_line(line: &str, state: LineState) -> LineTokens<'_> {
    let mut tokens = Vec::new();
    let mut state = state;
    let mut offset = 0;

    while offset < line.len() {
        let rest = &line[offset..];

        if state == LineState::BlockComment {
            let end = match rest.find("*/") {
                Some(close) => {
                    state = LineState::Start;
                    close + 2
                }
                None => rest.len(),
            };
            push(&mut tokens, TokenKind::Comment, line, offset, offset + end);
            offset += end;
            continue;
        }

        let mut lexer = RawToken::lexer(rest);
        let mut restart = None;
        while let Some(result) = lexer.next() {
            let span = lexer.span();
            match result {
                Ok(RawToken::BlockCommentStart) => {
                    let body = &rest[span.end..];
                    match body.find("*/") {
                        Some(close) => {
                            let end = span.end + close + 2;
                            push(&mut tokens, TokenKind::Comment, line, offset + span.start, offset + end);
                            restart = Some(offset + end);
                        }
                        None => {
                            push(&mut tokens, TokenKind::Comment, line, offset + span.start, line.len());
                            state = LineState::BlockComment;
                            restart = Some(line.len());
                        }
                    }
                    break;
                }
                Ok(raw) => push(&mut tokens, raw.into(), line, offset + span.start, offset + span.end),
                Err(()) => push(&mut tokens, TokenKind::Text, line, offset + span.start, offset + span.end),
            }
        }
        offset = restart.unwrap_or(line.len());
    }

    LineTokens { tokens, state }
}

/// Push a token, merging runs of plain text into one token.
fn push<'a>(tokens: &mut Vec<Token<'a>>, kind: TokenKind, line: &'a str, start: usize, end: usize) {
    if start == end {
        return;
    }
    if kind == TokenKind::Text
        && let Some(last) = tokens.last_mut()
        && last.kind == TokenKind::Text
        && last.end() == start
    {
        last.text = &line[last.start..end];
        return;
    }
    tokens.push(Token {
        kind,
        text: &line[start..end],
        start,
    });
}

/// Tokenizer for modes without a grammar: the whole line is one text token.
pub fn tokenize_plain(line: &str, state: LineState) -> LineTokens<'_> {
    let mut tokens = Vec::new();
    push(&mut tokens, TokenKind::Text, line, 0, line.len());
    LineTokens { tokens, state }
}

/// Index of the token covering `column`: the first token ending at or after
/// it. Column 0 resolves to the first token.
pub fn token_index_at(tokens: &[Token<'_>], column: usize) -> Option<usize> {
    tokens.iter().position(|t| t.end() >= column)
}
