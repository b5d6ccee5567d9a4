//! # Snippet templates
//!
//! A snippet body such as
//!
//! ```text
//! rule ${1:name} {
//!     ${2|permit,deny|}
//!     $0
//! }
//! ```
//!
//! is parsed into a flat [`Template`]: a sequence of [`Token`]s plus the
//! [`Slot`]s that placeholder tokens refer to. A placeholder with default
//! text shows up as an `Open` token, the default text, and a `Close` token
//! for the same slot; a bare `$1` is an `Open` immediately followed by its
//! `Close`. Conditional variables (`${VAR?yes:no}`) put an `Else` token
//! between the two branches.
//!
//! Parsing never fails. Anything that doesn't form valid syntax is kept as
//! literal text, and a placeholder whose `}` never comes stays open (it has
//! an `Open` token but no `Close`).
//!
//! ```
//! use alfa_mode_engine::snippets::template::{Role, Template, Token};
//!
//! let template = Template::parse("a${1:b}c");
//! assert_eq!(template.tokens.len(), 5);
//! assert!(matches!(
//!     template.tokens[1],
//!     Token::Placeholder { role: Role::Open, .. }
//! ));
//! assert_eq!(template.slots[0].tabstop_id(), Some(1));
//! ```

mod lexer;

/// Index of a [`Slot`] in [`Template::slots`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(pub usize);

/// Which occurrence of a placeholder a token marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Open,
    /// The `:` between the branches of a conditional
    Else,
    Close,
}

/// Case-change directives of replacement templates (`\U`, `\L`, `\u`, `\l`,
/// `\E`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseMode {
    Upper,
    Lower,
    /// Upper-case the first character of the next text
    UpperLocal,
    /// Lower-case the first character of the next text
    LowerLocal,
    End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Text(String),
    Newline,
    Placeholder { slot: SlotId, role: Role },
    CaseChange(CaseMode),
}

/// `/guard/replacement/flags`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transform {
    pub guard: String,
    pub fmt: String,
    pub flags: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotKind {
    Tabstop(u32),
    Variable(String),
}

/// What a placeholder refers to, plus its options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub kind: SlotKind,
    /// `${1|a,b|}`; the first choice is also the default text
    pub choices: Vec<String>,
    pub transform: Option<Transform>,
    /// Back-tick span; kept but never evaluated
    pub code: Option<String>,
    /// `${VAR?if:else}`
    pub conditional: bool,
}

impl Slot {
    fn new(kind: SlotKind) -> Self {
        Self {
            kind,
            choices: Vec::new(),
            transform: None,
            code: None,
            conditional: false,
        }
    }

    pub fn tabstop_id(&self) -> Option<u32> {
        match self.kind {
            SlotKind::Tabstop(id) => Some(id),
            SlotKind::Variable(_) => None,
        }
    }

    pub fn variable(&self) -> Option<&str> {
        match &self.kind {
            SlotKind::Variable(name) => Some(name),
            SlotKind::Tabstop(_) => None,
        }
    }
}

/// A parsed snippet body or replacement template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Template {
    pub tokens: Vec<Token>,
    pub slots: Vec<Slot>,
}

impl Template {
    /// Parse a snippet body.
    pub fn parse(text: &str) -> Self {
        lexer::tokenize(text, false)
    }

    /// Parse the replacement part of a transform. `$1` refers to a capture
    /// group here, and `\n`, `\t` and the case-change escapes are active.
    pub fn parse_format(text: &str) -> Self {
        lexer::tokenize(text, true)
    }

    pub fn slot(&self, id: SlotId) -> &Slot {
        &self.slots[id.0]
    }

    /// Index of the token closing the placeholder opened at `open`, if any.
    pub fn close_of(&self, open: usize) -> Option<usize> {
        let Token::Placeholder { slot, .. } = self.tokens.get(open)? else {
            return None;
        };
        self.tokens[open + 1..]
            .iter()
            .position(|t| matches!(t, Token::Placeholder { slot: s, role: Role::Close } if s == slot))
            .map(|i| open + 1 + i)
    }

    /// Index of the else separator of the placeholder opened at `open`,
    /// looking no further than its close.
    pub fn else_of(&self, open: usize) -> Option<usize> {
        let Token::Placeholder { slot, .. } = self.tokens.get(open)? else {
            return None;
        };
        let end = self.close_of(open).unwrap_or(self.tokens.len());
        self.tokens[open + 1..end]
            .iter()
            .position(|t| matches!(t, Token::Placeholder { slot: s, role: Role::Else } if s == slot))
            .map(|i| open + 1 + i)
    }
}
