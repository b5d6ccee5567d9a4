use crate::behaviour::BracketBehaviour;
use crate::brackets::{LineSource, state_at};
use crate::folding::FoldMode;
use crate::indent::{IndentPolicy, OutdentEdit};
use crate::lexer::{LineState, LineTokens, tokenize_line, tokenize_plain};

/// Line and block comment delimiters of a language.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentTokens {
    pub line: Option<String>,
    pub block: Option<(String, String)>,
}

/// Everything an editor needs to know about a language, composed from
/// named parts. Parts a language lacks are `None`.
#[derive(Debug, Clone)]
pub struct LanguageMode {
    /// Mode id; also the snippet scope for documents in this mode
    pub id: String,
    pub tokenizer: fn(&str, LineState) -> LineTokens<'_>,
    pub indent: IndentPolicy,
    pub behaviour: Option<BracketBehaviour>,
    pub folding: Option<FoldMode>,
    pub comments: CommentTokens,
}

impl LanguageMode {
    /// The ALFA policy language: C-style tokens, indentation and brackets.
    pub fn alfa() -> Self {
        Self {
            id: "alfa".to_string(),
            tokenizer: tokenize_line,
            indent: IndentPolicy::CStyle,
            behaviour: Some(BracketBehaviour::default()),
            folding: Some(FoldMode),
            comments: CommentTokens {
                line: Some("//".to_string()),
                block: Some(("/*".to_string(), "*/".to_string())),
            },
        }
    }

    /// Plain text: no grammar, indentation copied from the previous line.
    pub fn plain_text() -> Self {
        Self {
            id: "text".to_string(),
            tokenizer: tokenize_plain,
            indent: IndentPolicy::Keep,
            behaviour: None,
            folding: None,
            comments: CommentTokens::default(),
        }
    }

    pub fn tokenize<'a>(&self, line: &'a str, state: LineState) -> LineTokens<'a> {
        (self.tokenizer)(line, state)
    }

    /// Indentation for a new line inserted after `before_cursor` on `row`.
    pub fn next_line_indent<L: LineSource + ?Sized>(
        &self,
        lines: &L,
        row: usize,
        before_cursor: &str,
        tab: &str,
    ) -> String {
        self.indent
            .next_line_indent(state_at(lines, row), before_cursor, tab)
    }

    pub fn check_outdent(&self, line: &str, input: &str) -> bool {
        self.indent.check_outdent(line, input)
    }

    pub fn auto_outdent<L: LineSource + ?Sized>(&self, lines: &L, row: usize) -> Option<OutdentEdit> {
        self.indent.auto_outdent(lines, row)
    }
}

impl Default for LanguageMode {
    fn default() -> Self {
        Self::plain_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::TokenKind;

    #[test]
    fn alfa_mode_is_composed_of_cstyle_parts() {
        let mode = LanguageMode::alfa();
        assert_eq!(mode.id, "alfa");
        assert!(mode.behaviour.is_some());
        assert_eq!(mode.comments.line.as_deref(), Some("//"));

        let tokens = mode.tokenize("f(x)", LineState::Start).tokens;
        assert_eq!(tokens[1].kind, TokenKind::LParen);
    }

    #[test]
    fn plain_text_mode_keeps_indentation() {
        let mode = LanguageMode::plain_text();
        let lines = ["  notes {"];
        assert_eq!(mode.next_line_indent(&lines[..], 0, lines[0], "    "), "  ");
        assert_eq!(mode.tokenize("a (b)", LineState::Start).tokens.len(), 1);
        assert!(!mode.check_outdent("  ", "}"));
    }
}
