use std::sync::LazyLock;

use regex::Regex;

use crate::brackets::{LineSource, Point, find_opening};
use crate::lexer::{LineState, TokenKind, tokenize_line};

static OPENS_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*(?:\bcase\b.*:|[\{\(\[])\s*$").expect("valid block opener pattern")
});

static DOC_COMMENT_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(/?)\*").expect("valid doc comment pattern"));

/// How the next line is indented after a newline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IndentPolicy {
    /// Copy the current line's indentation
    #[default]
    Keep,
    /// Brace languages: indent after an opening bracket or `case ...:`, and
    /// continue `*` gutters inside block comments
    CStyle,
}

/// Replace `(row, 0)..(row, end_column)` with `indent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutdentEdit {
    pub row: usize,
    pub end_column: usize,
    pub indent: String,
}

/// Leading whitespace of a line.
pub fn indent_of(line: &str) -> &str {
    let end = line
        .char_indices()
        .find(|(_, c)| !c.is_whitespace())
        .map_or(line.len(), |(i, _)| i);
    &line[..end]
}

impl IndentPolicy {
    /// Indentation for the line after `line`, which starts in `state`.
    ///
    /// `line` is the text before the cursor, `tab` one indent level.
    pub fn next_line_indent(self, state: LineState, line: &str, tab: &str) -> String {
        let mut indent = indent_of(line).to_string();
        if self == IndentPolicy::Keep {
            return indent;
        }

        let tokens = tokenize_line(line, state);
        if tokens.tokens.last().is_some_and(|t| t.kind == TokenKind::Comment) && state == LineState::Start {
            return indent;
        }

        match state {
            LineState::Start => {
                if OPENS_BLOCK.is_match(line) {
                    indent.push_str(tab);
                }
            }
            LineState::BlockComment => {
                if tokens.state == LineState::Start {
                    return String::new();
                }
                if let Some(caps) = DOC_COMMENT_LINE.captures(line) {
                    if caps.get(1).is_some_and(|slash| !slash.is_empty()) {
                        indent.push(' ');
                    }
                    indent.push_str("* ");
                }
            }
        }
        indent
    }

    /// Typing `input` on a whitespace-only `line` should re-indent it.
    pub fn check_outdent(self, line: &str, input: &str) -> bool {
        if self == IndentPolicy::Keep {
            return false;
        }
        if line.is_empty() || !line.chars().all(char::is_whitespace) {
            return false;
        }
        input.trim_start().starts_with('}')
    }

    /// Align a line starting with `}` to the indentation of the line holding
    /// its opening brace.
    ///
    /// Returns `None` when the line doesn't start with `}`, the brace is
    /// unbalanced, or the opener sits on the same row.
    pub fn auto_outdent<L: LineSource + ?Sized>(self, lines: &L, row: usize) -> Option<OutdentEdit> {
        if self == IndentPolicy::Keep {
            return None;
        }
        let line = lines.line(row);
        let whitespace = indent_of(&line).len();
        if !line[whitespace..].starts_with('}') {
            return None;
        }

        let open = find_opening(lines, '}', Point::new(row, whitespace))?;
        if open.row == row {
            return None;
        }
        Some(OutdentEdit {
            row,
            end_column: whitespace,
            indent: indent_of(&lines.line(open.row)).to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case::after_brace("policy p {", "    ")]
    #[case::after_paren("  f(", "      ")]
    #[case::trailing_space_after_bracket("  target [  ", "      ")]
    #[case::case_label("  case 1:", "      ")]
    #[case::plain_statement("  permit", "  ")]
    #[case::brace_in_comment("  x // {", "  ")]
    fn cstyle_next_line_indent(#[case] line: &str, #[case] expected: &str) {
        let indent = IndentPolicy::CStyle.next_line_indent(LineState::Start, line, "    ");
        assert_eq!(indent, expected);
    }

    #[test]
    fn keep_policy_copies_indentation() {
        let indent = IndentPolicy::Keep.next_line_indent(LineState::Start, "\t\tx {", "\t");
        assert_eq!(indent, "\t\t");
    }

    #[test]
    fn block_comment_gutter_continues() {
        let policy = IndentPolicy::CStyle;
        assert_eq!(policy.next_line_indent(LineState::BlockComment, "  * text", "  "), "  * ");
        assert_eq!(policy.next_line_indent(LineState::BlockComment, "  text */", "  "), "");
    }

    #[rstest]
    #[case("    ", "}", true)]
    #[case("    ", "  }", true)]
    #[case("", "}", false)]
    #[case("  x ", "}", false)]
    #[case("    ", "a", false)]
    fn check_outdent_cases(#[case] line: &str, #[case] input: &str, #[case] expected: bool) {
        assert_eq!(IndentPolicy::CStyle.check_outdent(line, input), expected);
    }

    #[test]
    fn auto_outdent_aligns_closing_brace() {
        let lines = ["  rule r {", "    permit", "        }"];
        let edit = IndentPolicy::CStyle.auto_outdent(&lines[..], 2);
        assert_eq!(
            edit,
            Some(OutdentEdit {
                row: 2,
                end_column: 8,
                indent: "  ".to_string(),
            })
        );
    }

    #[test]
    fn auto_outdent_ignores_same_row_and_unbalanced() {
        let same_row = ["{ }"];
        assert_eq!(IndentPolicy::CStyle.auto_outdent(&same_row[..], 0), None);

        let unbalanced = ["x", "  }"];
        assert_eq!(IndentPolicy::CStyle.auto_outdent(&unbalanced[..], 1), None);
    }
}
