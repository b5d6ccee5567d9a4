//! Rule-table tokenizer for snippet bodies.
//!
//! Two states: `Start` for ordinary text, and `InPlaceholder` right after a
//! `${name` opener, where at most one option (choices, transform, code span,
//! `?` or the `:` separator) is consumed before returning to `Start`. Each
//! state is a table of `(pattern, rule)` pairs tried in order; the first
//! pattern matching at the current offset wins.

use std::sync::LazyLock;

use regex::Regex;

use super::{CaseMode, Role, Slot, SlotId, SlotKind, Template, Token, Transform};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    InPlaceholder,
}

#[derive(Debug, Clone, Copy)]
enum StartRule {
    Colon,
    Escape,
    Close,
    Open,
    Dollar,
    Newline,
    Literal,
}

#[derive(Debug, Clone, Copy)]
enum PlaceholderRule {
    Choices,
    Transform,
    Code,
    Conditional,
    Separator,
}

fn rule_table<R: Copy>(rules: &[(&str, R)]) -> Vec<(Regex, R)> {
    rules
        .iter()
        .map(|(pattern, rule)| (Regex::new(pattern).expect("valid template rule"), *rule))
        .collect()
}

static START_RULES: LazyLock<Vec<(Regex, StartRule)>> = LazyLock::new(|| {
    rule_table(&[
        (r"^:", StartRule::Colon),
        (r"^\\.", StartRule::Escape),
        (r"^\}", StartRule::Close),
        (r"^\$\{[0-9A-Za-z_]+", StartRule::Open),
        (r"^\$(?:[0-9]+|[0-9A-Za-z_]+)", StartRule::Dollar),
        (r"^\n", StartRule::Newline),
        (r"^[^\\$}:\n]+", StartRule::Literal),
        (r"^(?s).", StartRule::Literal),
    ])
});

static PLACEHOLDER_RULES: LazyLock<Vec<(Regex, PlaceholderRule)>> = LazyLock::new(|| {
    rule_table(&[
        (r"^\|((?:[^\\|]|\\.)*)\|", PlaceholderRule::Choices),
        (
            r"^/((?:[^\\/]|\\.)+)/((?:[^\\/]|\\.)*)/([0-9A-Za-z_]*):?",
            PlaceholderRule::Transform,
        ),
        (r"^`((?:[^\\`]|\\.)*)`", PlaceholderRule::Code),
        (r"^\?", PlaceholderRule::Conditional),
        (r"^(?:[^:}\\]|\\.)*:?", PlaceholderRule::Separator),
    ])
});

struct OpenSlot {
    slot: SlotId,
    /// Set by `?`; the next `:` becomes the else separator
    expect_else: bool,
}

struct Lexer {
    format: bool,
    tokens: Vec<Token>,
    slots: Vec<Slot>,
    stack: Vec<OpenSlot>,
}

pub(super) fn tokenize(text: &str, format: bool) -> Template {
    let mut lexer = Lexer {
        format,
        tokens: Vec::new(),
        slots: Vec::new(),
        stack: Vec::new(),
    };

    let mut state = State::Start;
    let mut rest = text;
    while !rest.is_empty() {
        let (consumed, next) = match state {
            State::Start => lexer.start(rest),
            State::InPlaceholder => (lexer.placeholder(rest), State::Start),
        };
        state = next;
        rest = &rest[consumed..];
    }

    Template {
        tokens: lexer.tokens,
        slots: lexer.slots,
    }
}

impl Lexer {
    fn start(&mut self, rest: &str) -> (usize, State) {
        let Some((matched, rule)) = START_RULES
            .iter()
            .find_map(|(re, rule)| re.find(rest).map(|m| (m.as_str(), *rule)))
        else {
            self.text(rest);
            return (rest.len(), State::Start);
        };

        let mut next = State::Start;
        match rule {
            StartRule::Colon => match self.stack.last_mut() {
                Some(top) if top.expect_else => {
                    top.expect_else = false;
                    let slot = top.slot;
                    self.tokens.push(Token::Placeholder {
                        slot,
                        role: Role::Else,
                    });
                }
                _ => self.text(matched),
            },
            StartRule::Escape => self.escape(matched),
            StartRule::Close => match self.stack.pop() {
                Some(open) => self.tokens.push(Token::Placeholder {
                    slot: open.slot,
                    role: Role::Close,
                }),
                None => self.text(matched),
            },
            StartRule::Open => {
                let slot = self.new_slot(&matched[2..]);
                self.tokens.push(Token::Placeholder {
                    slot,
                    role: Role::Open,
                });
                self.stack.push(OpenSlot {
                    slot,
                    expect_else: false,
                });
                next = State::InPlaceholder;
            }
            StartRule::Dollar => {
                let slot = self.new_slot(&matched[1..]);
                self.tokens.push(Token::Placeholder {
                    slot,
                    role: Role::Open,
                });
                self.tokens.push(Token::Placeholder {
                    slot,
                    role: Role::Close,
                });
            }
            StartRule::Newline => self.tokens.push(Token::Newline),
            StartRule::Literal => self.text(matched),
        }
        (matched.len(), next)
    }

    fn escape(&mut self, matched: &str) {
        let Some(ch) = matched[1..].chars().next() else {
            self.text(matched);
            return;
        };
        match ch {
            '}' if !self.stack.is_empty() => self.text("}"),
            '`' | '$' | '\\' => self.text(&matched[1..]),
            'n' if self.format => self.text("\n"),
            't' if self.format => self.text("\t"),
            '/' if self.format => self.text("/"),
            'u' if self.format => self.tokens.push(Token::CaseChange(CaseMode::UpperLocal)),
            'l' if self.format => self.tokens.push(Token::CaseChange(CaseMode::LowerLocal)),
            'U' if self.format => self.tokens.push(Token::CaseChange(CaseMode::Upper)),
            'L' if self.format => self.tokens.push(Token::CaseChange(CaseMode::Lower)),
            'E' if self.format => self.tokens.push(Token::CaseChange(CaseMode::End)),
            _ => self.text(matched),
        }
    }

    /// Returns the number of bytes consumed; may be zero.
    fn placeholder(&mut self, rest: &str) -> usize {
        let Some((caps, rule)) = PLACEHOLDER_RULES
            .iter()
            .find_map(|(re, rule)| re.captures(rest).map(|c| (c, *rule)))
        else {
            return 0;
        };
        let group = |i: usize| caps.get(i).map_or("", |m| m.as_str());

        let Some(top) = self.stack.last_mut() else {
            return 0;
        };
        let slot_id = top.slot;
        match rule {
            PlaceholderRule::Choices => {
                let choices = split_choices(group(1));
                let first = choices.first().cloned().unwrap_or_default();
                self.slots[slot_id.0].choices = choices;
                self.text(&first);
            }
            PlaceholderRule::Transform => {
                self.slots[slot_id.0].transform = Some(Transform {
                    guard: group(1).to_string(),
                    fmt: group(2).to_string(),
                    flags: group(3).to_string(),
                });
            }
            PlaceholderRule::Code => {
                self.slots[slot_id.0].code = Some(group(1).to_string());
            }
            PlaceholderRule::Conditional => {
                top.expect_else = true;
                self.slots[slot_id.0].conditional = true;
            }
            PlaceholderRule::Separator => {}
        }
        group(0).len()
    }

    fn new_slot(&mut self, name: &str) -> SlotId {
        let kind = match name.parse::<u32>() {
            Ok(id) if !self.format && name.bytes().all(|b| b.is_ascii_digit()) => SlotKind::Tabstop(id),
            _ => SlotKind::Variable(name.to_string()),
        };
        self.slots.push(Slot::new(kind));
        SlotId(self.slots.len() - 1)
    }

    fn text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Token::Text(last)) = self.tokens.last_mut() {
            last.push_str(text);
        } else {
            self.tokens.push(Token::Text(text.to_string()));
        }
    }
}

/// Split a choice list on unescaped commas. `\,`, `\|` and `\\` unescape;
/// other escapes are kept as written.
fn split_choices(list: &str) -> Vec<String> {
    let mut choices = vec![String::new()];
    let mut chars = list.chars();
    while let Some(c) = chars.next() {
        if c == ',' {
            choices.push(String::new());
            continue;
        }
        let Some(current) = choices.last_mut() else {
            continue;
        };
        if c != '\\' {
            current.push(c);
            continue;
        }
        match chars.next() {
            Some(next @ (',' | '|' | '\\')) => current.push(next),
            Some(next) => {
                current.push('\\');
                current.push(next);
            }
            None => current.push('\\'),
        }
    }
    choices
}
