//! Turning a resolved template into final text and tabstop regions.
//!
//! Every occurrence of a tabstop id shows the same default text: the first
//! plain default given for the id anywhere in the template, or else the
//! first default that contains other tabstops. Occurrences with a transform
//! show the transformed default and become mirrors of the tabstop.

use std::collections::{BTreeMap, HashMap};

use crate::editing::{Change, Position, Range};
use crate::snippets::template::{Role, SlotId, Template, Token, Transform};

/// One occurrence of a tabstop, relative to the insertion start: row 0
/// columns are offsets from the insertion column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionLayout {
    pub range: Range,
    pub transform: Option<Transform>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabstopLayout {
    pub id: u32,
    pub choices: Vec<String>,
    pub regions: Vec<RegionLayout>,
}

/// Final snippet text and its tabstops in traversal order (ascending id,
/// `0` last).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expansion {
    pub text: String,
    pub tabstops: Vec<TabstopLayout>,
}

#[derive(Debug, Clone)]
enum DefaultText {
    Flat(String),
    Nested(Vec<Token>),
}

/// Index of the `Close` of the placeholder opened at `open` within `tokens`.
fn close_index(tokens: &[Token], open: usize, slot: SlotId) -> Option<usize> {
    tokens[open + 1..]
        .iter()
        .position(|t| matches!(t, Token::Placeholder { slot: s, role: Role::Close } if *s == slot))
        .map(|i| open + 1 + i)
}

struct Layout<'a> {
    template: &'a Template,
    indent: &'a str,
    tab: &'a str,
    transform: &'a dyn Fn(&str, &Transform) -> String,
    defaults: HashMap<u32, DefaultText>,
    groups: BTreeMap<u32, TabstopLayout>,
    expanding: Vec<u32>,
    text: String,
    pos: Position,
}

impl Layout<'_> {
    fn map_text(&self, token: &Token) -> Option<String> {
        match token {
            Token::Text(text) => Some(text.replace('\t', self.tab)),
            Token::Newline => Some(format!("\n{}", self.indent)),
            _ => None,
        }
    }

    fn collect_defaults(&mut self) {
        let template = self.template;
        let tokens = &template.tokens;
        for (i, token) in tokens.iter().enumerate() {
            let Token::Placeholder { slot, role: Role::Open } = token else {
                continue;
            };
            let info = template.slot(*slot);
            let Some(id) = info.tabstop_id() else {
                continue;
            };

            let group = self.groups.entry(id).or_insert_with(|| TabstopLayout {
                id,
                choices: Vec::new(),
                regions: Vec::new(),
            });
            if group.choices.is_empty() && !info.choices.is_empty() {
                group.choices = info.choices.clone();
            }

            let Some(close) = close_index(tokens, i, *slot) else {
                continue;
            };
            let inner = &tokens[i + 1..close];
            let nested = inner.iter().any(|t| matches!(t, Token::Placeholder { .. }));
            // A plain default beats a nested one; otherwise the first wins.
            let replace = match self.defaults.get(&id) {
                Some(DefaultText::Flat(_)) => false,
                Some(DefaultText::Nested(_)) => !nested && !inner.is_empty(),
                None => !inner.is_empty(),
            };
            if replace {
                let default = if nested {
                    DefaultText::Nested(inner.to_vec())
                } else {
                    DefaultText::Flat(inner.iter().filter_map(|t| self.map_text(t)).collect())
                };
                self.defaults.insert(id, default);
            }
        }
    }

    fn push(&mut self, text: &str) {
        self.pos = Change::end_of_insert(self.pos, text);
        self.text.push_str(text);
    }

    fn emit(&mut self, tokens: &[Token]) {
        let template = self.template;
        let mut i = 0;
        while i < tokens.len() {
            let token = &tokens[i];
            i += 1;

            if let Some(text) = self.map_text(token) {
                self.push(&text);
                continue;
            }
            let Token::Placeholder { slot, role: Role::Open } = token else {
                continue;
            };
            let info = template.slot(*slot);
            let Some(id) = info.tabstop_id() else {
                continue;
            };
            // A tabstop inside its own default only keeps its text.
            if self.expanding.contains(&id) {
                continue;
            }

            let start = self.pos;
            self.expanding.push(id);
            match self.defaults.get(&id).cloned() {
                Some(DefaultText::Flat(text)) => {
                    let text = match &info.transform {
                        Some(transform) => (self.transform)(&text, transform),
                        None => text,
                    };
                    self.push(&text);
                }
                Some(DefaultText::Nested(inner)) => self.emit(&inner),
                None => {}
            }
            self.expanding.pop();

            if let Some(group) = self.groups.get_mut(&id) {
                group.regions.push(RegionLayout {
                    range: Range::new(start, self.pos),
                    transform: info.transform.clone(),
                });
            }
            if let Some(close) = close_index(tokens, i - 1, *slot) {
                i = close + 1;
            }
        }
    }
}

/// Lay out a resolved template.
///
/// Newlines are followed by `indent`, tabs in literal text become `tab`, and
/// `transform` computes what mirror occurrences show.
pub fn layout(
    template: &Template,
    indent: &str,
    tab: &str,
    transform: &dyn Fn(&str, &Transform) -> String,
) -> Expansion {
    let mut layout = Layout {
        template,
        indent,
        tab,
        transform,
        defaults: HashMap::new(),
        groups: BTreeMap::new(),
        expanding: Vec::new(),
        text: String::new(),
        pos: Position::default(),
    };
    layout.collect_defaults();
    layout.emit(&template.tokens);

    let mut tabstops: Vec<TabstopLayout> = layout.groups.into_values().collect();
    if let Some(first) = tabstops.first()
        && first.id == 0
    {
        let last = tabstops.remove(0);
        tabstops.push(last);
    }

    Expansion {
        text: layout.text,
        tabstops,
    }
}
