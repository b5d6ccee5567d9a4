//! Variable values and transforms.
//!
//! Variables come from three places: capture groups of the regex match
//! being formatted (`$1`), the trigger matches around the cursor (`$M1`,
//! `$T1`), and the editor ([`EditorContext`]) or a user-registered
//! function. Capture groups travel in a [`CaptureScope`] passed down each
//! call.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use alfa_mode_syntax::CommentTokens;
use regex::{Captures, Regex, RegexBuilder};

use crate::editing::{EditorHost, Position, TabSettings};
use crate::snippets::template::{CaseMode, Role, Template, Token, Transform};

static NAMED_CAPTURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][0-9]+$").expect("valid capture name pattern"));

static SELECTION_CONTINUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\r?([ \t]*\S)").expect("valid continuation pattern"));

/// A user-registered variable.
pub type VariableFn = Box<dyn Fn(&EditorContext) -> String>;

/// What the editor looked like when a snippet was inserted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditorContext {
    pub selected_text: String,
    pub current_line: String,
    pub prev_line: String,
    pub current_word: String,
    pub cursor: Position,
    pub tab_settings: TabSettings,
    pub file_path: Option<PathBuf>,
    pub full_name: String,
    pub comments: CommentTokens,
}

impl EditorContext {
    pub fn from_host<H: EditorHost + ?Sized>(host: &H, full_name: &str, comments: &CommentTokens) -> Self {
        let cursor = host.cursor();
        let current_line = host.line(cursor.row);
        Self {
            selected_text: host.selected_text(),
            prev_line: cursor.row.checked_sub(1).map(|row| host.line(row)).unwrap_or_default(),
            current_word: word_at(&current_line, cursor.column).to_string(),
            current_line,
            cursor,
            tab_settings: host.tab_settings(),
            file_path: host.file_path().map(Path::to_path_buf),
            full_name: full_name.to_string(),
            comments: comments.clone(),
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// The run of word characters touching `column`.
fn word_at(line: &str, column: usize) -> &str {
    let mut column = column.min(line.len());
    while !line.is_char_boundary(column) {
        column -= 1;
    }
    let start = line[..column]
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_word_char(*c))
        .last()
        .map_or(column, |(i, _)| i);
    let end = line[column..]
        .char_indices()
        .find(|(_, c)| !is_word_char(*c))
        .map_or(line.len(), |(i, _)| column + i);
    &line[start..end]
}

/// Capture groups visible while resolving.
///
/// `groups` are the groups of the transform match being formatted (`$0` is
/// the whole match). `named` holds the arrays reachable as `$<Letter><n>`:
/// `M` for the trigger match before the cursor, `T` for the end trigger
/// match after it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureScope {
    pub groups: Vec<Option<String>>,
    pub named: BTreeMap<char, Vec<Option<String>>>,
}

impl CaptureScope {
    pub fn with_named(mut self, letter: char, groups: Vec<Option<String>>) -> Self {
        self.named.insert(letter, groups);
        self
    }
}

/// All groups of a match, `None` for groups that did not participate.
pub fn capture_groups(caps: &Captures<'_>) -> Vec<Option<String>> {
    caps.iter()
        .map(|group| group.map(|m| m.as_str().to_string()))
        .collect()
}

fn group_value(groups: Option<&Vec<Option<String>>>, index: &str) -> String {
    let Ok(index) = index.parse::<usize>() else {
        return String::new();
    };
    groups
        .and_then(|groups| groups.get(index))
        .and_then(|group| group.clone())
        .unwrap_or_default()
}

/// Resolves variables of a template against one editor context.
pub struct VariableResolver<'a> {
    context: &'a EditorContext,
    dynamic: &'a HashMap<String, VariableFn>,
}

impl<'a> VariableResolver<'a> {
    pub fn new(context: &'a EditorContext, dynamic: &'a HashMap<String, VariableFn>) -> Self {
        Self { context, dynamic }
    }

    /// Value of a variable; unknown names are empty.
    ///
    /// `indentation` is the indentation of the snippet line the variable
    /// sits on; multi-line selections are re-indented to it.
    pub fn value(&self, name: &str, scope: &CaptureScope, indentation: &str) -> String {
        if NAMED_CAPTURE.is_match(name) {
            let letter = name.chars().next().unwrap_or_default();
            return group_value(scope.named.get(&letter), &name[1..]);
        }
        if !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit()) {
            return group_value(Some(&scope.groups), name);
        }

        let name = name.strip_prefix("TM_").unwrap_or(name);
        if let Some(variable) = self.dynamic.get(name) {
            return variable(self.context);
        }

        let ctx = self.context;
        let path = ctx
            .file_path
            .as_deref()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name_start = path.rfind(['/', '\\']).map_or(0, |i| i + 1);

        match name {
            "SELECTION" | "SELECTED_TEXT" => {
                if indentation.is_empty() {
                    ctx.selected_text.clone()
                } else {
                    SELECTION_CONTINUATION
                        .replace_all(&ctx.selected_text, format!("\n{indentation}$1").as_str())
                        .into_owned()
                }
            }
            "CURRENT_LINE" => ctx.current_line.clone(),
            "PREV_LINE" => ctx.prev_line.clone(),
            "CURRENT_WORD" => ctx.current_word.clone(),
            "LINE_INDEX" => ctx.cursor.column.to_string(),
            "LINE_NUMBER" => (ctx.cursor.row + 1).to_string(),
            "SOFT_TABS" => (if ctx.tab_settings.soft_tabs { "YES" } else { "NO" }).to_string(),
            "TAB_SIZE" => ctx.tab_settings.tab_size.to_string(),
            "FILENAME" => path[name_start..].to_string(),
            "FILEPATH" => path,
            "DIRECTORY" => path[..name_start].to_string(),
            "FULLNAME" => ctx.full_name.clone(),
            "LINE_COMMENT" => ctx.comments.line.clone().unwrap_or_default(),
            "BLOCK_COMMENT_START" => ctx.comments.block.as_ref().map(|b| b.0.clone()).unwrap_or_default(),
            "BLOCK_COMMENT_END" => ctx.comments.block.as_ref().map(|b| b.1.clone()).unwrap_or_default(),
            _ => String::new(),
        }
    }

    /// Replace variable placeholders with their values.
    ///
    /// A variable with a non-empty value replaces its default text; an empty
    /// one leaves the default in place. Conditionals keep the branch picked
    /// by whether the value is empty. Tabstop placeholders and case-change
    /// directives are kept.
    pub fn resolve(&self, template: &Template, scope: &CaptureScope) -> Template {
        let mut tokens: Vec<Token> = Vec::with_capacity(template.tokens.len());
        let mut indentation = String::new();
        let mut after_newline = true;

        let mut i = 0;
        while i < template.tokens.len() {
            let token = &template.tokens[i];
            i += 1;
            match token {
                Token::Text(text) => {
                    if after_newline {
                        indentation = text.chars().take_while(|c| *c == '\t').collect();
                        after_newline = !text.chars().any(|c| !c.is_whitespace());
                    }
                    push_text(&mut tokens, text);
                }
                Token::Newline => {
                    after_newline = true;
                    indentation.clear();
                    tokens.push(Token::Newline);
                }
                Token::CaseChange(_) => tokens.push(token.clone()),
                Token::Placeholder { slot, role } => {
                    let open = i - 1;
                    let info = template.slot(*slot);
                    let Some(name) = info.variable() else {
                        tokens.push(token.clone());
                        continue;
                    };
                    match role {
                        Role::Open => {
                            let mut value = self.value(name, scope, &indentation);
                            if let Some(transform) = &info.transform {
                                value = self.apply_transform(&value, transform, scope);
                            }
                            let skip_to = if info.conditional {
                                if value.is_empty() {
                                    template.else_of(open).or_else(|| template.close_of(open))
                                } else {
                                    None
                                }
                            } else if value.is_empty() {
                                None
                            } else {
                                push_text(&mut tokens, &value);
                                template.close_of(open)
                            };
                            if let Some(skip_to) = skip_to {
                                i = skip_to + 1;
                            }
                        }
                        Role::Else => {
                            if let Some(close) = template.close_of(i - 1) {
                                i = close + 1;
                            }
                        }
                        Role::Close => {}
                    }
                }
            }
        }

        Template {
            tokens,
            slots: template.slots.clone(),
        }
    }

    /// Run `value` through a `/guard/fmt/flags` transform.
    ///
    /// Only the `g` and `i` flags are honoured. A guard that isn't a valid
    /// regex leaves the value unchanged.
    pub fn apply_transform(&self, value: &str, transform: &Transform, scope: &CaptureScope) -> String {
        let re = match RegexBuilder::new(&transform.guard)
            .case_insensitive(transform.flags.contains('i'))
            .build()
        {
            Ok(re) => re,
            Err(err) => {
                log::debug!("ignoring transform with invalid guard {:?}: {err}", transform.guard);
                return value.to_string();
            }
        };
        let fmt = Template::parse_format(&transform.fmt);
        let limit = if transform.flags.contains('g') { 0 } else { 1 };

        re.replacen(value, limit, |caps: &Captures<'_>| {
            let inner = CaptureScope {
                groups: capture_groups(caps),
                named: scope.named.clone(),
            };
            apply_case(&self.resolve(&fmt, &inner).tokens)
        })
        .into_owned()
    }
}

fn push_text(tokens: &mut Vec<Token>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Token::Text(last)) = tokens.last_mut() {
        last.push_str(text);
    } else {
        tokens.push(Token::Text(text.to_string()));
    }
}

/// Join resolved replacement parts, applying case-change directives.
///
/// `\u`/`\l` change the first character of an immediately following text
/// and are dropped otherwise; `\U`/`\L` apply to later text until `\E`.
fn apply_case(tokens: &[Token]) -> String {
    let mut out = String::new();
    let mut global = CaseMode::End;
    let mut local: Option<CaseMode> = None;

    for token in tokens {
        let text = match token {
            Token::Text(text) => text.as_str(),
            Token::Newline => "\n",
            Token::CaseChange(mode @ (CaseMode::UpperLocal | CaseMode::LowerLocal)) => {
                local = Some(*mode);
                continue;
            }
            Token::CaseChange(mode) => {
                global = *mode;
                local = None;
                continue;
            }
            Token::Placeholder { .. } => {
                local = None;
                continue;
            }
        };

        let mut rest = text;
        if let Some(mode) = local.take() {
            let mut chars = text.chars();
            if let Some(first) = chars.next() {
                match mode {
                    CaseMode::UpperLocal => out.extend(first.to_uppercase()),
                    _ => out.extend(first.to_lowercase()),
                }
                rest = chars.as_str();
            }
        }
        match global {
            CaseMode::Upper => out.push_str(&rest.to_uppercase()),
            CaseMode::Lower => out.push_str(&rest.to_lowercase()),
            _ => out.push_str(rest),
        }
    }
    out
}
