//! Snippet records and the per-scope registry that finds the snippet to
//! expand for the text around the cursor.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::snippets::variables::capture_groups;

/// The scope every other scope falls back to.
pub const WILDCARD_SCOPE: &str = "_";

static ALREADY_GROUPED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\^?\(.*\)\$?$|^\\b$").expect("valid group pattern"));

/// `body` of a snippet record: one string or a list of lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SnippetBody {
    Text(String),
    Lines(Vec<String>),
}

impl SnippetBody {
    pub fn to_text(&self) -> String {
        match self {
            SnippetBody::Text(text) => text.clone(),
            SnippetBody::Lines(lines) => lines.join("\n"),
        }
    }
}

/// One snippet definition.
///
/// `prefix` and `body` are accepted as aliases of `tabTrigger` and
/// `content`. Keys this struct doesn't know end up in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab_trigger: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guard: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_trigger: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_guard: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<SnippetBody>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Snippet {
    /// Snippet expanded by typing `tab_trigger` and pressing Tab.
    pub fn with_tab_trigger(name: &str, tab_trigger: &str, content: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            tab_trigger: Some(tab_trigger.to_string()),
            content: Some(content.to_string()),
            ..Self::default()
        }
    }

    pub fn content(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }

    /// Fold aliases into the canonical fields and derive the trigger from
    /// the tab trigger.
    fn normalized(mut self, scope: &str) -> Self {
        self.scope = Some(scope.to_string());
        if let Some(prefix) = self.prefix.take() {
            self.tab_trigger = Some(prefix);
        }
        if self.content.is_none() {
            self.content = self.body.take().map(|body| body.to_text());
        }
        if let Some(tab_trigger) = self.tab_trigger.as_deref().filter(|t| !t.is_empty())
            && self.trigger.is_none()
        {
            if self.guard.is_none() && tab_trigger.starts_with(|c: char| c.is_alphanumeric() || c == '_') {
                self.guard = Some(r"\b".to_string());
            }
            self.trigger = Some(regex::escape(tab_trigger));
        }
        self
    }
}

/// Wrap a sub-pattern in a non-capturing group unless it is already one
/// group or a bare `\b`.
fn wrap(pattern: Option<&str>) -> String {
    match pattern {
        None | Some("") => String::new(),
        Some(p) if ALREADY_GROUPED.is_match(p) => p.to_string(),
        Some(p) => format!("(?:{p})"),
    }
}

/// A registered snippet with its compiled regexes.
#[derive(Debug, Clone)]
struct Entry {
    snippet: Snippet,
    /// Guard and trigger, anchored at the end of the text before the cursor
    start: Option<Regex>,
    /// End trigger and end guard, anchored at the start of the text after it
    end: Option<Regex>,
    trigger: Option<Regex>,
    end_trigger: Option<Regex>,
    /// A pattern failed to compile; the snippet never matches
    broken: bool,
}

impl Entry {
    fn compile(snippet: Snippet) -> Self {
        let mut broken = false;
        let mut build = |pattern: String| -> Option<Regex> {
            if pattern.is_empty() {
                return None;
            }
            match Regex::new(&pattern) {
                Ok(re) => Some(re),
                Err(err) => {
                    log::warn!(
                        "snippet {:?} has an invalid pattern {pattern:?}: {err}",
                        snippet.name.as_deref().unwrap_or_default()
                    );
                    broken = true;
                    None
                }
            }
        };

        let mut start = format!("{}{}", wrap(snippet.guard.as_deref()), wrap(snippet.trigger.as_deref()));
        if !start.is_empty() && !start.ends_with('$') {
            start.push('$');
        }
        let mut end = format!("{}{}", wrap(snippet.end_trigger.as_deref()), wrap(snippet.end_guard.as_deref()));
        if !end.is_empty() && !end.starts_with('^') {
            end.insert(0, '^');
        }

        let start = build(start);
        let end = build(end);
        let trigger = build(
            snippet
                .trigger
                .as_deref()
                .filter(|t| !t.is_empty())
                .map(|t| format!("(?:{t})$"))
                .unwrap_or_default(),
        );
        let end_trigger = build(
            snippet
                .end_trigger
                .as_deref()
                .filter(|t| !t.is_empty())
                .map(|t| format!("^(?:{t})"))
                .unwrap_or_default(),
        );

        Self {
            snippet,
            start,
            end,
            trigger,
            end_trigger,
            broken,
        }
    }
}

/// The snippet chosen for the text around the cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerMatch<'a> {
    pub snippet: &'a Snippet,
    /// Bytes before the cursor taken by the trigger, to be removed
    pub replace_before: usize,
    /// Bytes after the cursor taken by the end trigger, to be removed
    pub replace_after: usize,
    /// Groups of the start match, exposed as `$M<n>`
    pub match_before: Vec<Option<String>>,
    /// Groups of the end match, exposed as `$T<n>`
    pub match_after: Vec<Option<String>>,
}

/// Snippets by scope, in registration order.
#[derive(Debug, Clone, Default)]
pub struct SnippetRegistry {
    scopes: HashMap<String, Vec<Entry>>,
}

fn scope_of<'a>(snippet: &'a Snippet, default_scope: Option<&'a str>) -> &'a str {
    snippet
        .scope
        .as_deref()
        .or(default_scope)
        .filter(|s| !s.is_empty())
        .unwrap_or(WILDCARD_SCOPE)
}

impl SnippetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register snippets under their own scope, else `default_scope`, else
    /// the wildcard scope. A snippet displaces an earlier one with the same
    /// name in the same scope.
    pub fn register(&mut self, snippets: impl IntoIterator<Item = Snippet>, default_scope: Option<&str>) {
        for snippet in snippets {
            let scope = scope_of(&snippet, default_scope).to_string();
            let snippet = snippet.normalized(&scope);
            let entries = self.scopes.entry(scope).or_default();
            if let Some(name) = &snippet.name {
                entries.retain(|e| e.snippet.name.as_ref() != Some(name));
            }
            entries.push(Entry::compile(snippet));
        }
    }

    /// Remove snippets by name, or by equality for unnamed ones.
    pub fn unregister<'a>(&mut self, snippets: impl IntoIterator<Item = &'a Snippet>, default_scope: Option<&str>) {
        for snippet in snippets {
            let scope = scope_of(snippet, default_scope).to_string();
            let Some(entries) = self.scopes.get_mut(&scope) else {
                continue;
            };
            match &snippet.name {
                Some(name) => entries.retain(|e| e.snippet.name.as_ref() != Some(name)),
                None => {
                    let normalized = snippet.clone().normalized(&scope);
                    entries.retain(|e| e.snippet != normalized);
                }
            }
        }
    }

    /// Find the snippet to expand, trying `scopes` in order.
    ///
    /// Within a scope the most recently registered snippet wins.
    pub fn find_matching(&self, scopes: &[&str], before: &str, after: &str) -> Option<TriggerMatch<'_>> {
        scopes
            .iter()
            .filter_map(|scope| self.scopes.get(*scope))
            .find_map(|entries| entries.iter().rev().find_map(|e| Self::match_entry(e, before, after)))
    }

    fn match_entry<'a>(entry: &'a Entry, before: &str, after: &str) -> Option<TriggerMatch<'a>> {
        if entry.broken || (entry.start.is_none() && entry.end.is_none()) {
            return None;
        }
        let match_before = match &entry.start {
            Some(re) => capture_groups(&re.captures(before)?),
            None => vec![Some(String::new())],
        };
        let match_after = match &entry.end {
            Some(re) => capture_groups(&re.captures(after)?),
            None => vec![Some(String::new())],
        };
        let replace_before = entry
            .trigger
            .as_ref()
            .and_then(|re| re.find(before))
            .map_or(0, |m| m.len());
        let replace_after = entry
            .end_trigger
            .as_ref()
            .and_then(|re| re.find(after))
            .map_or(0, |m| m.len());

        Some(TriggerMatch {
            snippet: &entry.snippet,
            replace_before,
            replace_after,
            match_before,
            match_after,
        })
    }

    /// A snippet by name, trying `scopes` in order.
    pub fn by_name(&self, scopes: &[&str], name: &str) -> Option<&Snippet> {
        scopes
            .iter()
            .filter_map(|scope| self.scopes.get(*scope))
            .find_map(|entries| {
                entries
                    .iter()
                    .find(|e| e.snippet.name.as_deref() == Some(name))
                    .map(|e| &e.snippet)
            })
    }

    /// Snippets of one scope in registration order.
    pub fn snippets(&self, scope: &str) -> impl Iterator<Item = &Snippet> {
        self.scopes.get(scope).into_iter().flatten().map(|e| &e.snippet)
    }

    /// Registered scope names, sorted.
    pub fn scopes(&self) -> Vec<&str> {
        let mut scopes: Vec<&str> = self.scopes.keys().map(String::as_str).collect();
        scopes.sort_unstable();
        scopes
    }

    pub fn len(&self) -> usize {
        self.scopes.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
