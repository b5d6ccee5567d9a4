use std::collections::HashMap;

use alfa_mode_syntax::indent_of;

use crate::editing::{EditorHost, Position, Range};
use crate::session::EditorSession;
use crate::snippets::expand::layout;
use crate::snippets::file;
use crate::snippets::registry::{Snippet, SnippetRegistry, WILDCARD_SCOPE};
use crate::snippets::template::Template;
use crate::snippets::variables::{CaptureScope, EditorContext, VariableFn, VariableResolver};

/// Host-facing snippet API.
///
/// Owns the registry and the table of dynamic variables. One manager is
/// shared by reference between all editor sessions.
///
/// ```rust
/// # use alfa_mode_engine::editing::{Document, EditorHost, Position, Selection};
/// # use alfa_mode_engine::session::EditorSession;
/// # use alfa_mode_engine::snippets::{Snippet, SnippetManager};
/// # use alfa_mode_syntax::LanguageMode;
/// let mut snippets = SnippetManager::new();
/// snippets.register([Snippet::with_tab_trigger("permit", "pe", "permit")], None);
///
/// let mut doc = Document::new("pe");
/// doc.set_selection(Selection::caret(Position::new(0, 2)));
/// let mut session = EditorSession::new(doc, LanguageMode::alfa());
///
/// assert!(snippets.expand_with_tab(&mut session));
/// assert_eq!(session.host().text(), "permit");
/// ```
pub struct SnippetManager {
    registry: SnippetRegistry,
    variables: HashMap<String, VariableFn>,
    full_name: String,
}

impl Default for SnippetManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SnippetManager {
    pub fn new() -> Self {
        Self {
            registry: SnippetRegistry::new(),
            variables: HashMap::new(),
            full_name: String::new(),
        }
    }

    /// Value of `$TM_FULLNAME`.
    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = full_name.into();
        self
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn registry(&self) -> &SnippetRegistry {
        &self.registry
    }

    pub fn register(&mut self, snippets: impl IntoIterator<Item = Snippet>, default_scope: Option<&str>) {
        self.registry.register(snippets, default_scope);
    }

    pub fn unregister<'a>(&mut self, snippets: impl IntoIterator<Item = &'a Snippet>, default_scope: Option<&str>) {
        self.registry.unregister(snippets, default_scope);
    }

    pub fn parse_snippet_file(&self, text: &str) -> Vec<Snippet> {
        file::parse_snippet_file(text)
    }

    /// Add or replace a variable computed from the editor context.
    pub fn register_variable(
        &mut self,
        name: impl Into<String>,
        value: impl Fn(&EditorContext) -> String + 'static,
    ) {
        self.variables.insert(name.into(), Box::new(value));
    }

    pub fn resolver<'a>(&'a self, context: &'a EditorContext) -> VariableResolver<'a> {
        VariableResolver::new(context, &self.variables)
    }

    /// A snippet by name from the session's scope, else the wildcard scope.
    pub fn get_snippet_by_name<H: EditorHost>(&self, name: &str, session: &EditorSession<H>) -> Option<&Snippet> {
        self.registry.by_name(&[session.scope(), WILDCARD_SCOPE], name)
    }

    /// Expand the snippet triggered by the text around the caret.
    ///
    /// Returns `false` when nothing matches, leaving the document alone.
    pub fn expand_with_tab<H: EditorHost>(&self, session: &mut EditorSession<H>) -> bool {
        let cursor = session.host().cursor();
        let line = session.host().line(cursor.row);
        let Some((before, after)) = line.get(..cursor.column).zip(line.get(cursor.column..)) else {
            return false;
        };

        let scope = session.scope().to_string();
        let Some(found) = self.registry.find_matching(&[scope.as_str(), WILDCARD_SCOPE], before, after) else {
            return false;
        };
        log::debug!(
            "expanding snippet {:?} in scope {scope}",
            found.snippet.name.as_deref().unwrap_or_default()
        );

        let trigger = Range::new(
            Position::new(cursor.row, cursor.column - found.replace_before),
            Position::new(cursor.row, cursor.column + found.replace_after),
        );
        let captures = CaptureScope::default()
            .with_named('M', found.match_before.clone())
            .with_named('T', found.match_after.clone());
        let content = found.snippet.content().to_string();

        if !trigger.is_empty() {
            session.replace(trigger, "");
        }
        self.insert_with_captures(session, &content, &captures);
        true
    }

    /// Insert a snippet body in place of the session's selection and start
    /// tracking its tabstops.
    pub fn insert_snippet<H: EditorHost>(&self, session: &mut EditorSession<H>, text: &str) {
        self.insert_with_captures(session, text, &CaptureScope::default());
    }

    fn insert_with_captures<H: EditorHost>(&self, session: &mut EditorSession<H>, text: &str, captures: &CaptureScope) {
        let text = text.replace('\r', "");
        let host = session.host();
        let cursor = host.cursor();
        let line = host.line(cursor.row);
        let indent_len = indent_of(&line).len().min(cursor.column);
        let indent = line[..indent_len].to_string();
        let tab = host.tab_settings().tab_string();

        let context = EditorContext::from_host(host, &self.full_name, &session.mode().comments);
        let resolver = self.resolver(&context);
        let template = resolver.resolve(&Template::parse(&text), captures);
        let expansion = layout(&template, &indent, &tab, &|value, transform| {
            resolver.apply_transform(value, transform, captures)
        });

        session.insert_expansion(&expansion);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::{Document, Selection, TabSettings};
    use alfa_mode_syntax::LanguageMode;
    use pretty_assertions::assert_eq;

    fn p(row: usize, column: usize) -> Position {
        Position::new(row, column)
    }

    fn session(text: &str, caret: Position) -> EditorSession<Document> {
        let mut doc = Document::new(text);
        doc.set_selection(Selection::caret(caret));
        EditorSession::new(doc, LanguageMode::alfa())
    }

    #[test]
    fn test_expand_with_tab_replaces_trigger() {
        let mut snippets = SnippetManager::new();
        snippets.register(
            [Snippet::with_tab_trigger("policy", "pol", "policy ${1:name} {\n\t$0\n}")],
            Some("alfa"),
        );
        let mut session = session("  pol", p(0, 5));

        assert!(snippets.expand_with_tab(&mut session));
        assert_eq!(session.host().text(), "  policy name {\n      \n  }");
        assert_eq!(session.host().selection().range(), Range::new(p(0, 9), p(0, 13)));
        assert!(session.tabstops().is_some());
    }

    #[test]
    fn test_expand_with_tab_without_match() {
        let mut snippets = SnippetManager::new();
        snippets.register([Snippet::with_tab_trigger("policy", "pol", "policy")], None);
        let mut session = session("xpol", p(0, 4));

        assert!(!snippets.expand_with_tab(&mut session));
        assert_eq!(session.host().text(), "xpol");
    }

    #[test]
    fn test_wildcard_scope_found_from_any_scope() {
        let mut snippets = SnippetManager::new();
        snippets.register([Snippet::with_tab_trigger("note", "note", "// NOTE: $1")], None);
        let mut session = session("note", p(0, 4));

        assert!(snippets.get_snippet_by_name("note", &session).is_some());
        assert!(snippets.expand_with_tab(&mut session));
        assert_eq!(session.host().text(), "// NOTE: ");
    }

    #[test]
    fn test_later_registration_wins() {
        let mut snippets = SnippetManager::new();
        snippets.register([Snippet::with_tab_trigger("rule", "r", "first")], Some("alfa"));
        snippets.register([Snippet::with_tab_trigger("rule", "r", "second")], Some("alfa"));
        let mut session = session("r", p(0, 1));

        assert!(snippets.expand_with_tab(&mut session));
        assert_eq!(session.host().text(), "second");
    }

    #[test]
    fn test_trigger_captures_are_available() {
        let mut snippets = SnippetManager::new();
        let snippet = Snippet {
            name: Some("attr".to_string()),
            trigger: Some(r"@(\w+)".to_string()),
            content: Some("attribute $M1 = $1".to_string()),
            ..Snippet::default()
        };
        snippets.register([snippet], None);
        let mut session = session("x @role", p(0, 7));

        assert!(snippets.expand_with_tab(&mut session));
        assert_eq!(session.host().text(), "x attribute role = ");
    }

    #[test]
    fn test_insert_snippet_wraps_selection() {
        let snippets = SnippetManager::new();
        let mut doc = Document::new("deny");
        doc.set_selection(Selection::from_range(Range::new(p(0, 0), p(0, 4))));
        let mut session = EditorSession::new(doc, LanguageMode::alfa());

        snippets.insert_snippet(&mut session, "rule { $TM_SELECTED_TEXT$0 }");
        assert_eq!(session.host().text(), "rule { deny }");
        assert_eq!(session.host().cursor(), p(0, 11));
        assert!(session.tabstops().is_none());
    }

    #[test]
    fn test_insert_snippet_uses_hard_tabs() {
        let snippets = SnippetManager::new();
        let doc = Document::new("").with_tab_settings(TabSettings {
            soft_tabs: false,
            tab_size: 4,
        });
        let mut session = EditorSession::new(doc, LanguageMode::alfa());

        snippets.insert_snippet(&mut session, "a {\r\n\tb\r\n}");
        assert_eq!(session.host().text(), "a {\n\tb\n}");
    }

    #[test]
    fn test_registered_variable() {
        let mut snippets = SnippetManager::new().with_full_name("Ada");
        snippets.register_variable("SCOPE", |ctx: &EditorContext| ctx.current_line.trim().to_string());
        let mut session = session("  ", p(0, 2));

        snippets.insert_snippet(&mut session, "$SCOPE$TM_FULLNAME");
        assert_eq!(session.host().text(), "  Ada");
    }

    #[test]
    fn test_unregister_by_name() {
        let mut snippets = SnippetManager::new();
        let snippet = Snippet::with_tab_trigger("rule", "r", "rule");
        snippets.register([snippet.clone()], Some("alfa"));
        snippets.unregister([&snippet], Some("alfa"));
        assert!(snippets.registry().is_empty());
    }

    #[test]
    fn test_parse_snippet_file_delegates() {
        let snippets = SnippetManager::new();
        let parsed = snippets.parse_snippet_file("snippet pe\n\tpermit");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].content(), "permit");
    }
}
