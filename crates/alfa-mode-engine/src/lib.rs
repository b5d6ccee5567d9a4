pub mod editing;
pub mod io;
pub mod session;
pub mod snippets;

#[cfg(test)]
pub mod tests;

// Re-export key types for easier usage
pub use editing::{Cmd, Document, EditorHost, Patch, Position, Range, Selection, SelectionEvent, TabSettings};
pub use io::*;
pub use session::EditorSession;
pub use snippets::{Snippet, SnippetManager, TabstopManager, Template};
