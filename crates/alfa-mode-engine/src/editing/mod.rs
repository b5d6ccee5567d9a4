/*!
 * # Editing Core Module
 *
 * Everything the snippet core knows about a document goes through this
 * module.
 *
 * ## Architecture Overview
 *
 * ### 1. Row/column positions and change events
 * - Locations are **`Position { row, column }`**, spans are **`Range`**
 * - Every edit is reported as one or more **`Change`** events (insert or remove)
 * - Anything that tracks a location is carried through the edit with
 *   `Position::transform` / `Range::transform`
 *
 * ### 2. The host interface
 * - The **`EditorHost`** trait is what the snippet core needs from an editor:
 *   line access, `replace(range, text) -> end`, multi-range selection, tab
 *   settings, file path and highlight markers
 * - The core never holds host state between calls
 *
 * ### 3. Reference document
 * - **`Document`** stores text in a single **`xi_rope::Rope`** buffer
 * - Edits are **Commands** (`Cmd`) compiled to rope **Deltas**
 * - Applying a command returns a **`Patch`** with the change events it produced
 *
 * ## Module Structure
 *
 * - **`position`**: positions, ranges, change events and transform rules
 * - **`host`**: `EditorHost` trait, selections, tab settings, markers
 * - **`commands`**: `Cmd` enum and delta compilation
 * - **`document`**: rope-backed `Document` implementing `EditorHost`
 * - **`patch`**: edit result metadata
 *
 * ## Usage Pattern
 *
 * ```rust
 * use alfa_mode_engine::editing::*;
 *
 * let mut doc = Document::from_bytes(b"policy p {\n}").unwrap();
 * let patch = doc.apply(Cmd::InsertText {
 *     at: Position::new(0, 10),
 *     text: " apply denyOverrides".to_string(),
 * });
 * assert_eq!(patch.changes.len(), 1);
 * assert_eq!(doc.line(0), "policy p { apply denyOverrides");
 * ```
 */

pub mod commands;
pub mod document;
pub mod host;
pub mod patch;
pub mod position;

pub use commands::Cmd;
pub use document::Document;
pub use host::{EditorHost, MarkerId, Selection, SelectionEvent, TabSettings};
pub use patch::Patch;
pub use position::{Bias, Change, ChangeAction, Position, Range};
