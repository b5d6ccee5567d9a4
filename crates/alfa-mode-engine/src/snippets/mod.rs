/*!
 * # Snippets
 *
 * The snippet engine: from a snippet body typed in a definition file to live
 * linked regions in the host document.
 *
 * ## Pipeline
 *
 * ```text
 * snippet file ──file──▶ Snippet records ──registry──▶ matched by trigger
 *                                                          │
 *                      Template ◀──template── body text ◀──┘
 *                          │
 *             variables (resolve, transforms)
 *                          │
 *                 expand (text + tabstop layout)
 *                          │
 *        host replace + tabstops (live tracking until exit)
 * ```
 *
 * ## Modules
 *
 * - **`template`**: rule-table lexer for the snippet mini-language
 * - **`file`**: snippet definition files into records
 * - **`variables`**: editor context, variable values and regex transforms
 * - **`registry`**: scoped snippet storage and trigger matching
 * - **`expand`**: final text and relative tabstop regions
 * - **`tabstops`**: the live tabstop state machine
 * - **`manager`**: host-facing API tying the above to an editor session
 */

pub mod expand;
pub mod file;
pub mod manager;
pub mod registry;
pub mod tabstops;
pub mod template;
pub mod variables;

pub use expand::{Expansion, RegionLayout, TabstopLayout, layout};
pub use file::parse_snippet_file;
pub use manager::SnippetManager;
pub use registry::{Snippet, SnippetBody, SnippetRegistry, TriggerMatch, WILDCARD_SCOPE};
pub use tabstops::{Region, Tabstop, TabstopManager};
pub use template::{CaseMode, Role, Slot, SlotId, SlotKind, Template, Token, Transform};
pub use variables::{CaptureScope, EditorContext, VariableFn, VariableResolver, capture_groups};
