use crate::editing::{Change, Position};

/// Result of applying a command
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    /// Change events in the order they were applied
    pub changes: Vec<Change>,
    /// Where the inserted text ends
    pub end: Position,
    pub version: u64,
}
