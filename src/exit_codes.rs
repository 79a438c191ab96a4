//! Process exit codes.
//!
//! The worst tool exit code across all notebooks is passed through, so
//! callers see the same codes the tool would give them on plain files.
//! Internal failures use 2, matching the usual "error running" convention.

/// Every notebook processed, tool reported nothing.
pub const SUCCESS: i32 = 0;

/// A notebook could not be processed (unreadable, unparsable, tool missing,
/// unexpected mutation, failed reconstruction).
pub const ERROR: i32 = 2;

/// Fold one notebook's exit code into the running worst.
pub fn worst(current: i32, new: i32) -> i32 {
    current.max(new)
}
