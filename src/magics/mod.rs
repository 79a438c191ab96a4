//! IPython magic handling.
//!
//! Magics are the one place notebook code is not plain Python. The engine
//! keeps the host-grammar knowledge behind a narrow seam: [`detect`] finds
//! occurrences, [`substitute`] replaces them with syntactically neutral
//! placeholders that can be inverted byte-for-byte after the tool ran.

pub mod detect;
pub mod substitute;

pub use detect::{MagicOccurrence, contains_transformed_magics, detect_occurrences};
pub use substitute::{Substitution, SubstitutionProfile, detect_and_substitute, fresh_nonce};

/// What kind of magic an occurrence is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MagicKind {
    /// `%%magic` on the first non-blank line.
    Cell,
    /// `%magic` or `x = %magic`.
    Line,
    /// `!cmd` or `x = !cmd`.
    Shell,
    /// `?obj` or `obj?`.
    Help,
}

/// One placeholder written into the buffer, with everything needed to undo it.
#[derive(Debug, Clone)]
pub struct MagicPlaceholder {
    /// Hex nonce embedded in the replacement text.
    pub nonce: String,
    /// The exact original text the replacement stands for.
    pub original: String,
    /// The exact text written into the buffer.
    pub replacement: String,
    /// `None` when the placeholder stands for the whole cell.
    pub kind: Option<MagicKind>,
}
