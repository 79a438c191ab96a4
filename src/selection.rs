//! Cell selection: which code cells get projected at all.

use crate::magics::detect::{cell_magic_name, contains_transformed_magics, detect_occurrences};
use crate::magics::{MagicKind, SubstitutionProfile, detect_and_substitute};
use crate::pytext;

/// Cell magics whose bodies are still plain Python, so the cell stays in.
/// Anything else (`%%bash`, `%%html`, ...) is a foreign language.
pub const DEFAULT_PROCESS_MAGICS: [&str; 6] =
    ["time", "timeit", "capture", "pypy", "python", "python3"];

/// Configuration slice that drives selection.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectionPolicy<'a> {
    /// Extra cell-magic names to process beyond the defaults.
    pub process_cells: &'a [String],
    /// Cells carrying any of these tags are skipped.
    pub skip_celltags: &'a [String],
    /// Project malformed cells anyway so the tool can report on them.
    pub dont_skip_bad_cells: bool,
}

impl SelectionPolicy<'_> {
    /// Whether a code cell should be left out of the projection.
    ///
    /// Rules apply in order: empty cell, skip tag, transformed-magic
    /// marker, all-magic cell, plain valid cell, foreign cell magic, and
    /// finally a speculative substitution pass whose result decides.
    pub fn should_ignore(&self, source: &[String], tags: &[String]) -> bool {
        let joined: String = source.concat();
        if joined.trim().is_empty() {
            return true;
        }
        if tags.iter().any(|t| self.skip_celltags.contains(t)) {
            return true;
        }
        if contains_transformed_magics(source) {
            return true;
        }
        if source.iter().all(|line| {
            let t = line.trim();
            t.is_empty() || t.starts_with(['%', '!', '?'])
        }) {
            return true;
        }

        let occurrences = detect_occurrences(source);
        if occurrences.is_empty() && pytext::is_probably_valid(&joined) {
            return false;
        }

        if let Some(header) = occurrences.iter().find(|o| o.kind == MagicKind::Cell) {
            let name = cell_magic_name(&header.text);
            let allowed = DEFAULT_PROCESS_MAGICS.contains(&name)
                || self.process_cells.iter().any(|m| m.trim() == name);
            if !allowed {
                return true;
            }
        }

        // Speculative pass with the bad-cell fallback disabled; the
        // whole-cell placeholder is always valid and would mask the very
        // malformedness this rule exists to catch.
        let speculative = detect_and_substitute(
            source,
            SubstitutionProfile {
                string_nonce: false,
                dont_skip_bad_cells: true,
                whole_src: &joined,
            },
        );
        if pytext::is_probably_valid(&speculative.text) {
            return false;
        }
        !self.dont_skip_bad_cells
    }
}
