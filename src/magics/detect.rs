//! Magic occurrence detection.

use super::MagicKind;
use crate::pytext;

/// Marker strings left behind when a notebook was saved after IPython's own
/// input transformation already ran. Cells containing these are someone
/// else's output, not user source, and are never processed.
pub const TRANSFORMED_MAGICS: [&str; 4] = [
    "get_ipython().run_cell_magic",
    "get_ipython().run_line_magic",
    "get_ipython().getoutput",
    "get_ipython().system",
];

/// One magic found in a cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagicOccurrence {
    /// 0-based line index within the cell.
    pub line: usize,
    /// Byte column of the magic sigil within the line.
    pub col: usize,
    /// The magic text from the sigil to end of line (no newline).
    pub text: String,
    pub kind: MagicKind,
    /// The magic line ends with a backslash continuation.
    pub continued: bool,
}

/// Whether any line contains a transformed-magic marker.
pub fn contains_transformed_magics(lines: &[String]) -> bool {
    lines
        .iter()
        .any(|line| TRANSFORMED_MAGICS.iter().any(|m| line.contains(m)))
}

/// Scan cell lines for magic occurrences.
///
/// Detection is line-based: a sigil at the start of the stripped line, an
/// assignment whose right-hand side starts with a sigil, or a trailing `?`
/// help query. Lines that begin inside a string literal are string
/// content and never magics. `%%` only counts on the first non-blank
/// line, matching where the kernel accepts cell magics.
pub fn detect_occurrences(lines: &[String]) -> Vec<MagicOccurrence> {
    let mut occurrences = Vec::new();
    let mut first_nonblank_seen = false;
    let joined: String = lines.concat();
    let in_string = pytext::lines_opening_in_string(&joined);

    for (line_no, raw) in lines.iter().enumerate() {
        if in_string.get(line_no).copied().unwrap_or(false) {
            continue;
        }
        let line = raw.trim_end_matches(['\n', '\r']);
        let trimmed = line.trim_start();
        if trimmed.is_empty() {
            continue;
        }
        let col = line.len() - trimmed.len();
        let is_first = !first_nonblank_seen;
        first_nonblank_seen = true;

        let found = if trimmed.starts_with("%%") {
            if is_first {
                Some((col, MagicKind::Cell))
            } else {
                None
            }
        } else if trimmed.starts_with('%') {
            Some((col, MagicKind::Line))
        } else if trimmed.starts_with('!') {
            Some((col, MagicKind::Shell))
        } else if trimmed.starts_with('?') || is_trailing_help(trimmed) {
            Some((col, MagicKind::Help))
        } else {
            magic_assignment(line)
        };

        if let Some((start, kind)) = found {
            let text = line[start..].to_string();
            occurrences.push(MagicOccurrence {
                line: line_no,
                col: start,
                continued: text.trim_end().ends_with('\\'),
                text,
                kind,
            });
        }
    }

    occurrences
}

/// `obj?` / `obj.method??` style help queries: everything before the
/// trailing question marks must look like a dotted identifier.
fn is_trailing_help(trimmed: &str) -> bool {
    if !trimmed.ends_with('?') {
        return false;
    }
    let base = trimmed.trim_end_matches('?');
    if base.is_empty() {
        return false;
    }
    let mut chars = base.chars();
    let first = chars.next().unwrap_or(' ');
    if !(first.is_alphabetic() || first == '_') {
        return false;
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '.')
}

/// `x = !cmd` and `x = %magic` assignment forms. Returns the column of the
/// sigil and the magic kind.
fn magic_assignment(line: &str) -> Option<(usize, MagicKind)> {
    let eq = line.find('=')?;
    let lhs = line[..eq].trim();
    if lhs.is_empty() {
        return None;
    }
    let mut lhs_chars = lhs.chars();
    let first = lhs_chars.next()?;
    if !(first.is_alphabetic() || first == '_')
        || !lhs_chars.all(|c| c.is_alphanumeric() || c == '_')
    {
        return None;
    }
    let rhs = &line[eq + 1..];
    if rhs.starts_with('=') {
        // Comparison, not assignment.
        return None;
    }
    let rhs_trimmed = rhs.trim_start();
    let kind = if rhs_trimmed.starts_with('!') {
        MagicKind::Shell
    } else if rhs_trimmed.starts_with('%') {
        MagicKind::Line
    } else {
        return None;
    };
    let col = eq + 1 + (rhs.len() - rhs_trimmed.len());
    Some((col, kind))
}

/// Name of a cell magic from its header line, e.g. `%%time -n1` → `time`.
pub fn cell_magic_name(header: &str) -> &str {
    header
        .trim_start_matches('%')
        .split_whitespace()
        .next()
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lines(src: &[&str]) -> Vec<String> {
        src.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_no_magics() {
        assert!(detect_occurrences(&lines(&["x = 1\n", "print(x)\n"])).is_empty());
    }

    #[test]
    fn test_line_magic() {
        let occ = detect_occurrences(&lines(&["%matplotlib inline\n"]));
        assert_eq!(occ.len(), 1);
        assert_eq!(occ[0].kind, MagicKind::Line);
        assert_eq!(occ[0].col, 0);
        assert_eq!(occ[0].text, "%matplotlib inline");
    }

    #[test]
    fn test_indented_line_magic() {
        let occ = detect_occurrences(&lines(&["if True:\n", "    %time f()\n"]));
        assert_eq!(occ.len(), 1);
        assert_eq!(occ[0].line, 1);
        assert_eq!(occ[0].col, 4);
    }

    #[test]
    fn test_cell_magic_first_line_only() {
        let occ = detect_occurrences(&lines(&["\n", "%%time\n", "f()\n"]));
        assert_eq!(occ.len(), 1);
        assert_eq!(occ[0].kind, MagicKind::Cell);

        // %% past the first non-blank line is not a cell magic header.
        let occ = detect_occurrences(&lines(&["f()\n", "%%time\n"]));
        assert!(occ.iter().all(|o| o.kind != MagicKind::Cell));
    }

    #[test]
    fn test_shell_magic() {
        let occ = detect_occurrences(&lines(&["!pip install foo\n"]));
        assert_eq!(occ.len(), 1);
        assert_eq!(occ[0].kind, MagicKind::Shell);
    }

    #[test]
    fn test_shell_assignment() {
        let occ = detect_occurrences(&lines(&["files = !ls\n"]));
        assert_eq!(occ.len(), 1);
        assert_eq!(occ[0].kind, MagicKind::Shell);
        assert_eq!(occ[0].col, 8);
        assert_eq!(occ[0].text, "!ls");
    }

    #[test]
    fn test_comparison_is_not_assignment_magic() {
        assert!(detect_occurrences(&lines(&["x == y\n"])).is_empty());
    }

    #[test]
    fn test_help_queries() {
        let occ = detect_occurrences(&lines(&["?print\n"]));
        assert_eq!(occ[0].kind, MagicKind::Help);
        let occ = detect_occurrences(&lines(&["np.linalg.solve?\n"]));
        assert_eq!(occ[0].kind, MagicKind::Help);
        assert!(detect_occurrences(&lines(&["x = a if b else c\n"])).is_empty());
    }

    #[test]
    fn test_magic_syntax_inside_docstring_ignored() {
        let occ = detect_occurrences(&lines(&["s = \"\"\"\n", "%time\n", "!ls\n", "\"\"\"\n"]));
        assert!(occ.is_empty());
    }

    #[test]
    fn test_help_syntax_inside_docstring_ignored() {
        let occ = detect_occurrences(&lines(&["s = '''\n", "really?\n", "'''\n"]));
        assert!(occ.is_empty());
    }

    #[test]
    fn test_magic_after_closed_string_still_found() {
        let occ = detect_occurrences(&lines(&["s = 'abc'\n", "%time f()\n"]));
        assert_eq!(occ.len(), 1);
        assert_eq!(occ[0].line, 1);
    }

    #[test]
    fn test_continuation_flag() {
        let occ = detect_occurrences(&lines(&["%time f(\\\n", "    1)\n"]));
        assert_eq!(occ.len(), 1);
        assert!(occ[0].continued);
    }

    #[test]
    fn test_transformed_magics() {
        assert!(contains_transformed_magics(&lines(&[
            "get_ipython().run_line_magic('time', 'f()')\n"
        ])));
        assert!(!contains_transformed_magics(&lines(&["x = 1\n"])));
    }

    #[test]
    fn test_cell_magic_name() {
        assert_eq!(cell_magic_name("%%time -n1"), "time");
        assert_eq!(cell_magic_name("%%bash"), "bash");
    }
}
