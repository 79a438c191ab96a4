//! Remap tool diagnostics from buffer coordinates to notebook coordinates.

use fancy_regex::{Captures, Regex};
use log::warn;
use serde::Deserialize;

use crate::position_map::PositionMap;

/// Which family of patterns a tool's output follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// `path:LINE` at the start of a line (flake8, mypy, pylint, ...).
    #[default]
    Standard,
    /// black's `error: cannot format path: Cannot parse: LINE:COL` report.
    CannotParse,
    /// doctest-style `File "path", line LINE` tracebacks.
    FileLine,
}

/// Remapped tool output alongside the untouched originals.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    pub raw_stdout: String,
    pub raw_stderr: String,
    pub stdout: String,
    pub stderr: String,
}

enum Rewrite {
    /// The match is a buffer line number to resolve through the map.
    LineToCell,
    /// Replace the match with a fixed string.
    Literal(&'static str),
}

/// Rewrite every buffer-line reference in `stdout`/`stderr` to
/// `cell_<i>:<j>` notation. `shown_path` is the path as it appears in the
/// output (the notebook path, after the caller substituted it for the
/// buffer path). Unresolvable line numbers are left as printed.
pub fn remap_output(
    format: OutputFormat,
    stdout: &str,
    stderr: &str,
    shown_path: &str,
    map: &PositionMap,
) -> Diagnostics {
    let path = regex::escape(shown_path);
    let patterns: Vec<(String, Rewrite)> = match format {
        OutputFormat::Standard => {
            vec![(format!(r"(?m)(?<=^{path}:)\d+"), Rewrite::LineToCell)]
        }
        OutputFormat::CannotParse => vec![
            (
                format!(r"(?m)(?<=^error: cannot format {path}: Cannot parse: )\d+"),
                Rewrite::LineToCell,
            ),
            (r"(?<=line )\d+(?=\)\nOh no!)".to_string(), Rewrite::LineToCell),
            (
                r"line cell_(?=\d+:\d+\)\nOh no!)".to_string(),
                Rewrite::Literal("cell_"),
            ),
        ],
        OutputFormat::FileLine => vec![
            (
                format!(r#"(?m)(?<=^File "{path}", line )\d+"#),
                Rewrite::LineToCell,
            ),
            (
                format!(r#"(?m)(?<=^File "{path}",) line"#),
                Rewrite::Literal(""),
            ),
        ],
    };

    let mut out = stdout.to_string();
    let mut err = stderr.to_string();
    for (pattern, rewrite) in &patterns {
        let re = Regex::new(pattern).expect("remap pattern is valid");
        out = apply(&re, &out, rewrite, map);
        err = apply(&re, &err, rewrite, map);
    }

    Diagnostics {
        raw_stdout: stdout.to_string(),
        raw_stderr: stderr.to_string(),
        stdout: out,
        stderr: err,
    }
}

fn apply(re: &Regex, text: &str, rewrite: &Rewrite, map: &PositionMap) -> String {
    re.replace_all(text, |caps: &Captures| {
        let matched = caps.get(0).map(|m| m.as_str()).unwrap_or("");
        match rewrite {
            Rewrite::Literal(lit) => (*lit).to_string(),
            Rewrite::LineToCell => match matched.parse::<usize>().ok().and_then(|n| map.resolve(n))
            {
                Some(pos) => pos.to_string(),
                None => {
                    warn!("diagnostic line {matched} has no cell mapping, leaving as-is");
                    matched.to_string()
                }
            },
        }
    })
    .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn two_cell_map() -> PositionMap {
        // Cell 1: separator at buffer line 1, two source lines.
        // Cell 2: separator at buffer line 4 (one padding line), one line.
        let mut map = PositionMap::new();
        map.insert(1, 1, 0);
        map.insert(2, 1, 1);
        map.insert(3, 1, 2);
        map.insert(4, 2, 0);
        map.insert(5, 2, 1);
        map
    }

    #[test]
    fn test_standard_remap() {
        let d = remap_output(
            OutputFormat::Standard,
            "nb.ipynb:3:1: F401 'sys' imported but unused\n",
            "",
            "nb.ipynb",
            &two_cell_map(),
        );
        assert_eq!(d.stdout, "nb.ipynb:cell_1:2:1: F401 'sys' imported but unused\n");
    }

    #[test]
    fn test_standard_remap_stderr() {
        let d = remap_output(
            OutputFormat::Standard,
            "",
            "nb.ipynb:5: error: something\n",
            "nb.ipynb",
            &two_cell_map(),
        );
        assert_eq!(d.stderr, "nb.ipynb:cell_2:1: error: something\n");
    }

    #[test]
    fn test_line_zero_anchor() {
        let d = remap_output(
            OutputFormat::Standard,
            "nb.ipynb:0: whole-file warning\n",
            "",
            "nb.ipynb",
            &two_cell_map(),
        );
        assert_eq!(d.stdout, "nb.ipynb:cell_0:0: whole-file warning\n");
    }

    #[test]
    fn test_unmapped_line_left_alone() {
        let d = remap_output(
            OutputFormat::Standard,
            "nb.ipynb:42: past the end\n",
            "",
            "nb.ipynb",
            &two_cell_map(),
        );
        assert_eq!(d.stdout, "nb.ipynb:42: past the end\n");
    }

    #[test]
    fn test_path_only_at_line_start() {
        let d = remap_output(
            OutputFormat::Standard,
            "see nb.ipynb:3 for details\n",
            "",
            "nb.ipynb",
            &two_cell_map(),
        );
        assert_eq!(d.stdout, "see nb.ipynb:3 for details\n");
    }

    #[test]
    fn test_other_path_untouched() {
        let d = remap_output(
            OutputFormat::Standard,
            "other.py:3: error\n",
            "",
            "nb.ipynb",
            &two_cell_map(),
        );
        assert_eq!(d.stdout, "other.py:3: error\n");
    }

    #[test]
    fn test_regex_metachars_in_path() {
        let d = remap_output(
            OutputFormat::Standard,
            "note (1).ipynb:3: error\n",
            "",
            "note (1).ipynb",
            &two_cell_map(),
        );
        assert_eq!(d.stdout, "note (1).ipynb:cell_1:2: error\n");
    }

    #[test]
    fn test_cannot_parse_remap() {
        let stderr = "error: cannot format nb.ipynb: Cannot parse: 3:5: x = (\n";
        let d = remap_output(OutputFormat::CannotParse, "", stderr, "nb.ipynb", &two_cell_map());
        assert_eq!(
            d.stderr,
            "error: cannot format nb.ipynb: Cannot parse: cell_1:2:5: x = (\n"
        );
    }

    #[test]
    fn test_cannot_parse_oh_no_trailer() {
        let stderr = "error: cannot format nb.ipynb: Cannot parse (detected at line 3)\nOh no! \u{1f4a5} \u{1f494} \u{1f4a5}\n";
        let d = remap_output(OutputFormat::CannotParse, "", stderr, "nb.ipynb", &two_cell_map());
        assert_eq!(
            d.stderr,
            "error: cannot format nb.ipynb: Cannot parse (detected at cell_1:2)\nOh no! \u{1f4a5} \u{1f494} \u{1f4a5}\n"
        );
    }

    #[test]
    fn test_file_line_remap() {
        let stdout = "File \"nb.ipynb\", line 5, in example\n";
        let d = remap_output(OutputFormat::FileLine, stdout, "", "nb.ipynb", &two_cell_map());
        assert_eq!(d.stdout, "File \"nb.ipynb\", cell_2:1, in example\n");
    }

    #[test]
    fn test_raw_output_retained() {
        let d = remap_output(
            OutputFormat::Standard,
            "nb.ipynb:3: error\n",
            "",
            "nb.ipynb",
            &two_cell_map(),
        );
        assert_eq!(d.raw_stdout, "nb.ipynb:3: error\n");
    }
}
