//! Build the linear text buffer from a notebook's code cells.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;
use rand::Rng;
use thiserror::Error;

use crate::config::Config;
use crate::magics::{MagicPlaceholder, SubstitutionProfile, detect_and_substitute};
use crate::notebook::{CellKind, CellView};
use crate::position_map::PositionMap;
use crate::pytext;
use crate::selection::SelectionPolicy;

#[derive(Debug, Error)]
pub enum ProjectionError {
    /// The generated separator already occurs in the document, so span
    /// recovery would be ambiguous. Vanishingly unlikely; rerunning picks
    /// a new token.
    #[error("cell separator token {token} collides with notebook content; rerun to retry")]
    SeparatorCollision { token: String },
}

/// Everything needed to interpret tool output against the notebook and to
/// reconstruct the notebook from a mutated buffer.
#[derive(Debug, Clone)]
pub struct ProjectionInfo {
    pub map: PositionMap,
    /// Code-cell numbers whose source had a trailing semicolon stripped.
    pub trailing_semicolons: BTreeSet<usize>,
    /// Placeholders written into each projected cell, keyed by cell number.
    pub placeholders: BTreeMap<usize, Vec<MagicPlaceholder>>,
    /// Code-cell numbers left out of the buffer.
    pub ignored_cells: BTreeSet<usize>,
    /// Separator line, trailing newline included.
    pub separator: String,
    /// Number of cells actually written to the buffer.
    pub projected_cells: usize,
}

/// Project the notebook's code cells into one buffer.
///
/// Each projected cell is emitted as separator line, substituted source,
/// then the tool's padding of blank lines. Buffer lines are mapped back to
/// cell-relative lines as they are laid down, with the separator at
/// relative line 0.
pub fn project(
    cells: &[CellView],
    tool: &str,
    config: &Config,
) -> Result<(String, ProjectionInfo), ProjectionError> {
    // The token is drawn blind; the collision check below is what keeps
    // span recovery unambiguous.
    let token = format!("{:06x}", rand::rng().random::<u32>() & 0x00ff_ffff);
    project_with_token(cells, tool, config, &token)
}

fn project_with_token(
    cells: &[CellView],
    tool: &str,
    config: &Config,
    token: &str,
) -> Result<(String, ProjectionInfo), ProjectionError> {
    let whole_src: String = cells
        .iter()
        .filter(|c| c.kind == CellKind::Code)
        .flat_map(|c| c.source.iter().map(String::as_str))
        .collect();

    let separator = format!("# %%NBLINT-CELL-SEP{token}\n");
    if whole_src.contains(separator.trim_end()) {
        return Err(ProjectionError::SeparatorCollision {
            token: separator.trim_end().to_string(),
        });
    }

    let policy = SelectionPolicy {
        process_cells: &config.process_cells,
        skip_celltags: &config.skip_celltags,
        dont_skip_bad_cells: config.dont_skip_bad_cells,
    };
    let padding = config.cell_padding_for(tool);
    let string_nonce = config.string_nonce_for(tool);

    let mut info = ProjectionInfo {
        map: PositionMap::new(),
        trailing_semicolons: BTreeSet::new(),
        placeholders: BTreeMap::new(),
        ignored_cells: BTreeSet::new(),
        separator: separator.clone(),
        projected_cells: 0,
    };

    let mut spans: Vec<String> = Vec::new();
    let mut line_number = 0usize;
    let mut cell_number = 0usize;

    for cell in cells {
        if cell.kind != CellKind::Code {
            continue;
        }
        cell_number += 1;

        if policy.should_ignore(&cell.source, &cell.tags) {
            debug!("cell {cell_number} not projected");
            info.ignored_cells.insert(cell_number);
            continue;
        }

        let substitution = detect_and_substitute(
            &cell.source,
            SubstitutionProfile {
                string_nonce,
                dont_skip_bad_cells: config.dont_skip_bad_cells,
                whole_src: &whole_src,
            },
        );

        let mut body = substitution.text;
        if !body.ends_with('\n') {
            body.push('\n');
        }
        let mut parsed = format!("{separator}{body}{}", "\n".repeat(padding));

        for i in 0..parsed.matches('\n').count() {
            info.map.insert(i + line_number + 1, cell_number, i);
        }
        line_number += parsed.matches('\n').count();

        let (stripped, had_semicolon) = pytext::strip_trailing_semicolon(&parsed);
        if had_semicolon {
            info.trailing_semicolons.insert(cell_number);
            parsed = stripped;
        }
        if !substitution.placeholders.is_empty() {
            info.placeholders.insert(cell_number, substitution.placeholders);
        }

        spans.push(parsed);
        info.projected_cells += 1;
    }

    let buffer = if spans.is_empty() {
        String::new()
    } else {
        let joined: String = spans.concat();
        format!("{}\n", joined.trim_end_matches('\n'))
    };

    Ok((buffer, info))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn code_cell(src: &[&str]) -> CellView {
        CellView {
            kind: CellKind::Code,
            source: src.iter().map(|s| s.to_string()).collect(),
            tags: Vec::new(),
        }
    }

    fn markdown_cell() -> CellView {
        CellView {
            kind: CellKind::Markdown,
            source: vec!["# heading\n".to_string()],
            tags: Vec::new(),
        }
    }

    #[test]
    fn test_two_cell_layout() {
        let cells = vec![
            code_cell(&["import os\n", "import sys\n"]),
            markdown_cell(),
            code_cell(&["print(os.name)\n"]),
        ];
        let (buffer, info) = project(&cells, "flake8", &Config::default()).unwrap();

        let lines: Vec<&str> = buffer.lines().collect();
        assert_eq!(lines[0], info.separator.trim_end());
        assert_eq!(lines[1], "import os");
        assert_eq!(lines[2], "import sys");
        assert_eq!(lines[3], "");
        // Second cell starts after three padding lines.
        assert_eq!(lines[6], info.separator.trim_end());
        assert_eq!(lines[7], "print(os.name)");
        assert!(buffer.ends_with("print(os.name)\n"));
        assert_eq!(info.projected_cells, 2);

        // Buffer lines are 1-based in tool output; line 2 is `import os`.
        assert_eq!(info.map.resolve(2).unwrap().to_string(), "cell_1:1");
        assert_eq!(info.map.resolve(3).unwrap().to_string(), "cell_1:2");
        assert_eq!(info.map.resolve(8).unwrap().to_string(), "cell_2:1");
    }

    #[test]
    fn test_map_covers_every_buffer_line() {
        let cells = vec![
            code_cell(&["a = 1\n"]),
            code_cell(&["b = 2\n", "c = 3\n"]),
        ];
        let (buffer, info) = project(&cells, "mypy", &Config::default()).unwrap();
        // Padding trailing the last cell is trimmed from the buffer but
        // stays mapped, so coverage extends past the buffer end.
        let total = buffer.matches('\n').count();
        for line in 1..=total {
            assert!(info.map.resolve(line).is_some(), "line {line} unmapped");
        }
        assert_eq!(info.map.resolve(0).unwrap().to_string(), "cell_0:0");
    }

    #[test]
    fn test_isort_padding() {
        let cells = vec![code_cell(&["import os\n"]), code_cell(&["import sys\n"])];
        let (buffer, _) = project(&cells, "isort", &Config::default()).unwrap();
        let lines: Vec<&str> = buffer.lines().collect();
        // One source line, two padding lines, then the next separator.
        assert!(lines[4].starts_with("# %%NBLINT-CELL-SEP"));
    }

    #[test]
    fn test_ignored_cell_recorded() {
        let cells = vec![code_cell(&["!ls\n"]), code_cell(&["x = 1\n"])];
        let (_, info) = project(&cells, "flake8", &Config::default()).unwrap();
        assert!(info.ignored_cells.contains(&1));
        assert_eq!(info.projected_cells, 1);
    }

    #[test]
    fn test_trailing_semicolon_stripped_and_recorded() {
        let cells = vec![code_cell(&["plt.show();\n"])];
        let (buffer, info) = project(&cells, "black", &Config::default()).unwrap();
        assert!(buffer.contains("plt.show()\n"));
        assert!(!buffer.contains(';'));
        assert!(info.trailing_semicolons.contains(&1));
    }

    #[test]
    fn test_placeholders_recorded_per_cell() {
        let cells = vec![code_cell(&["x = 1\n"]), code_cell(&["%time f()\n", "y = 2\n"])];
        let (_, info) = project(&cells, "flake8", &Config::default()).unwrap();
        assert!(!info.placeholders.contains_key(&1));
        assert_eq!(info.placeholders[&2].len(), 1);
        assert_eq!(info.placeholders[&2][0].original, "%time f()");
    }

    #[test]
    fn test_separator_collision_aborts() {
        let cells = vec![code_cell(&["# %%NBLINT-CELL-SEPabc123\n", "x = 1\n"])];
        let err = project_with_token(&cells, "flake8", &Config::default(), "abc123");
        assert!(matches!(
            err,
            Err(ProjectionError::SeparatorCollision { token }) if token.ends_with("abc123")
        ));
    }

    #[test]
    fn test_separator_prefix_in_source_is_fine() {
        // Only the full separator line with a matching token collides.
        let cells = vec![code_cell(&["s = '# %%NBLINT-CELL-SEP'\n"])];
        let (buffer, info) = project(&cells, "flake8", &Config::default()).unwrap();
        assert_eq!(info.projected_cells, 1);
        assert!(buffer.contains("s = '# %%NBLINT-CELL-SEP'"));
    }

    #[test]
    fn test_empty_projection() {
        let cells = vec![markdown_cell()];
        let (buffer, info) = project(&cells, "flake8", &Config::default()).unwrap();
        assert_eq!(buffer, "");
        assert_eq!(info.projected_cells, 0);
    }
}
