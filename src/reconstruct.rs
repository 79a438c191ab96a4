//! Rebuild the notebook from a mutated buffer.

use std::fs;
use std::io::Write as _;
use std::path::Path;

use log::debug;
use serde_json::Value;
use thiserror::Error;

use crate::notebook::{self, Notebook, NotebookError};
use crate::projection::ProjectionInfo;
use crate::pytext;

#[derive(Debug, Error)]
pub enum ReconstructError {
    /// The tool added or removed separator lines; cell boundaries are gone.
    #[error("{path}: expected {expected} cell separators in tool output, found {found}")]
    SeparatorMismatch {
        path: String,
        expected: usize,
        found: usize,
    },
    /// A placeholder nonce is no longer present, so its original magic
    /// cannot be put back. The whole mutation is rejected.
    #[error("{path}: tool removed the placeholder for a magic in cell {cell}; refusing to apply the mutation")]
    MissingPlaceholder { path: String, cell: usize },
    #[error("failed to read mutated buffer {path}: {source}")]
    ReadBuffer {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    WriteNotebook {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Notebook(#[from] NotebookError),
}

/// Apply a mutated buffer back onto the notebook file.
///
/// Returns `Ok(false)` when the mutation turned out to be a no-op at the
/// notebook level (tool-side churn in padding only). The write is atomic:
/// a sibling temp file renamed over the original.
pub fn reconstruct(
    buffer_path: &Path,
    nb: &Notebook,
    info: &ProjectionInfo,
) -> Result<bool, ReconstructError> {
    let nb_path = nb.path.display().to_string();
    let text = fs::read_to_string(buffer_path).map_err(|source| ReconstructError::ReadBuffer {
        path: buffer_path.display().to_string(),
        source,
    })?;

    let found = text.matches(&info.separator).count();
    if found != info.projected_cells {
        return Err(ReconstructError::SeparatorMismatch {
            path: nb_path,
            expected: info.projected_cells,
            found,
        });
    }

    let stripped = text.strip_prefix(&info.separator).unwrap_or(&text);
    let mut spans: Vec<String> = if info.projected_cells == 0 {
        Vec::new()
    } else {
        stripped
            .split(&info.separator)
            .map(str::to_string)
            .collect()
    };

    let mut json = nb.json.clone();
    let cells = json["cells"]
        .as_array_mut()
        .map(std::mem::take)
        .unwrap_or_default();

    let mut new_cells: Vec<Value> = Vec::with_capacity(cells.len());
    let mut cell_number = 0usize;
    let mut span_iter = spans.drain(..);

    for mut cell in cells {
        if !notebook::is_code_cell(&cell) {
            new_cells.push(cell);
            continue;
        }
        cell_number += 1;
        if info.ignored_cells.contains(&cell_number) {
            new_cells.push(cell);
            continue;
        }

        let mut span = span_iter.next().unwrap_or_default();

        if info.trailing_semicolons.contains(&cell_number) {
            span = pytext::restore_trailing_semicolon(&span);
        }
        if let Some(placeholders) = info.placeholders.get(&cell_number) {
            for p in placeholders {
                if !span.contains(&p.replacement) {
                    return Err(ReconstructError::MissingPlaceholder {
                        path: nb_path,
                        cell: cell_number,
                    });
                }
                span = span.replace(&p.replacement, &p.original);
            }
        }

        let source = span.trim_matches('\n');
        if source.is_empty() {
            debug!("cell {cell_number} emptied by the tool, removing it");
            continue;
        }
        cell["source"] = notebook::source_value(&pytext::split_keepends(source));
        new_cells.push(cell);
    }

    json["cells"] = Value::Array(new_cells);

    if json == nb.json {
        return Ok(false);
    }

    let updated = Notebook {
        json,
        path: nb.path.clone(),
        trailing_newline: nb.trailing_newline,
    };
    write_atomic(&updated)?;
    Ok(true)
}

fn write_atomic(nb: &Notebook) -> Result<(), ReconstructError> {
    let dir = nb.path.parent().unwrap_or_else(|| Path::new("."));
    let io_err = |source| ReconstructError::WriteNotebook {
        path: nb.path.display().to_string(),
        source,
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(nb.to_text().as_bytes()).map_err(io_err)?;
    tmp.persist(&nb.path)
        .map_err(|e| io_err(e.error))?;
    Ok(())
}
