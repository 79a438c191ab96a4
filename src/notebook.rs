//! Notebook document model.
//!
//! The notebook is held as raw JSON (`serde_json::Value` with key order
//! preserved) so that reconstruction can rewrite cell sources and leave
//! every other byte of structure alone. The core only ever looks at cells
//! through immutable [`CellView`]s.

use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors reading or writing a notebook document.
#[derive(Debug, Error)]
pub enum NotebookError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} is not a valid notebook: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{path} has no cell list")]
    MissingCells { path: String },
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Discriminator for notebook cell types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Code,
    Markdown,
    /// Raw cells and anything with an unrecognized `cell_type`.
    Other,
}

/// Immutable view of one notebook cell.
#[derive(Debug, Clone)]
pub struct CellView {
    pub kind: CellKind,
    /// Raw source lines, trailing newlines preserved (last line may lack one).
    pub source: Vec<String>,
    /// Tags from `metadata.tags`, if any.
    pub tags: Vec<String>,
}

/// A notebook document read from disk.
#[derive(Debug, Clone)]
pub struct Notebook {
    pub json: Value,
    pub path: PathBuf,
    /// Whether the file ended with a newline, so a rewrite can match it.
    pub trailing_newline: bool,
}

impl Notebook {
    /// Read and parse a notebook file.
    pub fn read(path: &Path) -> Result<Self, NotebookError> {
        let text = fs::read_to_string(path).map_err(|source| NotebookError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let json: Value = serde_json::from_str(&text).map_err(|source| NotebookError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        if !json.get("cells").is_some_and(Value::is_array) {
            return Err(NotebookError::MissingCells {
                path: path.display().to_string(),
            });
        }
        Ok(Self {
            json,
            path: path.to_path_buf(),
            trailing_newline: text.ends_with('\n'),
        })
    }

    /// The raw cell array.
    pub fn cells(&self) -> &[Value] {
        self.json["cells"].as_array().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Extract immutable views of all cells, in document order.
    pub fn cell_views(&self) -> Vec<CellView> {
        self.cells().iter().map(cell_view).collect()
    }

    /// Serialize the notebook the way Jupyter writes it: one-space
    /// indentation, non-ASCII characters unescaped.
    pub fn to_text(&self) -> String {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b" ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        // Value serialization to an in-memory buffer cannot fail.
        self.json
            .serialize(&mut ser)
            .expect("notebook JSON serialization cannot fail");
        let mut text = String::from_utf8(buf).expect("serde_json emits UTF-8");
        if self.trailing_newline {
            text.push('\n');
        }
        text
    }

    /// Write the notebook to `path`.
    pub fn write_to(&self, path: &Path) -> Result<(), NotebookError> {
        fs::write(path, self.to_text()).map_err(|source| NotebookError::Write {
            path: path.display().to_string(),
            source,
        })
    }
}

/// Build a [`CellView`] from a raw cell value.
pub fn cell_view(cell: &Value) -> CellView {
    let kind = match cell.get("cell_type").and_then(Value::as_str) {
        Some("code") => CellKind::Code,
        Some("markdown") => CellKind::Markdown,
        _ => CellKind::Other,
    };
    CellView {
        kind,
        source: source_lines(cell),
        tags: cell_tags(cell),
    }
}

/// Cell source as a list of lines. The format allows either a single string
/// or a list of strings; both are normalized to lines with endings kept.
pub fn source_lines(cell: &Value) -> Vec<String> {
    match cell.get("source") {
        Some(Value::String(s)) => crate::pytext::split_keepends(s),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Tags from cell metadata, empty if absent.
pub fn cell_tags(cell: &Value) -> Vec<String> {
    cell.get("metadata")
        .and_then(|m| m.get("tags"))
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Whether a raw cell is a code cell.
pub fn is_code_cell(cell: &Value) -> bool {
    cell.get("cell_type").and_then(Value::as_str) == Some("code")
}

/// Convert source lines back into the list-of-strings JSON representation.
pub fn source_value(lines: &[String]) -> Value {
    Value::Array(lines.iter().map(|l| Value::String(l.clone())).collect())
}
