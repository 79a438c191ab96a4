//! Per-notebook pipeline: discover, project, run, remap, reconstruct.

use std::fs;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use log::{debug, info};
use thiserror::Error;

use crate::config::Config;
use crate::executor::{ExecutorError, ToolExecutor};
use crate::notebook::{Notebook, NotebookError};
use crate::projection::{ProjectionError, project};
use crate::reconstruct::{ReconstructError, reconstruct};
use crate::remap::{Diagnostics, remap_output};

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Notebook(#[from] NotebookError),
    #[error(transparent)]
    Projection(#[from] ProjectionError),
    #[error(transparent)]
    Executor(#[from] ExecutorError),
    #[error(transparent)]
    Reconstruct(#[from] ReconstructError),
    #[error("failed to write buffer for {path}: {source}")]
    WriteBuffer {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{tool} would mutate {path}; rerun with --allow-mutation to apply changes")]
    MutationDetected {
        tool: String,
        path: String,
        /// Remapped tool output, so the caller can still show what the
        /// tool reported before the mutation was rejected.
        stdout: String,
        stderr: String,
    },
}

/// Result of running the tool on one notebook.
#[derive(Debug)]
pub struct NotebookOutcome {
    pub notebook: PathBuf,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub mutated: bool,
    /// The notebook file on disk was actually rewritten.
    pub reconstructed: bool,
}

/// Expand the given paths into a sorted list of notebook files. Files are
/// taken as-is; directories are walked for `*.ipynb`, skipping checkpoint
/// copies.
pub fn find_notebooks(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut notebooks = Vec::new();
    for path in paths {
        if path.is_file() {
            notebooks.push(path.clone());
            continue;
        }
        for entry in WalkBuilder::new(path).build().flatten() {
            let p = entry.path();
            if p.extension().is_some_and(|e| e == "ipynb")
                && !p
                    .components()
                    .any(|c| c.as_os_str() == ".ipynb_checkpoints")
            {
                notebooks.push(p.to_path_buf());
            }
        }
    }
    notebooks.sort();
    notebooks.dedup();
    notebooks
}

/// Run `tool` on one notebook.
pub fn run_notebook(
    tool: &str,
    notebook_path: &Path,
    tool_args: &[String],
    config: &Config,
    executor: &ToolExecutor,
) -> Result<NotebookOutcome, RunError> {
    let nb = Notebook::read(notebook_path)?;
    let (buffer, projection) = project(&nb.cell_views(), tool, config)?;

    let workdir = tempfile::tempdir().map_err(|source| RunError::WriteBuffer {
        path: notebook_path.display().to_string(),
        source,
    })?;
    let stem = notebook_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("notebook");
    let buffer_path = workdir.path().join(format!("{stem}.py"));
    fs::write(&buffer_path, &buffer).map_err(|source| RunError::WriteBuffer {
        path: notebook_path.display().to_string(),
        source,
    })?;
    debug!(
        "projected {} cells of {} into {}",
        projection.projected_cells,
        notebook_path.display(),
        buffer_path.display()
    );

    let mut args = config.addopts_for(tool);
    args.extend(tool_args.iter().cloned());
    let output = executor.run(tool, &buffer_path, &args, config.timeout)?;

    let shown_path = notebook_path.display().to_string();
    let stdout = replace_buffer_path(&output.stdout, &buffer_path, &shown_path);
    let stderr = replace_buffer_path(&output.stderr, &buffer_path, &shown_path);
    let diagnostics: Diagnostics = remap_output(
        config.output_format_for(tool),
        &stdout,
        &stderr,
        &shown_path,
        &projection.map,
    );

    let mut reconstructed = false;
    if output.mutated {
        if !config.allow_mutation {
            return Err(RunError::MutationDetected {
                tool: tool.to_string(),
                path: shown_path,
                stdout: diagnostics.stdout,
                stderr: diagnostics.stderr,
            });
        }
        reconstructed = reconstruct(&buffer_path, &nb, &projection)?;
        if reconstructed {
            info!("updated {shown_path}");
        }
    }

    Ok(NotebookOutcome {
        notebook: notebook_path.to_path_buf(),
        stdout: diagnostics.stdout,
        stderr: diagnostics.stderr,
        exit_code: output.exit_code,
        mutated: output.mutated,
        reconstructed,
    })
}

/// Swap the temp buffer path for the notebook path in tool output, trying
/// the canonicalized form too since some tools resolve symlinks.
fn replace_buffer_path(text: &str, buffer_path: &Path, shown: &str) -> String {
    let mut out = text.replace(&buffer_path.display().to_string(), shown);
    if let Ok(canonical) = buffer_path.canonicalize() {
        out = out.replace(&canonical.display().to_string(), shown);
    }
    out
}
