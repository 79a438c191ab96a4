//! External tool invocation.

use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("command not found: {tool}. Is it installed and on PATH?")]
    ToolNotFound { tool: String },
    #[error("{tool} timed out after {timeout_ms}ms")]
    Timeout { tool: String, timeout_ms: u64 },
    #[error("failed to run {tool}: {source}")]
    Io {
        tool: String,
        #[source]
        source: std::io::Error,
    },
}

/// What a tool run produced.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub success: bool,
    /// The buffer file's bytes changed while the tool ran.
    pub mutated: bool,
}

/// Runs external tools against a buffer file.
///
/// Availability probes are cached so repeated runs of the same tool across
/// many notebooks only hit the PATH lookup once.
pub struct ToolExecutor {
    availability: Mutex<HashMap<String, bool>>,
}

impl ToolExecutor {
    pub fn new() -> Self {
        Self {
            availability: Mutex::new(HashMap::new()),
        }
    }

    /// Whether `tool` resolves on PATH.
    pub fn is_available(&self, tool: &str) -> bool {
        if let Ok(cache) = self.availability.lock()
            && let Some(&known) = cache.get(tool)
        {
            return known;
        }
        let probe = if cfg!(windows) { "where" } else { "which" };
        let available = Command::new(probe)
            .arg(tool)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false);
        if let Ok(mut cache) = self.availability.lock() {
            cache.insert(tool.to_string(), available);
        }
        available
    }

    /// Run `tool` with the buffer path as its first argument, followed by
    /// `args`. `timeout_ms` of 0 waits indefinitely.
    pub fn run(
        &self,
        tool: &str,
        buffer: &Path,
        args: &[String],
        timeout_ms: u64,
    ) -> Result<ToolOutput, ExecutorError> {
        if !self.is_available(tool) {
            return Err(ExecutorError::ToolNotFound {
                tool: tool.to_string(),
            });
        }

        let before = fs::read(buffer).unwrap_or_default();

        debug!("running {tool} {} {}", buffer.display(), args.join(" "));
        let mut child = Command::new(tool)
            .arg(buffer)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ExecutorError::Io {
                tool: tool.to_string(),
                source,
            })?;

        let stdout_handle = child.stdout.take().map(spawn_reader);
        let stderr_handle = child.stderr.take().map(spawn_reader);

        let status = if timeout_ms == 0 {
            child.wait().map_err(|source| ExecutorError::Io {
                tool: tool.to_string(),
                source,
            })?
        } else {
            wait_with_timeout(&mut child, tool, timeout_ms)?
        };

        let stdout = join_reader(stdout_handle);
        let stderr = join_reader(stderr_handle);

        let after = fs::read(buffer).unwrap_or_default();
        let mutated = before != after;
        if mutated {
            debug!("{tool} rewrote the buffer");
        }

        let exit_code = status.code().unwrap_or(-1);
        Ok(ToolOutput {
            stdout,
            stderr,
            exit_code,
            success: status.success(),
            mutated,
        })
    }
}

impl Default for ToolExecutor {
    fn default() -> Self {
        Self::new()
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut out = String::new();
        if pipe.read_to_string(&mut out).is_err() {
            warn!("tool emitted non-UTF-8 output, dropping it");
            out.clear();
        }
        out
    })
}

fn join_reader(handle: Option<thread::JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

fn wait_with_timeout(
    child: &mut Child,
    tool: &str,
    timeout_ms: u64,
) -> Result<std::process::ExitStatus, ExecutorError> {
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ExecutorError::Timeout {
                        tool: tool.to_string(),
                        timeout_ms,
                    });
                }
                thread::sleep(Duration::from_millis(10));
            }
            Err(source) => {
                return Err(ExecutorError::Io {
                    tool: tool.to_string(),
                    source,
                });
            }
        }
    }
}
