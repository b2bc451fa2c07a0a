// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Launches the external scraper for one workspace and waits for it under a
//! hard timeout.

use crate::models::settings::{InvocationStyle, ScraperConfig};
use crate::services::logging::{tail_excerpt, STDERR_EXCERPT_CHARS};
use crate::services::workspace::Workspace;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// How long to keep draining output pipes after the child has exited.
/// Pipes inherited by grandchildren would otherwise keep the reads open.
const OUTPUT_DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Whether the scraper should also download listing images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMode {
    Skip,
    /// Reserved: the image pipeline is not wired up yet and callers refuse it.
    IncludeImages,
}

#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("Scraping timeout - user may have too many products")]
    Timeout { after: Duration },
    #[error("Scraper failed: {message}")]
    Failed {
        code: Option<i32>,
        message: String,
    },
    #[error("Failed to launch scraper '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("Failed to wait for scraper: {0}")]
    Wait(#[source] io::Error),
}

/// A scraper run that exited with status zero.
#[derive(Debug)]
pub struct Invocation {
    /// Where the database artifact is expected; the file may still be missing.
    pub database_path: PathBuf,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

/// Builds and runs scraper child processes from a fixed configuration.
#[derive(Debug, Clone)]
pub struct ScraperInvoker {
    config: ScraperConfig,
    args: Vec<String>,
}

impl ScraperInvoker {
    pub fn new(mut config: ScraperConfig) -> Self {
        let mut args = config.base_args();
        // Relative program and script paths must not be resolved against the workspace
        if config.invocation == InvocationStyle::WorkingDir {
            match std::env::current_dir() {
                Ok(cwd) => {
                    config.program = absolutize(&cwd, &config.program);
                    args = anchor_existing_paths(&cwd, args);
                }
                Err(e) => warn!(
                    error = %e,
                    "cannot resolve scraper paths against current directory"
                ),
            }
        }
        Self { config, args }
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    /// Build the child command for `workspace`.
    ///
    /// The command is always an argument vector; nothing goes through a shell.
    pub fn command(&self, workspace: &Workspace, images: ImageMode) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.args);

        match self.config.invocation {
            InvocationStyle::ExplicitPaths => {
                cmd.arg("--users")
                    .arg(workspace.file(&self.config.users_file))
                    .arg("--database")
                    .arg(workspace.file(&self.config.database_file));
            }
            InvocationStyle::WorkingDir => {
                cmd.current_dir(workspace.path());
            }
        }

        if images == ImageMode::Skip && !self.config.no_images_flag.is_empty() {
            cmd.arg(&self.config.no_images_flag);
        }

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Run the scraper to completion or until the configured timeout.
    ///
    /// On timeout the child is killed and reaped before returning.
    pub async fn run(
        &self,
        workspace: &Workspace,
        images: ImageMode,
    ) -> Result<Invocation, InvocationError> {
        let timeout = self.config.timeout();
        let mut cmd = self.command(workspace, images);

        let started = Instant::now();
        let mut child = cmd.spawn().map_err(|source| InvocationError::Spawn {
            program: self.config.program.clone(),
            source,
        })?;
        debug!(
            pid = child.id(),
            workspace = %workspace.path().display(),
            timeout_secs = timeout.as_secs(),
            "scraper started"
        );

        let stdout_task = tokio::spawn(read_stream(child.stdout.take()));
        let stderr_task = tokio::spawn(read_stream(child.stderr.take()));

        let status = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(status) => status.map_err(InvocationError::Wait)?,
            Err(_) => {
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "failed to kill timed out scraper");
                }
                stdout_task.abort();
                stderr_task.abort();
                error!(timeout_secs = timeout.as_secs(), "scraper timed out");
                return Err(InvocationError::Timeout { after: timeout });
            }
        };

        let stdout = drain(stdout_task).await;
        let stderr = drain(stderr_task).await;
        let elapsed = started.elapsed();

        if !status.success() {
            let message = failure_message(status, &stderr);
            error!(
                exit_code = status.code(),
                elapsed_ms = elapsed.as_millis() as u64,
                stderr = %message,
                "scraper failed"
            );
            return Err(InvocationError::Failed {
                code: status.code(),
                message,
            });
        }

        info!(elapsed_ms = elapsed.as_millis() as u64, "scraper completed");
        Ok(Invocation {
            database_path: workspace.file(&self.config.database_file),
            stdout,
            stderr,
            elapsed,
        })
    }
}

fn absolutize(cwd: &Path, program: &str) -> String {
    let path = Path::new(program);
    if path.is_absolute() || path.components().count() < 2 {
        // Bare names are looked up on PATH
        return program.to_string();
    }
    cwd.join(path).to_string_lossy().into_owned()
}

/// Rewrite relative arguments that name an existing file under `cwd`
/// (typically the scraper script) into absolute paths.
fn anchor_existing_paths(cwd: &Path, args: Vec<String>) -> Vec<String> {
    args.into_iter()
        .map(|arg| {
            let path = Path::new(&arg);
            if arg.starts_with('-') || path.is_absolute() {
                return arg;
            }
            let anchored = cwd.join(path);
            if anchored.exists() {
                anchored.to_string_lossy().into_owned()
            } else {
                arg
            }
        })
        .collect()
}

fn failure_message(status: ExitStatus, stderr: &str) -> String {
    let excerpt = tail_excerpt(stderr, STDERR_EXCERPT_CHARS);
    if excerpt.is_empty() {
        format!("scraper {}", status)
    } else {
        excerpt
    }
}

async fn read_stream<R: AsyncRead + Unpin>(stream: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        if let Err(e) = stream.read_to_end(&mut buf).await {
            debug!(error = %e, "scraper output stream closed early");
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

async fn drain(task: JoinHandle<String>) -> String {
    match tokio::time::timeout(OUTPUT_DRAIN_GRACE, task).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            warn!(error = %e, "scraper output reader failed");
            String::new()
        }
        Err(_) => {
            warn!("scraper output still open after exit, giving up");
            String::new()
        }
    }
}
