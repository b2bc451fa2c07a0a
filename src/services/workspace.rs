// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Per-request scratch directories for scraper runs.

use crate::models::scrape::Username;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, warn};

const WORKSPACE_PREFIX: &str = "vinted-scrape-";

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("failed to create workspace: {0}")]
    Create(#[source] io::Error),
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// An exclusively owned, uniquely named directory under the system temp root.
///
/// Dropping a workspace removes it as well, so an early return or a panic in
/// the caller can not leak the directory. [`Workspace::release`] does the same
/// removal explicitly and reports what happened.
#[derive(Debug)]
pub struct Workspace {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl Workspace {
    /// Create a fresh workspace directory.
    pub fn acquire() -> Result<Self, WorkspaceError> {
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir()
            .map_err(WorkspaceError::Create)?;
        let path = dir.path().to_path_buf();
        debug!(workspace = %path.display(), "workspace acquired");
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Absolute path of `file_name` inside the workspace.
    pub fn file(&self, file_name: &str) -> PathBuf {
        self.path.join(file_name)
    }

    /// Write the scraper input list: exactly one line holding `username`.
    pub async fn write_user_list(
        &self,
        file_name: &str,
        username: &Username,
    ) -> Result<PathBuf, WorkspaceError> {
        let path = self.file(file_name);
        tokio::fs::write(&path, format!("{}\n", username))
            .await
            .map_err(|source| WorkspaceError::Write {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }

    /// Recursively delete the workspace.
    ///
    /// Never fails: a directory that is already gone counts as released, any
    /// other error is logged and swallowed. Calling it again is a no-op.
    pub fn release(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };
        match dir.close() {
            Ok(()) => debug!(workspace = %self.path.display(), "workspace released"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(workspace = %self.path.display(), "workspace already removed")
            }
            Err(e) => warn!(
                workspace = %self.path.display(),
                error = %e,
                "failed to remove workspace"
            ),
        }
        // close() gives up on the first error; sweep whatever is left
        if self.path.exists() {
            if let Err(e) = std::fs::remove_dir_all(&self.path) {
                warn!(workspace = %self.path.display(), error = %e, "workspace left on disk");
            }
        }
    }

    /// Release the workspace on the blocking pool instead of the async worker.
    pub async fn close(self) {
        let path = self.path.clone();
        let mut workspace = self;
        if let Err(e) = tokio::task::spawn_blocking(move || workspace.release()).await {
            warn!(workspace = %path.display(), error = %e, "workspace release task failed");
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.release();
    }
}
