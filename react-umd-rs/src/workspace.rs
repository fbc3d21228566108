//! Scoped scratch directories for one pipeline run.
//!
//! A run owns two directories under its [`WorkspaceRoot`]: `temp` for
//! generated scripts and entry modules, and `temp-dist` for raw bundler
//! output. Stale copies are removed when the workspace is opened. They are
//! removed again when it is closed, or when it is dropped on a failure path
//! unless the run asked to keep them.

use crate::config::KeepWorkspace;
use crate::error::{ReactUmdError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const SCRIPTS_DIR_NAME: &str = "temp";
pub const DIST_DIR_NAME: &str = "temp-dist";

/// Parent directory of a run's workspace.
#[derive(Debug)]
pub struct WorkspaceRoot {
    path: PathBuf,
    _temp_dir: Option<TempDir>,
}

impl WorkspaceRoot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _temp_dir: None,
        }
    }

    /// Fresh directory under the system temp dir. It is deleted with the
    /// root unless `keep` asks for the workspace to outlive the run.
    pub fn temporary(keep: KeepWorkspace) -> Result<Self> {
        let temp_dir = tempfile::Builder::new()
            .prefix("react-umd-")
            .disable_cleanup(keep != KeepWorkspace::Never)
            .tempdir()
            .map_err(|err| ReactUmdError::fs(std::env::temp_dir(), err))?;
        Ok(Self {
            path: temp_dir.path().to_path_buf(),
            _temp_dir: Some(temp_dir),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove a temporary root once its workspace was closed and left it
    /// empty. Roots given by the caller are never removed.
    pub fn close(self) -> Result<()> {
        if self._temp_dir.is_none() {
            return Ok(());
        }
        let is_empty = fs::read_dir(&self.path)
            .map_err(|err| ReactUmdError::fs(&self.path, err))?
            .next()
            .is_none();
        if is_empty {
            fs::remove_dir(&self.path).map_err(|err| ReactUmdError::fs(&self.path, err))?;
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct Workspace {
    scripts_dir: PathBuf,
    dist_dir: PathBuf,
    keep: KeepWorkspace,
    closed: bool,
}

impl Workspace {
    pub fn open(root: &WorkspaceRoot, keep: KeepWorkspace) -> Result<Self> {
        let scripts_dir = root.path().join(SCRIPTS_DIR_NAME);
        let dist_dir = root.path().join(DIST_DIR_NAME);

        for dir in [&scripts_dir, &dist_dir] {
            remove_if_exists(dir)?;
            fs::create_dir_all(dir).map_err(|err| ReactUmdError::fs(dir, err))?;
        }
        debug!(
            "Opened workspace {} and {}",
            scripts_dir.display(),
            dist_dir.display()
        );

        Ok(Self {
            scripts_dir,
            dist_dir,
            keep,
            closed: false,
        })
    }

    /// Generated scripts and the synthesized entry module.
    pub fn scripts_dir(&self) -> &Path {
        &self.scripts_dir
    }

    /// Raw bundler output.
    pub fn dist_dir(&self) -> &Path {
        &self.dist_dir
    }

    /// Success-path teardown.
    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        if self.keep == KeepWorkspace::Always {
            info!("Keeping workspace at {}", self.scripts_dir.display());
            return Ok(());
        }
        remove_if_exists(&self.scripts_dir)?;
        remove_if_exists(&self.dist_dir)?;
        Ok(())
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        match self.keep {
            KeepWorkspace::Never => {
                for dir in [&self.scripts_dir, &self.dist_dir] {
                    if let Err(err) = remove_if_exists(dir) {
                        warn!("Failed to clean up workspace: {}", err);
                    }
                }
            }
            KeepWorkspace::OnFailure | KeepWorkspace::Always => {
                warn!(
                    "Run failed, intermediate files kept in {} and {}",
                    self.scripts_dir.display(),
                    self.dist_dir.display()
                );
            }
        }
    }
}

fn remove_if_exists(dir: &Path) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir).map_err(|err| ReactUmdError::fs(dir, err))?;
    }
    Ok(())
}
