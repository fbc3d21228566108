//! Bundler seam for the build orchestrator.
//!
//! A [`Bundler`] turns one [`BuildTarget`] into a single UMD script inside
//! the workspace's dist directory. The bundling engine itself is external;
//! `webpack` is driven through a generated config and a small node driver.
//!
//! # Architecture
//!
//! - `webpack`: serializable webpack options and the node driver that runs them

mod webpack;

pub use webpack::{WebpackBundler, WebpackConfig};

use crate::error::Result;
use crate::target::BuildTarget;
use crate::workspace::Workspace;
use futures::future::BoxFuture;
use std::path::PathBuf;

/// Bundler output for one target, still inside the workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBundle {
    pub target: BuildTarget,
    pub path: PathBuf,
}

pub trait Bundler: Send + Sync {
    fn bundle<'a>(
        &'a self,
        target: &'a BuildTarget,
        workspace: &'a Workspace,
    ) -> BoxFuture<'a, Result<RawBundle>>;
}
