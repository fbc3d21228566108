use crate::config::{RendererModule, SurfaceSource, VendorConfig};
use crate::entry::write_entry;
use crate::error::Result;
use crate::runner::ScriptRunner;
use crate::surface::{RuntimeSurfaceProvider, StaticSurfaceProvider, SurfaceProvider};
use crate::target::EntryPoint;
use crate::version::{uses_split_surface, LibraryVersion};
use crate::workspace::Workspace;
use futures::future::BoxFuture;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    DirectEntry,
    SynthesizedEntry,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StrategyKind::DirectEntry => "direct entry",
            StrategyKind::SynthesizedEntry => "synthesized entry",
        })
    }
}

/// Decides what the renderer builds use as their entry point.
pub trait BuildStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    fn entry_point<'a>(&'a self, workspace: &'a Workspace) -> BoxFuture<'a, Result<EntryPoint>>;
}

/// The renderer package already exposes its whole API from one module.
pub struct DirectEntryStrategy {
    module: String,
}

impl DirectEntryStrategy {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
        }
    }
}

impl BuildStrategy for DirectEntryStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::DirectEntry
    }

    fn entry_point<'a>(&'a self, _workspace: &'a Workspace) -> BoxFuture<'a, Result<EntryPoint>> {
        Box::pin(async move { Ok(EntryPoint::Module(self.module.clone())) })
    }
}

/// The renderer API is split over two modules; bundle a generated module
/// that re-exports both.
pub struct SynthesizedEntryStrategy {
    provider: Box<dyn SurfaceProvider>,
    renderer: RendererModule,
}

impl SynthesizedEntryStrategy {
    pub fn new(provider: Box<dyn SurfaceProvider>, renderer: RendererModule) -> Self {
        Self { provider, renderer }
    }
}

impl BuildStrategy for SynthesizedEntryStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::SynthesizedEntry
    }

    fn entry_point<'a>(&'a self, workspace: &'a Workspace) -> BoxFuture<'a, Result<EntryPoint>> {
        Box::pin(async move {
            let surface = self.provider.enumerate().await?;
            let path = write_entry(workspace.scripts_dir(), &surface, &self.renderer)?;
            Ok(EntryPoint::File(path))
        })
    }
}

/// The configured way of discovering the split renderer's exports.
pub fn surface_provider(
    config: &VendorConfig,
    runner: Arc<dyn ScriptRunner>,
    scripts_dir: &Path,
) -> Box<dyn SurfaceProvider> {
    match config.surface_source {
        SurfaceSource::Runtime => Box::new(RuntimeSurfaceProvider::new(
            runner,
            scripts_dir,
            config.renderer.clone(),
            config.primary_exports.clone(),
        )),
        SurfaceSource::Static => Box::new(StaticSurfaceProvider::new(
            runner.project_dir(),
            config.renderer.clone(),
            config.primary_exports.clone(),
        )),
    }
}

/// Which strategy a version builds with. This is the only place the version
/// threshold is consulted.
pub fn strategy_kind(version: &LibraryVersion, config: &VendorConfig) -> Result<StrategyKind> {
    Ok(if uses_split_surface(version, &config.threshold()?) {
        StrategyKind::SynthesizedEntry
    } else {
        StrategyKind::DirectEntry
    })
}

/// Pick the strategy for this run.
pub fn select_strategy(
    version: &LibraryVersion,
    config: &VendorConfig,
    runner: Arc<dyn ScriptRunner>,
    workspace: &Workspace,
) -> Result<Box<dyn BuildStrategy>> {
    let strategy: Box<dyn BuildStrategy> = match strategy_kind(version, config)? {
        StrategyKind::SynthesizedEntry => Box::new(SynthesizedEntryStrategy::new(
            surface_provider(config, runner, workspace.scripts_dir()),
            config.renderer.clone(),
        )),
        StrategyKind::DirectEntry => {
            Box::new(DirectEntryStrategy::new(config.renderer.module.clone()))
        }
    };
    info!(
        "{} v{} uses the {} strategy (split at v{})",
        config.core.module,
        version,
        strategy.kind(),
        config.split_threshold
    );
    Ok(strategy)
}
