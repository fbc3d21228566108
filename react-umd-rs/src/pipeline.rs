use crate::bundler::{Bundler, WebpackBundler};
use crate::config::VendorConfig;
use crate::entry::entry_file_name;
use crate::error::Result;
use crate::finisher::{emit, Artifact, AssetFinisher, EmittedAsset};
use crate::minify::{Minifier, TerserMinifier};
use crate::orchestrator::BuildOrchestrator;
use crate::runner::{NodeRunner, ScriptRunner};
use crate::strategy::{select_strategy, strategy_kind, surface_provider, StrategyKind};
use crate::surface::ExportSurface;
use crate::target::{plan_targets, BuildTarget, EntryPoint};
use crate::version::{read_installed_version, LibraryVersion};
use crate::workspace::{Workspace, WorkspaceRoot, SCRIPTS_DIR_NAME};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// External collaborators the pipeline drives.
pub struct Toolchain {
    pub runner: Arc<dyn ScriptRunner>,
    pub bundler: Box<dyn Bundler>,
    pub minifier: Box<dyn Minifier>,
}

impl Toolchain {
    /// node + webpack + terser, all resolved from the project directory.
    pub fn node(config: &VendorConfig) -> Result<Self> {
        let runner: Arc<dyn ScriptRunner> =
            Arc::new(NodeRunner::new(config.node.clone(), &config.project_dir)?);
        Ok(Self {
            bundler: Box::new(WebpackBundler::new(runner.clone())),
            minifier: Box::new(TerserMinifier::new(runner.clone())),
            runner,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VendorReport {
    pub version: String,
    pub strategy: StrategyKind,
    pub assets: Vec<EmittedAsset>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VendorPlan {
    pub version: String,
    pub strategy: StrategyKind,
    pub targets: Vec<BuildTarget>,
}

/// One vendoring run from version detection to emitted artifacts.
pub struct VendorPipeline {
    config: VendorConfig,
    toolchain: Toolchain,
}

impl VendorPipeline {
    pub fn new(config: VendorConfig, toolchain: Toolchain) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, toolchain })
    }

    pub fn config(&self) -> &VendorConfig {
        &self.config
    }

    pub fn installed_version(&self) -> Result<LibraryVersion> {
        let version = read_installed_version(&self.config.project_dir, &self.config.core.module)?;
        LibraryVersion::parse(&version)
    }

    fn workspace_root(&self) -> Result<WorkspaceRoot> {
        match &self.config.workspace_root {
            Some(path) => Ok(WorkspaceRoot::new(path)),
            None => WorkspaceRoot::temporary(self.config.keep_workspace),
        }
    }

    /// Build, finish and emit all artifacts.
    ///
    /// Emission is all-or-nothing: any error before the final write leaves
    /// the output directory untouched.
    pub async fn run(&self) -> Result<VendorReport> {
        let version = self.installed_version()?;
        info!("Vendoring {} v{}", self.config.core.module, version);

        let root = self.workspace_root()?;
        let workspace = Workspace::open(&root, self.config.keep_workspace)?;

        // An early return drops the workspace, which handles failure cleanup.
        let (strategy, artifacts) = self.build(&version, &workspace).await?;
        let assets = emit(&artifacts, &self.config.output_dir)?;
        workspace.close()?;
        root.close()?;

        Ok(VendorReport {
            version: version.to_string(),
            strategy,
            assets,
        })
    }

    async fn build(
        &self,
        version: &LibraryVersion,
        workspace: &Workspace,
    ) -> Result<(StrategyKind, Vec<Artifact>)> {
        let strategy = select_strategy(
            version,
            &self.config,
            self.toolchain.runner.clone(),
            workspace,
        )?;
        let entry = strategy.entry_point(workspace).await?;
        let targets = plan_targets(&self.config, &entry);

        let bundles = BuildOrchestrator::new(self.toolchain.bundler.as_ref())
            .run(&targets, workspace)
            .await?;
        let artifacts = AssetFinisher::new(self.toolchain.minifier.as_ref(), version.to_string())
            .finish(&bundles, workspace)
            .await?;
        Ok((strategy.kind(), artifacts))
    }

    /// The targets a run would build, without running anything. A
    /// synthesized entry is shown relative to the workspace root.
    pub fn plan(&self) -> Result<VendorPlan> {
        let version = self.installed_version()?;
        let strategy = strategy_kind(&version, &self.config)?;
        let entry = match strategy {
            StrategyKind::SynthesizedEntry => EntryPoint::File(
                PathBuf::from(SCRIPTS_DIR_NAME).join(entry_file_name(&self.config.renderer)),
            ),
            StrategyKind::DirectEntry => EntryPoint::Module(self.config.renderer.module.clone()),
        };
        Ok(VendorPlan {
            version: version.to_string(),
            strategy,
            targets: plan_targets(&self.config, &entry),
        })
    }

    /// Discover the split renderer's export surface on its own.
    pub async fn surface(&self) -> Result<ExportSurface> {
        let root = self.workspace_root()?;
        let workspace = Workspace::open(&root, self.config.keep_workspace)?;
        let provider = surface_provider(
            &self.config,
            self.toolchain.runner.clone(),
            workspace.scripts_dir(),
        );
        let surface = provider.enumerate().await?;
        workspace.close()?;
        root.close()?;
        Ok(surface)
    }
}
