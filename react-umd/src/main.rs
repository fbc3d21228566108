use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use react_umd_rs::config::{KeepWorkspace, SurfaceSource};
use react_umd_rs::strategy::{strategy_kind, StrategyKind};
use react_umd_rs::{BuildMode, Toolchain, VendorConfig, VendorPipeline};
use std::path::PathBuf;

#[macro_use]
extern crate log;

/// react-umd: Build vendored UMD bundles of React and ReactDOM from an installed node_modules tree
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log pipeline details (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args, Debug)]
struct ProjectArgs {
    /// Directory containing node_modules with react and react-dom installed
    #[arg(short, long)]
    project_dir: Option<String>,

    /// JSON config file. Flags override its fields
    #[arg(short, long)]
    config: Option<String>,

    /// node executable
    #[arg(long)]
    node: Option<String>,

    /// Discover renderer exports by scanning package sources instead of importing them
    #[arg(long)]
    static_surface: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build, minify and write the UMD bundles
    Build {
        #[command(flatten)]
        project: ProjectArgs,

        /// Directory the bundles are written to
        #[arg(short, long)]
        output_dir: Option<String>,

        /// Directory for intermediate files. A fresh temporary directory by default
        #[arg(long)]
        workspace_root: Option<String>,

        /// Build mode to produce. May be repeated. Defaults to production and development
        #[arg(short, long)]
        mode: Vec<BuildMode>,

        /// Keep intermediate files: never, on-failure or always
        #[arg(long)]
        keep_workspace: Option<KeepWorkspace>,
    },
    /// Print the planned build targets as JSON without building anything
    Plan {
        #[command(flatten)]
        project: ProjectArgs,
    },
    /// Print the export surface of the split renderer as JSON
    Surface {
        #[command(flatten)]
        project: ProjectArgs,

        /// Directory for intermediate files. A fresh temporary directory by default
        #[arg(long)]
        workspace_root: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match cli.command {
        Commands::Build {
            project,
            output_dir,
            workspace_root,
            mode,
            keep_workspace,
        } => {
            let mut config = load_config(&project)?;
            if let Some(output_dir) = output_dir {
                config.output_dir = normalize_path(&output_dir)?;
            }
            if let Some(workspace_root) = workspace_root {
                config.workspace_root = Some(normalize_path(&workspace_root)?);
            }
            if !mode.is_empty() {
                config.modes = mode;
            }
            if let Some(keep_workspace) = keep_workspace {
                config.keep_workspace = keep_workspace;
            }

            let report = pipeline(config)?
                .run()
                .await
                .context("Failed to vendor React UMD bundles")?;
            for asset in &report.assets {
                println!("{} ({} bytes)", asset.path.display(), asset.bytes);
            }
            info!(
                "Vendored {} bundles of v{} using the {} strategy",
                report.assets.len(),
                report.version,
                report.strategy
            );
        }
        Commands::Plan { project } => {
            let plan = pipeline(load_config(&project)?)?
                .plan()
                .context("Failed to plan build targets")?;
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        Commands::Surface {
            project,
            workspace_root,
        } => {
            let mut config = load_config(&project)?;
            if let Some(workspace_root) = workspace_root {
                config.workspace_root = Some(normalize_path(&workspace_root)?);
            }
            let pipeline = pipeline(config)?;
            let version = pipeline.installed_version()?;
            if strategy_kind(&version, pipeline.config())? == StrategyKind::DirectEntry {
                bail!(
                    "{} v{} exposes its whole API from {}; there is no split surface to introspect",
                    pipeline.config().core.module,
                    version,
                    pipeline.config().renderer.module
                );
            }
            let surface = pipeline
                .surface()
                .await
                .context("Failed to introspect renderer exports")?;
            println!("{}", serde_json::to_string_pretty(&surface)?);
        }
    }
    Ok(())
}

fn load_config(project: &ProjectArgs) -> Result<VendorConfig, anyhow::Error> {
    let mut config = match &project.config {
        Some(path) => VendorConfig::from_path(&normalize_path(path)?)?,
        None => VendorConfig::default(),
    };
    if let Some(project_dir) = &project.project_dir {
        config.project_dir = normalize_path(project_dir)?;
    }
    if let Some(node) = &project.node {
        config.node = node.clone();
    }
    if project.static_surface {
        config.surface_source = SurfaceSource::Static;
    }
    Ok(config)
}

fn pipeline(config: VendorConfig) -> Result<VendorPipeline, anyhow::Error> {
    let toolchain = Toolchain::node(&config).with_context(|| {
        format!(
            "Failed to set up node toolchain in {}",
            config.project_dir.display()
        )
    })?;
    Ok(VendorPipeline::new(config, toolchain)?)
}

fn normalize_path(path: &str) -> Result<PathBuf, anyhow::Error> {
    let expanded = shellexpand::full(path).with_context(|| format!("Invalid path {}", path))?;
    Ok(PathBuf::from(expanded.as_ref()))
}
