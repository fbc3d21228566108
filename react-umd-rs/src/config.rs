use crate::error::{ReactUmdError, Result};
use crate::target::BuildMode;
use crate::version::LibraryVersion;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Version at which the renderer split `createRoot`/`hydrateRoot` out into
/// `react-dom/client`.
pub const DEFAULT_SPLIT_THRESHOLD: &str = "19.0.0";

/// The core library module and the global name its UMD build installs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryModule {
    pub module: String,
    pub global: String,
    pub file_stem: String,
}

impl Default for LibraryModule {
    fn default() -> Self {
        Self {
            module: "react".to_string(),
            global: "React".to_string(),
            file_stem: "react".to_string(),
        }
    }
}

/// The renderer module. `advanced_module` is where the renderer's advanced
/// API lives once the surface is split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererModule {
    pub module: String,
    pub advanced_module: String,
    pub global: String,
    pub file_stem: String,
}

impl Default for RendererModule {
    fn default() -> Self {
        Self {
            module: "react-dom".to_string(),
            advanced_module: "react-dom/client".to_string(),
            global: "ReactDOM".to_string(),
            file_stem: "react-dom".to_string(),
        }
    }
}

/// How the export surface of the split renderer is discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceSource {
    /// Load both modules in a separate node process and list their exports.
    #[default]
    Runtime,
    /// Scan the installed package sources without executing them.
    Static,
}

/// What happens to the workspace directories when a run ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeepWorkspace {
    #[default]
    Never,
    OnFailure,
    Always,
}

impl FromStr for KeepWorkspace {
    type Err = ReactUmdError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "never" => Self::Never,
            "on-failure" => Self::OnFailure,
            "always" => Self::Always,
            _ => {
                return Err(ReactUmdError::Config(format!(
                    "Unsupported keep-workspace value {}",
                    s
                )))
            }
        })
    }
}

impl fmt::Display for KeepWorkspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Never => "never",
            Self::OnFailure => "on-failure",
            Self::Always => "always",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VendorConfig {
    /// Directory whose `node_modules` holds the libraries and the build tools.
    pub project_dir: PathBuf,
    /// Directory the finished artifacts are written to.
    pub output_dir: PathBuf,
    /// Parent of the run's `temp` and `temp-dist` directories. A fresh
    /// temporary directory is used when unset.
    pub workspace_root: Option<PathBuf>,
    /// Node executable used for introspection, bundling and minification.
    pub node: String,
    pub core: LibraryModule,
    pub renderer: RendererModule,
    pub split_threshold: String,
    pub primary_exports: Vec<String>,
    pub surface_source: SurfaceSource,
    pub modes: Vec<BuildMode>,
    pub keep_workspace: KeepWorkspace,
}

impl Default for VendorConfig {
    fn default() -> Self {
        Self {
            project_dir: PathBuf::from("."),
            output_dir: PathBuf::from("dist"),
            workspace_root: None,
            node: "node".to_string(),
            core: LibraryModule::default(),
            renderer: RendererModule::default(),
            split_threshold: DEFAULT_SPLIT_THRESHOLD.to_string(),
            primary_exports: vec!["createRoot".to_string(), "hydrateRoot".to_string()],
            surface_source: SurfaceSource::default(),
            modes: vec![BuildMode::Production, BuildMode::Development],
            keep_workspace: KeepWorkspace::default(),
        }
    }
}

impl VendorConfig {
    /// Load a JSON config file. Fields that are absent keep their defaults.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|err| ReactUmdError::fs(path, err))?;
        let config: VendorConfig = serde_json::from_str(&text).map_err(|err| {
            ReactUmdError::Config(format!("Failed to parse {}: {}", path.display(), err))
        })?;
        Ok(config)
    }

    pub fn threshold(&self) -> Result<LibraryVersion> {
        LibraryVersion::parse(&self.split_threshold)
    }

    pub fn validate(&self) -> Result<()> {
        self.threshold()?;
        if self.modes.is_empty() {
            return Err(ReactUmdError::Config(
                "At least one build mode is required".to_string(),
            ));
        }
        if self.core.global == self.renderer.global {
            return Err(ReactUmdError::Config(format!(
                "Core and renderer cannot share the global name {}",
                self.core.global
            )));
        }
        if self.core.file_stem == self.renderer.file_stem {
            return Err(ReactUmdError::Config(format!(
                "Core and renderer cannot share the file stem {}",
                self.core.file_stem
            )));
        }
        Ok(())
    }

    /// Build modes in canonical order (production first) without duplicates.
    pub fn ordered_modes(&self) -> Vec<BuildMode> {
        [BuildMode::Production, BuildMode::Development]
            .into_iter()
            .filter(|mode| self.modes.contains(mode))
            .collect()
    }
}
