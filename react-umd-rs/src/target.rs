use crate::config::VendorConfig;
use crate::error::ReactUmdError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactId {
    Core,
    Renderer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    Production,
    Development,
}

impl BuildMode {
    pub fn minimize(self) -> bool {
        matches!(self, BuildMode::Production)
    }

    pub fn node_env(self) -> &'static str {
        match self {
            BuildMode::Production => "production",
            BuildMode::Development => "development",
        }
    }

    /// Output file name suffix, e.g. `production.min.js`.
    pub fn suffix(self) -> &'static str {
        match self {
            BuildMode::Production => "production.min.js",
            BuildMode::Development => "development.js",
        }
    }

    pub fn output_filename(self, file_stem: &str) -> String {
        format!("{}.{}", file_stem, self.suffix())
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.node_env())
    }
}

impl FromStr for BuildMode {
    type Err = ReactUmdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            _ => {
                return Err(ReactUmdError::Config(format!(
                    "Unsupported build mode {}",
                    s
                )))
            }
        })
    }
}

/// Where a bundle starts: an installed package or a generated file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryPoint {
    Module(String),
    File(PathBuf),
}

impl EntryPoint {
    pub fn as_request(&self) -> String {
        match self {
            EntryPoint::Module(module) => module.clone(),
            EntryPoint::File(path) => path.to_string_lossy().into_owned(),
        }
    }
}

/// Runtime binding of an external module under each UMD loading convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalBinding {
    pub root: String,
    pub commonjs: String,
    pub commonjs2: String,
    pub amd: String,
}

impl ExternalBinding {
    /// The same global name under the global-variable, both CommonJS and
    /// AMD conventions.
    pub fn global(name: &str) -> Self {
        Self {
            root: name.to_string(),
            commonjs: name.to_string(),
            commonjs2: name.to_string(),
            amd: name.to_string(),
        }
    }
}

/// One bundler invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildTarget {
    pub artifact: ArtifactId,
    pub mode: BuildMode,
    pub entry: EntryPoint,
    pub externals: BTreeMap<String, ExternalBinding>,
    pub output_filename: String,
    /// Global the UMD wrapper installs the bundle under.
    pub library: String,
}

impl BuildTarget {
    pub fn core(config: &VendorConfig, mode: BuildMode) -> Self {
        Self {
            artifact: ArtifactId::Core,
            mode,
            entry: EntryPoint::Module(config.core.module.clone()),
            externals: BTreeMap::new(),
            output_filename: mode.output_filename(&config.core.file_stem),
            library: config.core.global.clone(),
        }
    }

    pub fn renderer(config: &VendorConfig, mode: BuildMode, entry: EntryPoint) -> Self {
        let mut externals = BTreeMap::new();
        externals.insert(
            config.core.module.clone(),
            ExternalBinding::global(&config.core.global),
        );
        Self {
            artifact: ArtifactId::Renderer,
            mode,
            entry,
            externals,
            output_filename: mode.output_filename(&config.renderer.file_stem),
            library: config.renderer.global.clone(),
        }
    }
}

/// All targets of a run: core before renderer so the global the renderer
/// refers to is always built first, and production before development.
pub fn plan_targets(config: &VendorConfig, renderer_entry: &EntryPoint) -> Vec<BuildTarget> {
    let modes = config.ordered_modes();
    let core = modes.iter().map(|mode| BuildTarget::core(config, *mode));
    let renderer = modes
        .iter()
        .map(|mode| BuildTarget::renderer(config, *mode, renderer_entry.clone()));
    core.chain(renderer).collect()
}
