use super::{Bundler, RawBundle};
use crate::error::{ReactUmdError, Result};
use crate::runner::{require_anchor, write_script, ScriptInvocation, ScriptRunner};
use crate::target::{BuildMode, BuildTarget, ExternalBinding};
use crate::workspace::Workspace;
use futures::future::BoxFuture;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DRIVER_SCRIPT_NAME: &str = "webpack-driver.cjs";

/// Runs webpack with the JSON options in argv[2], resolving webpack, the
/// loader and the presets from the project named by argv[3]. Options that
/// JSON cannot carry (regexes, plugins) are rebuilt here.
const DRIVER_SCRIPT: &str = r#"'use strict';
const fs = require('node:fs');
const { createRequire } = require('node:module');

const [configPath, anchor] = process.argv.slice(2);
const projectRequire = createRequire(anchor);
const webpack = projectRequire('webpack');

const { define, module: moduleOptions, ...options } = JSON.parse(
    fs.readFileSync(configPath, 'utf8')
);

const config = {
    ...options,
    module: {
        rules: moduleOptions.rules.map((rule) => ({
            test: new RegExp(rule.test),
            exclude: new RegExp(rule.exclude),
            use: {
                loader: projectRequire.resolve(rule.loader),
                options: {
                    presets: rule.presets.map((preset) => projectRequire.resolve(preset)),
                },
            },
        })),
    },
    plugins: [new webpack.DefinePlugin(define)],
};

webpack(config, (err, stats) => {
    if (err) {
        process.stderr.write(String((err && err.stack) || err));
        process.exit(1);
    }
    if (stats.hasErrors()) {
        process.stderr.write(stats.toString({ all: false, errors: true, errorDetails: true }));
        process.exit(2);
    }
    process.stdout.write(JSON.stringify({ warnings: stats.toJson({ all: false, warnings: true }).warnings.length }));
});
"#;

/// The webpack options used for one target, in webpack's own shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebpackConfig {
    pub mode: BuildMode,
    pub entry: String,
    pub context: PathBuf,
    /// `false` keeps development bundles free of `eval` source-map wrappers.
    pub devtool: bool,
    pub optimization: Optimization,
    pub resolve: Resolve,
    pub resolve_loader: ResolveLoader,
    pub module: ModuleRules,
    pub externals: BTreeMap<String, ExternalBinding>,
    pub output: Output,
    /// Turned into a `DefinePlugin` by the driver.
    pub define: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Optimization {
    pub minimize: bool,
    pub used_exports: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolve {
    pub extensions: Vec<String>,
    pub modules: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolveLoader {
    pub modules: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleRules {
    pub rules: Vec<TransformRule>,
}

/// JSX to standard JavaScript for sources outside `node_modules`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransformRule {
    pub test: String,
    pub exclude: String,
    pub loader: String,
    pub presets: Vec<String>,
}

impl Default for TransformRule {
    fn default() -> Self {
        Self {
            test: r"\.jsx?$".to_string(),
            exclude: "node_modules".to_string(),
            loader: "babel-loader".to_string(),
            presets: vec!["@babel/preset-react".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Output {
    pub path: PathBuf,
    pub filename: String,
    pub library: Library,
    pub global_object: String,
    pub iife: bool,
    pub environment: Environment,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Library {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub arrow_function: bool,
    #[serde(rename = "const")]
    pub const_: bool,
}

impl WebpackConfig {
    pub fn for_target(target: &BuildTarget, project_dir: &Path, out_dir: &Path) -> Self {
        let node_modules = project_dir.join("node_modules").to_string_lossy().into_owned();
        let module_dirs = vec![node_modules, "node_modules".to_string()];

        let mut define = BTreeMap::new();
        define.insert(
            "process.env.NODE_ENV".to_string(),
            format!("\"{}\"", target.mode.node_env()),
        );

        Self {
            mode: target.mode,
            entry: target.entry.as_request(),
            context: project_dir.to_path_buf(),
            devtool: false,
            optimization: Optimization {
                minimize: target.mode.minimize(),
                used_exports: true,
            },
            resolve: Resolve {
                extensions: vec![".js".to_string(), ".jsx".to_string()],
                modules: module_dirs.clone(),
            },
            resolve_loader: ResolveLoader {
                modules: module_dirs,
            },
            module: ModuleRules {
                rules: vec![TransformRule::default()],
            },
            externals: target.externals.clone(),
            output: Output {
                path: out_dir.to_path_buf(),
                filename: target.output_filename.clone(),
                library: Library {
                    name: target.library.clone(),
                    kind: "umd".to_string(),
                },
                global_object: "this".to_string(),
                iife: true,
                environment: Environment {
                    arrow_function: true,
                    const_: true,
                },
            },
            define,
        }
    }
}

/// Drives webpack in a node process, one target at a time.
pub struct WebpackBundler {
    runner: Arc<dyn ScriptRunner>,
}

impl WebpackBundler {
    pub fn new(runner: Arc<dyn ScriptRunner>) -> Self {
        Self { runner }
    }
}

impl Bundler for WebpackBundler {
    fn bundle<'a>(
        &'a self,
        target: &'a BuildTarget,
        workspace: &'a Workspace,
    ) -> BoxFuture<'a, Result<RawBundle>> {
        Box::pin(async move {
            let project_dir = self.runner.project_dir();
            let config = WebpackConfig::for_target(target, project_dir, workspace.dist_dir());
            let config_json = serde_json::to_string_pretty(&config).map_err(|err| {
                ReactUmdError::Config(format!("Failed to serialize webpack config: {}", err))
            })?;

            let config_path = write_script(
                workspace.scripts_dir(),
                &format!("webpack.{}.json", target.output_filename),
                &config_json,
            )?;
            let driver = write_script(workspace.scripts_dir(), DRIVER_SCRIPT_NAME, DRIVER_SCRIPT)?;

            let invocation = ScriptInvocation::new(driver)
                .arg(config_path.to_string_lossy())
                .arg(require_anchor(project_dir).to_string_lossy());
            let output = self.runner.run(invocation).await?;

            if !output.success() {
                let diagnostics = if output.stderr.trim().is_empty() {
                    format!("webpack driver failed with {}", output.describe_exit())
                } else {
                    output.stderr.trim().to_string()
                };
                return Err(ReactUmdError::Compile {
                    filename: target.output_filename.clone(),
                    diagnostics,
                });
            }

            let path = workspace.dist_dir().join(&target.output_filename);
            if !path.is_file() {
                return Err(ReactUmdError::fs(
                    &path,
                    std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "webpack reported success but wrote no bundle",
                    ),
                ));
            }

            Ok(RawBundle {
                target: target.clone(),
                path,
            })
        })
    }
}
