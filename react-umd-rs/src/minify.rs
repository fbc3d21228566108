use crate::error::{ReactUmdError, Result};
use crate::runner::{js_literal, require_anchor, write_script, ScriptInvocation, ScriptRunner};
use crate::workspace::Workspace;
use futures::future::BoxFuture;
use serde::Serialize;
use std::sync::Arc;

const DRIVER_SCRIPT_NAME: &str = "terser-driver.cjs";

/// Minifies stdin with the options in argv[2] using the project's terser.
const DRIVER_SCRIPT: &str = r#"'use strict';
const { createRequire } = require('node:module');

const [profile, anchor] = process.argv.slice(2);
const { minify } = createRequire(anchor)('terser');

const chunks = [];
process.stdin.on('data', (chunk) => chunks.push(chunk));
process.stdin.on('end', async () => {
    try {
        const result = await minify(Buffer.concat(chunks).toString('utf8'), JSON.parse(profile));
        process.stdout.write(result.code);
    } catch (err) {
        process.stderr.write(String((err && err.stack) || err));
        process.exit(1);
    }
});
"#;

/// Fixed terser profile for production artifacts: dead code and
/// console/debugger statements removed, a single pass, names kept as they
/// are, ASCII-only output without comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompressProfile {
    pub compress: Compress,
    pub mangle: bool,
    pub format: Format,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Compress {
    pub dead_code: bool,
    pub drop_console: bool,
    pub drop_debugger: bool,
    pub passes: u32,
    pub unused: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Format {
    pub comments: bool,
    pub ascii_only: bool,
}

impl Default for CompressProfile {
    fn default() -> Self {
        Self {
            compress: Compress {
                dead_code: true,
                drop_console: true,
                drop_debugger: true,
                passes: 1,
                unused: true,
            },
            mangle: false,
            format: Format {
                comments: false,
                ascii_only: true,
            },
        }
    }
}

pub trait Minifier: Send + Sync {
    /// Minify `source`. `filename` only labels errors.
    fn minify<'a>(
        &'a self,
        filename: &'a str,
        source: &'a str,
        workspace: &'a Workspace,
    ) -> BoxFuture<'a, Result<String>>;
}

pub struct TerserMinifier {
    runner: Arc<dyn ScriptRunner>,
    profile: CompressProfile,
}

impl TerserMinifier {
    pub fn new(runner: Arc<dyn ScriptRunner>) -> Self {
        Self {
            runner,
            profile: CompressProfile::default(),
        }
    }
}

impl Minifier for TerserMinifier {
    fn minify<'a>(
        &'a self,
        filename: &'a str,
        source: &'a str,
        workspace: &'a Workspace,
    ) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let driver = write_script(workspace.scripts_dir(), DRIVER_SCRIPT_NAME, DRIVER_SCRIPT)?;
            let invocation = ScriptInvocation::new(driver)
                .arg(js_literal(&self.profile)?)
                .arg(require_anchor(self.runner.project_dir()).to_string_lossy())
                .stdin(source);

            debug!("Minifying {} ({} bytes)", filename, source.len());
            let output = self.runner.run(invocation).await?;
            if !output.success() {
                return Err(ReactUmdError::Minification {
                    filename: filename.to_string(),
                    reason: format!(
                        "terser failed with {}\n{}",
                        output.describe_exit(),
                        output.stderr.trim()
                    ),
                });
            }
            if output.stdout.trim().is_empty() && !source.trim().is_empty() {
                return Err(ReactUmdError::Minification {
                    filename: filename.to_string(),
                    reason: "terser produced no output".to_string(),
                });
            }
            Ok(output.stdout)
        })
    }
}
