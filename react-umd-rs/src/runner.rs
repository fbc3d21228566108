//! Isolated script execution.
//!
//! Everything that has to load JavaScript (export introspection, webpack,
//! terser) runs in a separate `node` process so that none of it touches the
//! orchestrating process. Scripts are written into the run's workspace and
//! resolve packages from the project's `node_modules` through `createRequire`.

use crate::error::{ReactUmdError, Result};
use futures::future::BoxFuture;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// A script to run, its arguments, and optional standard input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptInvocation {
    pub script: PathBuf,
    pub args: Vec<String>,
    pub stdin: Option<String>,
}

impl ScriptInvocation {
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
            args: Vec::new(),
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }
}

/// Captured result of a finished script.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptOutput {
    /// Exit code, `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ScriptOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn describe_exit(&self) -> String {
        match self.code {
            Some(code) => format!("exit code {}", code),
            None => "termination by signal".to_string(),
        }
    }
}

/// Runs a script in an isolated execution context and waits for it to exit.
pub trait ScriptRunner: Send + Sync {
    fn run(&self, invocation: ScriptInvocation) -> BoxFuture<'_, Result<ScriptOutput>>;

    /// Project directory the scripts resolve packages from.
    fn project_dir(&self) -> &Path;
}

#[derive(Debug, Clone)]
pub struct NodeRunner {
    node: String,
    project_dir: PathBuf,
}

impl NodeRunner {
    pub fn new(node: impl Into<String>, project_dir: &Path) -> Result<Self> {
        let project_dir =
            fs::canonicalize(project_dir).map_err(|err| ReactUmdError::fs(project_dir, err))?;
        Ok(Self {
            node: node.into(),
            project_dir,
        })
    }
}

impl ScriptRunner for NodeRunner {
    fn run(&self, invocation: ScriptInvocation) -> BoxFuture<'_, Result<ScriptOutput>> {
        Box::pin(async move {
            debug!(
                "Running {} {} {}",
                self.node,
                invocation.script.display(),
                invocation.args.join(" ")
            );

            let mut command = Command::new(&self.node);
            command
                .arg(&invocation.script)
                .args(&invocation.args)
                .current_dir(&self.project_dir)
                .stdin(if invocation.stdin.is_some() {
                    Stdio::piped()
                } else {
                    Stdio::null()
                })
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());

            let mut child = command
                .spawn()
                .map_err(|err| ReactUmdError::fs(&self.node, err))?;

            // stdin is written while stdout and stderr are drained
            let writer = match (invocation.stdin, child.stdin.take()) {
                (Some(input), Some(mut stdin)) => Some(tokio::spawn(async move {
                    stdin.write_all(input.as_bytes()).await?;
                    stdin.shutdown().await
                })),
                _ => None,
            };

            let output = child
                .wait_with_output()
                .await
                .map_err(|err| ReactUmdError::fs(&invocation.script, err))?;

            if let Some(writer) = writer {
                match writer.await {
                    Ok(Ok(())) => {}
                    // Child exited before reading all of stdin
                    Ok(Err(err)) => debug!("Writing stdin failed: {}", err),
                    Err(err) => debug!("Stdin writer task failed: {}", err),
                }
            }

            Ok(ScriptOutput {
                code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        })
    }

    fn project_dir(&self) -> &Path {
        &self.project_dir
    }
}

/// Write a generated script into the workspace and return its path.
pub fn write_script(dir: &Path, name: &str, source: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, source).map_err(|err| ReactUmdError::fs(&path, err))?;
    Ok(path)
}

/// Path handed to node's `createRequire` so generated scripts resolve
/// packages from the project rather than from the workspace.
pub fn require_anchor(project_dir: &Path) -> PathBuf {
    project_dir.join("package.json")
}

/// Render a value as a JavaScript literal.
pub fn js_literal<T: serde::Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|err| ReactUmdError::Config(format!("Failed to serialize script input: {}", err)))
}
