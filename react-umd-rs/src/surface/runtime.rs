use super::{ExportSurface, SurfaceProvider};
use crate::config::RendererModule;
use crate::error::{ReactUmdError, Result};
use crate::runner::{js_literal, require_anchor, write_script, ScriptInvocation, ScriptRunner};
use futures::future::BoxFuture;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;

const INTROSPECT_SCRIPT_NAME: &str = "introspect-exports.mjs";

/// Discovers the surface by importing both renderer modules in a separate
/// node process.
pub struct RuntimeSurfaceProvider {
    runner: Arc<dyn ScriptRunner>,
    scripts_dir: PathBuf,
    renderer: RendererModule,
    primary: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct IntrospectionReport {
    primary: Vec<String>,
    shared: Vec<String>,
    #[serde(default)]
    missing: Vec<String>,
}

impl RuntimeSurfaceProvider {
    pub fn new(
        runner: Arc<dyn ScriptRunner>,
        scripts_dir: impl Into<PathBuf>,
        renderer: RendererModule,
        primary: Vec<String>,
    ) -> Self {
        Self {
            runner,
            scripts_dir: scripts_dir.into(),
            renderer,
            primary,
        }
    }

    fn render_script(&self) -> Result<String> {
        Ok(format!(
            r#"import {{ createRequire }} from 'node:module';
import {{ pathToFileURL }} from 'node:url';

const require = createRequire({anchor});
const load = (id) => import(pathToFileURL(require.resolve(id)).href);

const legacy = await load({legacy});
const advanced = await load({advanced});

const primary = {primary};
const missing = primary.filter((name) => !(name in advanced));
const shared = Object.keys(legacy).filter(
    (name) => name !== 'default' && !primary.includes(name)
);

process.stdout.write(JSON.stringify({{ primary, shared, missing }}));
"#,
            anchor = js_literal(&require_anchor(self.runner.project_dir()))?,
            legacy = js_literal(&self.renderer.module)?,
            advanced = js_literal(&self.renderer.advanced_module)?,
            primary = js_literal(&self.primary)?,
        ))
    }

    fn parse_report(&self, stdout: &str) -> Result<ExportSurface> {
        let report: IntrospectionReport = serde_json::from_str(stdout.trim()).map_err(|err| {
            ReactUmdError::Introspection(format!(
                "unparsable output from introspection script: {}",
                err
            ))
        })?;

        if !report.missing.is_empty() {
            return Err(ReactUmdError::Introspection(format!(
                "{} does not export {}",
                self.renderer.advanced_module,
                report.missing.join(", ")
            )));
        }
        if report.primary != self.primary {
            return Err(ReactUmdError::Introspection(format!(
                "introspection reported primary exports {:?}, expected {:?}",
                report.primary, self.primary
            )));
        }

        let surface = ExportSurface {
            primary: report.primary,
            shared: report.shared,
        };
        surface.validate()?;
        Ok(surface)
    }
}

impl SurfaceProvider for RuntimeSurfaceProvider {
    fn enumerate(&self) -> BoxFuture<'_, Result<ExportSurface>> {
        Box::pin(async move {
            let script = write_script(
                &self.scripts_dir,
                INTROSPECT_SCRIPT_NAME,
                &self.render_script()?,
            )?;
            info!(
                "Introspecting exports of {} and {}",
                self.renderer.module, self.renderer.advanced_module
            );

            let output = self.runner.run(ScriptInvocation::new(script)).await?;
            if !output.success() {
                return Err(ReactUmdError::Introspection(format!(
                    "introspection script failed with {}\n{}",
                    output.describe_exit(),
                    output.stderr.trim()
                )));
            }

            let surface = self.parse_report(&output.stdout)?;
            debug!(
                "Found {} primary and {} shared exports",
                surface.primary.len(),
                surface.shared.len()
            );
            Ok(surface)
        })
    }
}
