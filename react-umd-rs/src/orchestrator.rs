use crate::bundler::{Bundler, RawBundle};
use crate::error::Result;
use crate::target::BuildTarget;
use crate::workspace::Workspace;

/// Runs the planned bundler invocations one after another.
///
/// Targets are built strictly in order and never overlap: the finisher reads
/// their output from the shared dist directory, and the renderer builds rely
/// on the global the core build defines. The first failure stops the run.
pub struct BuildOrchestrator<'a> {
    bundler: &'a dyn Bundler,
}

impl<'a> BuildOrchestrator<'a> {
    pub fn new(bundler: &'a dyn Bundler) -> Self {
        Self { bundler }
    }

    pub async fn run(
        &self,
        targets: &[BuildTarget],
        workspace: &Workspace,
    ) -> Result<Vec<RawBundle>> {
        let mut bundles = Vec::with_capacity(targets.len());
        for (index, target) in targets.iter().enumerate() {
            info!(
                "Building {} ({}/{})",
                target.output_filename,
                index + 1,
                targets.len()
            );
            let bundle = self.bundler.bundle(target, workspace).await?;
            debug!("Bundled {}", bundle.path.display());
            bundles.push(bundle);
        }
        Ok(bundles)
    }
}
