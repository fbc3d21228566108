//! Turns raw bundler output into the artifacts that get published.
//!
//! Production bundles are minified, development bundles are kept byte for
//! byte, and every artifact is prefixed with a one-line version banner.
//! Nothing is written until all artifacts are finished.

use crate::bundler::RawBundle;
use crate::error::{ReactUmdError, Result};
use crate::minify::Minifier;
use crate::target::{ArtifactId, BuildMode};
use crate::workspace::Workspace;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// `/*! <filename> v<version> */` followed by a newline.
pub fn banner(filename: &str, version: &str) -> String {
    format!("/*! {} v{} */\n", filename, version)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub name: String,
    pub artifact: ArtifactId,
    pub mode: BuildMode,
    pub raw_content: String,
    pub final_content: String,
    pub banner: String,
}

/// An artifact after it was written to the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmittedAsset {
    pub name: String,
    pub artifact: ArtifactId,
    pub mode: BuildMode,
    pub path: PathBuf,
    pub bytes: usize,
}

pub struct AssetFinisher<'a> {
    minifier: &'a dyn Minifier,
    version: String,
}

impl<'a> AssetFinisher<'a> {
    pub fn new(minifier: &'a dyn Minifier, version: impl Into<String>) -> Self {
        Self {
            minifier,
            version: version.into(),
        }
    }

    pub async fn finish(
        &self,
        bundles: &[RawBundle],
        workspace: &Workspace,
    ) -> Result<Vec<Artifact>> {
        let mut artifacts = Vec::with_capacity(bundles.len());
        for bundle in bundles {
            artifacts.push(self.finish_one(bundle, workspace).await?);
        }
        Ok(artifacts)
    }

    async fn finish_one(&self, bundle: &RawBundle, workspace: &Workspace) -> Result<Artifact> {
        let name = bundle.target.output_filename.clone();
        let raw_content = tokio::fs::read_to_string(&bundle.path)
            .await
            .map_err(|err| ReactUmdError::fs(&bundle.path, err))?;

        let body = match bundle.target.mode {
            BuildMode::Production => {
                let minified = self.minifier.minify(&name, &raw_content, workspace).await?;
                info!(
                    "Minified {} from {} to {} bytes",
                    name,
                    raw_content.len(),
                    minified.len()
                );
                minified
            }
            BuildMode::Development => raw_content.clone(),
        };

        let banner = banner(&name, &self.version);
        let final_content = format!("{}{}", banner, body);
        Ok(Artifact {
            name,
            artifact: bundle.target.artifact,
            mode: bundle.target.mode,
            raw_content,
            final_content,
            banner,
        })
    }
}

/// Write every artifact into `output_dir`.
///
/// Contents go to temporary siblings first and are renamed into place only
/// once all of them were written. A failed write or rename removes every
/// staged and already renamed file, so a failed emit leaves no partial set.
pub fn emit(artifacts: &[Artifact], output_dir: &Path) -> Result<Vec<EmittedAsset>> {
    fs::create_dir_all(output_dir).map_err(|err| ReactUmdError::fs(output_dir, err))?;

    let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        let final_path = output_dir.join(&artifact.name);
        let staging_path = output_dir.join(format!(".{}.partial", artifact.name));
        if let Err(err) = fs::write(&staging_path, &artifact.final_content) {
            discard(&staged);
            let _ = fs::remove_file(&staging_path);
            return Err(ReactUmdError::fs(&staging_path, err));
        }
        staged.push((staging_path, final_path));
    }

    let mut emitted: Vec<EmittedAsset> = Vec::with_capacity(artifacts.len());
    for (index, (staging_path, final_path)) in staged.iter().enumerate() {
        if let Err(err) = fs::rename(staging_path, final_path) {
            unpublish(&emitted);
            discard(&staged[index..]);
            return Err(ReactUmdError::fs(final_path, err));
        }
        let artifact = &artifacts[index];
        info!("Emitted {}", final_path.display());
        emitted.push(EmittedAsset {
            name: artifact.name.clone(),
            artifact: artifact.artifact,
            mode: artifact.mode,
            path: final_path.clone(),
            bytes: artifact.final_content.len(),
        });
    }
    Ok(emitted)
}

fn unpublish(emitted: &[EmittedAsset]) {
    for asset in emitted {
        if let Err(err) = fs::remove_file(&asset.path) {
            warn!("Failed to remove {}: {}", asset.path.display(), err);
        }
    }
}

fn discard(staged: &[(PathBuf, PathBuf)]) {
    for (staging_path, _) in staged {
        if let Err(err) = fs::remove_file(staging_path) {
            warn!("Failed to remove {}: {}", staging_path.display(), err);
        }
    }
}
