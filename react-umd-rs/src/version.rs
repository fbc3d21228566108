use crate::error::{ReactUmdError, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Semantic version of the installed library, read once per run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LibraryVersion(semver::Version);

impl LibraryVersion {
    pub fn parse(version: &str) -> Result<Self> {
        semver::Version::parse(version.trim())
            .map(Self)
            .map_err(|err| ReactUmdError::version_parse(version, err))
    }

    pub fn as_semver(&self) -> &semver::Version {
        &self.0
    }
}

impl fmt::Display for LibraryVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Whether the renderer exports are spread across two physical modules.
pub fn uses_split_surface(version: &LibraryVersion, threshold: &LibraryVersion) -> bool {
    version >= threshold
}

#[derive(Deserialize)]
struct PackageManifest {
    version: Option<String>,
}

pub fn package_json_path(project_dir: &Path, module: &str) -> PathBuf {
    let mut path = project_dir.join("node_modules");
    for segment in module.split('/') {
        path.push(segment);
    }
    path.join("package.json")
}

/// Read the `version` field of an installed package's `package.json`.
pub fn read_installed_version(project_dir: &Path, module: &str) -> Result<String> {
    let manifest_path = package_json_path(project_dir, module);
    let text = std::fs::read_to_string(&manifest_path)
        .map_err(|err| ReactUmdError::fs(&manifest_path, err))?;
    let manifest: PackageManifest = serde_json::from_str(&text).map_err(|err| {
        ReactUmdError::version_parse(
            "<unreadable>",
            format!("{}: {}", manifest_path.display(), err),
        )
    })?;
    manifest.version.ok_or_else(|| {
        ReactUmdError::version_parse(
            "<missing>",
            format!("{} has no version field", manifest_path.display()),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("16.14.0", false)]
    #[case("18.2.0", false)]
    #[case("18.3.1", false)]
    #[case("19.0.0-rc.1", false)]
    #[case("19.0.0", true)]
    #[case("19.1.0", true)]
    #[case("20.0.0-beta.2", true)]
    fn test_split_surface_threshold(#[case] version: &str, #[case] expected: bool) {
        let threshold = LibraryVersion::parse("19.0.0").unwrap();
        let version = LibraryVersion::parse(version).unwrap();
        assert_eq!(uses_split_surface(&version, &threshold), expected);
        // Same answer every time for the same triple
        assert_eq!(uses_split_surface(&version, &threshold), expected);
    }

    #[rstest]
    #[case("")]
    #[case("19")]
    #[case("19.1")]
    #[case("v19.1.0")]
    #[case("latest")]
    fn test_parse_rejects_invalid(#[case] version: &str) {
        let err = LibraryVersion::parse(version).unwrap_err();
        assert!(matches!(err, ReactUmdError::VersionParse { .. }));
    }

    #[test]
    fn test_read_installed_version() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = package_json_path(dir.path(), "react");
        std::fs::create_dir_all(manifest.parent().unwrap()).unwrap();
        std::fs::write(&manifest, r#"{"name": "react", "version": "18.2.0"}"#).unwrap();

        assert_eq!(read_installed_version(dir.path(), "react").unwrap(), "18.2.0");
    }

    #[test]
    fn test_read_installed_version_scoped_package() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = package_json_path(dir.path(), "@scope/lib");
        assert!(manifest.ends_with("node_modules/@scope/lib/package.json"));
        std::fs::create_dir_all(manifest.parent().unwrap()).unwrap();
        std::fs::write(&manifest, r#"{"version": "1.0.0"}"#).unwrap();

        assert_eq!(
            read_installed_version(dir.path(), "@scope/lib").unwrap(),
            "1.0.0"
        );
    }

    #[test]
    fn test_read_installed_version_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_installed_version(dir.path(), "react").unwrap_err();
        assert!(matches!(err, ReactUmdError::FileSystem { .. }));

        let manifest = package_json_path(dir.path(), "react");
        std::fs::create_dir_all(manifest.parent().unwrap()).unwrap();
        std::fs::write(&manifest, r#"{"name": "react"}"#).unwrap();
        let err = read_installed_version(dir.path(), "react").unwrap_err();
        assert!(matches!(err, ReactUmdError::VersionParse { .. }));
    }
}
