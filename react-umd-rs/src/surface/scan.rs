use super::{ExportSurface, SurfaceProvider};
use crate::config::RendererModule;
use crate::error::{ReactUmdError, Result};
use futures::future::BoxFuture;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

lazy_static! {
    static ref CJS_EXPORT_RE: Regex =
        Regex::new(r"(?m)(?:^|[^.\w$])(?:module\.)?exports\.([A-Za-z_$][\w$]*)\s*=[^=]").unwrap();
    static ref CJS_DEFINE_RE: Regex =
        Regex::new(r#"Object\.defineProperty\(\s*exports\s*,\s*['"]([A-Za-z_$][\w$]*)['"]"#)
            .unwrap();
    static ref ESM_DECL_RE: Regex = Regex::new(
        r"(?m)^\s*export\s+(?:async\s+)?(?:const|let|var|function\s*\*?|class)\s+([A-Za-z_$][\w$]*)"
    )
    .unwrap();
    static ref ESM_LIST_RE: Regex = Regex::new(r"(?m)^\s*export\s*\{([^}]*)\}").unwrap();
    static ref CJS_REEXPORT_RE: Regex =
        Regex::new(r#"module\.exports\s*=\s*require\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap();
}

/// Discovers the surface by scanning the installed legacy module's sources
/// instead of executing them.
///
/// Handles the shapes renderer packages ship: CommonJS `exports.NAME =`
/// assignments, `module.exports = require('./…')` indirection inside the
/// package, and plain ESM `export` declarations.
pub struct StaticSurfaceProvider {
    project_dir: PathBuf,
    renderer: RendererModule,
    primary: Vec<String>,
}

#[derive(Deserialize)]
struct PackageEntry {
    main: Option<String>,
}

impl StaticSurfaceProvider {
    pub fn new(
        project_dir: impl Into<PathBuf>,
        renderer: RendererModule,
        primary: Vec<String>,
    ) -> Self {
        Self {
            project_dir: project_dir.into(),
            renderer,
            primary,
        }
    }

    fn package_dir(&self) -> PathBuf {
        let mut dir = self.project_dir.join("node_modules");
        for segment in self.renderer.module.split('/') {
            dir.push(segment);
        }
        normalize(&dir)
    }

    fn entry_file(&self) -> Result<PathBuf> {
        let package_dir = self.package_dir();
        let manifest_path = package_dir.join("package.json");
        let text = fs::read_to_string(&manifest_path)
            .map_err(|err| ReactUmdError::fs(&manifest_path, err))?;
        let manifest: PackageEntry = serde_json::from_str(&text).map_err(|err| {
            ReactUmdError::Introspection(format!(
                "unparsable manifest {}: {}",
                manifest_path.display(),
                err
            ))
        })?;
        let main = manifest.main.unwrap_or_else(|| "index.js".to_string());
        Ok(with_js_extension(package_dir.join(main)))
    }

    fn scan(&self) -> Result<Vec<String>> {
        let package_dir = self.package_dir();
        let mut pending = vec![self.entry_file()?];
        let mut visited = HashSet::new();
        let mut names = Vec::new();

        while let Some(file) = pending.pop() {
            if !visited.insert(file.clone()) {
                continue;
            }
            let source = fs::read_to_string(&file).map_err(|err| ReactUmdError::fs(&file, err))?;
            debug!("Scanning {} for exports", file.display());
            names.extend(scan_exports(&source));

            let base = file.parent().unwrap_or(&package_dir);
            // Reverse so the first re-export in the file is scanned first
            let mut targets: Vec<PathBuf> = reexport_targets(&source)
                .into_iter()
                .map(|target| with_js_extension(normalize(&base.join(target))))
                .filter(|target| target.starts_with(&package_dir))
                .collect();
            targets.reverse();
            pending.extend(targets);
        }

        Ok(names)
    }
}

impl SurfaceProvider for StaticSurfaceProvider {
    fn enumerate(&self) -> BoxFuture<'_, Result<ExportSurface>> {
        Box::pin(async move {
            info!("Scanning exports of {}", self.renderer.module);
            let names = self.scan()?;
            if names.is_empty() {
                return Err(ReactUmdError::Introspection(format!(
                    "no exports found in {}",
                    self.renderer.module
                )));
            }
            let surface = ExportSurface::partition(names, &self.primary);
            surface.validate()?;
            Ok(surface)
        })
    }
}

/// Export names declared in one source file, in order of appearance.
fn scan_exports(source: &str) -> Vec<String> {
    let mut found: Vec<(usize, String)> = Vec::new();

    for re in [&*CJS_EXPORT_RE, &*CJS_DEFINE_RE, &*ESM_DECL_RE] {
        for caps in re.captures_iter(source) {
            if let Some(name) = caps.get(1) {
                found.push((name.start(), name.as_str().to_string()));
            }
        }
    }

    for caps in ESM_LIST_RE.captures_iter(source) {
        if let Some(list) = caps.get(1) {
            for specifier in list.as_str().split(',') {
                let exported = specifier.rsplit(" as ").next().unwrap_or(specifier).trim();
                if !exported.is_empty() {
                    found.push((list.start(), exported.to_string()));
                }
            }
        }
    }

    found.sort_by_key(|(position, _)| *position);
    found
        .into_iter()
        .map(|(_, name)| name)
        .filter(|name| name != "__esModule")
        .collect()
}

/// Relative `module.exports = require(...)` targets.
fn reexport_targets(source: &str) -> Vec<String> {
    CJS_REEXPORT_RE
        .captures_iter(source)
        .filter_map(|caps| caps.get(1))
        .map(|target| target.as_str().to_string())
        .filter(|target| target.starts_with("./") || target.starts_with("../"))
        .collect()
}

/// Resolve `.` and `..` lexically. Leading `..` of a relative path is kept.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

fn with_js_extension(path: PathBuf) -> PathBuf {
    if path.extension().is_some() {
        path
    } else {
        path.with_extension("js")
    }
}
