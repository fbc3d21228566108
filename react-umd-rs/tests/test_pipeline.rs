use futures::future::BoxFuture;
use react_umd_rs::bundler::{Bundler, RawBundle};
use react_umd_rs::config::KeepWorkspace;
use react_umd_rs::minify::Minifier;
use react_umd_rs::runner::{ScriptInvocation, ScriptOutput, ScriptRunner};
use react_umd_rs::strategy::StrategyKind;
use react_umd_rs::target::{ArtifactId, BuildTarget, EntryPoint, ExternalBinding};
use react_umd_rs::workspace::{Workspace, DIST_DIR_NAME, SCRIPTS_DIR_NAME};
use react_umd_rs::{BuildMode, ReactUmdError, Result, Toolchain, VendorConfig, VendorPipeline};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const CORE_BODY: &str = "var ReactCoreInternals = { version: 'inlined-core' };";

/// node stand-in that only knows how to answer the introspection script.
struct FakeNode {
    project_dir: PathBuf,
    exit_code: i32,
    scripts: Mutex<Vec<PathBuf>>,
}

impl ScriptRunner for FakeNode {
    fn run(&self, invocation: ScriptInvocation) -> BoxFuture<'_, Result<ScriptOutput>> {
        Box::pin(async move {
            assert!(invocation.script.exists(), "script written before it runs");
            self.scripts.lock().unwrap().push(invocation.script.clone());
            Ok(ScriptOutput {
                code: Some(self.exit_code),
                stdout: if self.exit_code == 0 {
                    r#"{"primary":["createRoot","hydrateRoot"],"shared":["createPortal","flushSync","render","unmountComponentAtNode","version"],"missing":[]}"#.to_string()
                } else {
                    String::new()
                },
                stderr: if self.exit_code == 0 {
                    String::new()
                } else {
                    "Error [ERR_MODULE_NOT_FOUND]: Cannot find package 'react-dom'".to_string()
                },
            })
        })
    }

    fn project_dir(&self) -> &Path {
        &self.project_dir
    }
}

/// Writes a UMD-shaped bundle per target. Renderer bundles refer to the
/// core only through its external global; core bundles carry the core body.
struct FakeBundler {
    targets: Arc<Mutex<Vec<BuildTarget>>>,
    entries: Arc<Mutex<Vec<String>>>,
    fail_on: Option<&'static str>,
}

impl Bundler for FakeBundler {
    fn bundle<'a>(
        &'a self,
        target: &'a BuildTarget,
        workspace: &'a Workspace,
    ) -> BoxFuture<'a, Result<RawBundle>> {
        Box::pin(async move {
            self.targets.lock().unwrap().push(target.clone());
            if self.fail_on == Some(target.output_filename.as_str()) {
                return Err(ReactUmdError::Compile {
                    filename: target.output_filename.clone(),
                    diagnostics: "ERROR in ./temp/react-dom-entry.js\nModule not found".to_string(),
                });
            }

            let body = match (&target.artifact, &target.entry) {
                (ArtifactId::Core, _) => CORE_BODY.to_string(),
                (ArtifactId::Renderer, EntryPoint::File(path)) => {
                    let entry = fs::read_to_string(path).unwrap();
                    self.entries.lock().unwrap().push(entry.clone());
                    entry
                }
                (ArtifactId::Renderer, EntryPoint::Module(module)) => {
                    format!("module.exports = require({:?});", module)
                }
            };
            let externals: Vec<String> = target
                .externals
                .values()
                .map(|binding| format!("root[{:?}]", binding.root))
                .collect();
            let contents = format!(
                "(function (root, factory) {{\n    root.{} = factory({});\n}})(this, function () {{\n    {}\n}});\n",
                target.library,
                externals.join(", "),
                body
            );

            let path = workspace.dist_dir().join(&target.output_filename);
            fs::write(&path, contents).unwrap();
            Ok(RawBundle {
                target: target.clone(),
                path,
            })
        })
    }
}

struct SqueezeMinifier;

impl Minifier for SqueezeMinifier {
    fn minify<'a>(
        &'a self,
        _filename: &'a str,
        source: &'a str,
        _workspace: &'a Workspace,
    ) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move { Ok(source.split_whitespace().collect::<Vec<_>>().join(" ")) })
    }
}

struct Fixture {
    project: TempDir,
    scratch: TempDir,
    runner: Arc<FakeNode>,
    targets: Arc<Mutex<Vec<BuildTarget>>>,
    entries: Arc<Mutex<Vec<String>>>,
}

impl Fixture {
    fn new(react_version: &str, introspection_exit_code: i32) -> Self {
        let project = tempfile::tempdir().unwrap();
        let manifest = project.path().join("node_modules/react/package.json");
        fs::create_dir_all(manifest.parent().unwrap()).unwrap();
        fs::write(
            &manifest,
            format!(r#"{{"name": "react", "version": "{}"}}"#, react_version),
        )
        .unwrap();

        let runner = Arc::new(FakeNode {
            project_dir: project.path().to_path_buf(),
            exit_code: introspection_exit_code,
            scripts: Mutex::new(Vec::new()),
        });
        Self {
            project,
            scratch: tempfile::tempdir().unwrap(),
            runner,
            targets: Arc::new(Mutex::new(Vec::new())),
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn output_dir(&self) -> PathBuf {
        self.scratch.path().join("dist")
    }

    fn workspace_root(&self) -> PathBuf {
        self.scratch.path().join("work")
    }

    fn config(&self) -> VendorConfig {
        VendorConfig {
            project_dir: self.project.path().to_path_buf(),
            output_dir: self.output_dir(),
            workspace_root: Some(self.workspace_root()),
            ..Default::default()
        }
    }

    fn pipeline(&self, config: VendorConfig, fail_on: Option<&'static str>) -> VendorPipeline {
        let toolchain = Toolchain {
            runner: self.runner.clone(),
            bundler: Box::new(FakeBundler {
                targets: self.targets.clone(),
                entries: self.entries.clone(),
                fail_on,
            }),
            minifier: Box::new(SqueezeMinifier),
        };
        VendorPipeline::new(config, toolchain).unwrap()
    }

    fn output_files(&self) -> Vec<String> {
        match fs::read_dir(self.output_dir()) {
            Ok(entries) => {
                let mut names: Vec<String> = entries
                    .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
                    .collect();
                names.sort();
                names
            }
            Err(_) => Vec::new(),
        }
    }
}

#[tokio::test]
async fn test_split_surface_end_to_end() {
    let fixture = Fixture::new("19.1.0", 0);
    let report = fixture
        .pipeline(fixture.config(), None)
        .run()
        .await
        .unwrap();

    assert_eq!(report.version, "19.1.0");
    assert_eq!(report.strategy, StrategyKind::SynthesizedEntry);
    assert_eq!(
        fixture.output_files(),
        vec![
            "react-dom.development.js",
            "react-dom.production.min.js",
            "react.development.js",
            "react.production.min.js",
        ]
    );

    // The synthesized entry re-exports both modules under one surface
    let entries = fixture.entries.lock().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0], entries[1]);
    assert!(entries[0].contains("export const createRoot = $advanced.createRoot;"));
    assert!(entries[0].contains("export const hydrateRoot = $advanced.hydrateRoot;"));
    assert!(entries[0].contains("export const render = $legacy.render;"));
    assert!(entries[0].contains("export const version = $legacy.version;"));

    // Renderer builds bind the core through its global and never inline it
    let targets = fixture.targets.lock().unwrap();
    assert_eq!(targets.len(), 4);
    for target in targets.iter().filter(|t| t.artifact == ArtifactId::Renderer) {
        assert_eq!(target.externals["react"], ExternalBinding::global("React"));
    }
    for asset in &report.assets {
        let contents = fs::read_to_string(&asset.path).unwrap();
        assert!(contents.starts_with(&format!("/*! {} v19.1.0 */\n", asset.name)));
        if asset.artifact == ArtifactId::Renderer {
            assert!(contents.contains(r#"root["React"]"#));
            assert!(!contents.contains(CORE_BODY));
        }
    }

    // Workspace cleaned up on success
    assert!(!fixture.workspace_root().join(SCRIPTS_DIR_NAME).exists());
    assert!(!fixture.workspace_root().join(DIST_DIR_NAME).exists());
}

#[tokio::test]
async fn test_development_assets_match_bundler_output() {
    let fixture = Fixture::new("18.2.0", 0);
    let report = fixture
        .pipeline(fixture.config(), None)
        .run()
        .await
        .unwrap();

    for asset in &report.assets {
        let contents = fs::read_to_string(&asset.path).unwrap();
        let banner = format!("/*! {} v18.2.0 */\n", asset.name);
        let body = &contents[banner.len()..];
        match asset.mode {
            BuildMode::Development => {
                assert!(body.contains("\n    "), "development output keeps formatting");
            }
            BuildMode::Production => assert!(!body.contains('\n')),
        }
    }
}

#[tokio::test]
async fn test_direct_entry_below_threshold() {
    let fixture = Fixture::new("18.3.1", 0);
    let report = fixture
        .pipeline(fixture.config(), None)
        .run()
        .await
        .unwrap();

    assert_eq!(report.strategy, StrategyKind::DirectEntry);
    assert_eq!(report.assets.len(), 4);
    assert!(fixture.runner.scripts.lock().unwrap().is_empty());
    assert!(fixture.entries.lock().unwrap().is_empty());

    let targets = fixture.targets.lock().unwrap();
    let renderer_entries: Vec<&EntryPoint> = targets
        .iter()
        .filter(|t| t.artifact == ArtifactId::Renderer)
        .map(|t| &t.entry)
        .collect();
    assert_eq!(
        renderer_entries,
        vec![
            &EntryPoint::Module("react-dom".to_string()),
            &EntryPoint::Module("react-dom".to_string())
        ]
    );
}

#[tokio::test]
async fn test_introspection_failure_emits_nothing() {
    let fixture = Fixture::new("19.0.0", 1);
    let err = fixture
        .pipeline(fixture.config(), None)
        .run()
        .await
        .unwrap_err();

    match err {
        ReactUmdError::Introspection(message) => {
            assert!(message.contains("ERR_MODULE_NOT_FOUND"))
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(fixture.output_files().is_empty());
    assert!(fixture.targets.lock().unwrap().is_empty());
    // Cleaned up on the failure path as well
    assert!(!fixture.workspace_root().join(SCRIPTS_DIR_NAME).exists());
}

#[tokio::test]
async fn test_compile_failure_emits_nothing() {
    let fixture = Fixture::new("19.1.0", 0);
    let err = fixture
        .pipeline(fixture.config(), Some("react-dom.production.min.js"))
        .run()
        .await
        .unwrap_err();

    match err {
        ReactUmdError::Compile {
            filename,
            diagnostics,
        } => {
            assert_eq!(filename, "react-dom.production.min.js");
            assert!(diagnostics.contains("Module not found"));
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(fixture.output_files().is_empty());
    // The development renderer build never started
    assert_eq!(fixture.targets.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_failed_run_keeps_workspace_when_asked() {
    let fixture = Fixture::new("19.1.0", 0);
    let config = VendorConfig {
        keep_workspace: KeepWorkspace::OnFailure,
        ..fixture.config()
    };
    fixture
        .pipeline(config, Some("react.development.js"))
        .run()
        .await
        .unwrap_err();

    let scripts_dir = fixture.workspace_root().join(SCRIPTS_DIR_NAME);
    assert!(scripts_dir.join("react-dom-entry.js").exists());
    assert!(fixture
        .workspace_root()
        .join(DIST_DIR_NAME)
        .join("react.production.min.js")
        .exists());
}

#[tokio::test]
async fn test_invalid_version_aborts_before_any_build() {
    let fixture = Fixture::new("nineteen", 0);
    let err = fixture
        .pipeline(fixture.config(), None)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, ReactUmdError::VersionParse { .. }));
    assert!(fixture.targets.lock().unwrap().is_empty());
    assert!(!fixture.workspace_root().exists());
}

#[test]
fn test_plan_lists_targets_without_building() {
    let fixture = Fixture::new("19.1.0", 0);
    let plan = fixture.pipeline(fixture.config(), None).plan().unwrap();

    assert_eq!(plan.strategy, StrategyKind::SynthesizedEntry);
    assert_eq!(plan.targets.len(), 4);
    assert_eq!(
        plan.targets[2].entry,
        EntryPoint::File(PathBuf::from("temp/react-dom-entry.js"))
    );
    assert!(fixture.targets.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_surface_only() {
    let fixture = Fixture::new("19.1.0", 0);
    let surface = fixture
        .pipeline(fixture.config(), None)
        .surface()
        .await
        .unwrap();
    assert_eq!(surface.primary, vec!["createRoot", "hydrateRoot"]);
    assert_eq!(surface.shared.len(), 5);
    assert!(!fixture.workspace_root().join(SCRIPTS_DIR_NAME).exists());
}
