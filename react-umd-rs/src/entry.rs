//! Synthesized entry module for a split renderer.
//!
//! The generated module imports both renderer modules as namespaces and
//! re-exports every surface name from the module that owns it, so the
//! bundler sees a single entry point with the complete legacy API.

use crate::config::RendererModule;
use crate::error::{ReactUmdError, Result};
use crate::runner::js_literal;
use crate::surface::ExportSurface;
use regex::Regex;
use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};

const LEGACY_BINDING: &str = "$legacy";
const ADVANCED_BINDING: &str = "$advanced";

const RESERVED_WORDS: &[&str] = &[
    "await",
    "break",
    "case",
    "catch",
    "class",
    "const",
    "continue",
    "debugger",
    "default",
    "delete",
    "do",
    "else",
    "enum",
    "export",
    "extends",
    "false",
    "finally",
    "for",
    "function",
    "if",
    "implements",
    "import",
    "in",
    "instanceof",
    "interface",
    "let",
    "new",
    "null",
    "package",
    "private",
    "protected",
    "public",
    "return",
    "static",
    "super",
    "switch",
    "this",
    "throw",
    "true",
    "try",
    "typeof",
    "var",
    "void",
    "while",
    "with",
    "yield",
];

lazy_static! {
    static ref IDENTIFIER_RE: Regex = Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").unwrap();
}

fn check_identifier(name: &str) -> Result<()> {
    if !IDENTIFIER_RE.is_match(name) || RESERVED_WORDS.contains(&name) {
        return Err(ReactUmdError::Introspection(format!(
            "`{}` cannot be re-exported as a module binding",
            name
        )));
    }
    if name == LEGACY_BINDING || name == ADVANCED_BINDING {
        return Err(ReactUmdError::Introspection(format!(
            "`{}` collides with an entry module import",
            name
        )));
    }
    Ok(())
}

/// Render the entry module source. Identical surfaces give identical text.
pub fn render_entry(surface: &ExportSurface, renderer: &RendererModule) -> Result<String> {
    surface.validate()?;
    for name in surface.names() {
        check_identifier(name)?;
    }

    let mut source = String::new();
    // Writing to a String cannot fail
    let _ = writeln!(
        source,
        "import * as {} from {};",
        LEGACY_BINDING,
        js_literal(&renderer.module)?
    );
    let _ = writeln!(
        source,
        "import * as {} from {};",
        ADVANCED_BINDING,
        js_literal(&renderer.advanced_module)?
    );

    source.push_str("\n// advanced API\n");
    for name in &surface.primary {
        let _ = writeln!(source, "export const {0} = {1}.{0};", name, ADVANCED_BINDING);
    }

    source.push_str("\n// legacy API\n");
    for name in &surface.shared {
        let _ = writeln!(source, "export const {0} = {1}.{0};", name, LEGACY_BINDING);
    }

    Ok(source)
}

pub fn entry_file_name(renderer: &RendererModule) -> String {
    format!("{}-entry.js", renderer.file_stem)
}

/// Render the entry module into `scripts_dir` and return its path.
pub fn write_entry(
    scripts_dir: &Path,
    surface: &ExportSurface,
    renderer: &RendererModule,
) -> Result<PathBuf> {
    let source = render_entry(surface, renderer)?;
    let path = scripts_dir.join(entry_file_name(renderer));
    fs::write(&path, source).map_err(|err| ReactUmdError::fs(&path, err))?;
    debug!("Wrote entry module {}", path.display());
    Ok(path)
}
