//! Export surface of a renderer whose API is split across two modules.
//!
//! The surface is the list of names the unified entry module re-exports.
//! `primary` are the advanced-API names taken from the advanced module,
//! `shared` is everything else the legacy module exports. How the legacy
//! names are discovered is up to the [`SurfaceProvider`].

mod runtime;
mod scan;

pub use runtime::RuntimeSurfaceProvider;
pub use scan::StaticSurfaceProvider;

use crate::error::{ReactUmdError, Result};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Namespace key a module loader adds for the default export.
pub const DEFAULT_EXPORT: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSurface {
    pub primary: Vec<String>,
    pub shared: Vec<String>,
}

impl ExportSurface {
    /// Split the legacy module's export names against the fixed primary list.
    ///
    /// `shared` keeps the legacy order, drops the default marker and any
    /// primary name, and drops repeats.
    pub fn partition<I, S>(legacy_names: I, primary: &[String]) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen: HashSet<String> = HashSet::new();
        let primary: Vec<String> = primary
            .iter()
            .filter(|name| seen.insert((*name).clone()))
            .cloned()
            .collect();

        let shared = legacy_names
            .into_iter()
            .map(Into::into)
            .filter(|name| name != DEFAULT_EXPORT)
            .filter(|name| seen.insert(name.clone()))
            .collect();

        Self { primary, shared }
    }

    /// Check the invariants a surface reported by another process must hold.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for name in self.primary.iter().chain(self.shared.iter()) {
            if name == DEFAULT_EXPORT {
                return Err(ReactUmdError::Introspection(
                    "export surface contains the default export marker".to_string(),
                ));
            }
            if !seen.insert(name.as_str()) {
                return Err(ReactUmdError::Introspection(format!(
                    "export `{}` appears more than once in the surface",
                    name
                )));
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.primary.len() + self.shared.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.primary
            .iter()
            .chain(self.shared.iter())
            .map(String::as_str)
    }
}

/// Source of an [`ExportSurface`]. The build does not care how it was obtained.
pub trait SurfaceProvider: Send + Sync {
    fn enumerate(&self) -> BoxFuture<'_, Result<ExportSurface>>;
}
