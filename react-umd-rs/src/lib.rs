// Allow uninlined format args for cleaner format!/write! macros
#![allow(clippy::uninlined_format_args)]
#![doc = include_str!("../README.md")]

pub mod bundler;
pub mod config;
pub mod entry;
pub mod error;
pub mod finisher;
pub mod minify;
pub mod orchestrator;
pub mod pipeline;
pub mod runner;
pub mod strategy;
pub mod surface;
pub mod target;
pub mod version;
pub mod workspace;

#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;

pub use config::VendorConfig;
pub use error::{ReactUmdError, Result};
pub use pipeline::{Toolchain, VendorPipeline, VendorReport};
pub use target::{ArtifactId, BuildMode};
pub use version::LibraryVersion;
pub use serde_json;
