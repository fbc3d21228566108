use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, ReactUmdError>;

/// Every failure is terminal for a run. Nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum ReactUmdError {
    #[error("Invalid library version `{version}`: {reason}")]
    VersionParse { version: String, reason: String },

    #[error("Export introspection failed: {0}")]
    Introspection(String),

    #[error("Compilation of {filename} failed:\n{diagnostics}")]
    Compile {
        filename: String,
        diagnostics: String,
    },

    #[error("Minification of {filename} failed: {reason}")]
    Minification { filename: String, reason: String },

    #[error("Filesystem error at {}: {source}", path.display())]
    FileSystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ReactUmdError {
    pub fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileSystem {
            path: path.into(),
            source,
        }
    }

    pub fn version_parse(version: impl Into<String>, reason: impl ToString) -> Self {
        Self::VersionParse {
            version: version.into(),
            reason: reason.to_string(),
        }
    }
}
