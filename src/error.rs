use std::path::PathBuf;

/// Everything that can go wrong between reading an `.api` file and emitting JSON.
///
/// The normalizer itself never fails; these come from the front-end, the
/// filesystem and the JSON boundary.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed IDL source.
    #[error("{file}:{line}:{column}: {message}")]
    Parse {
        file: String,
        line: u32,
        column: u32,
        message: String,
    },

    #[error("failed to encode JSON: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode JSON {0}")]
    Decode(String),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("input file does not exist: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("{0}")]
    Glob(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io { path: path.into(), source }
    }
}
