use std::path::PathBuf;
use std::time::Duration;

/// Tag identifying which stage of a run failed, independent of the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MissingArgument,
    PatternCompile,
    NavigationTimeout,
    RenderFailure,
    AssemblyFailure,
    Filesystem,
    Browser,
    Config,
}

/// Every failure a run can end in.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required input was not supplied at the boundary.
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),

    /// The link pattern is not a valid regular expression.
    #[error("invalid link pattern {pattern:?}: {source}")]
    PatternCompile {
        pattern: String,
        source: regex::Error,
    },

    /// A document did not finish loading within its deadline.
    #[error("navigation to {url} timed out after {}s", timeout.as_secs())]
    NavigationTimeout { url: String, timeout: Duration },

    /// Producing the paginated artifact for one document failed.
    #[error("render failed for {url}: {message}")]
    RenderFailure { url: String, message: String },

    /// Merging the artifacts into the final document failed.
    #[error("assembly failed: {0}")]
    AssemblyFailure(String),

    /// The persisted result could not be written.
    #[error("I/O error at {path:?}: {source}")]
    Filesystem {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The browser collaborator failed outside of a navigation deadline.
    #[error("browser error: {0}")]
    Browser(String),

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MissingArgument(_) => ErrorKind::MissingArgument,
            Error::PatternCompile { .. } => ErrorKind::PatternCompile,
            Error::NavigationTimeout { .. } => ErrorKind::NavigationTimeout,
            Error::RenderFailure { .. } => ErrorKind::RenderFailure,
            Error::AssemblyFailure(_) => ErrorKind::AssemblyFailure,
            Error::Filesystem { .. } => ErrorKind::Filesystem,
            Error::Browser(_) => ErrorKind::Browser,
            Error::Config(_) => ErrorKind::Config,
        }
    }

    pub fn browser(msg: impl std::fmt::Display) -> Self {
        Error::Browser(msg.to_string())
    }

    pub fn render(url: impl Into<String>, msg: impl std::fmt::Display) -> Self {
        Error::RenderFailure {
            url: url.into(),
            message: msg.to_string(),
        }
    }

    pub fn assembly(msg: impl std::fmt::Display) -> Self {
        Error::AssemblyFailure(msg.to_string())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Filesystem {
            path: path.into(),
            source,
        }
    }
}
