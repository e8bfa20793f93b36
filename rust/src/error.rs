use std::collections::BTreeMap;
use std::path::PathBuf;

/// Broad category of an [`IndexError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Discovery,
    Extraction,
    Scope,
    Conflict,
    Lifecycle,
    Io,
}

/// Unified error type for resolving, indexing and querying a source tree.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("configuration error in {}: {message}", .path.display())]
    Configuration { path: PathBuf, message: String },

    #[error(
        "unresolved tag '{tag}' in template '{template}' ({}): add it to parseTags or use {{{tag}:REGEX}}",
        .path.display()
    )]
    UnresolvedTag {
        tag: String,
        template: String,
        path: PathBuf,
    },

    #[error("invalid pattern '{pattern}' ({}): {source}", .path.display())]
    InvalidPattern {
        pattern: String,
        path: PathBuf,
        #[source]
        source: regex::Error,
    },

    #[error("discovery error: {0}")]
    Discovery(String),

    #[error(
        "cannot bind tag '{tag}' of end template '{template}' in {} line {line}: captured {captures:?}",
        .path.display()
    )]
    UnboundTag {
        tag: String,
        template: String,
        path: PathBuf,
        line: usize,
        captures: BTreeMap<String, String>,
    },

    #[error(
        "no end of item found in {} for match at line {line} with properties {properties:?}\nstart pattern: {start}\nend pattern: {end}",
        .path.display()
    )]
    Unterminated {
        path: PathBuf,
        line: usize,
        start: String,
        end: String,
        properties: BTreeMap<String, String>,
    },

    #[error("empty scope: {0}")]
    EmptyScope(String),

    #[error("ambiguous scope: expected one component, found {count}:\n{contents}")]
    AmbiguousScope { count: usize, contents: String },

    #[error("{} already exists; pass overwrite to replace it", .0.display())]
    Conflict(PathBuf),

    #[error("source tree rooted at {} is already indexed; call refresh() for fresh data", .0.display())]
    AlreadyIndexed(PathBuf),

    #[error("indexer is {0}, not indexed")]
    NotIndexed(&'static str),

    #[error("IO error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML error in {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

impl IndexError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration { .. }
            | Self::UnresolvedTag { .. }
            | Self::InvalidPattern { .. } => ErrorKind::Configuration,
            Self::Discovery(_) => ErrorKind::Discovery,
            Self::UnboundTag { .. } | Self::Unterminated { .. } => ErrorKind::Extraction,
            Self::EmptyScope(_) | Self::AmbiguousScope { .. } => ErrorKind::Scope,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::AlreadyIndexed(_) | Self::NotIndexed(_) => ErrorKind::Lifecycle,
            Self::Io { .. } | Self::Yaml { .. } => ErrorKind::Io,
        }
    }

    pub(crate) fn config(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Configuration {
            path: path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, IndexError>;
