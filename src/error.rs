use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main error type for include resolution
#[derive(Error, Debug)]
pub enum IncludeError {
    /// Empty filename handed to the resolver
    #[error("must specify filename")]
    MissingFilename,

    /// A file was re-entered while its own expansion was still in progress
    #[error("include cycle: '{}'", .path.display())]
    IncludeCycle { path: PathBuf },

    /// The file could not be opened
    #[error("open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file was opened but reading a line failed
    #[error("read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The include pattern is not a valid glob
    #[error("bad pattern '{pattern}': {source}")]
    GlobResolution {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    /// Walking the directories under a glob pattern failed
    #[error("cannot expand '{pattern}': {source}")]
    GlobWalk {
        pattern: String,
        #[source]
        source: walkdir::Error,
    },

    /// An error raised while expanding the directive at `path:line`
    #[error("{}:{line}: {source}", .path.display())]
    At {
        path: PathBuf,
        line: usize,
        #[source]
        source: Box<IncludeError>,
    },

    /// A line carrying the marker prefix that does not decode
    #[error("malformed marker: {line}")]
    MalformedMarker { line: String },

    /// Content found before the first marker of a combined stream
    #[error("malformed stream: content at line {index} precedes any marker")]
    MalformedStream { index: usize },

    /// A root path handed over as raw OS bytes that are not valid UTF-8
    #[error("path is not valid UTF-8: {}", .path.display())]
    NonUtf8Path { path: PathBuf },

    /// IO error outside of source file handling (stdout, output files)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IncludeError {
    /// Wraps `self` with the location of the directive that triggered it.
    pub(crate) fn at(self, path: &Path, line: usize) -> Self {
        Self::At {
            path: path.to_path_buf(),
            line,
            source: Box::new(self),
        }
    }

    /// The innermost error underneath any `At` breadcrumbs.
    #[must_use]
    pub fn root_cause(&self) -> &IncludeError {
        let mut err = self;
        while let Self::At { source, .. } = err {
            err = &**source;
        }
        err
    }

    /// The deepest directive location recorded while unwinding, if any.
    #[must_use]
    pub fn location(&self) -> Option<(&Path, usize)> {
        let mut found = None;
        let mut err = self;
        while let Self::At { path, line, source } = err {
            found = Some((path.as_path(), *line));
            err = &**source;
        }
        found
    }
}

pub type Result<T> = std::result::Result<T, IncludeError>;
