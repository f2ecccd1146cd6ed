use crate::error::{IncludeError, Result};
use crate::fs_utils::{OsFs, SourceFs, clean_path};
use crate::marker::CombinedStream;
use std::collections::HashSet;
use std::io::BufRead;
use std::path::{Path, PathBuf};

/// Keyword that opens an include directive
pub const INCLUDE_KEYWORD: &str = "include";

/// Returns the pattern of an include directive, or `None` for ordinary content.
///
/// A directive is the exact token `include`, one space, and a non-empty
/// remainder. The remainder is returned verbatim, so `include  a` yields the
/// pattern ` a`.
#[must_use]
pub fn parse_directive(line: &str) -> Option<&str> {
    line.strip_prefix(INCLUDE_KEYWORD)
        .and_then(|rest| rest.strip_prefix(' '))
        .filter(|pattern| !pattern.is_empty())
}

/// Flattens `filename` and everything it includes, reading from disk.
///
/// # Errors
///
/// See [`resolve_with`].
pub fn resolve(filename: &str) -> Result<CombinedStream> {
    resolve_with(&OsFs, filename)
}

/// Flattens `filename` and everything it includes through `fs`.
///
/// # Errors
///
/// - `IncludeError::MissingFilename` if `filename` is empty.
/// - `IncludeError::IncludeCycle` if a file is re-entered while being expanded.
/// - `IncludeError::Open` / `IncludeError::Read` for unreadable files.
/// - `IncludeError::GlobResolution` / `IncludeError::GlobWalk` for patterns
///   that cannot be expanded.
///
/// Errors raised below a directive arrive wrapped in `IncludeError::At`, one
/// layer per including file.
pub fn resolve_with(fs: &dyn SourceFs, filename: &str) -> Result<CombinedStream> {
    let mut includer = Includer::new(fs);
    includer.include(Path::new(filename))?;
    Ok(includer.finish())
}

/// Depth-first include expansion into a [`CombinedStream`]
///
/// The set of files currently mid-expansion lives here rather than in any
/// shared state, so separate includers never see each other's progress.
pub struct Includer<'a> {
    fs: &'a dyn SourceFs,
    active: HashSet<PathBuf>,
    stream: CombinedStream,
}

impl<'a> Includer<'a> {
    #[must_use]
    pub fn new(fs: &'a dyn SourceFs) -> Self {
        Self {
            fs,
            active: HashSet::new(),
            stream: CombinedStream::new(),
        }
    }

    /// Appends `filename`, with its includes expanded, to the stream.
    ///
    /// # Errors
    ///
    /// See [`resolve_with`]. After an error the stream holds whatever was
    /// emitted before it and should be discarded.
    pub fn include(&mut self, filename: &Path) -> Result<()> {
        if filename.as_os_str().is_empty() {
            return Err(IncludeError::MissingFilename);
        }

        let path = clean_path(filename);
        if !self.active.insert(path.clone()) {
            return Err(IncludeError::IncludeCycle { path });
        }

        let result = self.expand(&path);
        self.active.remove(&path);
        result
    }

    /// Consumes the includer and returns the stream built so far.
    #[must_use]
    pub fn finish(self) -> CombinedStream {
        self.stream
    }

    fn expand(&mut self, path: &Path) -> Result<()> {
        let fs = self.fs;
        let reader = fs.open(path).map_err(|source| IncludeError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        self.stream.push_marker(path, 0);

        let mut line_num = 0;
        for line in reader.lines() {
            let line = line.map_err(|source| IncludeError::Read {
                path: path.to_path_buf(),
                source,
            })?;

            if let Some(pattern) = parse_directive(&line) {
                self.include_matches(path, pattern)
                    .map_err(|err| err.at(path, line_num))?;
                line_num += 1;
                self.stream.push_marker(path, line_num);
            } else {
                self.stream.push_content(line);
                line_num += 1;
            }
        }

        Ok(())
    }

    /// Expands every file matching `pattern`, taken relative to the directory
    /// of `including`. The same file matched twice by one pattern is
    /// expanded once.
    fn include_matches(&mut self, including: &Path, pattern: &str) -> Result<()> {
        let dir = including.parent().unwrap_or_else(|| Path::new(""));
        let target = clean_path(&dir.join(pattern));

        let mut seen = HashSet::new();
        for matched in self.fs.glob(&target)? {
            let matched = clean_path(&matched);
            if seen.insert(matched.clone()) {
                self.include(&matched)?;
            }
        }

        Ok(())
    }
}
