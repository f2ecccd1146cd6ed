use crate::error::{IncludeError, Result};
use globset::GlobBuilder;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Filesystem operations the includer needs
pub trait SourceFs {
    /// Opens a file for line-by-line reading. The handle is dropped once the
    /// returned reader goes out of scope.
    ///
    /// # Errors
    ///
    /// Any error from the underlying open call.
    fn open(&self, path: &Path) -> io::Result<Box<dyn BufRead + '_>>;

    /// Expands a glob pattern into concrete file paths, in resolution order.
    ///
    /// # Errors
    ///
    /// - `IncludeError::GlobResolution` if the pattern does not compile.
    /// - `IncludeError::GlobWalk` if a directory under the pattern cannot be read.
    fn glob(&self, pattern: &Path) -> Result<Vec<PathBuf>>;
}

/// The real filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFs;

impl SourceFs for OsFs {
    fn open(&self, path: &Path) -> io::Result<Box<dyn BufRead + '_>> {
        Ok(Box::new(BufReader::new(File::open(path)?)))
    }

    fn glob(&self, pattern: &Path) -> Result<Vec<PathBuf>> {
        glob_paths(pattern)
    }
}

/// Lexically cleans a path: drops `.` segments, folds `name/..` pairs and
/// duplicate separators. Leading `..` segments of a relative path are kept;
/// `..` directly under the root is dropped. An empty result becomes `.`.
#[must_use]
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();

    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(comp),
            },
            _ => out.push(comp),
        }
    }

    if out.is_empty() {
        PathBuf::from(".")
    } else {
        out.iter().collect()
    }
}

fn has_meta(segment: &str) -> bool {
    segment.contains(['*', '?', '[', '{'])
}

/// Resolves a glob pattern against the filesystem.
///
/// The pattern is split into a literal directory prefix and a wildcard
/// remainder. The prefix is walked in file-name order and every regular file
/// whose prefix-relative path matches the remainder is returned. `*` does not
/// cross `/`; `**` does. A pattern without wildcards yields the path itself
/// when it names an existing file. A missing base directory yields nothing.
///
/// # Errors
///
/// - `IncludeError::GlobResolution` if the remainder is not a valid glob.
/// - `IncludeError::GlobWalk` if walking the base directory fails.
pub fn glob_paths(pattern: &Path) -> Result<Vec<PathBuf>> {
    let pattern_str = pattern.to_string_lossy().into_owned();

    let mut base = PathBuf::new();
    let mut rest: Vec<String> = Vec::new();
    for comp in pattern.components() {
        let segment = comp.as_os_str().to_string_lossy();
        if rest.is_empty() && !has_meta(&segment) {
            base.push(comp);
        } else {
            rest.push(segment.into_owned());
        }
    }

    if rest.is_empty() {
        return Ok(if pattern.is_file() {
            vec![pattern.to_path_buf()]
        } else {
            Vec::new()
        });
    }

    let matcher = GlobBuilder::new(&rest.join("/"))
        .literal_separator(true)
        .build()
        .map_err(|source| IncludeError::GlobResolution {
            pattern: pattern_str.clone(),
            source,
        })?
        .compile_matcher();

    let max_depth = if rest.iter().any(|segment| segment.contains("**")) {
        usize::MAX
    } else {
        rest.len()
    };

    let walk_root = if base.as_os_str().is_empty() {
        Path::new(".")
    } else {
        base.as_path()
    };
    if !walk_root.is_dir() {
        return Ok(Vec::new());
    }

    let walker = WalkDir::new(walk_root)
        .min_depth(1)
        .max_depth(max_depth)
        .follow_links(true)
        .sort_by_file_name();

    let mut matches = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|source| IncludeError::GlobWalk {
            pattern: pattern_str.clone(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(walk_root) else {
            continue;
        };
        if matcher.is_match(relative.to_string_lossy().replace('\\', "/")) {
            matches.push(base.join(relative));
        }
    }

    Ok(matches)
}
