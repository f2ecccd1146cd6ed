use crate::error::{IncludeError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Sentinel that starts every marker line. Ledger comments start with `;`,
/// so a marker that leaks into a consumer unaware of it reads as a comment.
pub const MARKER_PREFIX: &str = ";__ledger_file";

/// Separator between the marker fields
pub const MARKER_DELIMITER: &str = "*-*";

/// Position metadata: the file a run of content lines comes from and the
/// zero-based line number of the first of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    pub path: PathBuf,
    pub line: usize,
}

impl Marker {
    pub fn new(path: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            path: path.into(),
            line,
        }
    }

    /// Encodes the marker as `;__ledger_file*-*<path>*-*<line>`.
    #[must_use]
    pub fn encode(&self) -> String {
        format!(
            "{MARKER_PREFIX}{MARKER_DELIMITER}{}{MARKER_DELIMITER}{}",
            self.path.display(),
            self.line
        )
    }

    /// Decodes a line produced by [`Marker::encode`].
    ///
    /// The line number is read after the last delimiter, so a path that
    /// itself contains the delimiter still decodes to the original pair.
    ///
    /// # Errors
    ///
    /// Returns `IncludeError::MalformedMarker` if the prefix is missing or the
    /// line number does not parse.
    pub fn decode(line: &str) -> Result<Self> {
        let malformed = || IncludeError::MalformedMarker {
            line: line.to_string(),
        };

        let rest = line
            .strip_prefix(MARKER_PREFIX)
            .and_then(|rest| rest.strip_prefix(MARKER_DELIMITER))
            .ok_or_else(malformed)?;
        let (path, num) = rest.rsplit_once(MARKER_DELIMITER).ok_or_else(malformed)?;
        let num = num.parse::<usize>().map_err(|_| malformed())?;

        Ok(Self::new(path, num))
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Whether a line of a combined stream is a marker rather than content
#[must_use]
pub fn is_marker(line: &str) -> bool {
    line.starts_with(MARKER_PREFIX)
}

/// One entry of the combined stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Line {
    /// A ledger line passed through verbatim
    Content(String),
    /// Position metadata inserted by the includer
    Marker(Marker),
}

impl Line {
    /// Renders the entry as it appears in the flattened text.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Content(text) => text.clone(),
            Self::Marker(marker) => marker.encode(),
        }
    }
}

/// A content line together with the place it was read from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLine<'a> {
    pub path: &'a Path,
    pub line: usize,
    pub text: &'a str,
}

/// One file expansion within a combined stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Expansion<'a> {
    pub path: &'a Path,
    pub lines: usize,
}

/// The flattened output of an include resolution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedStream {
    lines: Vec<Line>,
}

impl CombinedStream {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_marker(&mut self, path: &Path, line: usize) {
        self.lines.push(Line::Marker(Marker::new(path, line)));
    }

    pub(crate) fn push_content(&mut self, text: String) {
        self.lines.push(Line::Content(text));
    }

    #[must_use]
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Content lines only, markers dropped
    pub fn content(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().filter_map(|line| match line {
            Line::Content(text) => Some(text.as_str()),
            Line::Marker(_) => None,
        })
    }

    /// Every file whose expansion started, in expansion order.
    #[must_use]
    pub fn sources(&self) -> Vec<&Path> {
        self.lines
            .iter()
            .filter_map(|line| match line {
                Line::Marker(Marker { path, line: 0 }) => Some(path.as_path()),
                _ => None,
            })
            .collect()
    }

    /// One entry per file expansion, in expansion order, with the number of
    /// content lines that expansion contributed. Includes nested inside an
    /// expansion are counted against their own entries.
    ///
    /// # Errors
    ///
    /// Returns `IncludeError::MalformedStream` if content appears before the
    /// first marker, or a resumption marker names no open expansion.
    pub fn expansions(&self) -> Result<Vec<Expansion<'_>>> {
        let mut out: Vec<Expansion<'_>> = Vec::new();
        let mut open: Vec<usize> = Vec::new();

        for (index, line) in self.lines.iter().enumerate() {
            match line {
                Line::Marker(Marker { path, line: 0 }) => {
                    open.push(out.len());
                    out.push(Expansion {
                        path: path.as_path(),
                        lines: 0,
                    });
                }
                Line::Marker(Marker { path, .. }) => {
                    while open.last().is_some_and(|&i| out[i].path != path.as_path()) {
                        open.pop();
                    }
                    if open.is_empty() {
                        return Err(IncludeError::MalformedStream { index });
                    }
                }
                Line::Content(_) => {
                    let &current = open
                        .last()
                        .ok_or(IncludeError::MalformedStream { index })?;
                    out[current].lines += 1;
                }
            }
        }

        Ok(out)
    }

    /// Maps every content line back to the file and line it came from.
    ///
    /// # Errors
    ///
    /// Returns `IncludeError::MalformedStream` if content appears before the
    /// first marker.
    pub fn source_lines(&self) -> Result<Vec<SourceLine<'_>>> {
        let mut current: Option<(&Path, usize)> = None;
        let mut out = Vec::new();

        for (index, line) in self.lines.iter().enumerate() {
            match line {
                Line::Marker(marker) => current = Some((marker.path.as_path(), marker.line)),
                Line::Content(text) => {
                    let (path, num) = current
                        .as_mut()
                        .ok_or(IncludeError::MalformedStream { index })?;
                    out.push(SourceLine {
                        path: *path,
                        line: *num,
                        text: text.as_str(),
                    });
                    *num += 1;
                }
            }
        }

        Ok(out)
    }

    /// Renders the stream as newline-terminated text with encoded markers.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(&line.to_text());
            out.push('\n');
        }
        out
    }

    /// Parses text produced by [`CombinedStream::to_text`].
    ///
    /// # Errors
    ///
    /// Returns `IncludeError::MalformedMarker` for a prefixed line that does
    /// not decode.
    pub fn parse(text: &str) -> Result<Self> {
        let lines = text
            .lines()
            .map(|line| {
                if is_marker(line) {
                    Marker::decode(line).map(Line::Marker)
                } else {
                    Ok(Line::Content(line.to_string()))
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { lines })
    }
}

impl fmt::Display for CombinedStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}
