//! # ledger-include
//!
//! Flattens a plain-text ledger file into a single stream by expanding its
//! `include <pattern>` directives, recursively and in depth-first order.
//!
//! ## Features
//!
//! - Glob patterns resolved relative to the including file
//! - Include cycle detection with `file:line` breadcrumbs on every error
//! - Position markers so consumers can map flattened lines back to their source
//!
//! ## Markers
//!
//! Every file expansion starts with a marker line, and every directive is
//! followed by one recording where reading resumes:
//!
//! ```text
//! ;__ledger_file*-*main.ledger*-*0
//! 2024-01-01 a
//! ;__ledger_file*-*sub/x.ledger*-*0
//! x-line
//! ;__ledger_file*-*main.ledger*-*2
//! 2024-01-02 b
//! ```
//!
//! ## Usage
//!
//! ```no_run
//! match ledger_include::resolve("main.ledger") {
//!     Ok(stream) => {
//!         for line in stream.source_lines().unwrap_or_default() {
//!             println!("{}:{}: {}", line.path.display(), line.line, line.text);
//!         }
//!     }
//!     Err(e) => eprintln!("Error: {e}"),
//! }
//! ```

pub mod error;
pub mod fs_utils;
pub mod include;
pub mod marker;

pub use error::{IncludeError, Result};
pub use fs_utils::{OsFs, SourceFs, clean_path};
pub use include::{Includer, parse_directive, resolve, resolve_with};
pub use marker::{
    CombinedStream, Expansion, Line, MARKER_PREFIX, Marker, SourceLine, is_marker,
};
