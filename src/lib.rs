//! Terminal output engine for a multiplexer.
//!
//! Reconciles in-memory grids of styled cells against a physical terminal,
//! emitting the minimum capability-string byte sequences needed to bring the
//! terminal's observable state in line with each pane. The engine shadows the
//! terminal's cursor position, scroll region, and active cell attributes so
//! redundant emissions can be elided, and downgrades colours to whatever
//! depth the terminal actually supports.
//!
//! The grid itself, terminfo database parsing, and input decoding live in
//! collaborating layers; this crate owns everything from the capability query
//! down to the bytes.

pub mod acs;
pub mod caps;
pub mod cell;
pub mod client;
pub mod colour;
pub mod output;
pub mod screen;
pub mod style;
pub mod tty;

use thiserror::Error;

/// Errors surfaced by terminal setup.
///
/// Rendering itself never fails: a missing capability selects a fallback
/// path, and write errors on a dying terminal are tolerated by policy.
#[derive(Debug, Error)]
pub enum TtyError {
    /// The file descriptor handed to [`tty::Tty::init`] is not a terminal.
    #[error("file descriptor is not a terminal")]
    NotATty,

    /// The terminal name did not resolve to a usable capability table.
    #[error("unknown terminal {name:?}: {cause}")]
    UnknownTerm { name: String, cause: String },

    /// An I/O error during setup or teardown.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
