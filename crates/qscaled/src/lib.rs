//! qscaled: the qscale daemon.
//!
//! The library half holds the command-line and environment surface so it
//! can be exercised from tests; `main.rs` wires it to the real backends.

pub mod cli;

pub use cli::{Cli, LogFormat};
