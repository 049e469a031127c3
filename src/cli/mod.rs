//! Process wiring for the `agentx-subagentd` binary.
//!
//! This module is only available with the `cli` feature. It covers the
//! concerns spec.md §6.5 assigns to "the CLI front-end": argument parsing
//! and log verbosity, not MIB content or transport logic (those live in
//! [`crate::agent`], [`crate::session`], and [`crate::mibs`]).

mod args;

pub use args::{Args, DEFAULT_DB_SOCKET};
