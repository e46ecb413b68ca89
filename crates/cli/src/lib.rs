//! sh3 CLI library
//!
//! This module exports the shell components for use in integration tests.

pub mod commands;
pub mod exit_code;
pub mod output;
pub mod shell;

pub use shell::Shell;
