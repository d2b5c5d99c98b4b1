//! Command-line front end for the vizmesh registry
//!
//! The binary opens the store once per invocation, runs one subcommand and
//! prints its result as JSON on stdout. Logs go to stderr.

pub mod commands;
pub mod config;
