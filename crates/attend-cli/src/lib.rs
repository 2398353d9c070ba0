//! Attendance import CLI library.
//!
//! This crate provides the `attend` command-line interface.

mod cli;
pub mod commands;
mod config;
pub mod store;

pub use cli::{Cli, Commands};
pub use config::{Backend, Config};
