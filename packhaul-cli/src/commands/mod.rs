//! CLI subcommands.

mod common;

pub mod install;
pub mod list;
pub mod remove;
pub mod update;
