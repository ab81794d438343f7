//! CLI subcommands that inspect the content store

pub mod check;
pub mod list;
