//! Subcommand implementations.

pub mod account;
pub mod menu;
pub mod order;
pub mod request;
