//! Shared helpers for command handlers.

pub mod env;
