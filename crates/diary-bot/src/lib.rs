pub mod broadcast;
pub mod client;
pub mod handlers;
pub mod jobs;
pub mod schedule;
pub mod update;

/// Divider line used across bot messages.
pub const DIV: &str = "▔▔▔▔▔▔▔▔▔▔▔▔▔▔▔";
