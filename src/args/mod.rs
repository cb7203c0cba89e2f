//! CLI argument types and parsing helpers.
mod cli;
mod defaults;
pub(crate) mod parsers;
mod types;


pub use cli::{CaptureArgs, Command, ProxyArgs, ReplayArgs};
pub use types::FailurePolicy;
