//! Replay side: resend a captured request file against a target, in order.
mod records;
mod runner;


pub use records::{ReplayRequest, build_requests, parse_target, read_records};
pub use runner::{ReplayOptions, ReplaySummary, replay_requests, run_replay, send_request};
