use std::num::NonZeroUsize;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use super::defaults::{
    DEFAULT_CAPTURE_HOST, DEFAULT_CAPTURE_PORT, DEFAULT_EVENTS_PATH, DEFAULT_FLUSH_INTERVAL,
    DEFAULT_MAX_BODY_BYTES, DEFAULT_REPLAY_TARGET,
};
use super::parsers::{parse_bool_env, parse_duration_arg, parse_positive_usize};
use super::types::FailurePolicy;

#[derive(Debug, Parser, Clone)]
#[clap(
    version,
    about = "Capture APM agent intake traffic to a file and replay it against an APM server endpoint."
)]
pub struct ProxyArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Enable debug logging when no log filter is set in the environment
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Listen for intake requests and periodically persist them to a file
    Capture(CaptureArgs),
    /// Re-send previously captured requests to a target endpoint
    Replay(ReplayArgs),
}

#[derive(Debug, Args, Clone)]
pub struct CaptureArgs {
    /// Address to bind the capture listener to
    #[arg(long, env = "ELASTIC_APM_SERVER_HOST", default_value = DEFAULT_CAPTURE_HOST)]
    pub host: String,

    /// Port to bind the capture listener to
    #[arg(long, env = "ELASTIC_APM_SERVER_PORT", default_value_t = DEFAULT_CAPTURE_PORT)]
    pub port: u16,

    /// File the captured requests are written to on every flush
    #[arg(long, short, env = "APM_PROXY_OUTPUT", default_value = DEFAULT_EVENTS_PATH)]
    pub output: String,

    /// How often the captured requests are flushed (supports ms/s/m/h)
    #[arg(
        long = "flush-interval",
        env = "APM_PROXY_FLUSH_INTERVAL",
        default_value = DEFAULT_FLUSH_INTERVAL,
        value_parser = parse_duration_arg
    )]
    pub flush_interval: Duration,

    /// Largest accepted request (headers plus decoded body), in bytes
    #[arg(
        long = "max-body-bytes",
        env = "APM_PROXY_MAX_BODY_BYTES",
        default_value = DEFAULT_MAX_BODY_BYTES,
        value_parser = parse_positive_usize
    )]
    pub max_body_bytes: NonZeroUsize,
}

#[derive(Debug, Args, Clone)]
pub struct ReplayArgs {
    /// Captured requests file (or hand-curated fixture) to replay
    #[arg(long, short, env = "APM_PROXY_INPUT", default_value = DEFAULT_EVENTS_PATH)]
    pub input: String,

    /// Base URL the recorded request paths are appended to
    #[arg(long, env = "APM_PROXY_TARGET", default_value = DEFAULT_REPLAY_TARGET)]
    pub target: String,

    /// Do not log the end-of-run marker
    #[arg(long = "no-end-marker", env = "APM_PROXY_NO_END_MARKER", value_parser = parse_bool_env)]
    pub no_end_marker: bool,

    /// What to do when a request fails without any response
    #[arg(
        long = "on-transport-error",
        env = "APM_PROXY_ON_TRANSPORT_ERROR",
        value_enum,
        default_value_t = FailurePolicy::Abort
    )]
    pub on_transport_error: FailurePolicy,

    /// What to do when the target answers with a non-success status
    #[arg(
        long = "on-http-error",
        env = "APM_PROXY_ON_HTTP_ERROR",
        value_enum,
        default_value_t = FailurePolicy::Continue
    )]
    pub on_http_error: FailurePolicy,
}
