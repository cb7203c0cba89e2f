pub(crate) const DEFAULT_CAPTURE_HOST: &str = "0.0.0.0";
pub(crate) const DEFAULT_CAPTURE_PORT: u16 = 8200;
/// Shared between both subcommands so a capture run feeds the next replay run.
pub(crate) const DEFAULT_EVENTS_PATH: &str = "./shared-volume/events.json";
pub(crate) const DEFAULT_FLUSH_INTERVAL: &str = "10s";
pub(crate) const DEFAULT_REPLAY_TARGET: &str = "http://0.0.0.0:8200";
pub(crate) const DEFAULT_MAX_BODY_BYTES: &str = "1048576";
