//! Capture-and-replay harness for APM intake traffic.
//!
//! The `capture` component listens like an APM server, acknowledges every
//! intake request with `202 Accepted` and periodically persists what it saw
//! to a JSON file. The `replay` component reads such a file (or a
//! hand-curated fixture) and resends each request, in order, to a target
//! endpoint. The file is the only handoff between the two.
pub mod args;
pub mod capture;
pub mod entry;
pub mod error;
pub mod logger;
pub mod record;
pub mod replay;
pub mod shutdown;
