//! Capture side: an HTTP listener that records intake requests and
//! periodically persists them.
mod body;
mod buffer;
mod request;
mod server;


pub use buffer::CaptureBuffer;
pub use server::{CaptureServer, flush_to_file, run_capture};
