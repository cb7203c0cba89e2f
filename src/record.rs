//! The single persisted entity shared by capture and replay.
use serde::{Deserialize, Serialize};

/// One intake request as it arrived at the capture server.
///
/// Field names are the on-disk format: a capture file is a JSON array of
/// these objects in arrival order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedRequest {
    /// Request target as received (path plus query string).
    pub url: String,
    /// Uppercase HTTP verb.
    pub method: String,
    /// Raw request body, usually newline-delimited JSON.
    pub data: String,
}

impl CapturedRequest {
    #[must_use]
    pub fn new(
        url: impl Into<String>,
        method: impl Into<String>,
        data: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            method: method.into(),
            data: data.into(),
        }
    }
}
