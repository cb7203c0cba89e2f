use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Whether a replay run keeps going after a failed request.
#[derive(Debug, Clone, Copy, ValueEnum, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    Continue,
    Abort,
}

impl FailurePolicy {
    #[must_use]
    pub const fn aborts(self) -> bool {
        matches!(self, FailurePolicy::Abort)
    }
}
