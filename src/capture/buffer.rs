use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::record::CapturedRequest;

/// Append-only, arrival-ordered store of captured requests.
///
/// Cloning shares the same underlying list; connection tasks append while
/// the flusher serializes snapshots of it.
#[derive(Debug, Clone, Default)]
pub struct CaptureBuffer {
    records: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl CaptureBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, record: CapturedRequest) {
        self.lock().push(record);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<CapturedRequest> {
        self.lock().clone()
    }

    /// Serialize the whole list as a JSON array, returning the record count
    /// alongside the bytes. The lock is held for the duration so the count
    /// always matches the payload.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<(usize, Vec<u8>), serde_json::Error> {
        let records = self.lock();
        let payload = serde_json::to_vec(&*records)?;
        Ok((records.len(), payload))
    }

    fn lock(&self) -> MutexGuard<'_, Vec<CapturedRequest>> {
        // A panicking appender cannot leave the Vec half-written.
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
