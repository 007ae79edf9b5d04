//! Shared reading buffer between the sampler task and the aggregator.

use crate::models::Reading;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Insertion-ordered readings behind a single lock.
///
/// `append` and `drain` each take the lock once, so a drain sees every
/// reading appended before it and none of the ones appended after.
#[derive(Debug, Clone, Default)]
pub struct SampleBuffer {
    inner: Arc<Mutex<Vec<Reading>>>,
}

impl SampleBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Reading>> {
        // A panicking holder cannot leave a half-written Reading behind.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn append(&self, reading: Reading) {
        self.lock().push(reading);
    }

    /// Take everything buffered, oldest first, leaving the buffer empty.
    pub fn drain(&self) -> Vec<Reading> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[allow(dead_code)] // Pairs with len()
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
