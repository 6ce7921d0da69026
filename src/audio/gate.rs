//! Hand-off point between the audio thread and the capture session.
//!
//! The delivery callback lives in a `Mutex<Option<_>>`.  The audio thread
//! holds the lock for the whole delivery, and [`ChunkGate::close`] takes the
//! callback out under the same lock.  Once `close` returns, any delivery that
//! was running has finished and every later one finds the slot empty.

use std::sync::{Arc, Mutex, PoisonError};

use super::SampleChunk;

/// Callback invoked on the audio thread for every delivered chunk.
pub type ChunkCallback = Box<dyn FnMut(SampleChunk) + Send + 'static>;

/// Cloneable gate around a [`ChunkCallback`].
#[derive(Clone)]
pub struct ChunkGate {
    slot: Arc<Mutex<Option<ChunkCallback>>>,
}

impl ChunkGate {
    /// Open a gate that forwards chunks to `callback`.
    pub fn open(callback: ChunkCallback) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(callback))),
        }
    }

    /// Forward `chunk` if the gate is still open.  Returns `false` when the
    /// chunk was dropped because the gate is closed.
    pub fn deliver(&self, chunk: SampleChunk) -> bool {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_mut() {
            Some(callback) => {
                callback(chunk);
                true
            }
            None => false,
        }
    }

    /// Close the gate, waiting for an in-progress delivery.
    ///
    /// Returns `true` if this call closed it, `false` if it was already
    /// closed.
    pub fn close(&self) -> bool {
        let callback = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        callback.is_some()
    }

    pub fn is_open(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl std::fmt::Debug for ChunkGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkGate")
            .field("open", &self.is_open())
            .finish()
    }
}
