//! Concurrent registry of remote audio tracks.
//!
//! Maps an opaque track handle to the most recently delivered PCM buffer
//! for that track. Each delivery replaces the previous buffer wholesale;
//! there is no queuing, and older buffers are discarded. The capture
//! thread reads via `snapshot`, the host (and the remote delivery
//! mechanism) writes via `register`/`deliver`/`unregister`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

static NEXT_TRACK_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identity of one remote audio track.
///
/// Compares by identity, never by buffer contents: each call to
/// `allocate` yields a process-unique handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackHandle(u64);

impl TrackHandle {
    /// Allocate a fresh, process-unique handle.
    pub fn allocate() -> Self {
        Self(NEXT_TRACK_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Registry of remote tracks and their latest PCM buffers.
///
/// One mutex around a plain map: the correctness requirement is atomic
/// per-key replace, not contention throughput. Buffers are stored as
/// `Arc<Vec<u8>>` so a snapshot clones pointers, never bytes — a mixing
/// pass sees either the old or the new buffer for a track, never a
/// partial one.
#[derive(Debug, Default)]
pub struct RemoteSourceRegistry {
    buffers: Mutex<HashMap<TrackHandle, Arc<Vec<u8>>>>,
}

impl RemoteSourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure `handle` has an entry, initially empty.
    ///
    /// Re-registration is idempotent and keeps any buffer already
    /// delivered under the same handle.
    pub fn register(&self, handle: TrackHandle) {
        self.buffers
            .lock()
            .entry(handle)
            .or_insert_with(|| Arc::new(Vec::new()));
    }

    /// Replace the buffer for `handle` with `pcm_bytes`.
    ///
    /// Delivery for a handle that was never registered is not an error;
    /// it implies current existence in the mapping.
    pub fn deliver(&self, handle: TrackHandle, pcm_bytes: Vec<u8>) {
        self.buffers.lock().insert(handle, Arc::new(pcm_bytes));
    }

    /// Remove the entry for `handle` and discard its buffer.
    pub fn unregister(&self, handle: TrackHandle) {
        self.buffers.lock().remove(&handle);
    }

    /// Point-in-time view of all current buffers, for one mixing pass.
    pub fn snapshot(&self) -> Vec<Arc<Vec<u8>>> {
        self.buffers.lock().values().cloned().collect()
    }

    /// Push handle for the external delivery mechanism of one track.
    pub fn sink(self: &Arc<Self>, handle: TrackHandle) -> RemoteSink {
        RemoteSink {
            registry: Arc::clone(self),
            handle,
        }
    }

    pub fn contains(&self, handle: TrackHandle) -> bool {
        self.buffers.lock().contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.buffers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.lock().is_empty()
    }
}

/// Delivery sink for one remote track.
///
/// The remote audio mechanism calls `push` once per decoded frame; each
/// push wholesale-replaces the track's buffer in the registry.
#[derive(Clone)]
pub struct RemoteSink {
    registry: Arc<RemoteSourceRegistry>,
    handle: TrackHandle,
}

impl RemoteSink {
    pub fn push(&self, pcm_bytes: Vec<u8>) {
        self.registry.deliver(self.handle, pcm_bytes);
    }

    pub fn handle(&self) -> TrackHandle {
        self.handle
    }
}
