//! # webrtc-recorder-core
//!
//! Platform-agnostic WebRTC local recording core.
//!
//! Captures a microphone PCM stream, mixes it in real time with the latest
//! buffers from dynamically registered remote audio tracks, and persists the
//! result as a 48 kHz / 16-bit / mono WAV file. Platform-specific capture
//! backends and permission checks implement the `CaptureBackend` and
//! `PermissionProbe` traits and plug into the generic `RecordingSession`.
//!
//! ## Architecture
//!
//! ```text
//! webrtc-recorder-core (this crate)
//! ├── traits/       ← CaptureBackend, CaptureDevice, PermissionProbe, SessionDelegate
//! ├── models/       ← RecorderError, RecorderState, RecorderConfig, RecordingResult
//! ├── processing/   ← additive PCM mixer, WAV header generation
//! ├── registry/     ← RemoteSourceRegistry (handle → latest PCM buffer)
//! ├── session/      ← RecordingSession (capture thread orchestrator)
//! └── storage/      ← WavFileWriter, header finalization, metadata sidecar
//! ```

pub mod models;
pub mod processing;
pub mod registry;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::config::{RecorderConfig, StartOptions};
pub use models::error::RecorderError;
pub use models::recording_result::{RecordingMetadata, RecordingResult};
pub use models::state::RecorderState;
pub use registry::remote_sources::{RemoteSink, RemoteSourceRegistry, TrackHandle};
pub use session::recorder::{RecordingSession, SessionStats};
pub use storage::wav_writer::WavFileWriter;
pub use traits::capture_device::{CaptureBackend, CaptureDevice};
pub use traits::permissions::PermissionProbe;
pub use traits::session_delegate::SessionDelegate;
