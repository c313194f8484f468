use crate::models::config::RecorderConfig;
use crate::models::error::RecorderError;

/// An open microphone capture stream.
///
/// The device is owned exclusively by the capture thread for the lifetime
/// of a recording. Resource release happens on drop.
pub trait CaptureDevice: Send {
    /// Device buffer size in bytes for the configured format, from the
    /// platform's minimum-buffer-size query. The capture loop reads one
    /// buffer of this size per iteration.
    fn buffer_size(&self) -> usize;

    /// Block until a buffer of microphone PCM is available and copy it
    /// into `buf`. Returns the number of bytes read; zero means nothing
    /// was captured this cycle and the mix/write step is skipped.
    fn read(&mut self, buf: &mut [u8]) -> usize;

    /// Stop the underlying capture stream.
    fn stop(&mut self);
}

/// Interface for platform-specific microphone backends.
///
/// Implemented outside this crate (AudioRecord on Android, WASAPI on
/// Windows, Core Audio on macOS) and plugged into `RecordingSession`.
pub trait CaptureBackend: Send + Sync {
    /// Open a capture stream at the configured parameters.
    ///
    /// A failure here aborts `start` with `RecorderError::AudioInit` and
    /// leaves the session idle; the caller may retry.
    fn open(&self, config: &RecorderConfig) -> Result<Box<dyn CaptureDevice>, RecorderError>;
}
