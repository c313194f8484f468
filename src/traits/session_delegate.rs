use crate::models::error::RecorderError;
use crate::models::recording_result::RecordingResult;
use crate::models::state::RecorderState;

/// Event delegate for recording session notifications.
///
/// `on_write_error` fires on the capture thread; the others fire on the
/// caller's thread. Implementations should marshal to the UI thread if
/// needed.
pub trait SessionDelegate: Send + Sync {
    /// Called when the session state changes.
    fn on_state_changed(&self, state: &RecorderState);

    /// Called when a write to the output file fails. The capture loop
    /// continues; the corresponding audio interval is dropped.
    fn on_write_error(&self, error: &RecorderError);

    /// Called when a recording stops and the file is finalized.
    fn on_recording_finished(&self, result: &RecordingResult);
}
