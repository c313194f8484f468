use thiserror::Error;

/// Errors that can occur during recording operations.
///
/// Precondition violations (`AlreadyRecording`, `NotRecording`,
/// `PermissionDenied`) and initialization failures (`AudioInit`) are
/// surfaced immediately and leave the session in `Idle`, ready for
/// another attempt. No variant is fatal to the process.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecorderError {
    #[error("already recording")]
    AlreadyRecording,

    #[error("not recording")]
    NotRecording,

    #[error("microphone permission denied")]
    PermissionDenied,

    #[error("audio capture initialization failed: {0}")]
    AudioInit(String),

    #[error("no output path for the active session")]
    NoOutputPath,

    #[error("storage error: {0}")]
    Storage(String),
}
