/// Recording session state machine.
///
/// State transitions:
/// ```text
/// idle → recording → idle
/// ```
///
/// A session is long-lived and re-enterable: one start/stop cycle at a
/// time, any number of cycles over its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Recording,
}

impl RecorderState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording)
    }
}
