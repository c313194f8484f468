use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use crate::models::config::{RecorderConfig, StartOptions};
use crate::models::error::RecorderError;
use crate::models::recording_result::{RecordingMetadata, RecordingResult};
use crate::models::state::RecorderState;
use crate::processing::pcm_mixer;
use crate::processing::wav_format;
use crate::registry::remote_sources::{RemoteSourceRegistry, TrackHandle};
use crate::storage::wav_writer::{self, WavFileWriter};
use crate::traits::capture_device::{CaptureBackend, CaptureDevice};
use crate::traits::permissions::PermissionProbe;
use crate::traits::session_delegate::SessionDelegate;

/// Counters for one recording session, reset on each `start`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Completed snapshot → mix → append iterations.
    pub mix_cycles: u64,
    /// PCM bytes successfully appended (header excluded).
    pub bytes_written: u64,
    /// Appends that failed and were dropped from the output.
    pub write_errors: u64,
}

/// Internal mutable session state, protected by `parking_lot::Mutex`.
struct SessionState {
    state: RecorderState,
    stats: SessionStats,
}

impl SessionState {
    fn new() -> Self {
        Self {
            state: RecorderState::Idle,
            stats: SessionStats::default(),
        }
    }
}

/// Recording session orchestrator.
///
/// Generic over the microphone backend and permission probe. Owns the
/// registry of remote tracks, the capture thread, and the output writer,
/// and drives the `Idle ↔ Recording` state machine.
///
/// Data flow while recording:
/// ```text
/// [CaptureDevice] → mic buffer ─┐
///                               ├→ [pcm_mixer] → [WavFileWriter]
/// [Registry snapshot] ──────────┘
/// ```
///
/// The session is long-lived and re-enterable: one start/stop cycle at a
/// time, any number of cycles. At most one recording can be active
/// because `start` takes `&mut self` and guards on the state tag.
pub struct RecordingSession<B: CaptureBackend, P: PermissionProbe> {
    backend: B,
    permissions: P,
    config: RecorderConfig,
    registry: Arc<RemoteSourceRegistry>,
    delegate: Option<Arc<dyn SessionDelegate>>,

    session_state: Arc<Mutex<SessionState>>,

    // Capture thread control
    stop_requested: Arc<AtomicBool>,
    capture_handle: Option<thread::JoinHandle<()>>,

    // Output file path for the active cycle
    output_path: Option<PathBuf>,
}

impl<B: CaptureBackend, P: PermissionProbe> RecordingSession<B, P> {
    pub fn new(backend: B, permissions: P, config: RecorderConfig) -> Self {
        Self {
            backend,
            permissions,
            config,
            registry: Arc::new(RemoteSourceRegistry::new()),
            delegate: None,
            session_state: Arc::new(Mutex::new(SessionState::new())),
            stop_requested: Arc::new(AtomicBool::new(false)),
            capture_handle: None,
            output_path: None,
        }
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn SessionDelegate>) {
        self.delegate = Some(delegate);
    }

    /// Current state tag. Never blocks beyond the state lock, never errors.
    pub fn is_recording(&self) -> bool {
        self.session_state.lock().state.is_recording()
    }

    /// Counters for the current (or most recent) cycle.
    pub fn stats(&self) -> SessionStats {
        self.session_state.lock().stats
    }

    /// Registry of remote tracks, shared with the delivery mechanism.
    pub fn registry(&self) -> &Arc<RemoteSourceRegistry> {
        &self.registry
    }

    /// Install a delivery entry for `handle`. Valid in any state; buffers
    /// delivered while idle are retained unused.
    pub fn register_remote_track(&self, handle: TrackHandle) {
        self.registry.register(handle);
    }

    /// Remove `handle` and discard its buffer. Valid in any state.
    pub fn unregister_remote_track(&self, handle: TrackHandle) {
        self.registry.unregister(handle);
    }

    /// Start recording. Transitions: idle → recording.
    ///
    /// Fails with `AlreadyRecording` if a cycle is active,
    /// `PermissionDenied` if the host's microphone permission check says
    /// no, and `AudioInit` if the capture device cannot be opened — in
    /// every failure case the session stays idle and may be retried.
    pub fn start(&mut self, options: StartOptions) -> Result<(), RecorderError> {
        {
            let s = self.session_state.lock();
            if s.state.is_recording() {
                return Err(RecorderError::AlreadyRecording);
            }
        }

        if !self.permissions.has_microphone_permission() {
            return Err(RecorderError::PermissionDenied);
        }

        self.config.validate().map_err(RecorderError::AudioInit)?;

        let path = options.path.unwrap_or_else(|| self.default_output_path());

        let mut writer = WavFileWriter::new(path.clone());
        writer.open(&self.config)?;

        // A failed device open leaves the provisional header on disk; the
        // finalize guard ignores such files.
        let device = self.backend.open(&self.config)?;

        self.output_path = Some(path);
        self.session_state.lock().stats = SessionStats::default();
        self.stop_requested.store(false, Ordering::SeqCst);

        let stop = Arc::clone(&self.stop_requested);
        let registry = Arc::clone(&self.registry);
        let session_state = Arc::clone(&self.session_state);
        let delegate = self.delegate.clone();

        let handle = thread::Builder::new()
            .name("capture-loop".into())
            .spawn(move || {
                capture_loop(device, writer, registry, stop, session_state, delegate);
            })
            .map_err(|e| RecorderError::AudioInit(format!("failed to spawn capture thread: {}", e)))?;

        self.capture_handle = Some(handle);
        self.set_state(RecorderState::Recording);
        Ok(())
    }

    /// Stop recording, finalize the file, return the result.
    /// Transitions: recording → idle.
    ///
    /// Does not return before the capture thread has exited and the
    /// header has been patched, so the output file is safe to read
    /// immediately afterwards.
    pub fn stop(&mut self) -> Result<RecordingResult, RecorderError> {
        {
            let s = self.session_state.lock();
            if !s.state.is_recording() {
                return Err(RecorderError::NotRecording);
            }
        }

        self.stop_requested.store(true, Ordering::SeqCst);
        if let Some(handle) = self.capture_handle.take() {
            let _ = handle.join();
        }

        // Back to idle before finalization so even a storage failure
        // below leaves the session retryable.
        self.set_state(RecorderState::Idle);

        let path = self.output_path.take().ok_or(RecorderError::NoOutputPath)?;

        wav_writer::finalize_header(&path)?;

        let data_bytes = fs::metadata(&path)
            .map(|m| m.len().saturating_sub(wav_format::WAV_HEADER_SIZE as u64))
            .unwrap_or(0);
        let duration_secs = data_bytes as f64 / self.config.byte_rate() as f64;

        let checksum = wav_writer::sha256_file(&path)?;

        let recording_metadata =
            RecordingMetadata::new(duration_secs, &path.to_string_lossy(), &checksum, &self.config);
        if let Err(e) = recording_metadata.save_beside(&path) {
            log::warn!("failed to write metadata sidecar: {}", e);
        }

        let result = RecordingResult {
            file_path: path,
            duration_secs,
            metadata: recording_metadata,
            checksum,
        };

        if let Some(ref delegate) = self.delegate {
            delegate.on_recording_finished(&result);
        }

        Ok(result)
    }

    // --- Internal helpers ---

    fn set_state(&self, new_state: RecorderState) {
        self.session_state.lock().state = new_state;
        if let Some(ref delegate) = self.delegate {
            delegate.on_state_changed(&new_state);
        }
    }

    fn default_output_path(&self) -> PathBuf {
        let timestamp = chrono::Utc::now().timestamp_millis();
        self.config
            .output_directory
            .join(format!("recording_{}.wav", timestamp))
    }
}

/// Capture loop body, one iteration per device buffer.
///
/// Owns the device and the writer exclusively; no other thread touches
/// either while the loop runs. The stop flag is checked once per
/// iteration — the loop is not preemptible mid-read.
fn capture_loop(
    mut device: Box<dyn CaptureDevice>,
    mut writer: WavFileWriter,
    registry: Arc<RemoteSourceRegistry>,
    stop: Arc<AtomicBool>,
    session_state: Arc<Mutex<SessionState>>,
    delegate: Option<Arc<dyn SessionDelegate>>,
) {
    let mut mic_buf = vec![0u8; device.buffer_size().max(2)];

    while !stop.load(Ordering::SeqCst) {
        let read = device.read(&mut mic_buf);
        if read == 0 {
            continue;
        }

        let snapshot = registry.snapshot();
        let mixed = pcm_mixer::mix(&mic_buf[..read], &snapshot);

        match writer.append(&mixed) {
            Ok(()) => {
                let mut s = session_state.lock();
                s.stats.mix_cycles += 1;
                s.stats.bytes_written += mixed.len() as u64;
            }
            Err(e) => {
                // Best-effort: the interval is dropped, recording continues.
                log::error!("failed to write mixed audio: {}", e);
                session_state.lock().stats.write_errors += 1;
                if let Some(ref d) = delegate {
                    d.on_write_error(&e);
                }
            }
        }
    }

    device.stop();
    if let Err(e) = writer.close() {
        log::error!("failed to close recording file: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::time::{Duration, Instant};

    struct GrantAll;
    impl PermissionProbe for GrantAll {
        fn has_microphone_permission(&self) -> bool {
            true
        }
    }

    struct DenyAll;
    impl PermissionProbe for DenyAll {
        fn has_microphone_permission(&self) -> bool {
            false
        }
    }

    /// Plays back a fixed script of mic buffers, then reports empty reads.
    struct ScriptedDevice {
        chunks: VecDeque<Vec<u8>>,
        buffer_size: usize,
        exhausted: Arc<AtomicBool>,
    }

    impl CaptureDevice for ScriptedDevice {
        fn buffer_size(&self) -> usize {
            self.buffer_size
        }

        fn read(&mut self, buf: &mut [u8]) -> usize {
            match self.chunks.pop_front() {
                Some(chunk) => {
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    chunk.len()
                }
                None => {
                    self.exhausted.store(true, Ordering::SeqCst);
                    // Real devices block here; approximate with a nap.
                    thread::sleep(Duration::from_millis(2));
                    0
                }
            }
        }

        fn stop(&mut self) {}
    }

    struct ScriptedBackend {
        chunks: Mutex<VecDeque<Vec<u8>>>,
        buffer_size: usize,
        exhausted: Arc<AtomicBool>,
        fail_open: bool,
    }

    impl ScriptedBackend {
        fn new(chunks: Vec<Vec<u8>>, buffer_size: usize) -> Self {
            Self {
                chunks: Mutex::new(chunks.into()),
                buffer_size,
                exhausted: Arc::new(AtomicBool::new(false)),
                fail_open: false,
            }
        }

        fn failing() -> Self {
            let mut backend = Self::new(Vec::new(), 64);
            backend.fail_open = true;
            backend
        }
    }

    impl CaptureBackend for ScriptedBackend {
        fn open(&self, _config: &RecorderConfig) -> Result<Box<dyn CaptureDevice>, RecorderError> {
            if self.fail_open {
                return Err(RecorderError::AudioInit("device unavailable".into()));
            }
            Ok(Box::new(ScriptedDevice {
                chunks: std::mem::take(&mut *self.chunks.lock()),
                buffer_size: self.buffer_size,
                exhausted: Arc::clone(&self.exhausted),
            }))
        }
    }

    fn wait_until(deadline: Duration, cond: impl Fn() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("webrtc_recorder_session_{}", name))
    }

    fn test_config() -> RecorderConfig {
        RecorderConfig {
            output_directory: std::env::temp_dir(),
            ..Default::default()
        }
    }

    fn cleanup(path: &std::path::Path) {
        fs::remove_file(path).ok();
        fs::remove_file(crate::storage::metadata::sidecar_path(path)).ok();
    }

    #[test]
    fn stop_while_idle_fails_and_touches_no_file() {
        let mut session =
            RecordingSession::new(ScriptedBackend::new(Vec::new(), 64), GrantAll, test_config());

        assert_eq!(session.stop(), Err(RecorderError::NotRecording));
        assert!(!session.is_recording());
    }

    #[test]
    fn start_without_permission_fails() {
        let mut session =
            RecordingSession::new(ScriptedBackend::new(Vec::new(), 64), DenyAll, test_config());

        let err = session.start(StartOptions::default()).unwrap_err();
        assert_eq!(err, RecorderError::PermissionDenied);
        assert!(!session.is_recording());
    }

    #[test]
    fn failed_device_open_leaves_session_idle() {
        let path = temp_path("init_failure.wav");
        let mut session = RecordingSession::new(ScriptedBackend::failing(), GrantAll, test_config());

        let err = session
            .start(StartOptions {
                path: Some(path.clone()),
            })
            .unwrap_err();

        assert!(matches!(err, RecorderError::AudioInit(_)));
        assert!(!session.is_recording());
        assert_eq!(session.stop(), Err(RecorderError::NotRecording));

        cleanup(&path);
    }

    #[test]
    fn second_start_fails_while_first_cycle_runs() {
        let path = temp_path("double_start.wav");
        let mut session =
            RecordingSession::new(ScriptedBackend::new(Vec::new(), 64), GrantAll, test_config());

        session
            .start(StartOptions {
                path: Some(path.clone()),
            })
            .unwrap();
        assert!(session.is_recording());

        assert_eq!(
            session.start(StartOptions::default()),
            Err(RecorderError::AlreadyRecording)
        );
        // First cycle unaffected
        assert!(session.is_recording());

        session.stop().unwrap();
        assert!(!session.is_recording());

        cleanup(&path);
    }

    #[test]
    fn one_second_of_silence_round_trips() {
        let path = temp_path("silence.wav");
        // 1 second at 48 kHz mono 16-bit = 96000 bytes, in 10 device buffers
        let chunks = vec![vec![0u8; 9600]; 10];
        let backend = ScriptedBackend::new(chunks, 9600);
        let exhausted = Arc::clone(&backend.exhausted);

        let mut session = RecordingSession::new(backend, GrantAll, test_config());
        session
            .start(StartOptions {
                path: Some(path.clone()),
            })
            .unwrap();
        assert!(session.is_recording());

        assert!(wait_until(Duration::from_secs(5), || {
            exhausted.load(Ordering::SeqCst)
        }));

        let result = session.stop().unwrap();
        assert!(!session.is_recording());
        assert_eq!(result.file_path, path);
        assert!((result.duration_secs - 1.0).abs() < 1e-9);
        assert_eq!(result.checksum.len(), 64);

        let file_data = fs::read(&path).unwrap();
        assert_eq!(file_data.len(), 44 + 96000);

        let riff_size = u32::from_le_bytes([file_data[4], file_data[5], file_data[6], file_data[7]]);
        assert_eq!(riff_size as usize, file_data.len() - 8);
        let data_size = u32::from_le_bytes([file_data[40], file_data[41], file_data[42], file_data[43]]);
        assert_eq!(data_size as usize, file_data.len() - 44);

        assert!(file_data[44..].iter().all(|&b| b == 0));

        let stats = session.stats();
        assert_eq!(stats.mix_cycles, 10);
        assert_eq!(stats.bytes_written, 96000);
        assert_eq!(stats.write_errors, 0);

        // Sidecar written alongside the recording
        let loaded = RecordingMetadata::load_beside(&path).unwrap();
        assert_eq!(loaded.checksum, result.checksum);

        cleanup(&path);
    }

    #[test]
    fn full_scale_remote_clamps_to_i16_max() {
        let path = temp_path("clamp.wav");
        let max_sample: Vec<u8> = i16::MAX.to_le_bytes().to_vec();
        let loud: Vec<u8> = max_sample.iter().cycle().take(960).copied().collect();

        let backend = ScriptedBackend::new(vec![loud.clone()], 960);
        let exhausted = Arc::clone(&backend.exhausted);

        let mut session = RecordingSession::new(backend, GrantAll, test_config());
        let handle = TrackHandle::allocate();
        session.register_remote_track(handle);
        session.registry().deliver(handle, loud);

        session
            .start(StartOptions {
                path: Some(path.clone()),
            })
            .unwrap();
        assert!(wait_until(Duration::from_secs(5), || {
            exhausted.load(Ordering::SeqCst)
        }));
        session.stop().unwrap();

        let file_data = fs::read(&path).unwrap();
        assert_eq!(file_data.len(), 44 + 960);
        for pair in file_data[44..].chunks_exact(2) {
            assert_eq!(i16::from_le_bytes([pair[0], pair[1]]), i16::MAX);
        }

        cleanup(&path);
    }

    #[test]
    fn session_is_reenterable_across_cycles() {
        let first = temp_path("cycle_one.wav");
        let second = temp_path("cycle_two.wav");

        let mut session =
            RecordingSession::new(ScriptedBackend::new(Vec::new(), 64), GrantAll, test_config());

        session
            .start(StartOptions {
                path: Some(first.clone()),
            })
            .unwrap();
        session.stop().unwrap();

        // Same session, second cycle — new device from the backend
        session
            .start(StartOptions {
                path: Some(second.clone()),
            })
            .unwrap();
        assert!(session.is_recording());
        session.stop().unwrap();

        cleanup(&first);
        cleanup(&second);
    }

    #[test]
    fn registry_operations_are_valid_while_idle() {
        let session =
            RecordingSession::new(ScriptedBackend::new(Vec::new(), 64), GrantAll, test_config());

        let handle = TrackHandle::allocate();
        session.register_remote_track(handle);
        session.registry().deliver(handle, vec![1, 2, 3, 4]);
        assert!(session.registry().contains(handle));

        session.unregister_remote_track(handle);
        assert!(!session.registry().contains(handle));
    }

    #[test]
    fn is_recording_is_idempotent() {
        let session =
            RecordingSession::new(ScriptedBackend::new(Vec::new(), 64), GrantAll, test_config());

        for _ in 0..10 {
            assert!(!session.is_recording());
        }
    }

    struct RecordingDelegate {
        states: Mutex<Vec<RecorderState>>,
        write_errors: Mutex<Vec<RecorderError>>,
        finished: AtomicBool,
    }

    impl RecordingDelegate {
        fn new() -> Self {
            Self {
                states: Mutex::new(Vec::new()),
                write_errors: Mutex::new(Vec::new()),
                finished: AtomicBool::new(false),
            }
        }
    }

    impl SessionDelegate for RecordingDelegate {
        fn on_state_changed(&self, state: &RecorderState) {
            self.states.lock().push(*state);
        }

        fn on_write_error(&self, error: &RecorderError) {
            self.write_errors.lock().push(error.clone());
        }

        fn on_recording_finished(&self, _result: &RecordingResult) {
            self.finished.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn delegate_observes_state_changes_and_completion() {
        let path = temp_path("delegate.wav");
        let delegate = Arc::new(RecordingDelegate::new());

        let mut session =
            RecordingSession::new(ScriptedBackend::new(Vec::new(), 64), GrantAll, test_config());
        session.set_delegate(delegate.clone());

        session
            .start(StartOptions {
                path: Some(path.clone()),
            })
            .unwrap();
        session.stop().unwrap();

        assert_eq!(
            *delegate.states.lock(),
            vec![RecorderState::Recording, RecorderState::Idle]
        );
        assert!(delegate.finished.load(Ordering::SeqCst));

        cleanup(&path);
    }

    #[test]
    fn write_failures_are_counted_and_loop_continues() {
        let path = temp_path("unwritable.wav");
        let exhausted = Arc::new(AtomicBool::new(false));
        let device: Box<dyn CaptureDevice> = Box::new(ScriptedDevice {
            chunks: vec![vec![7u8; 64]; 3].into(),
            buffer_size: 64,
            exhausted: Arc::clone(&exhausted),
        });

        // Never opened, so every append fails
        let writer = WavFileWriter::new(path.clone());

        let registry = Arc::new(RemoteSourceRegistry::new());
        let session_state = Arc::new(Mutex::new(SessionState::new()));
        let stop = Arc::new(AtomicBool::new(false));
        let delegate = Arc::new(RecordingDelegate::new());

        let handle = {
            let registry = Arc::clone(&registry);
            let stop = Arc::clone(&stop);
            let session_state = Arc::clone(&session_state);
            let delegate: Arc<dyn SessionDelegate> = delegate.clone();
            thread::spawn(move || {
                capture_loop(device, writer, registry, stop, session_state, Some(delegate));
            })
        };

        // All three buffers are consumed despite every write failing
        assert!(wait_until(Duration::from_secs(5), || {
            exhausted.load(Ordering::SeqCst)
        }));
        stop.store(true, Ordering::SeqCst);
        handle.join().unwrap();

        let stats = session_state.lock().stats;
        assert_eq!(stats.write_errors, 3);
        assert_eq!(stats.mix_cycles, 0);
        assert_eq!(stats.bytes_written, 0);

        let reported = delegate.write_errors.lock();
        assert_eq!(reported.len(), 3);
        assert!(reported.iter().all(|e| matches!(e, RecorderError::Storage(_))));

        assert!(!path.exists());
    }
}
