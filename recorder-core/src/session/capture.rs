use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::models::config::RecorderConfig;
use crate::models::error::RecorderError;
use crate::models::format::{AudioFormat, CAPTURE_FORMAT};
use crate::models::recording_result::RecordingResult;
use crate::models::state::RecorderState;
use crate::processing::amplitude::peak_amplitude;
use crate::storage::relocate;
use crate::storage::wav_writer::WavFileWriter;
use crate::traits::input_line::{AmplitudeCallback, InputLine, LineProvider};
use crate::traits::recorder_delegate::RecorderDelegate;

/// How often `stop` checks whether the worker has exited.
const JOIN_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Internal mutable session state, protected by `parking_lot::Mutex`.
struct SessionState {
    state: RecorderState,
    amplitude: f32,
    buffers_read: u64,
    data_bytes: u64,
}

impl SessionState {
    fn new() -> Self {
        Self {
            state: RecorderState::Idle,
            amplitude: 0.0,
            buffers_read: 0,
            data_bytes: 0,
        }
    }

    fn reset_counters(&mut self) {
        self.amplitude = 0.0;
        self.buffers_read = 0;
        self.data_bytes = 0;
    }
}

/// A live capture: the open line and the thread reading it.
struct Worker {
    line: Arc<dyn InputLine>,
    handle: thread::JoinHandle<Result<RecordingResult, RecorderError>>,
}

/// Everything the capture thread owns.
struct WorkerContext {
    line: Arc<dyn InputLine>,
    writer: WavFileWriter,
    format: AudioFormat,
    buffer_size: usize,
    running: Arc<AtomicBool>,
    session_state: Arc<Mutex<SessionState>>,
    delegate: Option<Arc<dyn RecorderDelegate>>,
    on_amplitude: AmplitudeCallback,
}

/// The capture loop: one input line, one worker thread, one temp file.
///
/// Generic over the capture backend via the `LineProvider` trait.
///
/// ```text
/// [InputLine] → read(buffer_size) ─┬→ [WavFileWriter] → temp file
///                                  └→ peak_amplitude → on_amplitude
/// ```
///
/// At most one worker exists at a time. `start` while it is alive fails
/// with `AlreadyRecording`; `stop` with none fails with `NotRecording`.
pub struct CaptureSession<P: LineProvider> {
    provider: P,
    config: RecorderConfig,
    session_state: Arc<Mutex<SessionState>>,
    delegate: Option<Arc<dyn RecorderDelegate>>,
    running: Arc<AtomicBool>,
    worker: Option<Worker>,
    /// A worker that outlived the join timeout. It still holds the temp
    /// file, so no new recording starts until it exits.
    detached: Option<Worker>,
}

impl<P: LineProvider> CaptureSession<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            config: RecorderConfig::default(),
            session_state: Arc::new(Mutex::new(SessionState::new())),
            delegate: None,
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
            detached: None,
        }
    }

    pub fn with_config(provider: P, config: RecorderConfig) -> Result<Self, RecorderError> {
        config.validate().map_err(RecorderError::ConfigurationFailed)?;
        let mut session = Self::new(provider);
        session.config = config;
        Ok(session)
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn RecorderDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn state(&self) -> RecorderState {
        self.session_state.lock().state.clone()
    }

    /// Amplitude of the most recent buffer.
    pub fn current_amplitude(&self) -> f32 {
        self.session_state.lock().amplitude
    }

    pub fn buffers_read(&self) -> u64 {
        self.session_state.lock().buffers_read
    }

    pub fn is_recording(&self) -> bool {
        self.worker.is_some() && self.session_state.lock().state.is_recording()
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Open the input line and start streaming it to the temp file.
    ///
    /// Transitions: idle → recording. `on_amplitude` fires on the worker
    /// thread once per buffer.
    pub fn start(&mut self, on_amplitude: AmplitudeCallback) -> Result<(), RecorderError> {
        if self.worker.is_some() {
            if !matches!(self.session_state.lock().state, RecorderState::Failed(_)) {
                return Err(RecorderError::AlreadyRecording);
            }
            // The previous worker died on its own; clear it out first.
            if let Err(e) = self.stop() {
                log::debug!("Reaped failed capture session: {}", e);
            }
        }
        self.reap_detached()?;

        let line = self.provider.open(&CAPTURE_FORMAT)?;

        let mut writer = WavFileWriter::new(self.config.temp_path.clone(), CAPTURE_FORMAT);
        if let Err(e) = writer.open() {
            line.close();
            return Err(e);
        }

        self.session_state.lock().reset_counters();
        self.running.store(true, Ordering::SeqCst);
        self.set_state(RecorderState::Recording { duration_secs: 0.0 });

        let context = WorkerContext {
            line: Arc::clone(&line),
            writer,
            format: CAPTURE_FORMAT,
            buffer_size: self.config.buffer_size,
            running: Arc::clone(&self.running),
            session_state: Arc::clone(&self.session_state),
            delegate: self.delegate.clone(),
            on_amplitude,
        };

        let spawned = thread::Builder::new()
            .name("audio-capture".into())
            .spawn(move || capture_loop(context));

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                line.close();
                let _ = relocate::discard(&self.config.temp_path);
                self.set_state(RecorderState::Idle);
                return Err(RecorderError::IoFailure(format!("failed to spawn capture thread: {}", e)));
            }
        };

        log::info!(
            "Recording from {} to {}",
            self.provider.device_name(),
            self.config.temp_path.display()
        );
        self.worker = Some(Worker { line, handle });
        Ok(())
    }

    /// Stop the line, join the worker and finalize the temp file.
    ///
    /// Transitions: recording → stopping → completed → idle. Blocks until the
    /// worker exits or the join timeout elapses.
    ///
    /// If the worker already failed, its error is returned here once and the
    /// partial temp file is discarded.
    pub fn stop(&mut self) -> Result<RecordingResult, RecorderError> {
        let Some(worker) = self.worker.take() else {
            return Err(RecorderError::NotRecording);
        };

        let already_failed = matches!(self.session_state.lock().state, RecorderState::Failed(_));
        if !already_failed {
            self.set_state(RecorderState::Stopping);
        }

        self.running.store(false, Ordering::SeqCst);
        worker.line.stop();
        worker.line.close();

        if !wait_for_exit(&worker.handle, self.config.join_timeout) {
            let error = RecorderError::Timeout(self.config.join_timeout);
            log::error!("Capture worker did not exit within {:?}", self.config.join_timeout);
            self.detached = Some(worker);
            self.fail(&error);
            return Err(error);
        }

        match join(worker.handle).and_then(|r| r) {
            Ok(result) => {
                log::info!(
                    "Recording stopped: {} bytes in {} buffers ({:.2}s)",
                    result.data_bytes,
                    result.buffers_read,
                    result.duration_secs
                );
                self.set_state(RecorderState::Completed(Box::new(result.clone())));
                if let Some(ref delegate) = self.delegate {
                    delegate.on_recording_finished(&result);
                }

                // Reset for next session
                self.session_state.lock().state = RecorderState::Idle;
                Ok(result)
            }
            Err(error) => {
                if !already_failed {
                    self.fail(&error);
                }
                if let Err(e) = relocate::discard(&self.config.temp_path) {
                    log::warn!("{}", e);
                }
                self.session_state.lock().state = RecorderState::Idle;
                Err(error)
            }
        }
    }

    // --- Internal helpers ---

    /// Collect a worker left behind by a timed-out `stop`, or fail with
    /// `Timeout` if it is still running.
    fn reap_detached(&mut self) -> Result<(), RecorderError> {
        let Some(detached) = self.detached.take() else {
            return Ok(());
        };
        if !detached.handle.is_finished() {
            self.detached = Some(detached);
            return Err(RecorderError::Timeout(self.config.join_timeout));
        }

        match join(detached.handle).and_then(|r| r) {
            Ok(result) => log::warn!("Dropping recording {} from a timed-out capture", result.id),
            Err(e) => log::warn!("Timed-out capture ended with: {}", e),
        }
        self.session_state.lock().state = RecorderState::Idle;
        Ok(())
    }

    fn set_state(&self, new_state: RecorderState) {
        set_state(&self.session_state, &self.delegate, new_state);
    }

    fn fail(&self, error: &RecorderError) {
        self.set_state(RecorderState::Failed(error.clone()));
        if let Some(ref delegate) = self.delegate {
            delegate.on_error(error);
        }
    }
}

impl<P: LineProvider> Drop for CaptureSession<P> {
    fn drop(&mut self) {
        if self.worker.is_some() {
            if let Err(e) = self.stop() {
                log::warn!("Capture session dropped while recording: {}", e);
            }
        }
    }
}

fn set_state(
    session_state: &Mutex<SessionState>,
    delegate: &Option<Arc<dyn RecorderDelegate>>,
    new_state: RecorderState,
) {
    session_state.lock().state = new_state.clone();
    if let Some(delegate) = delegate {
        delegate.on_state_changed(&new_state);
    }
}

/// Worker body: read → stream to file → meter → report, until the line runs dry.
fn capture_loop(mut ctx: WorkerContext) -> Result<RecordingResult, RecorderError> {
    let mut buffer = vec![0u8; ctx.buffer_size];
    let mut buffers_read = 0u64;

    let outcome = loop {
        let bytes_read = match ctx.line.read(&mut buffer) {
            Ok(0) => break Ok(()),
            Ok(n) => n,
            // Errors raised while the line is being torn down are expected.
            Err(_) if !ctx.running.load(Ordering::SeqCst) => break Ok(()),
            Err(e) => break Err(e),
        };

        let chunk = &buffer[..bytes_read];
        if let Err(e) = ctx.writer.write(chunk) {
            break Err(e);
        }
        buffers_read += 1;

        let amplitude = peak_amplitude(chunk);
        {
            let mut s = ctx.session_state.lock();
            s.amplitude = amplitude;
            s.buffers_read = buffers_read;
            s.data_bytes = ctx.writer.data_bytes();
            if s.state.is_recording() {
                s.state = RecorderState::Recording {
                    duration_secs: ctx.format.duration_of(s.data_bytes),
                };
            }
        }
        (ctx.on_amplitude)(amplitude);
    };

    match outcome {
        Ok(()) => {
            let checksum = ctx.writer.close()?;
            Ok(RecordingResult::new(
                ctx.writer.file_path().to_path_buf(),
                ctx.format,
                ctx.writer.data_bytes(),
                buffers_read,
                checksum,
            ))
        }
        Err(error) => {
            log::error!("Capture failed after {} buffers: {}", buffers_read, error);
            ctx.line.close();
            if ctx.writer.is_open() {
                if let Err(e) = ctx.writer.close() {
                    log::warn!("Could not finalize partial recording: {}", e);
                }
            }
            set_state(&ctx.session_state, &ctx.delegate, RecorderState::Failed(error.clone()));
            if let Some(ref delegate) = ctx.delegate {
                delegate.on_error(&error);
            }
            Err(error)
        }
    }
}

/// Wait up to `timeout` for `handle` to finish. Returns whether it did.
fn wait_for_exit<T>(handle: &thread::JoinHandle<T>, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(JOIN_POLL_INTERVAL);
    }
    true
}

fn join<T>(handle: thread::JoinHandle<T>) -> Result<T, RecorderError> {
    handle
        .join()
        .map_err(|_| RecorderError::IoFailure("capture worker panicked".into()))
}
