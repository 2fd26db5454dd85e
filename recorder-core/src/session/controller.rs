use std::path::{Path, PathBuf};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

use crate::models::config::RecorderConfig;
use crate::models::error::RecorderError;
use crate::models::format::OutputFormat;
use crate::models::recording_result::RecordingResult;
use crate::models::state::RecorderState;
use crate::processing::amplitude_window::AmplitudeWindow;
use crate::session::capture::CaptureSession;
use crate::storage::relocate::{self, Relocation};
use crate::traits::input_line::LineProvider;
use crate::traits::recorder_delegate::RecorderDelegate;

/// Notifications a front end subscribes to.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    StateChanged(RecorderState),
    Error(RecorderError),
    Saved(PathBuf),
    Discarded(PathBuf),
}

/// Outcome of `RecorderController::toggle`.
#[derive(Debug, Clone, PartialEq)]
pub enum Toggle {
    Started,
    Stopped(RecordingResult),
}

/// Fans controller events out to every live subscriber.
#[derive(Default)]
struct EventHub {
    subscribers: Mutex<Vec<Sender<ControllerEvent>>>,
}

impl EventHub {
    fn subscribe(&self) -> Receiver<ControllerEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    fn publish(&self, event: ControllerEvent) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl RecorderDelegate for EventHub {
    fn on_state_changed(&self, state: &RecorderState) {
        self.publish(ControllerEvent::StateChanged(state.clone()));
    }

    fn on_error(&self, error: &RecorderError) {
        self.publish(ControllerEvent::Error(error.clone()));
    }

    fn on_recording_finished(&self, result: &RecordingResult) {
        log::debug!("Recording {} ready at {}", result.id, result.temp_path.display());
    }
}

/// Owns everything a recorder front end needs: the capture session, the
/// live amplitude window, the chosen output format and the stopped-but-
/// unsaved recording.
///
/// The worker never touches UI state. It pushes amplitudes into a bounded
/// queue (dropping them when full) and the UI drains that queue with
/// `poll_amplitudes` on its own schedule.
pub struct RecorderController<P: LineProvider> {
    session: CaptureSession<P>,
    hub: Arc<EventHub>,
    amplitude_tx: Sender<f32>,
    amplitude_rx: Receiver<f32>,
    window: AmplitudeWindow,
    format: OutputFormat,
    pending: Option<RecordingResult>,
}

impl<P: LineProvider> RecorderController<P> {
    pub fn new(provider: P) -> Self {
        Self::from_session(CaptureSession::new(provider))
    }

    pub fn with_config(provider: P, config: RecorderConfig) -> Result<Self, RecorderError> {
        Ok(Self::from_session(CaptureSession::with_config(provider, config)?))
    }

    fn from_session(mut session: CaptureSession<P>) -> Self {
        let hub = Arc::new(EventHub::default());
        session.set_delegate(hub.clone());

        let config = session.config();
        let (amplitude_tx, amplitude_rx) = crossbeam_channel::bounded(config.amplitude_capacity);
        let window = AmplitudeWindow::new(config.window_len);

        Self {
            session,
            hub,
            amplitude_tx,
            amplitude_rx,
            window,
            format: OutputFormat::default(),
            pending: None,
        }
    }

    /// Receive state changes, errors and save notifications.
    pub fn subscribe(&self) -> Receiver<ControllerEvent> {
        self.hub.subscribe()
    }

    pub fn state(&self) -> RecorderState {
        self.session.state()
    }

    pub fn is_recording(&self) -> bool {
        self.session.is_recording()
    }

    /// The stopped recording waiting to be saved or discarded.
    pub fn pending(&self) -> Option<&RecordingResult> {
        self.pending.as_ref()
    }

    pub fn selected_format(&self) -> OutputFormat {
        self.format
    }

    pub fn set_format(&mut self, format: OutputFormat) {
        self.format = format;
    }

    /// Default file name for the save prompt, matching the selected format.
    pub fn suggested_file_name(&self) -> String {
        Path::new(&self.session.config().default_file_name)
            .with_extension(self.format.extension())
            .to_string_lossy()
            .into_owned()
    }

    pub fn session(&self) -> &CaptureSession<P> {
        &self.session
    }

    /// Start recording. An unsaved previous recording is discarded.
    pub fn start(&mut self) -> Result<(), RecorderError> {
        if self.session.is_recording() {
            return self.report(Err(RecorderError::AlreadyRecording));
        }

        // The pending take shares the temp path, so only drop it once the
        // device looks usable.
        if self.pending.is_some() && !self.session.provider().is_available() {
            let device = self.session.provider().device_name();
            return self.report(Err(RecorderError::DeviceUnavailable(device)));
        }

        if let Some(previous) = self.pending.take() {
            log::warn!("Discarding unsaved recording {}", previous.id);
            if let Err(e) = self.remove_temp(&previous.temp_path) {
                log::warn!("{}", e);
            }
        }

        self.reset_window();
        let tx = self.amplitude_tx.clone();
        let on_amplitude = Arc::new(move |amplitude: f32| {
            // The UI only shows the tail, so a full queue just drops this value.
            let _ = tx.try_send(amplitude);
        });

        let started = self.session.start(on_amplitude);
        self.report(started)
    }

    /// Stop recording and hold the result as the pending recording.
    pub fn stop(&mut self) -> Result<RecordingResult, RecorderError> {
        let stopped = self.session.stop();
        self.reset_window();

        match stopped {
            Ok(result) => {
                self.pending = Some(result.clone());
                Ok(result)
            }
            // Worker failures already reached subscribers through the delegate.
            Err(RecorderError::NotRecording) => self.report(Err(RecorderError::NotRecording)),
            Err(e) => Err(e),
        }
    }

    /// Start if idle, stop if recording.
    pub fn toggle(&mut self) -> Result<Toggle, RecorderError> {
        if self.session.is_recording() {
            self.stop().map(Toggle::Stopped)
        } else {
            self.start().map(|()| Toggle::Started)
        }
    }

    /// Save the pending recording to `dest` in the selected format.
    pub fn save(&mut self, dest: &Path) -> Result<Relocation, RecorderError> {
        self.save_with_format(dest, self.format)
    }

    /// Save the pending recording to `dest` as `format`.
    ///
    /// The extension of `dest` is replaced by the format's. On failure the
    /// recording stays pending so the save can be retried.
    pub fn save_with_format(&mut self, dest: &Path, format: OutputFormat) -> Result<Relocation, RecorderError> {
        let Some(pending) = self.pending.as_ref() else {
            return self.report(Err(RecorderError::NotRecording));
        };

        let target = relocate::destination_for(dest, format);
        let relocation = match relocate::relocate(&pending.temp_path, &target) {
            Ok(relocation) => relocation,
            Err(e) => return self.report(Err(e)),
        };

        self.pending = None;
        self.format = format;
        self.hub.publish(ControllerEvent::Saved(relocation.path.clone()));
        Ok(relocation)
    }

    /// Throw the pending recording away.
    pub fn discard(&mut self) -> Result<(), RecorderError> {
        let Some(pending) = self.pending.take() else {
            return self.report(Err(RecorderError::NotRecording));
        };
        let removed = self.remove_temp(&pending.temp_path);
        self.report(removed)
    }

    /// Drain queued amplitudes into the window and return it, oldest first.
    pub fn poll_amplitudes(&mut self) -> Vec<f32> {
        self.window.extend(self.amplitude_rx.try_iter());
        self.window.snapshot()
    }

    /// The window as of the last poll, oldest first.
    pub fn amplitudes(&self) -> Vec<f32> {
        self.window.snapshot()
    }

    fn reset_window(&mut self) {
        self.amplitude_rx.try_iter().for_each(drop);
        self.window.clear();
    }

    fn remove_temp(&self, path: &Path) -> Result<(), RecorderError> {
        relocate::discard(path)?;
        self.hub.publish(ControllerEvent::Discarded(path.to_path_buf()));
        Ok(())
    }

    /// Forward an error to subscribers before handing it back.
    fn report<T>(&self, result: Result<T, RecorderError>) -> Result<T, RecorderError> {
        if let Err(ref e) = result {
            self.hub.publish(ControllerEvent::Error(e.clone()));
        }
        result
    }
}
