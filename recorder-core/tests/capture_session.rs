mod common;

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use approx::assert_relative_eq;
use parking_lot::Mutex;

use common::{buffer_with_peak, wait_until, Chunk, ScriptedProvider};
use recorder_core::processing::wav_format;
use recorder_core::{
    AmplitudeCallback, CaptureSession, RecorderConfig, RecorderDelegate, RecorderError, RecorderState,
    RecordingResult,
};

const WAIT: Duration = Duration::from_secs(5);

fn session_in(dir: &tempfile::TempDir, provider: ScriptedProvider) -> CaptureSession<ScriptedProvider> {
    let config = RecorderConfig::with_temp_path(dir.path().join("temp_recording.wav"));
    CaptureSession::with_config(provider, config).unwrap()
}

fn amplitude_channel() -> (AmplitudeCallback, crossbeam_channel::Receiver<f32>) {
    let (tx, rx) = crossbeam_channel::unbounded();
    let callback: AmplitudeCallback = Arc::new(move |amplitude| {
        let _ = tx.send(amplitude);
    });
    (callback, rx)
}

fn recv_n(rx: &crossbeam_channel::Receiver<f32>, n: usize) -> Vec<f32> {
    (0..n).map(|_| rx.recv_timeout(WAIT).expect("amplitude")).collect()
}

#[derive(Default)]
struct EventLog {
    states: Mutex<Vec<&'static str>>,
    errors: Mutex<Vec<RecorderError>>,
    finished: Mutex<Vec<RecordingResult>>,
}

impl RecorderDelegate for EventLog {
    fn on_state_changed(&self, state: &RecorderState) {
        self.states.lock().push(state.label());
    }

    fn on_error(&self, error: &RecorderError) {
        self.errors.lock().push(error.clone());
    }

    fn on_recording_finished(&self, result: &RecordingResult) {
        self.finished.lock().push(result.clone());
    }
}

#[test]
fn streams_every_buffer_to_temp_file() {
    let dir = tempfile::tempdir().unwrap();
    let provider = ScriptedProvider::with_buffers(5);
    let mut session = session_in(&dir, provider.clone());
    let (callback, rx) = amplitude_channel();

    session.start(callback).unwrap();
    assert!(session.is_recording());

    let amplitudes = recv_n(&rx, 5);
    let result = session.stop().unwrap();

    assert_eq!(result.buffers_read, 5);
    assert_eq!(result.data_bytes, 5 * 1024);
    assert_relative_eq!(result.duration_secs, 5120.0 / 88_200.0);
    assert_eq!(result.checksum.len(), 64);

    let on_disk = fs::read(&result.temp_path).unwrap();
    assert_eq!(on_disk.len(), 44 + 5 * 1024);
    assert_eq!(wav_format::parse_data_size(&on_disk), Some(5 * 1024));

    for (i, amplitude) in amplitudes.iter().enumerate() {
        assert_relative_eq!(*amplitude, (i as f32 + 1.0) * 1000.0 / 32768.0);
    }

    assert!(session.state().is_idle());
    assert!(!session.is_recording());
    assert!(provider.last_line().unwrap().is_closed());
}

#[test]
fn near_full_scale_sample_reports_just_under_one() {
    let dir = tempfile::tempdir().unwrap();
    let provider = ScriptedProvider::new(vec![Chunk::Data(buffer_with_peak(32767))]);
    let mut session = session_in(&dir, provider);
    let (callback, rx) = amplitude_channel();

    session.start(callback).unwrap();
    let amplitude = recv_n(&rx, 1)[0];
    session.stop().unwrap();

    assert_relative_eq!(amplitude, 0.99997, epsilon = 1e-5);
    assert_relative_eq!(session.current_amplitude(), amplitude);
}

#[test]
fn temp_file_grows_while_recording() {
    let dir = tempfile::tempdir().unwrap();
    let provider = ScriptedProvider::with_buffers(2);
    let mut session = session_in(&dir, provider);
    let (callback, rx) = amplitude_channel();

    session.start(callback).unwrap();
    recv_n(&rx, 2);

    let temp = dir.path().join("temp_recording.wav");
    assert_eq!(fs::metadata(&temp).unwrap().len(), 44 + 2048);

    session.stop().unwrap();
}

#[test]
fn second_start_is_rejected_without_new_line() {
    let dir = tempfile::tempdir().unwrap();
    let provider = ScriptedProvider::with_buffers(1);
    let mut session = session_in(&dir, provider.clone());
    let (callback, _rx) = amplitude_channel();

    session.start(callback.clone()).unwrap();
    let err = session.start(callback).unwrap_err();

    assert_eq!(err, RecorderError::AlreadyRecording);
    assert_eq!(provider.opens(), 1);
    assert!(session.is_recording());

    session.stop().unwrap();
}

#[test]
fn stop_without_start_touches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session_in(&dir, ScriptedProvider::with_buffers(1));

    assert_eq!(session.stop().unwrap_err(), RecorderError::NotRecording);
    assert!(!dir.path().join("temp_recording.wav").exists());
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn stop_twice_reports_not_recording() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session_in(&dir, ScriptedProvider::with_buffers(1));
    let (callback, _rx) = amplitude_channel();

    session.start(callback).unwrap();
    session.stop().unwrap();
    assert_eq!(session.stop().unwrap_err(), RecorderError::NotRecording);
}

#[test]
fn unavailable_device_creates_no_temp_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session_in(&dir, ScriptedProvider::unavailable());
    let (callback, _rx) = amplitude_channel();

    let err = session.start(callback).unwrap_err();

    assert!(matches!(err, RecorderError::DeviceUnavailable(_)));
    assert!(!dir.path().join("temp_recording.wav").exists());
    assert!(session.state().is_idle());
    assert!(!session.is_recording());
}

#[test]
fn unwritable_temp_path_closes_line() {
    let dir = tempfile::tempdir().unwrap();
    // A directory where the file should be.
    let temp = dir.path().join("occupied");
    fs::create_dir(&temp).unwrap();

    let provider = ScriptedProvider::with_buffers(1);
    let mut session =
        CaptureSession::with_config(provider.clone(), RecorderConfig::with_temp_path(&temp)).unwrap();
    let (callback, _rx) = amplitude_channel();

    let err = session.start(callback).unwrap_err();

    assert!(matches!(err, RecorderError::IoFailure(_)));
    assert!(provider.last_line().unwrap().is_closed());
    assert!(!session.is_recording());
}

#[test]
fn read_error_fails_session_and_reports_once() {
    let dir = tempfile::tempdir().unwrap();
    let failure = RecorderError::IoFailure("device unplugged".into());
    let provider = ScriptedProvider::new(vec![
        Chunk::Data(buffer_with_peak(100)),
        Chunk::Data(buffer_with_peak(200)),
        Chunk::Fail(failure.clone()),
    ]);
    let mut session = session_in(&dir, provider.clone());
    let log = Arc::new(EventLog::default());
    session.set_delegate(log.clone());
    let (callback, rx) = amplitude_channel();

    session.start(callback).unwrap();
    recv_n(&rx, 2);
    assert!(wait_until(WAIT, || !log.errors.lock().is_empty()));

    assert_eq!(session.state(), RecorderState::Failed(failure.clone()));
    assert!(!session.is_recording());
    assert!(provider.last_line().unwrap().is_closed());

    // What was captured before the failure is a finalized WAV.
    let temp = dir.path().join("temp_recording.wav");
    let on_disk = fs::read(&temp).unwrap();
    assert_eq!(wav_format::parse_data_size(&on_disk), Some(2048));

    assert_eq!(session.stop().unwrap_err(), failure);
    assert!(!temp.exists());
    assert!(session.state().is_idle());
    assert_eq!(log.errors.lock().len(), 1);
    assert!(log.finished.lock().is_empty());
}

#[test]
fn restart_after_failure_without_stop() {
    let dir = tempfile::tempdir().unwrap();
    let provider = ScriptedProvider::new(vec![Chunk::Fail(RecorderError::IoFailure("glitch".into()))]);
    let mut session = session_in(&dir, provider.clone());
    let (callback, rx) = amplitude_channel();

    session.start(callback.clone()).unwrap();
    assert!(wait_until(WAIT, || matches!(session.state(), RecorderState::Failed(_))));

    provider.set_script(vec![Chunk::Data(buffer_with_peak(5))]);
    session.start(callback).unwrap();
    recv_n(&rx, 1);
    let result = session.stop().unwrap();

    assert_eq!(provider.opens(), 2);
    assert_eq!(result.buffers_read, 1);
}

#[test]
fn stuck_line_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let provider = ScriptedProvider::new(Vec::new());
    provider.set_ignore_stop(true);
    let config = RecorderConfig {
        join_timeout: Duration::from_millis(50),
        ..RecorderConfig::with_temp_path(dir.path().join("temp_recording.wav"))
    };
    let mut session = CaptureSession::with_config(provider.clone(), config).unwrap();
    let log = Arc::new(EventLog::default());
    session.set_delegate(log.clone());
    let (callback, _rx) = amplitude_channel();

    session.start(callback).unwrap();
    let err = session.stop().unwrap_err();

    assert_eq!(err, RecorderError::Timeout(Duration::from_millis(50)));
    assert!(matches!(session.state(), RecorderState::Failed(RecorderError::Timeout(_))));
    assert_eq!(log.errors.lock().as_slice(), &[err]);

    provider.last_line().unwrap().release();
}

#[test]
fn timed_out_worker_never_writes_into_next_recording() {
    let dir = tempfile::tempdir().unwrap();
    let provider = ScriptedProvider::new(Vec::new());
    provider.set_ignore_stop(true);
    let config = RecorderConfig {
        join_timeout: Duration::from_millis(50),
        ..RecorderConfig::with_temp_path(dir.path().join("temp_recording.wav"))
    };
    let mut session = CaptureSession::with_config(provider.clone(), config).unwrap();
    let (callback, rx) = amplitude_channel();

    session.start(callback.clone()).unwrap();
    assert!(matches!(session.stop(), Err(RecorderError::Timeout(_))));
    let stuck = provider.last_line().unwrap();

    // The old worker still owns the temp file.
    assert_eq!(session.start(callback.clone()).unwrap_err(), RecorderError::Timeout(Duration::from_millis(50)));
    assert_eq!(provider.opens(), 1);

    // It delivers one late buffer, then exits.
    stuck.push(Chunk::Data(vec![0xAA; 1024]));
    stuck.release();

    provider.set_ignore_stop(false);
    provider.set_script((0..4).map(|_| Chunk::Data(vec![0x11; 1024])).collect());
    assert!(wait_until(WAIT, || session.start(callback.clone()).is_ok()));
    recv_n(&rx, 5);
    let result = session.stop().unwrap();

    assert_eq!(result.data_bytes, 4 * 1024);
    let on_disk = fs::read(&result.temp_path).unwrap();
    assert_eq!(on_disk.len(), 44 + 4 * 1024);
    assert!(on_disk[44..].iter().all(|&b| b == 0x11));
    assert_eq!(provider.opens(), 2);
}

#[test]
fn delegate_sees_full_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session_in(&dir, ScriptedProvider::with_buffers(3));
    let log = Arc::new(EventLog::default());
    session.set_delegate(log.clone());
    let (callback, rx) = amplitude_channel();

    session.start(callback).unwrap();
    recv_n(&rx, 3);
    let result = session.stop().unwrap();

    assert_eq!(log.states.lock().as_slice(), &["recording", "stopping", "completed"]);
    assert_eq!(log.finished.lock().as_slice(), &[result]);
    assert!(log.errors.lock().is_empty());
}

#[test]
fn invalid_config_is_rejected() {
    let config = RecorderConfig {
        buffer_size: 3,
        ..Default::default()
    };
    let err = CaptureSession::with_config(ScriptedProvider::with_buffers(1), config).err();
    assert!(matches!(err, Some(RecorderError::ConfigurationFailed(_))));
}

#[test]
fn dropping_a_live_session_joins_the_worker() {
    let dir = tempfile::tempdir().unwrap();
    let provider = ScriptedProvider::with_buffers(1);
    let mut session = session_in(&dir, provider.clone());
    let (callback, rx) = amplitude_channel();

    session.start(callback).unwrap();
    recv_n(&rx, 1);
    drop(session);

    assert!(provider.last_line().unwrap().is_closed());
    let on_disk = fs::read(dir.path().join("temp_recording.wav")).unwrap();
    assert_eq!(wav_format::parse_data_size(&on_disk), Some(1024));
}
