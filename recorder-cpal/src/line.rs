//! cpal-backed input line and its provider.

use std::sync::Arc;
use std::thread;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

use recorder_core::{AudioFormat, InputLine, LineProvider, MonoConverter, RecorderError};

use crate::device::{choose_config, find_device};
use crate::queue::PcmQueue;

/// Seconds of converted audio buffered before the oldest is dropped.
const QUEUE_SECONDS: u32 = 2;

/// Opens cpal input lines on one device.
#[derive(Debug, Clone, Default)]
pub struct CpalLineProvider {
    device: Option<String>,
}

impl CpalLineProvider {
    /// Follow the host's default input device.
    pub fn default_device() -> Self {
        Self { device: None }
    }

    /// Use the input device called `name`.
    pub fn with_device(name: impl Into<String>) -> Self {
        Self {
            device: Some(name.into()),
        }
    }
}

impl LineProvider for CpalLineProvider {
    fn is_available(&self) -> bool {
        find_device(self.device.as_deref()).is_ok()
    }

    fn open(&self, format: &AudioFormat) -> Result<Arc<dyn InputLine>, RecorderError> {
        let line = CpalInputLine::open(self.device.clone(), *format)?;
        Ok(Arc::new(line))
    }

    fn device_name(&self) -> String {
        match &self.device {
            Some(name) => name.clone(),
            None => find_device(None)
                .ok()
                .and_then(|device| device.name().ok())
                .unwrap_or_else(|| "Default Microphone".into()),
        }
    }
}

/// A running cpal input stream delivering 16-bit mono PCM.
///
/// cpal streams are not `Send`, so the stream is built, played and dropped
/// on a dedicated thread. Dropping `stop_tx` ends that thread.
pub struct CpalInputLine {
    queue: Arc<PcmQueue>,
    stop_tx: Mutex<Option<Sender<()>>>,
    stream_thread: Mutex<Option<thread::JoinHandle<()>>>,
}

impl CpalInputLine {
    fn open(device: Option<String>, format: AudioFormat) -> Result<Self, RecorderError> {
        if format.bits_per_sample != 16 || format.channels != 1 || !format.signed || format.big_endian {
            return Err(RecorderError::DeviceUnavailable(format!(
                "unsupported line format: {} bit, {} channel(s)",
                format.bits_per_sample, format.channels
            )));
        }

        let capacity = (format.byte_rate() * QUEUE_SECONDS) as usize;
        let queue = Arc::new(PcmQueue::new(capacity, format.frame_size()));
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(0);

        let stream_queue = Arc::clone(&queue);
        let handle = thread::Builder::new()
            .name("cpal-input".into())
            .spawn(move || stream_thread(device, format, stream_queue, ready_tx, stop_rx))
            .map_err(|e| RecorderError::DeviceUnavailable(format!("failed to spawn input thread: {}", e)))?;

        let ready = ready_rx
            .recv()
            .unwrap_or_else(|_| Err(RecorderError::DeviceUnavailable("input thread exited".into())));
        if let Err(e) = ready {
            let _ = handle.join();
            return Err(e);
        }

        Ok(Self {
            queue,
            stop_tx: Mutex::new(Some(stop_tx)),
            stream_thread: Mutex::new(Some(handle)),
        })
    }
}

impl InputLine for CpalInputLine {
    fn read(&self, buf: &mut [u8]) -> Result<usize, RecorderError> {
        self.queue.read(buf)
    }

    fn stop(&self) {
        self.queue.stop();
        self.stop_tx.lock().take();
    }

    fn close(&self) {
        self.stop();
        if let Some(handle) = self.stream_thread.lock().take() {
            if handle.join().is_err() {
                log::error!("Input stream thread panicked");
            }
        }
    }

    fn is_running(&self) -> bool {
        self.queue.is_running()
    }
}

impl Drop for CpalInputLine {
    fn drop(&mut self) {
        self.close();
    }
}

/// Owns the cpal stream for the lifetime of the line.
fn stream_thread(
    device: Option<String>,
    format: AudioFormat,
    queue: Arc<PcmQueue>,
    ready: Sender<Result<(), RecorderError>>,
    stop: Receiver<()>,
) {
    let stream = match build_stream(device.as_deref(), &format, &queue) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready.send(Err(RecorderError::DeviceUnavailable(format!(
            "failed to start input stream: {}",
            e
        ))));
        return;
    }
    let _ = ready.send(Ok(()));

    // Blocks until the line drops its sender.
    let _ = stop.recv();
    drop(stream);
    log::debug!("Input stream closed");
}

fn build_stream(
    device_name: Option<&str>,
    format: &AudioFormat,
    queue: &Arc<PcmQueue>,
) -> Result<Stream, RecorderError> {
    let device = find_device(device_name)?;
    let supported = choose_config(&device, format.sample_rate)?;
    let sample_format = supported.sample_format();
    let config: StreamConfig = supported.into();

    log::info!(
        "Opening input {:?}: {} Hz, {} channel(s), {:?}",
        device.name().unwrap_or_default(),
        config.sample_rate.0,
        config.channels,
        sample_format
    );

    let converter = MonoConverter::new(format.sample_rate as f64);
    match sample_format {
        SampleFormat::I16 => build_typed::<i16>(&device, &config, converter, queue),
        SampleFormat::U16 => build_typed::<u16>(&device, &config, converter, queue),
        SampleFormat::F32 => build_typed::<f32>(&device, &config, converter, queue),
        other => Err(RecorderError::DeviceUnavailable(format!(
            "unsupported sample format {:?}",
            other
        ))),
    }
}

fn build_typed<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut converter: MonoConverter,
    queue: &Arc<PcmQueue>,
) -> Result<Stream, RecorderError>
where
    T: SizedSample + Send + 'static,
    f32: FromSample<T>,
{
    let source_rate = config.sample_rate.0 as f64;
    let channels = config.channels;
    let data_queue = Arc::clone(queue);
    let error_queue = Arc::clone(queue);

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let samples: Vec<f32> = data.iter().map(|&s| f32::from_sample(s)).collect();
                data_queue.push(&converter.to_pcm16(&samples, source_rate, channels));
            },
            move |err| {
                log::error!("Input stream error: {}", err);
                error_queue.fail(RecorderError::DeviceUnavailable(err.to_string()));
            },
            None,
        )
        .map_err(|e| RecorderError::DeviceUnavailable(format!("failed to build input stream: {}", e)))
}
