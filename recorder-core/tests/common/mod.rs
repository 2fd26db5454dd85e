#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use recorder_core::{AudioFormat, InputLine, LineProvider, RecorderError};

/// One step of a scripted line.
#[derive(Debug, Clone)]
pub enum Chunk {
    Data(Vec<u8>),
    Fail(RecorderError),
}

/// Little-endian PCM for `samples`.
pub fn pcm(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// A 1024-byte buffer of silence with `peak` at one position.
pub fn buffer_with_peak(peak: i16) -> Vec<u8> {
    let mut samples = vec![0i16; 512];
    samples[17] = peak;
    pcm(&samples)
}

struct LineInner {
    queue: VecDeque<Chunk>,
    running: bool,
    closed: bool,
}

/// In-memory input line that replays a script, then blocks like a live
/// microphone until stopped.
pub struct ScriptedLine {
    inner: Mutex<LineInner>,
    cond: Condvar,
    ignore_stop: bool,
    released: AtomicBool,
}

impl ScriptedLine {
    fn new(script: Vec<Chunk>, ignore_stop: bool) -> Self {
        Self {
            inner: Mutex::new(LineInner {
                queue: script.into(),
                running: true,
                closed: false,
            }),
            cond: Condvar::new(),
            ignore_stop,
            released: AtomicBool::new(false),
        }
    }

    /// Queue more audio, as if the device delivered it late.
    pub fn push(&self, chunk: Chunk) {
        self.inner.lock().queue.push_back(chunk);
        self.cond.notify_all();
    }

    /// Unblock a line created with `ignore_stop`.
    pub fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
        let _guard = self.inner.lock();
        self.cond.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }
}

impl InputLine for ScriptedLine {
    fn read(&self, buf: &mut [u8]) -> Result<usize, RecorderError> {
        let mut inner = self.inner.lock();
        loop {
            match inner.queue.pop_front() {
                Some(Chunk::Data(mut data)) => {
                    let n = data.len().min(buf.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    if n < data.len() {
                        inner.queue.push_front(Chunk::Data(data.split_off(n)));
                    }
                    return Ok(n);
                }
                Some(Chunk::Fail(e)) => return Err(e),
                None => {}
            }

            if self.ignore_stop {
                if self.released.load(Ordering::SeqCst) {
                    return Ok(0);
                }
            } else if !inner.running {
                return Ok(0);
            }
            self.cond.wait_for(&mut inner, Duration::from_millis(50));
        }
    }

    fn stop(&self) {
        self.inner.lock().running = false;
        self.cond.notify_all();
    }

    fn close(&self) {
        let mut inner = self.inner.lock();
        inner.running = false;
        inner.closed = true;
        self.cond.notify_all();
    }

    fn is_running(&self) -> bool {
        self.inner.lock().running
    }
}

struct ProviderInner {
    available: AtomicBool,
    ignore_stop: AtomicBool,
    script: Mutex<Vec<Chunk>>,
    opens: AtomicUsize,
    lines: Mutex<Vec<Arc<ScriptedLine>>>,
}

/// Provider handing out `ScriptedLine`s. Clones share state so tests can
/// inspect it after moving one into a session.
#[derive(Clone)]
pub struct ScriptedProvider {
    inner: Arc<ProviderInner>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Chunk>) -> Self {
        Self {
            inner: Arc::new(ProviderInner {
                available: AtomicBool::new(true),
                ignore_stop: AtomicBool::new(false),
                script: Mutex::new(script),
                opens: AtomicUsize::new(0),
                lines: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn unavailable() -> Self {
        let provider = Self::new(Vec::new());
        provider.set_available(false);
        provider
    }

    /// `n` buffers of 1024 bytes, peaks 1000, 2000, ...
    pub fn with_buffers(n: usize) -> Self {
        Self::new((1..=n).map(|i| Chunk::Data(buffer_with_peak(i as i16 * 1000))).collect())
    }

    pub fn set_available(&self, available: bool) {
        self.inner.available.store(available, Ordering::SeqCst);
    }

    pub fn set_ignore_stop(&self, ignore: bool) {
        self.inner.ignore_stop.store(ignore, Ordering::SeqCst);
    }

    pub fn set_script(&self, script: Vec<Chunk>) {
        *self.inner.script.lock() = script;
    }

    pub fn opens(&self) -> usize {
        self.inner.opens.load(Ordering::SeqCst)
    }

    pub fn last_line(&self) -> Option<Arc<ScriptedLine>> {
        self.inner.lines.lock().last().cloned()
    }
}

impl LineProvider for ScriptedProvider {
    fn is_available(&self) -> bool {
        self.inner.available.load(Ordering::SeqCst)
    }

    fn open(&self, format: &AudioFormat) -> Result<Arc<dyn InputLine>, RecorderError> {
        assert_eq!(format.sample_rate, 44_100);
        if !self.is_available() {
            return Err(RecorderError::DeviceUnavailable("no scripted device".into()));
        }
        self.inner.opens.fetch_add(1, Ordering::SeqCst);
        let line = Arc::new(ScriptedLine::new(
            self.inner.script.lock().clone(),
            self.inner.ignore_stop.load(Ordering::SeqCst),
        ));
        self.inner.lines.lock().push(Arc::clone(&line));
        Ok(line)
    }

    fn device_name(&self) -> String {
        "Scripted Microphone".into()
    }
}

/// Poll `condition` until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}
