//! Byte queue between the cpal data callback and `InputLine::read`.

use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};

use recorder_core::RecorderError;

struct QueueState {
    bytes: VecDeque<u8>,
    running: bool,
    error: Option<RecorderError>,
    dropped: usize,
}

/// Bounded PCM queue. The producer never blocks: when the reader falls
/// behind, the oldest bytes are dropped to make room.
pub(crate) struct PcmQueue {
    state: Mutex<QueueState>,
    ready: Condvar,
    capacity: usize,
    frame_size: usize,
}

impl PcmQueue {
    pub(crate) fn new(capacity: usize, frame_size: usize) -> Self {
        let frame_size = frame_size.max(1);
        Self {
            state: Mutex::new(QueueState {
                bytes: VecDeque::with_capacity(capacity),
                running: true,
                error: None,
                dropped: 0,
            }),
            ready: Condvar::new(),
            // Keep whole frames so dropping never splits a sample.
            capacity: (capacity / frame_size).max(1) * frame_size,
            frame_size,
        }
    }

    /// Append converted PCM. Called from the audio callback.
    pub(crate) fn push(&self, pcm: &[u8]) {
        let mut state = self.state.lock();
        if !state.running {
            return;
        }

        let incoming = if pcm.len() > self.capacity {
            &pcm[pcm.len() - self.capacity..]
        } else {
            pcm
        };

        let overflow = (state.bytes.len() + incoming.len()).saturating_sub(self.capacity);
        if overflow > 0 {
            state.bytes.drain(..overflow);
            if state.dropped == 0 {
                log::warn!("Input queue full, dropping oldest audio");
            }
            state.dropped += overflow;
        }
        state.bytes.extend(incoming);
        self.ready.notify_all();
    }

    /// Latch a stream error; the next `read` returns it.
    pub(crate) fn fail(&self, error: RecorderError) {
        let mut state = self.state.lock();
        if state.error.is_none() {
            state.error = Some(error);
        }
        self.ready.notify_all();
    }

    /// Block until `buf` can be filled, the queue is stopped, or an error
    /// was latched. Returns whole frames only; `Ok(0)` once stopped and
    /// drained.
    pub(crate) fn read(&self, buf: &mut [u8]) -> Result<usize, RecorderError> {
        let wanted = buf.len() - buf.len() % self.frame_size;
        if wanted == 0 {
            return Ok(0);
        }

        let mut state = self.state.lock();
        loop {
            if let Some(error) = state.error.take() {
                return Err(error);
            }
            if state.bytes.len() >= wanted || !state.running {
                break;
            }
            self.ready.wait(&mut state);
        }

        let available = state.bytes.len() - state.bytes.len() % self.frame_size;
        let n = available.min(wanted);
        for (dst, src) in buf[..n].iter_mut().zip(state.bytes.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }

    /// Stop accepting audio and wake any blocked reader.
    pub(crate) fn stop(&self) {
        let mut state = self.state.lock();
        if state.running && state.dropped > 0 {
            log::warn!("Dropped {} bytes of input audio", state.dropped);
        }
        state.running = false;
        self.ready.notify_all();
    }

    pub(crate) fn is_running(&self) -> bool {
        self.state.lock().running
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.state.lock().bytes.len()
    }
}
