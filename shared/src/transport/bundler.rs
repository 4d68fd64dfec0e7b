use std::{
    io::Write,
    sync::Arc,
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use log::{trace, warn};
use parking_lot::{Condvar, Mutex};

use rti_serde::ByteWriter;

use crate::transport::{
    frame::{write_frame, write_header},
    ConnectionConfig, FrameKind, TransportError,
};

/// Counters kept by a bundler since it was created
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BundlerMetrics {
    pub frames_sent: u64,
    pub bundles_sent: u64,
    pub bytes_sent: u64,
    pub flushes_by_size: u64,
    pub flushes_by_time: u64,
    pub flushes_forced: u64,
}

#[derive(Clone, Copy)]
enum FlushCause {
    Size,
    Time,
    Forced,
}

struct BundlerState {
    stream: Box<dyn Write + Send>,
    buffer: ByteWriter,
    queued: usize,
    oldest: Option<Instant>,
    running: bool,
    failed: Option<TransportError>,
    metrics: BundlerMetrics,
}

impl BundlerState {
    fn flush(&mut self, cause: FlushCause) -> Result<(), TransportError> {
        if self.queued == 0 {
            return Ok(());
        }
        if let Some(error) = &self.failed {
            return Err(error.clone());
        }

        let result = self.write_out();
        match cause {
            FlushCause::Size => self.metrics.flushes_by_size += 1,
            FlushCause::Time => self.metrics.flushes_by_time += 1,
            FlushCause::Forced => self.metrics.flushes_forced += 1,
        }
        self.buffer.clear();
        self.queued = 0;
        self.oldest = None;

        if let Err(error) = &result {
            self.failed = Some(error.clone());
        }
        result
    }

    fn write_out(&mut self) -> Result<(), TransportError> {
        // A lone frame goes out as-is; only real groups get the bundle header
        if self.queued > 1 {
            write_header(&mut self.stream, FrameKind::Bundle, self.buffer.len())?;
            self.metrics.bundles_sent += 1;
        }
        self.stream.write_all(self.buffer.as_slice())?;
        self.stream.flush()?;

        self.metrics.frames_sent += self.queued as u64;
        self.metrics.bytes_sent += self.buffer.len() as u64;
        Ok(())
    }
}

struct BundlerShared {
    state: Mutex<BundlerState>,
    wake: Condvar,
    enabled: bool,
    max_size: usize,
    max_time: Duration,
}

/// Coalesces outgoing frames into bundles, flushing when either the size or
/// the age limit is reached. Frames leave in the order they were submitted.
pub struct Bundler {
    name: String,
    shared: Arc<BundlerShared>,
    sender: Mutex<Option<JoinHandle<()>>>,
}

impl Bundler {
    pub fn new(name: &str, stream: Box<dyn Write + Send>, config: &ConnectionConfig) -> Self {
        let state = BundlerState {
            stream,
            buffer: ByteWriter::with_capacity(config.bundle_max_size),
            queued: 0,
            oldest: None,
            running: true,
            failed: None,
            metrics: BundlerMetrics::default(),
        };
        Self {
            name: name.to_string(),
            shared: Arc::new(BundlerShared {
                state: Mutex::new(state),
                wake: Condvar::new(),
                enabled: config.bundling,
                max_size: config.bundle_max_size,
                max_time: config.bundle_max_time,
            }),
            sender: Mutex::new(None),
        }
    }

    /// Starts the timer thread. Without it, frames only leave on size or
    /// urgent flushes.
    pub fn start(&self) -> Result<(), TransportError> {
        if !self.shared.enabled {
            return Ok(());
        }
        let mut sender = self.sender.lock();
        if sender.is_some() {
            return Ok(());
        }
        let shared = self.shared.clone();
        let name = self.name.clone();
        let handle = thread::Builder::new()
            .name(format!("{}-bundler", self.name))
            .spawn(move || sender_loop(&name, &shared))?;
        *sender = Some(handle);
        Ok(())
    }

    /// Queues a frame. Urgent kinds, and any frame that pushes the buffer
    /// past the size limit, are flushed before this returns.
    pub fn submit(&self, kind: FrameKind, payload: &[u8]) -> Result<(), TransportError> {
        let mut state = self.shared.state.lock();
        if !state.running {
            return Err(TransportError::ChannelClosed);
        }
        if let Some(error) = &state.failed {
            return Err(error.clone());
        }

        write_frame(&mut state.buffer, kind, payload);
        state.queued += 1;
        if state.oldest.is_none() {
            state.oldest = Some(Instant::now());
        }

        if !self.shared.enabled || kind.is_urgent() {
            state.flush(FlushCause::Forced)
        } else if state.buffer.len() >= self.shared.max_size {
            state.flush(FlushCause::Size)
        } else {
            self.shared.wake.notify_one();
            Ok(())
        }
    }

    /// Sends whatever is buffered right now
    pub fn flush(&self) -> Result<(), TransportError> {
        self.shared.state.lock().flush(FlushCause::Forced)
    }

    /// Flushes what remains, then stops the timer thread, waiting at most
    /// `join_timeout` for it
    pub fn stop(&self, join_timeout: Duration) {
        {
            let mut state = self.shared.state.lock();
            if !state.running {
                return;
            }
            if let Err(error) = state.flush(FlushCause::Forced) {
                trace!("Bundler {}: final flush failed: {}", self.name, error);
            }
            state.running = false;
        }
        self.shared.wake.notify_all();

        let Some(handle) = self.sender.lock().take() else {
            return;
        };
        let deadline = Instant::now() + join_timeout;
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                warn!("Bundler {}: sender thread did not stop in time", self.name);
                return;
            }
            thread::sleep(Duration::from_millis(5));
        }
        let _ = handle.join();
    }

    pub fn buffered_frames(&self) -> usize {
        self.shared.state.lock().queued
    }

    pub fn metrics(&self) -> BundlerMetrics {
        self.shared.state.lock().metrics.clone()
    }
}

fn sender_loop(name: &str, shared: &BundlerShared) {
    let mut state = shared.state.lock();
    while state.running {
        match state.oldest {
            None => {
                shared.wake.wait(&mut state);
            }
            Some(oldest) => {
                let deadline = oldest + shared.max_time;
                if Instant::now() >= deadline {
                    if let Err(error) = state.flush(FlushCause::Time) {
                        warn!("Bundler {}: timed flush failed: {}", name, error);
                    }
                } else {
                    shared.wake.wait_until(&mut state, deadline);
                }
            }
        }
    }
    trace!("Bundler {}: sender thread exiting", name);
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::transport::frame::{read_frame, unpack_bundle};

    #[derive(Clone, Default)]
    struct SharedSink(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn config(bundling: bool, max_size: usize, max_time: Duration) -> ConnectionConfig {
        ConnectionConfig {
            bundling,
            bundle_max_size: max_size,
            bundle_max_time: max_time,
            ..ConnectionConfig::default()
        }
    }

    #[test]
    fn single_frame_is_written_without_bundle_header() {
        let sink = SharedSink::default();
        let bundler = Bundler::new("test", Box::new(sink.clone()), &config(true, 1000, Duration::from_secs(60)));
        bundler.submit(FrameKind::DataMessage, &[1, 2, 3]).unwrap();
        assert!(sink.0.lock().is_empty());

        bundler.flush().unwrap();
        let bytes = sink.0.lock().clone();
        let frame = read_frame(&mut bytes.as_slice(), 1024).unwrap();
        assert_eq!(frame.kind, FrameKind::DataMessage);
        assert_eq!(frame.payload, vec![1, 2, 3]);
    }

    #[test]
    fn size_limit_flushes_inline_as_one_bundle() {
        let sink = SharedSink::default();
        let bundler = Bundler::new("test", Box::new(sink.clone()), &config(true, 30, Duration::from_secs(60)));
        bundler.submit(FrameKind::DataMessage, &[1; 10]).unwrap();
        bundler.submit(FrameKind::ControlAsync, &[2; 10]).unwrap();

        let bytes = sink.0.lock().clone();
        let bundle = read_frame(&mut bytes.as_slice(), 1024).unwrap();
        assert_eq!(bundle.kind, FrameKind::Bundle);
        let frames = unpack_bundle(&bundle.payload).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].payload, vec![1; 10]);
        assert_eq!(frames[1].kind, FrameKind::ControlAsync);
        assert_eq!(bundler.metrics().flushes_by_size, 1);
    }

    #[test]
    fn urgent_frames_flush_everything_ahead_of_them() {
        let sink = SharedSink::default();
        let bundler = Bundler::new("test", Box::new(sink.clone()), &config(true, 64_000, Duration::from_secs(60)));
        bundler.submit(FrameKind::DataMessage, &[9]).unwrap();
        bundler.submit(FrameKind::ControlSync, &[0, 0, 0, 1]).unwrap();

        let metrics = bundler.metrics();
        assert_eq!(metrics.frames_sent, 2);
        assert_eq!(metrics.bundles_sent, 1);
        assert_eq!(bundler.buffered_frames(), 0);
    }

    #[test]
    fn timer_thread_flushes_stale_frames() {
        let sink = SharedSink::default();
        let bundler = Bundler::new("test", Box::new(sink.clone()), &config(true, 64_000, Duration::from_millis(10)));
        bundler.start().unwrap();
        bundler.submit(FrameKind::DataMessage, &[5]).unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while sink.0.lock().is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!sink.0.lock().is_empty());
        assert_eq!(bundler.metrics().flushes_by_time, 1);
        bundler.stop(Duration::from_secs(1));
    }

    #[test]
    fn submit_after_stop_fails() {
        let bundler = Bundler::new("test", Box::new(SharedSink::default()), &ConnectionConfig::default());
        bundler.stop(Duration::from_millis(100));
        assert_eq!(
            bundler.submit(FrameKind::DataMessage, &[1]),
            Err(TransportError::ChannelClosed)
        );
    }

    #[test]
    fn bundling_disabled_writes_immediately() {
        let sink = SharedSink::default();
        let bundler = Bundler::new("test", Box::new(sink.clone()), &config(false, 64_000, Duration::from_secs(60)));
        bundler.submit(FrameKind::DataMessage, &[1]).unwrap();
        assert_eq!(sink.0.lock().len(), 9);
    }
}
