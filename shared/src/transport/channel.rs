use std::{
    io::{BufReader, BufWriter},
    net::{Shutdown, SocketAddr, TcpStream},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use log::{debug, info, trace, warn};
use parking_lot::Mutex;

use crate::transport::{
    frame::{read_frame, unpack_bundle},
    Bundler, BundlerMetrics, ConnectionConfig, Frame, FrameKind, ResponseCorrelator,
    TransportError,
};

/// Receives whatever a channel reads off the wire. Called on the channel's
/// receiver thread, so implementations must not block on that same channel.
pub trait ChannelListener: Send + Sync {
    fn on_data(&self, channel: &Channel, payload: Vec<u8>);

    /// `request_id` is set when the peer is blocked waiting for a reply,
    /// which must be sent with [`Channel::send_control_response`]
    fn on_control_request(&self, channel: &Channel, request_id: Option<u32>, payload: Vec<u8>);

    /// The peer went away without a local close
    fn on_disconnect(&self, channel: &Channel);
}

struct ChannelInner {
    name: String,
    peer: SocketAddr,
    stream: TcpStream,
    config: ConnectionConfig,
    bundler: Bundler,
    correlator: ResponseCorrelator,
    welcome: String,
    listener: Mutex<Option<Arc<dyn ChannelListener>>>,
    receiver: Mutex<Option<JoinHandle<()>>>,
    closing: AtomicBool,
}

/// A framed, bundled TCP connection between an LRC and the RTI (or a
/// router). Cloning yields another handle to the same connection.
#[derive(Clone)]
pub struct Channel {
    inner: Arc<ChannelInner>,
}

impl Channel {
    /// Opens a connection and runs the client side of the handshake: wait for
    /// Welcome, wait for Ready, answer Ready
    pub fn connect(addr: SocketAddr, name: &str, config: ConnectionConfig) -> Result<Self, TransportError> {
        let stream = TcpStream::connect_timeout(&addr, config.connect_timeout)?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(config.connect_timeout))?;

        let mut reader = stream.try_clone()?;
        let welcome = expect_frame(&mut reader, FrameKind::Welcome, "WELCOME", &config)?;
        let welcome = String::from_utf8_lossy(&welcome.payload).into_owned();
        expect_frame(&mut reader, FrameKind::Ready, "READY", &config)?;

        let channel = Self::wrap(stream, name, welcome, config)?;
        channel.inner.bundler.submit(FrameKind::Ready, &[])?;
        info!("Channel {}: connected to {}", name, addr);
        Ok(channel)
    }

    /// Runs the server side of the handshake on an accepted stream: send
    /// Welcome and Ready, then wait for the peer's Ready
    pub fn accept(stream: TcpStream, name: &str, welcome: &str, config: ConnectionConfig) -> Result<Self, TransportError> {
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(config.connect_timeout))?;

        let channel = Self::wrap(stream, name, welcome.to_string(), config)?;
        channel.inner.bundler.submit(FrameKind::Welcome, welcome.as_bytes())?;
        channel.inner.bundler.submit(FrameKind::Ready, &[])?;

        let mut reader = channel.inner.stream.try_clone()?;
        expect_frame(&mut reader, FrameKind::Ready, "READY", &channel.inner.config)?;
        info!("Channel {}: accepted {}", name, channel.inner.peer);
        Ok(channel)
    }

    fn wrap(stream: TcpStream, name: &str, welcome: String, config: ConnectionConfig) -> Result<Self, TransportError> {
        let peer = stream.peer_addr()?;
        let writer = BufWriter::new(stream.try_clone()?);
        let bundler = Bundler::new(name, Box::new(writer), &config);
        Ok(Self {
            inner: Arc::new(ChannelInner {
                name: name.to_string(),
                peer,
                stream,
                config,
                bundler,
                correlator: ResponseCorrelator::new(),
                welcome,
                listener: Mutex::new(None),
                receiver: Mutex::new(None),
                closing: AtomicBool::new(false),
            }),
        })
    }

    /// Starts the sender and receiver threads. Nothing is read off the
    /// stream until this is called.
    pub fn start(&self, listener: Arc<dyn ChannelListener>) -> Result<(), TransportError> {
        self.inner.stream.set_read_timeout(None)?;
        *self.inner.listener.lock() = Some(listener);
        self.inner.bundler.start()?;

        let reader = BufReader::new(self.inner.stream.try_clone()?);
        let inner = self.inner.clone();
        let handle = thread::Builder::new()
            .name(format!("{}-receiver", self.inner.name))
            .spawn(move || receive_loop(inner, reader))?;
        *self.inner.receiver.lock() = Some(handle);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.inner.peer
    }

    /// The greeting exchanged during the handshake
    pub fn welcome(&self) -> &str {
        &self.inner.welcome
    }

    pub fn is_open(&self) -> bool {
        !self.inner.closing.load(Ordering::Acquire)
    }

    pub fn metrics(&self) -> BundlerMetrics {
        self.inner.bundler.metrics()
    }

    // Sending

    pub fn send_data(&self, payload: &[u8]) -> Result<(), TransportError> {
        self.inner.bundler.submit(FrameKind::DataMessage, payload)
    }

    pub fn send_control_async(&self, payload: &[u8]) -> Result<(), TransportError> {
        self.inner.bundler.submit(FrameKind::ControlAsync, payload)
    }

    /// Sends a control request and blocks until the peer answers it
    pub fn send_control_sync(&self, payload: &[u8]) -> Result<Vec<u8>, TransportError> {
        let request_id = self.inner.correlator.register()?;
        let frame = Frame::with_request_id(FrameKind::ControlSync, request_id, payload);
        if let Err(error) = self.inner.bundler.submit(frame.kind, &frame.payload) {
            self.inner.correlator.cancel(request_id);
            return Err(error);
        }
        self.inner
            .correlator
            .wait(request_id, self.inner.config.response_timeout)
    }

    pub fn send_control_response(&self, request_id: u32, payload: &[u8]) -> Result<(), TransportError> {
        let frame = Frame::with_request_id(FrameKind::ControlResponse, request_id, payload);
        self.inner.bundler.submit(frame.kind, &frame.payload)
    }

    /// Forwards an already framed unit unchanged, used by relays
    pub fn send_frame(&self, frame: &Frame) -> Result<(), TransportError> {
        self.inner.bundler.submit(frame.kind, &frame.payload)
    }

    /// Flushes pending output, shuts the stream and stops both threads.
    /// Safe to call more than once, including from the listener.
    pub fn close(&self) {
        if self.inner.closing.swap(true, Ordering::AcqRel) {
            return;
        }
        debug!("Channel {}: closing", self.inner.name);

        self.inner.bundler.stop(self.inner.config.join_timeout);
        let _ = self.inner.stream.shutdown(Shutdown::Both);
        self.inner.correlator.abandon_all();

        if let Some(handle) = self.inner.receiver.lock().take() {
            if handle.thread().id() != thread::current().id() {
                join_bounded(&self.inner.name, handle, self.inner.config.join_timeout);
            }
        }
        self.inner.listener.lock().take();
    }
}

fn expect_frame(
    reader: &mut TcpStream,
    kind: FrameKind,
    expected: &'static str,
    config: &ConnectionConfig,
) -> Result<Frame, TransportError> {
    let frame = read_frame(reader, config.max_frame_size).map_err(|error| {
        TransportError::HandshakeFailed {
            expected,
            received: error.to_string(),
        }
    })?;
    if frame.kind != kind {
        return Err(TransportError::HandshakeFailed {
            expected,
            received: format!("{:?}", frame.kind),
        });
    }
    Ok(frame)
}

fn join_bounded(name: &str, handle: JoinHandle<()>, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            warn!("Channel {}: receiver thread did not stop in time", name);
            return;
        }
        thread::sleep(Duration::from_millis(5));
    }
    let _ = handle.join();
}

fn receive_loop(inner: Arc<ChannelInner>, mut reader: BufReader<TcpStream>) {
    let channel = Channel { inner };
    loop {
        match read_frame(&mut reader, channel.inner.config.max_frame_size) {
            Ok(frame) => dispatch(&channel, frame, false),
            Err(error) => {
                if channel.is_open() {
                    debug!("Channel {}: receive ended: {}", channel.inner.name, error);
                }
                break;
            }
        }
    }

    channel.inner.correlator.abandon_all();
    if !channel.is_open() {
        return;
    }

    // The peer hung up. Teardown joins this thread, so it runs elsewhere.
    info!("Channel {}: peer {} disconnected", channel.inner.name, channel.inner.peer);
    let listener = channel.inner.listener.lock().clone();
    let teardown = channel.clone();
    let spawned = thread::Builder::new()
        .name(format!("{}-teardown", channel.inner.name))
        .spawn(move || {
            if let Some(listener) = listener {
                listener.on_disconnect(&teardown);
            }
            teardown.close();
        });
    if let Err(error) = spawned {
        warn!("Channel {}: could not spawn teardown: {}", channel.inner.name, error);
    }
}

fn dispatch(channel: &Channel, frame: Frame, in_bundle: bool) {
    let Some(listener) = channel.inner.listener.lock().clone() else {
        trace!("Channel {}: no listener, dropping {:?}", channel.inner.name, frame.kind);
        return;
    };

    match frame.kind {
        FrameKind::DataMessage => listener.on_data(channel, frame.payload),
        FrameKind::ControlAsync => listener.on_control_request(channel, None, frame.payload),
        FrameKind::ControlSync => match frame.split_request_id() {
            Ok((request_id, body)) => {
                listener.on_control_request(channel, Some(request_id), body.to_vec())
            }
            Err(error) => warn!("Channel {}: {}", channel.inner.name, error),
        },
        FrameKind::ControlResponse => match frame.split_request_id() {
            Ok((request_id, body)) => {
                channel.inner.correlator.deliver(request_id, body.to_vec());
            }
            Err(error) => warn!("Channel {}: {}", channel.inner.name, error),
        },
        FrameKind::Bundle if !in_bundle => match unpack_bundle(&frame.payload) {
            Ok(frames) => {
                for inner_frame in frames {
                    dispatch(channel, inner_frame, true);
                }
            }
            Err(error) => warn!("Channel {}: {}", channel.inner.name, error),
        },
        kind => warn!("Channel {}: unexpected {:?} frame", channel.inner.name, kind),
    }
}
