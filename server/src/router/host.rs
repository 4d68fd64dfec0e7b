use std::{
    io::{BufReader, BufWriter, Write},
    net::{Shutdown, SocketAddr, TcpStream},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, Sender};
use log::{debug, warn};
use parking_lot::Mutex;

use rti_shared::transport::{read_frame, ConnectionConfig, Frame, FrameKind, TransportError};

use crate::error::RtiServerError;

/// Packet and byte counts for one host, in each direction
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HostCounters {
    pub packets_in: u64,
    pub bytes_in: u64,
    pub packets_out: u64,
    pub bytes_out: u64,
}

#[derive(Default)]
struct Counters {
    packets_in: AtomicU64,
    bytes_in: AtomicU64,
    packets_out: AtomicU64,
    bytes_out: AtomicU64,
}

/// One connected host. Frames read from it are handed to the router; frames
/// queued for it are written by its own sender thread.
pub struct Host {
    id: u32,
    peer: SocketAddr,
    stream: TcpStream,
    outgoing: Sender<Arc<Frame>>,
    queued: Mutex<Option<Receiver<Arc<Frame>>>>,
    counters: Arc<Counters>,
    open: Arc<AtomicBool>,
    threads: Mutex<Vec<JoinHandle<()>>>,
    join_timeout: Duration,
}

impl Host {
    /// Server side of the handshake: Welcome, Ready, then the peer's Ready
    pub fn handshake(
        stream: TcpStream,
        id: u32,
        welcome: &str,
        config: &ConnectionConfig,
    ) -> Result<Self, RtiServerError> {
        let peer = stream.peer_addr()?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(config.connect_timeout))?;

        let mut writer = stream.try_clone()?;
        writer.write_all(&Frame::new(FrameKind::Welcome, welcome.as_bytes().to_vec()).to_bytes())?;
        writer.write_all(&Frame::new(FrameKind::Ready, Vec::new()).to_bytes())?;

        let mut reader = stream.try_clone()?;
        let reply = read_frame(&mut reader, config.max_frame_size)?;
        if reply.kind != FrameKind::Ready {
            return Err(TransportError::HandshakeFailed {
                expected: "READY",
                received: format!("{:?}", reply.kind),
            }
            .into());
        }
        stream.set_read_timeout(None)?;

        let (outgoing, queued) = crossbeam_channel::unbounded();
        Ok(Self {
            id,
            peer,
            stream,
            outgoing,
            queued: Mutex::new(Some(queued)),
            counters: Arc::new(Counters::default()),
            open: Arc::new(AtomicBool::new(true)),
            threads: Mutex::new(Vec::new()),
            join_timeout: config.join_timeout,
        })
    }

    /// Starts the receiver and sender threads. `relay` is called on the
    /// receiver thread for every frame read; `gone` once the peer hangs up.
    pub fn start(
        &self,
        max_frame_size: usize,
        relay: impl Fn(u32, Arc<Frame>) + Send + 'static,
        gone: impl FnOnce(u32) + Send + 'static,
    ) -> Result<(), RtiServerError> {
        let Some(receiver) = self.queued.lock().take() else {
            return Ok(());
        };

        let writer = BufWriter::new(self.stream.try_clone()?);
        let counters = self.counters.clone();
        let open = self.open.clone();
        let sending = spawn(format!("router-host-{}-sender", self.id), move || {
            send_loop(writer, receiver, counters, open)
        })?;

        let reader = BufReader::new(self.stream.try_clone()?);
        let counters = self.counters.clone();
        let open = self.open.clone();
        let id = self.id;
        let receiving = spawn(format!("router-host-{}-receiver", self.id), move || {
            receive_loop(id, reader, max_frame_size, counters, &open, relay);
            if open.load(Ordering::Acquire) {
                gone(id);
            }
        })?;

        self.threads.lock().extend([sending, receiving]);
        Ok(())
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Queues a frame for this host. Never blocks; frames queued before
    /// `start` go out once the sender runs.
    pub fn forward(&self, frame: Arc<Frame>) {
        if self.is_open() && self.outgoing.send(frame).is_err() {
            debug!("Host {}: sender already stopped", self.id);
        }
    }

    pub fn counters(&self) -> HostCounters {
        HostCounters {
            packets_in: self.counters.packets_in.load(Ordering::Relaxed),
            bytes_in: self.counters.bytes_in.load(Ordering::Relaxed),
            packets_out: self.counters.packets_out.load(Ordering::Relaxed),
            bytes_out: self.counters.bytes_out.load(Ordering::Relaxed),
        }
    }

    /// Shuts the stream and waits, bounded, for both threads
    pub fn close(&self) {
        if !self.open.swap(false, Ordering::AcqRel) {
            return;
        }
        let _ = self.stream.shutdown(Shutdown::Both);
        let threads: Vec<JoinHandle<()>> = self.threads.lock().drain(..).collect();
        let current = thread::current().id();
        let deadline = Instant::now() + self.join_timeout;
        for handle in threads {
            if handle.thread().id() == current {
                continue;
            }
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(5));
            }
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                warn!("Host {}: thread did not stop in time", self.id);
            }
        }
    }
}

fn spawn(name: String, body: impl FnOnce() + Send + 'static) -> Result<JoinHandle<()>, RtiServerError> {
    thread::Builder::new()
        .name(name.clone())
        .spawn(body)
        .map_err(|source| RtiServerError::Spawn { name, source })
}

fn receive_loop(
    id: u32,
    mut reader: BufReader<TcpStream>,
    max_frame_size: usize,
    counters: Arc<Counters>,
    open: &AtomicBool,
    relay: impl Fn(u32, Arc<Frame>),
) {
    loop {
        match read_frame(&mut reader, max_frame_size) {
            Ok(frame) => {
                counters.packets_in.fetch_add(1, Ordering::Relaxed);
                counters
                    .bytes_in
                    .fetch_add(frame.encoded_len() as u64, Ordering::Relaxed);
                relay(id, Arc::new(frame));
            }
            Err(error) => {
                if open.load(Ordering::Acquire) {
                    debug!("Host {}: receive ended: {}", id, error);
                }
                return;
            }
        }
    }
}

fn send_loop(
    mut writer: BufWriter<TcpStream>,
    receiver: Receiver<Arc<Frame>>,
    counters: Arc<Counters>,
    open: Arc<AtomicBool>,
) {
    let poll = Duration::from_millis(50);
    while open.load(Ordering::Acquire) {
        let frame = match receiver.recv_timeout(poll) {
            Ok(frame) => frame,
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => return,
        };
        let bytes = frame.to_bytes();
        let written = writer.write_all(&bytes).and_then(|()| {
            if receiver.is_empty() {
                writer.flush()
            } else {
                Ok(())
            }
        });
        if let Err(error) = written {
            debug!("Router sender stopping: {}", error);
            return;
        }
        counters.packets_out.fetch_add(1, Ordering::Relaxed);
        counters
            .bytes_out
            .fetch_add(bytes.len() as u64, Ordering::Relaxed);
    }
}
