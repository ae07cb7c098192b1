//! The public engine: [`H5Link`].

use std::fmt;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use parking_lot::{Mutex, RwLock};
use threewire_frame::{
    decode_frame, encode_frame, max_encoded_len, Decoded, Frame, FrameError, Header,
    LinkMessage, PacketType, SlipDecoder, MAX_PAYLOAD,
};
use threewire_transport::SerialSink;

use crate::config::LinkConfig;
use crate::control::LinkControl;
use crate::error::{LinkError, Result};
use crate::queue::RxQueue;
use crate::reliability::{Inbound, Reliability};
use crate::state::{LinkState, SeqCounters, SleepState};
use crate::stats::{LinkStats, StatsCounters};
use crate::worker::Worker;

/// Invoked on the worker thread for every delivered packet.
pub type ReceiveCallback = Arc<dyn Fn(Packet) + Send + Sync>;

/// Invoked once the SYNC/CONFIG handshake completes.
pub type InitCallback = Arc<dyn Fn() + Send + Sync>;

/// An application packet handed to the receive callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub packet_type: PacketType,
    /// Payload without the three-wire header.
    pub payload: Bytes,
}

impl From<Frame> for Packet {
    fn from(frame: Frame) -> Self {
        Self {
            packet_type: frame.packet_type(),
            payload: frame.payload(),
        }
    }
}

/// Mutable protocol state, guarded as one unit.
struct Protocol {
    slip: SlipDecoder,
    reliability: Reliability,
    control: LinkControl,
    started: bool,
}

/// A frame owed to the peer, written once the protocol lock is released.
#[derive(Debug, Clone, Copy)]
enum Reply {
    Control(LinkMessage),
    Ack,
}

struct Shared {
    sink: Box<dyn SerialSink>,
    config: LinkConfig,
    /// Held from header assignment until the sink write returns, so frames
    /// reach the wire in numbering order. Taken before `protocol`.
    tx: Mutex<()>,
    protocol: Mutex<Protocol>,
    queue: RxQueue,
    on_receive: Arc<RwLock<Option<ReceiveCallback>>>,
    on_init: RwLock<Option<InitCallback>>,
    stats: Arc<StatsCounters>,
    worker: Mutex<Option<Worker>>,
}

/// One three-wire session over one serial link.
///
/// Feed received bytes through [`on_bytes_received`](Self::on_bytes_received)
/// (or a cloned [`Intake`]); frames go out through the [`SerialSink`] given at
/// construction. Dropping the link stops the delivery worker and waits for it.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use threewire_link::{H5Link, PacketType};
/// use threewire_transport::CaptureSink;
///
/// let wire = Arc::new(CaptureSink::new());
/// let link = H5Link::new(Arc::clone(&wire));
/// link.start().unwrap();
/// // SYNC_REQ is on the wire.
/// assert_eq!(wire.len(), 1);
///
/// link.send(PacketType::Command, &[0x03, 0x0C, 0x00]).unwrap();
/// assert_eq!(wire.len(), 2);
/// ```
pub struct H5Link {
    shared: Arc<Shared>,
}

/// Cloneable handle for the byte-intake context.
///
/// Intake never waits on the delivery worker, and frames are decoded and
/// queued without waiting for sink writes. Replies owed to the peer (ACK,
/// link control) are written afterwards and wait for any [`H5Link::send`]
/// already in progress.
#[derive(Clone)]
pub struct Intake {
    shared: Arc<Shared>,
}

impl Intake {
    /// See [`H5Link::on_bytes_received`].
    pub fn on_bytes_received(&self, data: &[u8]) -> usize {
        self.shared.on_bytes_received(data)
    }
}

impl fmt::Debug for Intake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Intake").finish_non_exhaustive()
    }
}

impl H5Link {
    pub fn new<S: SerialSink + 'static>(sink: S) -> Self {
        Self::with_config(sink, LinkConfig::default())
    }

    pub fn with_config<S: SerialSink + 'static>(sink: S, config: LinkConfig) -> Self {
        let protocol = Protocol {
            slip: SlipDecoder::new(),
            reliability: Reliability::new(config.out_of_order_limit()),
            control: LinkControl::new(config.window()),
            started: false,
        };
        let queue = RxQueue::new(config.capacity());

        Self {
            shared: Arc::new(Shared {
                sink: Box::new(sink),
                config,
                tx: Mutex::new(()),
                protocol: Mutex::new(protocol),
                queue,
                on_receive: Arc::new(RwLock::new(None)),
                on_init: RwLock::new(None),
                stats: Arc::new(StatsCounters::default()),
                worker: Mutex::new(None),
            }),
        }
    }

    /// Reset the protocol state, make sure the worker runs, and send SYNC_REQ.
    ///
    /// Calling `start` again restarts the handshake from scratch; the peer
    /// sees this as a reset. Packets still queued from before are discarded.
    pub fn start(&self) -> Result<()> {
        let shared = &self.shared;
        let window = {
            let mut proto = shared.protocol.lock();
            proto.slip.reset();
            proto.reliability.reset();
            proto.control.reset();
            proto.started = true;
            proto.control.tx_window()
        };

        let discarded = shared.queue.clear();
        if discarded > 0 {
            tracing::debug!(discarded, "cleared receive queue on start");
        }

        shared.ensure_worker()?;

        tracing::debug!(window, "starting three-wire sync");
        shared.transmit(PacketType::LinkControl, &LinkMessage::SyncReq.to_bytes())
    }

    /// Stop and join the delivery worker. The peer is not notified.
    ///
    /// Returns [`LinkError::WorkerPanicked`] if the receive callback panicked.
    pub fn stop(&self) -> Result<()> {
        self.shared.protocol.lock().started = false;

        let worker = self.shared.worker.lock().take();
        match worker {
            Some(mut worker) => worker.stop(),
            None => Ok(()),
        }
    }

    /// Frame `payload` and write it to the sink.
    ///
    /// Command and ACL packets are sent reliable and consume a sequence
    /// number; every frame acknowledges what we received so far.
    pub fn send(&self, packet_type: PacketType, payload: &[u8]) -> Result<()> {
        if payload.len() > MAX_PAYLOAD {
            return Err(LinkError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD,
            });
        }
        self.shared.transmit(packet_type, payload)
    }

    /// Process received bytes.
    ///
    /// Consumes every complete frame and any noise in `data` and returns the
    /// number of bytes consumed. A trailing partial frame is left unconsumed,
    /// and so is the delimiter that closed the last frame, since it may also
    /// open the next one. Offer the remainder again with more bytes appended.
    /// `0` means "need more".
    pub fn on_bytes_received(&self, data: &[u8]) -> usize {
        self.shared.on_bytes_received(data)
    }

    /// A handle to feed received bytes from another thread.
    pub fn intake(&self) -> Intake {
        Intake {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn set_receive_callback<F>(&self, callback: F)
    where
        F: Fn(Packet) + Send + Sync + 'static,
    {
        *self.shared.on_receive.write() = Some(Arc::new(callback));
    }

    pub fn clear_receive_callback(&self) {
        self.shared.on_receive.write().take();
    }

    pub fn set_init_callback<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.shared.on_init.write() = Some(Arc::new(callback));
    }

    pub fn clear_init_callback(&self) {
        self.shared.on_init.write().take();
    }

    pub fn link_state(&self) -> LinkState {
        self.shared.protocol.lock().control.state()
    }

    pub fn sleep_state(&self) -> SleepState {
        self.shared.protocol.lock().control.sleep_state()
    }

    /// The send window negotiated with the peer.
    pub fn tx_window(&self) -> u8 {
        self.shared.protocol.lock().control.tx_window()
    }

    pub fn counters(&self) -> SeqCounters {
        self.shared.protocol.lock().reliability.counters()
    }

    pub fn stats(&self) -> LinkStats {
        self.shared.stats.snapshot()
    }

    /// Whether the delivery worker is alive.
    pub fn is_running(&self) -> bool {
        self.shared
            .worker
            .lock()
            .as_ref()
            .is_some_and(Worker::is_running)
    }

    /// Packets waiting for the worker.
    pub fn queue_len(&self) -> usize {
        self.shared.queue.len()
    }

    pub fn config(&self) -> &LinkConfig {
        &self.shared.config
    }
}

impl Drop for H5Link {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            tracing::warn!(%err, "error stopping three-wire link");
        }
    }
}

impl fmt::Debug for H5Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let proto = self.shared.protocol.lock();
        f.debug_struct("H5Link")
            .field("state", &proto.control.state())
            .field("sleep", &proto.control.sleep_state())
            .field("tx_win", &proto.control.tx_window())
            .field("counters", &proto.reliability.counters())
            .field("started", &proto.started)
            .finish_non_exhaustive()
    }
}

impl Shared {
    fn ensure_worker(&self) -> Result<()> {
        let mut slot = self.worker.lock();
        if slot.as_ref().is_some_and(Worker::is_running) {
            return Ok(());
        }
        // A previous worker that died in the callback is reaped here.
        drop(slot.take());

        let on_receive = Arc::clone(&self.on_receive);
        let stats = Arc::clone(&self.stats);
        let worker = Worker::spawn(
            &self.config.worker_name,
            self.queue.receiver().clone(),
            self.queue.capacity(),
            move |frame: Frame| {
                let callback = on_receive.read().clone();
                match callback {
                    Some(callback) => {
                        StatsCounters::bump(&stats.packets_delivered);
                        callback(Packet::from(frame));
                    }
                    None => tracing::debug!(
                        packet_type = %frame.packet_type(),
                        "no receive callback, packet discarded"
                    ),
                }
            },
        )?;
        *slot = Some(worker);
        Ok(())
    }

    /// Number the frame and write it. The protocol lock is only held while
    /// the header is assigned.
    fn transmit(&self, packet_type: PacketType, payload: &[u8]) -> Result<()> {
        let _tx = self.tx.lock();
        let header = self
            .protocol
            .lock()
            .reliability
            .next_outbound(packet_type, payload.len());
        self.write_frame(&header, payload)
    }

    fn write_frame(&self, header: &Header, payload: &[u8]) -> Result<()> {
        let mut buf = BytesMut::with_capacity(max_encoded_len(payload.len()));
        encode_frame(header, payload, &mut buf)?;
        self.sink.transmit(&buf)?;

        StatsCounters::bump(&self.stats.frames_sent);
        tracing::trace!(
            packet_type = %header.packet_type,
            seq = %header.seq,
            ack = %header.ack,
            len = payload.len(),
            "frame sent"
        );
        Ok(())
    }

    /// Write what an intake pass owes the peer, in order. A sink failure is
    /// logged and does not abort intake.
    fn send_replies(&self, replies: Vec<Reply>) {
        let _tx = self.tx.lock();
        for reply in replies {
            let (packet_type, payload) = match reply {
                Reply::Control(msg) => (PacketType::LinkControl, msg.to_bytes()),
                Reply::Ack => (PacketType::Ack, Vec::new()),
            };
            let header = self
                .protocol
                .lock()
                .reliability
                .next_outbound(packet_type, payload.len());
            if let Err(err) = self.write_frame(&header, &payload) {
                tracing::warn!(%err, ?reply, "failed to transmit reply");
            }
        }
    }

    fn on_bytes_received(&self, data: &[u8]) -> usize {
        let mut consumed = 0usize;
        let mut init_complete = false;
        let mut replies = Vec::new();

        {
            let mut proto = self.protocol.lock();
            while consumed < data.len() {
                match decode_frame(&data[consumed..], &mut proto.slip) {
                    Decoded::Incomplete => break,
                    Decoded::Noise(n) => {
                        StatsCounters::add(&self.stats.noise_bytes, n);
                        consumed += n;
                    }
                    Decoded::Invalid { error, consumed: n } => {
                        let counter = match error {
                            FrameError::HeaderChecksum { .. } => &self.stats.checksum_errors,
                            _ => &self.stats.framing_errors,
                        };
                        StatsCounters::bump(counter);
                        tracing::warn!(%error, "dropping malformed frame");
                        consumed += n;
                    }
                    Decoded::Frame { frame, consumed: n } => {
                        consumed += n;
                        init_complete |= self.process(&mut proto, frame, &mut replies);
                    }
                }
            }
        }

        if !replies.is_empty() {
            self.send_replies(replies);
        }

        if init_complete {
            let callback = self.on_init.read().clone();
            if let Some(callback) = callback {
                callback();
            }
        }
        consumed
    }

    /// Handle one checksum-valid frame. Returns whether the handshake just
    /// completed.
    fn process(&self, proto: &mut Protocol, frame: Frame, replies: &mut Vec<Reply>) -> bool {
        StatsCounters::bump(&self.stats.frames_received);

        let header = *frame.header();
        let packet_type = header.packet_type;

        if !proto.control.is_active() && packet_type != PacketType::LinkControl {
            StatsCounters::bump(&self.stats.not_active_drops);
            tracing::warn!(%packet_type, "link not active, dropping frame");
            return false;
        }

        match proto.reliability.on_inbound(&header) {
            Inbound::OutOfOrder { expected, resync } => {
                StatsCounters::bump(&self.stats.out_of_order);
                tracing::warn!(seq = %header.seq, %expected, "out-of-order frame dropped");
                if resync {
                    StatsCounters::bump(&self.stats.resyncs);
                    tracing::warn!("too many out-of-order frames, resyncing");
                    replies.push(Reply::Control(LinkMessage::SyncReq));
                }
                Self::owe_ack(proto, replies);
                return false;
            }
            Inbound::Accepted | Inbound::Unsequenced => {}
        }
        StatsCounters::bump(&self.stats.frames_accepted);

        let mut init_complete = false;
        if packet_type.is_deliverable() {
            self.enqueue(proto.started, frame);
        } else if packet_type == PacketType::LinkControl {
            init_complete = self.handle_link_control(proto, &frame.payload(), replies);
        } else if packet_type != PacketType::Ack {
            tracing::debug!(%packet_type, "ignoring packet type");
        }

        Self::owe_ack(proto, replies);
        init_complete
    }

    fn enqueue(&self, started: bool, frame: Frame) {
        let len = frame.payload().len();
        match self.queue.push(frame) {
            Ok(remaining) => {
                if remaining < self.queue.capacity() / 2 {
                    tracing::debug!(remaining, len, "queued packet");
                }
            }
            Err(err) => {
                StatsCounters::bump(&self.stats.queue_drops);
                if started {
                    tracing::error!(%err, len, "no space in receive queue, packet dropped");
                }
            }
        }
    }

    fn handle_link_control(
        &self,
        proto: &mut Protocol,
        payload: &[u8],
        replies: &mut Vec<Reply>,
    ) -> bool {
        let Some(msg) = LinkMessage::parse(payload) else {
            tracing::debug!(len = payload.len(), "unrecognized link-control payload");
            return false;
        };
        tracing::debug!(message = %msg, "link-control received");

        let outcome = proto.control.handle(msg);
        if outcome.peer_reset {
            tracing::debug!("peer reset detected");
            proto.reliability.peer_reset();
        }
        replies.extend(outcome.replies.into_iter().map(Reply::Control));
        outcome.init_complete
    }

    /// One ACK per frame that left an acknowledgment owed.
    fn owe_ack(proto: &mut Protocol, replies: &mut Vec<Reply>) {
        if proto.reliability.take_ack_pending() {
            replies.push(Reply::Ack);
        }
    }
}
