//! Two engines wired back to back through capture sinks.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use threewire_frame::{decode_frame, Decoded, Frame, SlipDecoder};
use threewire_link::{H5Link, LinkState, Packet, PacketType};
use threewire_transport::CaptureSink;

struct End {
    link: H5Link,
    wire: Arc<CaptureSink>,
    inits: Arc<AtomicUsize>,
}

fn end() -> End {
    let wire = Arc::new(CaptureSink::new());
    let link = H5Link::new(Arc::clone(&wire));
    let inits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&inits);
    link.set_init_callback(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    End { link, wire, inits }
}

/// Feed a whole capture; only the final closing delimiter may be left over.
fn feed(link: &H5Link, stream: &[u8]) {
    let consumed = link.on_bytes_received(stream);
    assert!(stream[consumed..].iter().all(|&b| b == 0xC0), "unconsumed frame bytes");
}

/// Shuttle bytes until both directions go quiet.
fn pump(a: &End, b: &End) {
    for _ in 0..32 {
        let a_out = a.wire.take_stream();
        let b_out = b.wire.take_stream();
        if a_out.is_empty() && b_out.is_empty() {
            return;
        }
        feed(&b.link, &a_out);
        feed(&a.link, &b_out);
    }
    panic!("link traffic did not settle");
}

fn frames(stream: &[u8]) -> Vec<Frame> {
    let mut slip = SlipDecoder::new();
    let mut out = Vec::new();
    let mut pos = 0;
    while pos < stream.len() {
        match decode_frame(&stream[pos..], &mut slip) {
            Decoded::Incomplete => break,
            Decoded::Frame { frame, consumed } => {
                out.push(frame);
                pos += consumed;
            }
            other => pos += other.consumed(),
        }
    }
    out
}

fn active_pair() -> (End, End) {
    let a = end();
    let b = end();
    a.link.start().unwrap();
    b.link.start().unwrap();
    pump(&a, &b);
    (a, b)
}

#[test]
fn handshake_converges_with_one_init_each() {
    let (a, b) = active_pair();

    assert_eq!(a.link.link_state(), LinkState::Active);
    assert_eq!(b.link.link_state(), LinkState::Active);
    assert_eq!(a.inits.load(Ordering::SeqCst), 1);
    assert_eq!(b.inits.load(Ordering::SeqCst), 1);
    assert_eq!(a.link.tx_window(), 4);
}

#[test]
fn acl_is_delivered_and_acknowledged() {
    let (a, b) = active_pair();

    let (tx, rx) = crossbeam_channel::unbounded::<Packet>();
    b.link.set_receive_callback(move |packet| {
        let _ = tx.send(packet);
    });

    a.link.send(PacketType::Acl, &[1, 2, 3]).unwrap();

    let stream = a.wire.take_stream();
    let sent = frames(&stream);
    assert_eq!(sent.len(), 1);
    assert!(sent[0].header().reliable);
    assert_eq!(sent[0].header().seq.get(), 0);
    feed(&b.link, &stream);

    let packet = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(packet.packet_type, PacketType::Acl);
    assert_eq!(packet.payload, Bytes::from_static(&[1, 2, 3]));

    let reply = frames(&b.wire.take_stream());
    assert_eq!(reply.len(), 1);
    assert_eq!(reply[0].packet_type(), PacketType::Ack);
    assert_eq!(reply[0].header().ack.get(), 1);
    assert_eq!(b.link.counters().tx_ack.get(), 1);
}

#[test]
fn reliable_stream_wraps_sequence_numbers() {
    let (a, b) = active_pair();

    let (tx, rx) = crossbeam_channel::unbounded::<Packet>();
    b.link.set_receive_callback(move |packet| {
        let _ = tx.send(packet);
    });

    for n in 0..10u8 {
        a.link.send(PacketType::Acl, &[n]).unwrap();
        pump(&a, &b);
    }

    let delivered: Vec<u8> = (0..10)
        .map(|_| rx.recv_timeout(Duration::from_secs(2)).unwrap().payload[0])
        .collect();
    assert_eq!(delivered, (0..10).collect::<Vec<u8>>());
    assert_eq!(b.link.counters().tx_ack.get(), 10 % 8);
    assert_eq!(b.link.stats().out_of_order, 0);
    // Every ACK from b told a how far it got.
    assert_eq!(a.link.counters().rx_ack.get(), 10 % 8);
}

#[test]
fn restarted_peer_triggers_reset_and_new_handshake() {
    let (a, b) = active_pair();

    a.link.send(PacketType::Acl, &[0xAB]).unwrap();
    pump(&a, &b);
    assert_eq!(b.link.counters().tx_ack.get(), 1);

    a.link.start().unwrap();
    pump(&a, &b);

    assert_eq!(a.link.link_state(), LinkState::Active);
    assert_eq!(b.link.link_state(), LinkState::Active);
    assert_eq!(a.inits.load(Ordering::SeqCst), 2);
    assert_eq!(b.inits.load(Ordering::SeqCst), 2);

    // Both sides count from zero again, so the next frame is accepted.
    assert_eq!(b.link.counters().tx_ack.get(), 0);
    a.link.send(PacketType::Acl, &[0xCD]).unwrap();
    pump(&a, &b);
    assert_eq!(b.link.counters().tx_ack.get(), 1);
    assert_eq!(b.link.stats().out_of_order, 0);
}

#[test]
fn link_control_is_never_acknowledged() {
    let (a, b) = active_pair();

    let acks = |stream: &[u8]| {
        frames(stream)
            .iter()
            .filter(|f| f.packet_type() == PacketType::Ack)
            .count()
    };

    a.link.send(PacketType::LinkControl, &[0x05, 0xFA]).unwrap();
    let stream = a.wire.take_stream();
    b.link.on_bytes_received(&stream);
    assert_eq!(acks(&b.wire.take_stream()), 0);
}
