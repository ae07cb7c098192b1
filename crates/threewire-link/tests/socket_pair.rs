//! Two engines over a real byte stream, each fed by a reader thread.
#![cfg(unix)]

use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::time::Duration;

use threewire_link::{H5Link, LinkState, Packet, PacketType};
use threewire_transport::{spawn_reader, ReaderHandle, WriteSink};

fn link_over(stream: &UnixStream) -> H5Link {
    H5Link::new(WriteSink::new(stream.try_clone().unwrap()))
}

fn pump_into(name: &str, stream: &UnixStream, link: &H5Link) -> ReaderHandle {
    let intake = link.intake();
    spawn_reader(name, stream.try_clone().unwrap(), move |buf| {
        intake.on_bytes_received(buf)
    })
    .unwrap()
}

#[test]
fn handshake_and_delivery_over_socket_pair() {
    let (sock_a, sock_b) = UnixStream::pair().unwrap();
    let a = link_over(&sock_a);
    let b = link_over(&sock_b);

    let (init_tx, init_rx) = crossbeam_channel::unbounded::<&'static str>();
    let tx = init_tx.clone();
    a.set_init_callback(move || {
        let _ = tx.send("a");
    });
    b.set_init_callback(move || {
        let _ = init_tx.send("b");
    });

    let (packet_tx, packet_rx) = crossbeam_channel::unbounded::<Packet>();
    b.set_receive_callback(move |packet| {
        let _ = packet_tx.send(packet);
    });

    // Both SYNC_REQs sit in the socket buffers until the readers run.
    a.start().unwrap();
    b.start().unwrap();
    let reader_a = pump_into("rx-a", &sock_a, &a);
    let reader_b = pump_into("rx-b", &sock_b, &b);

    let mut ready: Vec<&str> = (0..2)
        .map(|_| init_rx.recv_timeout(Duration::from_secs(5)).unwrap())
        .collect();
    ready.sort_unstable();
    assert_eq!(ready, vec!["a", "b"]);
    assert_eq!(a.link_state(), LinkState::Active);

    a.send(PacketType::Acl, &[1, 2, 3]).unwrap();
    a.send(PacketType::Event, &[0x0E, 0x04]).unwrap();

    let first = packet_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(first.packet_type, PacketType::Acl);
    assert_eq!(first.payload.as_ref(), &[1, 2, 3]);
    let second = packet_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(second.packet_type, PacketType::Event);

    a.stop().unwrap();
    b.stop().unwrap();
    sock_a.shutdown(Shutdown::Both).unwrap();
    sock_b.shutdown(Shutdown::Both).unwrap();
    reader_a.join();
    reader_b.join();
}
