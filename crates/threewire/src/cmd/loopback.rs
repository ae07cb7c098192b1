use std::net::Shutdown;
use std::os::unix::net::UnixStream;

use crossbeam_channel::RecvTimeoutError;
use threewire_link::{H5Link, LinkConfig, Packet, PacketType};
use threewire_transport::{spawn_reader, ReaderHandle, WriteSink};

use crate::cmd::{parse_duration, parse_hex, LoopbackArgs};
use crate::exit::{io_error, link_error, transport_error, CliError, CliResult, SUCCESS, TIMEOUT};
use crate::output::{print_packet, print_stats, OutputFormat};

struct End {
    link: H5Link,
    stream: UnixStream,
}

impl End {
    fn new(stream: UnixStream, config: LinkConfig) -> CliResult<Self> {
        let writer = stream
            .try_clone()
            .map_err(|err| io_error("socket clone failed", err))?;
        Ok(Self {
            link: H5Link::with_config(WriteSink::new(writer), config),
            stream,
        })
    }

    fn pump(&self, name: &str) -> CliResult<ReaderHandle> {
        let reader = self
            .stream
            .try_clone()
            .map_err(|err| io_error("socket clone failed", err))?;
        let intake = self.link.intake();
        spawn_reader(name, reader, move |buf| intake.on_bytes_received(buf))
            .map_err(|err| transport_error("reader start failed", err))
    }
}

pub fn run(args: LoopbackArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let payload = parse_hex(&args.hex)?;

    let (sock_a, sock_b) = UnixStream::pair().map_err(|err| io_error("socketpair failed", err))?;
    let config = |name: &str| LinkConfig {
        tx_window: args.window,
        worker_name: name.to_string(),
        ..LinkConfig::default()
    };
    let a = End::new(sock_a, config("h5-worker-a"))?;
    let b = End::new(sock_b, config("h5-worker-b"))?;

    let (init_tx, init_rx) = crossbeam_channel::unbounded::<()>();
    for end in [&a, &b] {
        let init_tx = init_tx.clone();
        end.link.set_init_callback(move || {
            let _ = init_tx.send(());
        });
    }

    let (packet_tx, packet_rx) = crossbeam_channel::unbounded::<Packet>();
    b.link.set_receive_callback(move |packet| {
        let _ = packet_tx.send(packet);
    });

    // Both SYNC_REQs are buffered in the socket before either side reads.
    a.link.start().map_err(|err| link_error("start failed", err))?;
    b.link.start().map_err(|err| link_error("start failed", err))?;
    let readers = [a.pump("h5-rx-a")?, b.pump("h5-rx-b")?];

    let result = exchange(&a.link, &init_rx, &packet_rx, &payload, &args, timeout, format);

    if args.stats && result.is_ok() {
        print_stats(&b.link.stats(), format);
    }

    for end in [&a, &b] {
        if let Err(err) = end.link.stop() {
            tracing::warn!(%err, "link did not stop cleanly");
        }
        let _ = end.stream.shutdown(Shutdown::Both);
    }
    for reader in readers {
        reader.join();
    }

    result
}

fn exchange(
    sender: &H5Link,
    init_rx: &crossbeam_channel::Receiver<()>,
    packet_rx: &crossbeam_channel::Receiver<Packet>,
    payload: &[u8],
    args: &LoopbackArgs,
    timeout: std::time::Duration,
    format: OutputFormat,
) -> CliResult<i32> {
    for _ in 0..2 {
        init_rx
            .recv_timeout(timeout)
            .map_err(|_| CliError::new(TIMEOUT, "handshake timed out"))?;
    }
    tracing::info!(tx_win = sender.tx_window(), "loopback link active");

    for _ in 0..args.count {
        sender
            .send(PacketType::Acl, payload)
            .map_err(|err| link_error("send failed", err))?;

        match packet_rx.recv_timeout(timeout) {
            Ok(packet) => print_packet(&packet, "b", format),
            Err(RecvTimeoutError::Timeout) => {
                return Err(CliError::new(TIMEOUT, "packet was not delivered in time"))
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(CliError::new(crate::exit::INTERNAL, "receiver went away"))
            }
        }
    }

    Ok(SUCCESS)
}
