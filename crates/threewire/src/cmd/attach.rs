use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::RecvTimeoutError;
use threewire_link::{H5Link, LinkConfig, Packet};
use threewire_transport::{spawn_reader, WriteSink};

use crate::cmd::{parse_duration, AttachArgs};
use crate::exit::{link_error, transport_error, CliError, CliResult, INTERNAL, SUCCESS, TIMEOUT, TRANSPORT_ERROR};
use crate::output::{print_packet, OutputFormat};

const READ_TIMEOUT: Duration = Duration::from_millis(500);
const POLL_INTERVAL: Duration = Duration::from_millis(200);

pub fn run(args: AttachArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;

    let port = port_builder(&args.device, args.baud).open().map_err(|err| {
        CliError::new(TRANSPORT_ERROR, format!("failed to open {}: {err}", args.device))
    })?;
    let writer = port.try_clone().map_err(|err| {
        CliError::new(TRANSPORT_ERROR, format!("failed to clone {}: {err}", args.device))
    })?;

    let config = LinkConfig {
        tx_window: args.window,
        ..LinkConfig::default()
    };
    let link = H5Link::with_config(WriteSink::new(writer), config);

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(Arc::clone(&running))?;

    let (init_tx, init_rx) = crossbeam_channel::unbounded::<()>();
    link.set_init_callback(move || {
        let _ = init_tx.send(());
    });
    let (packet_tx, packet_rx) = crossbeam_channel::unbounded::<Packet>();
    link.set_receive_callback(move |packet| {
        let _ = packet_tx.send(packet);
    });

    let intake = link.intake();
    let reader = spawn_reader("h5-rx", port, move |buf| intake.on_bytes_received(buf))
        .map_err(|err| transport_error("reader start failed", err))?;

    link.start().map_err(|err| link_error("start failed", err))?;
    let result = receive(&link, &running, &init_rx, &packet_rx, timeout, args.count, format);

    reader.stop();
    let stopped = link.stop().map_err(|err| link_error("stop failed", err));
    reader.join();

    let code = result?;
    stopped?;
    Ok(code)
}

/// Three-wire runs 8N1 without hardware or software flow control.
fn port_builder(device: &str, baud: u32) -> serialport::SerialPortBuilder {
    serialport::new(device, baud)
        .timeout(READ_TIMEOUT)
        .data_bits(serialport::DataBits::Eight)
        .stop_bits(serialport::StopBits::One)
        .parity(serialport::Parity::None)
        .flow_control(serialport::FlowControl::None)
}

fn receive(
    link: &H5Link,
    running: &AtomicBool,
    init_rx: &crossbeam_channel::Receiver<()>,
    packet_rx: &crossbeam_channel::Receiver<Packet>,
    timeout: Duration,
    count: Option<usize>,
    format: OutputFormat,
) -> CliResult<i32> {
    init_rx
        .recv_timeout(timeout)
        .map_err(|_| CliError::new(TIMEOUT, "handshake timed out"))?;
    tracing::info!(tx_win = link.tx_window(), "link active");

    let mut printed = 0usize;
    while running.load(Ordering::SeqCst) {
        match packet_rx.recv_timeout(POLL_INTERVAL) {
            Ok(packet) => {
                print_packet(&packet, "device", format);
                printed = printed.saturating_add(1);
                if count.is_some_and(|count| printed >= count) {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
