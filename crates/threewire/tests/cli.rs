#![cfg(feature = "cli")]

use std::process::{Command, Output};

fn threewire(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_threewire"))
        .args(["--log-level", "error"])
        .args(args)
        .output()
        .expect("threewire should run")
}

#[test]
fn encode_prints_wire_bytes() {
    let output = threewire(&["--format", "json", "encode", "--type", "acl", "--hex", "010203"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"wire\":\"c08032004d010203c0\""), "{stdout}");
    assert!(stdout.contains("\"reliable\":true"));
}

#[test]
fn encode_link_message() {
    let output = threewire(&["--format", "pretty", "encode", "--link", "sync-req"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.trim_end().ends_with("01 7E C0"), "{stdout}");
}

#[test]
fn decode_reports_frames() {
    let output = threewire(&["--format", "json", "decode", "c0 80 32 00 4d 01 02 03 c0"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"status\":\"ok\""), "{stdout}");
    assert!(stdout.contains("\"packet_type\":\"ACL\""));
    assert!(stdout.contains("\"payload\":\"010203\""));
}

#[test]
fn decode_bad_checksum_exits_60() {
    let output = threewire(&["--format", "json", "decode", "c0 80 32 00 4e 01 02 03 c0"]);
    assert_eq!(output.status.code(), Some(60));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"status\":\"invalid\""));
}

#[test]
fn decode_rejects_malformed_hex() {
    let output = threewire(&["decode", "c0 8"]);
    assert_eq!(output.status.code(), Some(60));
}

#[test]
fn attach_missing_device_exits_3() {
    let output = threewire(&["attach", "/dev/threewire-does-not-exist", "--timeout", "1s"]);
    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to open"));
}

#[cfg(unix)]
#[test]
fn loopback_delivers_packets() {
    let output = threewire(&[
        "--format", "json", "loopback", "--count", "3", "--hex", "c0db01", "--stats",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let packets: Vec<&str> = stdout
        .lines()
        .filter(|line| line.contains("\"packet_type\""))
        .collect();
    assert_eq!(packets.len(), 3, "{stdout}");
    assert!(packets.iter().all(|p| p.contains("\"payload\":\"c0db01\"")));
    assert!(stdout.contains("\"packets_delivered\":3"));
}

#[test]
fn version_prints_name() {
    let output = threewire(&["version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("threewire "));
}

#[test]
fn unknown_subcommand_is_usage_error() {
    let output = threewire(&["frobnicate"]);
    assert_eq!(output.status.code(), Some(2));
}
