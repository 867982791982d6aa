//! End-to-end tests for message handling through the shared bridge.

use lora_to_csv_transcode::{Bridge, DualSink, Error, Transcoder};
use std::fs::File;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Writer whose contents stay inspectable while the bridge owns it.
#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn bridge(receiver: &str) -> (Bridge<SharedBuf, SharedBuf>, SharedBuf, SharedBuf) {
    let console = SharedBuf::default();
    let file = SharedBuf::default();
    let bridge = Bridge::new(
        Transcoder::new(receiver),
        DualSink::new(console.clone(), file.clone()),
    );
    (bridge, console, file)
}

#[test]
fn test_first_message_writes_header_and_row() {
    let (bridge, console, file) = bridge("RX1");

    let row = bridge
        .handle(
            "lora_aprs/RX1/TX1/json_message",
            br#"{"timestamp":"2024-01-01T00:00:00Z","lat":1.0,"lon":2.0}"#,
        )
        .unwrap();

    assert_eq!(row, vec!["2024-01-01T00:00:00Z", "RX1", "TX1", "1.0", "2.0"]);
    let expected = "timestamp,rx_callsign,tx_callsign,lat,lon\r\n\
                    2024-01-01T00:00:00Z,RX1,TX1,1.0,2.0\r\n";
    assert_eq!(console.contents(), expected);
    assert_eq!(file.contents(), expected);
}

#[test]
fn test_malformed_payload_writes_nothing() {
    let (bridge, console, file) = bridge("RX1");

    let err = bridge
        .handle("lora_aprs/RX1/TX1/json_message", b"{\"lat\":")
        .unwrap_err();

    assert!(matches!(err, Error::MalformedPayload(_)), "got {err:?}");
    assert_eq!(console.contents(), "");
    assert_eq!(file.contents(), "");
    assert!(bridge.columns().is_none());
}

#[test]
fn test_malformed_payload_between_valid_messages() {
    let (bridge, console, file) = bridge("RX1");
    let topic = "lora_aprs/RX1/TX1/json_message";

    bridge.handle(topic, br#"{"timestamp":"t1","lat":1.0}"#).unwrap();
    assert!(bridge.handle(topic, b"garbage").is_err());
    bridge.handle(topic, br#"{"timestamp":"t2","lat":2.0}"#).unwrap();

    let expected =
        "timestamp,rx_callsign,tx_callsign,lat\r\nt1,RX1,TX1,1.0\r\nt2,RX1,TX1,2.0\r\n";
    assert_eq!(console.contents(), expected);
    assert_eq!(file.contents(), expected);
}

#[test]
fn test_later_messages_follow_first_layout() {
    let (bridge, _console, file) = bridge("DB0ABC");

    bridge
        .handle(
            "lora_aprs/DB0ABC/DL1XYZ-7/json_message",
            br#"{"timestamp":"t1","lat":50.1,"lon":8.6,"path":["WIDE1-1"]}"#,
        )
        .unwrap();
    bridge
        .handle(
            "lora_aprs/DB0ABC/DL2ABC/json_message",
            br#"{"comment":"hello, world","timestamp":"t2","path":{"hops":2}}"#,
        )
        .unwrap();

    assert_eq!(
        bridge.columns().unwrap(),
        vec!["timestamp", "rx_callsign", "tx_callsign", "lat", "lon", "path"]
    );
    assert_eq!(
        file.contents(),
        "timestamp,rx_callsign,tx_callsign,lat,lon,path\r\n\
         t1,DB0ABC,DL1XYZ-7,50.1,8.6,\"[\"\"WIDE1-1\"\"]\"\r\n\
         t2,DB0ABC,DL2ABC,,,\"{\"\"hops\"\":2}\"\r\n"
    );
}

#[test]
fn test_unexpected_topic_shape_still_writes_row() {
    let (bridge, console, _file) = bridge("RX1");

    let row = bridge
        .handle("lora_aprs/RX1", br#"{"timestamp":"t"}"#)
        .unwrap();

    assert_eq!(row, vec!["t", "RX1", ""]);
    assert_eq!(
        console.contents(),
        "timestamp,rx_callsign,tx_callsign\r\nt,RX1,\r\n"
    );
}

#[test]
fn test_concurrent_messages_share_one_header() {
    let (bridge, console, file) = bridge("RX1");
    let bridge = Arc::new(bridge);

    std::thread::scope(|scope| {
        for sender in 0..8 {
            let bridge = Arc::clone(&bridge);
            scope.spawn(move || {
                for i in 0..50 {
                    let topic = format!("lora_aprs/RX1/TX{sender}/json_message");
                    let payload = format!(r#"{{"timestamp":"{i}","seq":{i},"tag":"a,b"}}"#);
                    bridge.handle(&topic, payload.as_bytes()).unwrap();
                }
            });
        }
    });

    let output = console.contents();
    assert_eq!(output, file.contents());

    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 1 + 8 * 50);
    assert_eq!(lines[0], "timestamp,rx_callsign,tx_callsign,seq,tag");
    assert!(lines[1..].iter().all(|l| l.starts_with(char::is_numeric)));
    assert!(lines[1..].iter().all(|l| l.ends_with(",\"a,b\"")));
}

#[test]
fn test_file_matches_console_after_close() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("lora-syslog.csv");
    let console = SharedBuf::default();
    let bridge = Bridge::new(
        Transcoder::new("RX1"),
        DualSink::new(console.clone(), File::create(&path).unwrap()),
    );

    for (tx, payload) in [
        ("TX1", r#"{"timestamp":"t1","lat":1.0,"comment":"line one\nline two"}"#),
        ("TX2", r#"{"timestamp":"t2","lat":null,"comment":"say \"hi\""}"#),
        ("TX3", r#"{"timestamp":"t3","lat":-3.25,"extra":true}"#),
    ] {
        let topic = format!("lora_aprs/RX1/{tx}/json_message");
        bridge.handle(&topic, payload.as_bytes()).unwrap();
    }
    bridge.close().unwrap();

    let on_disk = std::fs::read_to_string(&path).unwrap();
    assert_eq!(on_disk, console.contents());
    assert!(on_disk.starts_with("timestamp,rx_callsign,tx_callsign,lat,comment\r\n"));
    // Embedded newlines stay bare inside the quoted cell
    assert!(on_disk.contains("\"line one\nline two\"\r\n"));
    assert!(on_disk.ends_with("t3,RX1,TX3,-3.25,\r\n"));
}
