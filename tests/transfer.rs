//! 루프백 UDP 위에서 전체 전송 흐름 검증
//!
//! 각 테스트는 별도 스레드에서 stop-and-wait 피어를 띄우고,
//! 클라이언트 세션이 메타데이터와 세그먼트를 보내는 과정을 확인

use std::io::Write;
use std::net::{SocketAddr, UdpSocket};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::NamedTempFile;

use rft::{
    Config, MetadataMessage, ProtocolState, RecordingSink, Segment, Session, METADATA_SIZE,
    SEGMENT_SIZE,
};

/// 피어가 받은 결과
#[derive(Debug, Default)]
struct PeerReport {
    metadata: Option<MetadataMessage>,
    data: Vec<u8>,
    segments_seen: usize,
    corrupted_seen: usize,
}

/// 체크섬이 맞는 DATA에만 ACK하는 피어
fn spawn_peer(idle: Duration) -> (SocketAddr, JoinHandle<PeerReport>) {
    let socket = UdpSocket::bind("127.0.0.1:0").expect("bind peer socket");
    socket.set_read_timeout(Some(idle)).expect("peer timeout");
    let addr = socket.local_addr().expect("peer addr");

    let handle = thread::spawn(move || {
        let mut report = PeerReport::default();
        let mut expected_sq = 0u32;
        let mut buf = vec![0u8; 2048];

        loop {
            let (len, from) = match socket.recv_from(&mut buf) {
                Ok(r) => r,
                Err(_) => return report,
            };

            if len == METADATA_SIZE && report.metadata.is_none() {
                let metadata = MetadataMessage::from_bytes(&buf[..len]).expect("metadata");
                let done = metadata.size == 0;
                report.metadata = Some(metadata);
                if done {
                    return report;
                }
                continue;
            }

            assert_eq!(len, SEGMENT_SIZE);
            let segment = Segment::from_bytes(&buf[..len]).expect("segment");
            report.segments_seen += 1;

            if !segment.verify_checksum() {
                report.corrupted_seen += 1;
                continue;
            }

            if segment.sequence == expected_sq {
                report.data.extend_from_slice(segment.data_bytes());
                expected_sq = expected_sq.wrapping_add(1);
            }

            let ack = Segment::ack(segment.sequence).to_bytes().expect("ack");
            socket.send_to(&ack, from).expect("send ack");

            let size = report.metadata.as_ref().map_or(0, |m| m.size);
            if report.data.len() as u64 >= size {
                return report;
            }
        }
    });

    (addr, handle)
}

fn temp_file(len: usize) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    let data: Vec<u8> = (0..len).map(|i| (i * 7 % 256) as u8).collect();
    file.write_all(&data).expect("write temp file");
    file.flush().expect("flush");
    file
}

#[test]
fn normal_transfer_delivers_whole_file() {
    let (addr, peer) = spawn_peer(Duration::from_secs(5));
    let file = temp_file(5_000);

    let config = Config::normal("127.0.0.1", addr.port()).out_fname("copy.bin");
    let stats = rft::send_file(config, file.path()).expect("transfer");

    let report = peer.join().expect("peer thread");
    let metadata = report.metadata.expect("metadata received");

    assert_eq!(metadata.size, 5_000);
    assert_eq!(metadata.name_bytes(), b"copy.bin");
    assert_eq!(report.data, std::fs::read(file.path()).unwrap());
    assert_eq!(stats.total_file_data, 5_000);
    assert_eq!(stats.total_segments, 6);
}

#[test]
fn output_name_defaults_to_input_name() {
    let (addr, peer) = spawn_peer(Duration::from_secs(5));
    let file = temp_file(10);
    let expected = file.path().file_name().unwrap().to_string_lossy().into_owned();

    rft::send_file(Config::normal("127.0.0.1", addr.port()), file.path()).expect("transfer");

    let report = peer.join().expect("peer thread");
    assert_eq!(report.metadata.unwrap().name_bytes(), expected.as_bytes());
}

#[test]
fn empty_file_ends_in_empty_state() {
    let (addr, peer) = spawn_peer(Duration::from_secs(5));
    let file = temp_file(0);

    let sink = RecordingSink::new();
    let mut session = Session::new(Config::normal("127.0.0.1", addr.port()).out_fname("empty"))
        .with_sink(sink.clone());
    session.run(file.path()).expect("transfer");
    session.close();

    let report = peer.join().expect("peer thread");

    assert_eq!(session.state(), ProtocolState::EmptyFile);
    assert_eq!(report.metadata.unwrap().size, 0);
    assert_eq!(report.segments_seen, 0);
    assert_eq!(sink.count(ProtocolState::DataSend), 0);
}

#[test]
fn timeout_mode_recovers_from_corruption() {
    let (addr, peer) = spawn_peer(Duration::from_secs(5));
    let file = temp_file(8_000);

    let config = Config::with_timeout("127.0.0.1", addr.port(), 0.3)
        .timeout(Duration::from_millis(500))
        .max_retries(50)
        .out_fname("lossy.bin");
    let sink = RecordingSink::new();
    let mut session = Session::new(config)
        .with_sink(sink.clone())
        .with_rng(StdRng::seed_from_u64(42));

    session.run(file.path()).expect("transfer");
    session.close();

    let report = peer.join().expect("peer thread");

    assert_eq!(session.state(), ProtocolState::TfrComplete);
    assert_eq!(report.data, std::fs::read(file.path()).unwrap());
    assert_eq!(session.stats().total_file_data, 8_000);
    assert_eq!(session.stats().retransmissions as usize, report.corrupted_seen);
    assert_eq!(sink.count(ProtocolState::DataResend), report.corrupted_seen);
    assert_eq!(sink.count(ProtocolState::AckRecv), 9);
}

#[test]
fn timeout_mode_gives_up_after_retry_budget() {
    let (addr, peer) = spawn_peer(Duration::from_millis(800));
    let file = temp_file(100);

    let config = Config::with_timeout("127.0.0.1", addr.port(), 1.0)
        .timeout(Duration::from_millis(50))
        .max_retries(2);
    let mut session = Session::new(config);

    let err = session.run(file.path()).expect_err("must exhaust retries");
    session.close();

    let report = peer.join().expect("peer thread");

    assert_eq!(err.protocol_state(), Some(ProtocolState::ExceedRetry));
    assert_eq!(session.state(), ProtocolState::ExceedRetry);
    assert_eq!(report.segments_seen, 3);
    assert_eq!(report.corrupted_seen, 3);
    assert!(report.data.is_empty());
}

#[test]
fn unresolvable_server_fails_before_sending() {
    let file = temp_file(10);
    let err = rft::send_file(Config::normal("example.invalid", 9), file.path()).unwrap_err();
    assert!(matches!(err, rft::Error::AddressResolution(_)));
}
