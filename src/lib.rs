//! # RFT (Reliable File Transfer)
//!
//! UDP 기반 stop-and-wait 파일 전송 클라이언트
//!
//! ## 핵심 특징
//! - **고정 크기 세그먼트**: DATA / ACK 동일 와이어 크기, 네트워크 바이트 순서
//! - **명시적 ACK**: 세그먼트마다 시퀀스 번호가 같은 ACK 하나
//! - **체크섬**: CRC32로 전송 오류 검출, 테스트용 손상 시뮬레이션
//! - **피어 검증**: ACK 송신자의 크기/포트/패밀리/주소 확인
//! - **두 가지 전송 모드**: 일반 (재전송 없음) / 타임아웃 (제한 재전송)

pub mod config;
pub mod error;
pub mod metadata;
pub mod peer;
pub mod segment;
pub mod session;
pub mod state;
pub mod stats;
pub mod transfer;
pub mod transport;

use std::time::Duration;

pub use config::Config;
pub use error::{Error, Result};
pub use metadata::MetadataMessage;
pub use peer::{sockaddr_size, verify_peer};
pub use segment::{checksum, is_corrupted, Segment, SegmentType, SequenceNumber};
pub use session::Session;
pub use state::{ProtocolState, TransferMode};
pub use stats::{LogSink, RecordingSink, SessionSnapshot, TracingSink, TransferStats};
pub use transfer::{send_file, AckOutcome};
pub use transport::Datagram;

/// 페이로드 용량 (바이트)
pub const PAYLOAD_SIZE: usize = 1000;

/// 세그먼트 헤더 크기: type(4) + sequence(4) + checksum(4) + payload_length(4)
pub const SEGMENT_HEADER_SIZE: usize = 16;

/// 세그먼트 와이어 크기
pub const SEGMENT_SIZE: usize = SEGMENT_HEADER_SIZE + PAYLOAD_SIZE;

/// 파일 이름 버퍼 용량
pub const MAX_FILENAME_SIZE: usize = 256;

/// 메타데이터 와이어 크기: size(8) + name
pub const METADATA_SIZE: usize = 8 + MAX_FILENAME_SIZE;

/// 기본 ACK 수신 타임아웃
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// 기본 최대 재전송 횟수
pub const DEFAULT_RETRIES: u32 = 4;

/// sockaddr_in 크기
pub const SOCKADDR_IN_SIZE: usize = 16;

/// sockaddr_in6 크기
pub const SOCKADDR_IN6_SIZE: usize = 28;
