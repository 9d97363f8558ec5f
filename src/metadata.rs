//! 메타데이터 메시지
//!
//! 세그먼트 루프 전에 한 번만 전송: 파일 크기 + 서버측 파일 이름

use bincode::Options;
use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, warn};

use crate::segment::wire_options;
use crate::session::Session;
use crate::{Error, Result, MAX_FILENAME_SIZE, METADATA_SIZE};

/// 메타데이터 메시지
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataMessage {
    /// 전체 파일 크기 (바이트)
    pub size: u64,

    /// 파일 이름 버퍼
    ///
    /// 용량에 딱 맞는 이름이면 NUL로 끝나지 않음
    pub name: [u8; MAX_FILENAME_SIZE],
}

impl MetadataMessage {
    /// 새 메타데이터 생성 (이름은 용량에 맞게 자르거나 0으로 채움)
    pub fn new(size: u64, name: &str) -> Self {
        let mut buf = [0u8; MAX_FILENAME_SIZE];
        let bytes = name.as_bytes();
        let len = bytes.len().min(MAX_FILENAME_SIZE);
        buf[..len].copy_from_slice(&bytes[..len]);

        Self { size, name: buf }
    }

    /// 이름 바이트 (첫 NUL 전까지)
    pub fn name_bytes(&self) -> &[u8] {
        let end = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(MAX_FILENAME_SIZE);
        &self.name[..end]
    }

    /// 바이트로 직렬화 (항상 METADATA_SIZE)
    pub fn to_bytes(&self) -> Result<Bytes> {
        let size_bytes = wire_options().serialize(&self.size)?;

        let mut buf = BytesMut::with_capacity(METADATA_SIZE);
        buf.put_slice(&size_bytes);
        buf.put_slice(&self.name);
        Ok(buf.freeze())
    }

    /// 바이트에서 역직렬화
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != METADATA_SIZE {
            return Err(Error::Decode {
                expected: METADATA_SIZE,
                got: bytes.len(),
            });
        }

        let split = METADATA_SIZE - MAX_FILENAME_SIZE;
        let size: u64 = wire_options().deserialize(&bytes[..split])?;
        let mut name = [0u8; MAX_FILENAME_SIZE];
        name.copy_from_slice(&bytes[split..]);

        Ok(Self { size, name })
    }
}

impl Session {
    /// 메타데이터 전송
    ///
    /// 전송 바이트 수가 METADATA_SIZE와 다르면 false. 프로토콜 상태는 바꾸지 않음
    pub fn send_metadata(&mut self) -> bool {
        let message = MetadataMessage::new(self.fsize, &self.config.out_fname);

        let bytes = match message.to_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("메타데이터 직렬화 실패: {}", e);
                return false;
            }
        };

        let (socket, server) = match (self.socket.as_ref(), self.server) {
            (Some(socket), Some(server)) => (socket, server),
            _ => {
                warn!("메타데이터 전송 실패: 소켓 없음");
                return false;
            }
        };

        match socket.send_to(&bytes, server) {
            Ok(sent) if sent == METADATA_SIZE => {
                debug!("메타데이터 전송: size={}, name={}", message.size, self.config.out_fname);
                true
            }
            Ok(sent) => {
                warn!(
                    "메타데이터 크기 불일치: expected {} bytes, sent {} bytes",
                    METADATA_SIZE, sent
                );
                false
            }
            Err(e) => {
                warn!("메타데이터 전송 에러: {}", e);
                false
            }
        }
    }
}
