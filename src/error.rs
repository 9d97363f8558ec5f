//! 에러 타입 정의

use thiserror::Error;

use crate::state::ProtocolState;

/// RFT 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO 에러: {0}")]
    Io(#[from] std::io::Error),

    #[error("직렬화 에러: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("유효하지 않은 와이어 크기: expected {expected}, got {got}")]
    Decode { expected: usize, got: usize },

    #[error("프로토콜 에러 {state} ({file}:{line})")]
    Protocol {
        state: ProtocolState,
        file: &'static str,
        line: u32,
    },

    #[error("서버 주소 해석 실패: {0}")]
    AddressResolution(String),

    #[error("소켓 없음")]
    SocketUnset,

    #[error("입력 파일 없음")]
    NoInput,

    #[error("유효하지 않은 전송 모드: {0}")]
    InvalidMode(String),
}

impl Error {
    /// 프로토콜 에러인 경우 종단 상태 반환
    pub fn protocol_state(&self) -> Option<ProtocolState> {
        match self {
            Error::Protocol { state, .. } => Some(*state),
            _ => None,
        }
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, Error>;
