//! 프로토콜 상태 및 전송 모드 정의

use std::fmt;
use std::str::FromStr;

use crate::Error;

/// 프로토콜 상태
///
/// 상태 머신의 현재 위치이자 에러 보고 채널.
/// 에러 상태는 종단 상태로, 도달하면 세션이 끝남.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolState {
    /// 세션 초기화됨
    Init,
    /// 소켓/서버 주소 준비 완료
    TfrReady,
    /// 전송 루프 시작
    StartSend,
    /// DATA 세그먼트 최초 전송
    DataSend,
    /// 같은 시퀀스 번호의 DATA 재전송
    DataResend,
    /// ACK 대기
    AckWait,
    /// 검증된 ACK 수신
    AckRecv,
    /// 전송 완료
    TfrComplete,
    /// 빈 파일 (보낼 데이터 없음)
    EmptyFile,

    // -- 에러 상태 --
    BadRead,
    BadSend,
    BadAck,
    BadAckSq,
    BadSSize,
    BadSPort,
    BadSFam,
    BadSAddr,
    ExceedRetry,
    BadSocktout,
}

impl ProtocolState {
    /// 종단 에러 상태 여부
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            ProtocolState::BadRead
                | ProtocolState::BadSend
                | ProtocolState::BadAck
                | ProtocolState::BadAckSq
                | ProtocolState::BadSSize
                | ProtocolState::BadSPort
                | ProtocolState::BadSFam
                | ProtocolState::BadSAddr
                | ProtocolState::ExceedRetry
                | ProtocolState::BadSocktout
        )
    }

    /// 정상 종료 상태 여부
    pub fn is_success(&self) -> bool {
        matches!(self, ProtocolState::TfrComplete | ProtocolState::EmptyFile)
    }

    /// 로그용 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolState::Init => "INIT",
            ProtocolState::TfrReady => "TFR_READY",
            ProtocolState::StartSend => "START_SEND",
            ProtocolState::DataSend => "DATA_SEND",
            ProtocolState::DataResend => "DATA_RESEND",
            ProtocolState::AckWait => "ACK_WAIT",
            ProtocolState::AckRecv => "ACK_RECV",
            ProtocolState::TfrComplete => "TFR_COMPLETE",
            ProtocolState::EmptyFile => "EMPTY_FILE",
            ProtocolState::BadRead => "BAD_READ",
            ProtocolState::BadSend => "BAD_SEND",
            ProtocolState::BadAck => "BAD_ACK",
            ProtocolState::BadAckSq => "BAD_ACK_SQ",
            ProtocolState::BadSSize => "BAD_S_SIZE",
            ProtocolState::BadSPort => "BAD_S_PORT",
            ProtocolState::BadSFam => "BAD_S_FAM",
            ProtocolState::BadSAddr => "BAD_S_ADDR",
            ProtocolState::ExceedRetry => "EXCEED_RETRY",
            ProtocolState::BadSocktout => "BAD_SOCKTOUT",
        }
    }
}

impl fmt::Display for ProtocolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 전송 모드
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferMode {
    /// 재전송 없는 stop-and-wait. 모든 이상은 치명적
    #[default]
    Normal,
    /// 수신 타임아웃 기반 제한 재전송 + 체크섬 손상 시뮬레이션
    Timeout,
}

impl TransferMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferMode::Normal => "nm",
            TransferMode::Timeout => "wt",
        }
    }
}

impl fmt::Display for TransferMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransferMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nm" | "normal" => Ok(TransferMode::Normal),
            "wt" | "timeout" => Ok(TransferMode::Timeout),
            _ => Err(Error::InvalidMode(s.to_string())),
        }
    }
}
