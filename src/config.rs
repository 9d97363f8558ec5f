//! 전송 설정

use std::net::SocketAddr;
use std::time::Duration;

use crate::state::TransferMode;
use crate::{DEFAULT_RETRIES, DEFAULT_TIMEOUT};

/// RFT 클라이언트 설정
#[derive(Debug, Clone)]
pub struct Config {
    /// 서버 주소 (숫자 IPv4 표기)
    pub server_host: String,

    /// 서버 포트
    pub server_port: u16,

    /// 로컬 바인드 주소
    pub bind_addr: SocketAddr,

    /// 전송 모드
    pub mode: TransferMode,

    /// 서버측 저장 파일 이름 (메타데이터로 전달)
    pub out_fname: String,

    /// ACK 수신 타임아웃 (타임아웃 모드 전용)
    pub timeout: Duration,

    /// 최대 재전송 횟수
    pub max_retries: u32,

    /// 체크섬 손상 확률 (0.0 ~ 1.0, 타임아웃 모드 전용)
    pub loss_prob: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: "127.0.0.1".to_string(),
            server_port: 50001,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 0)),
            mode: TransferMode::Normal,
            out_fname: String::new(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_RETRIES,
            loss_prob: 0.0,
        }
    }
}

impl Config {
    /// 새 설정 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 재전송 없는 기본 모드 설정
    pub fn normal(host: impl Into<String>, port: u16) -> Self {
        Self {
            server_host: host.into(),
            server_port: port,
            mode: TransferMode::Normal,
            ..Self::default()
        }
    }

    /// 타임아웃 재전송 모드 설정
    pub fn with_timeout(host: impl Into<String>, port: u16, loss_prob: f32) -> Self {
        Self {
            server_host: host.into(),
            server_port: port,
            mode: TransferMode::Timeout,
            loss_prob,
            ..Self::default()
        }
        .validate()
    }

    pub fn out_fname(mut self, name: impl Into<String>) -> Self {
        self.out_fname = name.into();
        self
    }

    pub fn mode(mut self, mode: TransferMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn loss_prob(mut self, loss_prob: f32) -> Self {
        self.loss_prob = loss_prob;
        self.validate()
    }

    /// 손실 확률을 [0, 1] 범위로 보정
    pub fn validate(mut self) -> Self {
        if self.loss_prob.is_nan() {
            self.loss_prob = 0.0;
        }
        self.loss_prob = self.loss_prob.clamp(0.0, 1.0);
        self
    }
}
