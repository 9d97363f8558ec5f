//! 전송 상태 머신
//!
//! INIT → TFR_READY → START_SEND → {DATA_SEND | DATA_RESEND → ACK_WAIT → ACK_RECV}*
//! → TFR_COMPLETE | EMPTY_FILE
//!
//! - 일반 모드: 재전송 없는 stop-and-wait, 모든 이상은 치명적
//! - 타임아웃 모드: 수신 타임아웃만 재전송으로 처리, 나머지 이상은 치명적

use std::io::{self, Read};
use std::path::Path;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::peer::sockaddr_size;
use crate::segment::{checksum, simulated_checksum, Segment, SegmentType};
use crate::session::Session;
use crate::state::{ProtocolState, TransferMode};
use crate::stats::TransferStats;
use crate::transport::{recv_classified, RecvOutcome};
use crate::{Error, Result, PAYLOAD_SIZE, SEGMENT_SIZE};

/// ACK 대기 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// 검증된 ACK 수신
    Verified,
    /// 제한 시간 내 응답 없음 (타임아웃 모드 전용)
    TimedOut,
}

/// `buf`가 가득 차거나 EOF까지 읽기
fn read_up_to(input: &mut dyn Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match input.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

impl Session {
    /// 다음 파일 조각을 DATA 페이로드로 읽기
    ///
    /// 최대 PAYLOAD_SIZE - 1 바이트. `tfr_bytes`는 읽은 만큼 감소
    pub fn read_data(&mut self) -> Result<usize> {
        self.init_segment(SegmentType::Data, true);

        let want = (self.tfr_bytes.min((PAYLOAD_SIZE - 1) as u64)) as usize;
        let result = match self.in_file.as_mut() {
            Some(input) => read_up_to(&mut **input, &mut self.data.payload[..want]),
            None => Err(io::Error::new(io::ErrorKind::NotFound, "input unset")),
        };

        let read = match result {
            Ok(0) if want > 0 => {
                warn!("예상보다 이른 EOF: {} bytes 남음", self.tfr_bytes);
                return Err(self.fail(ProtocolState::BadRead));
            }
            Ok(n) => n,
            Err(e) => {
                warn!("파일 읽기 에러: {}", e);
                return Err(self.fail(ProtocolState::BadRead));
            }
        };

        self.data.payload_length = read as u32;
        self.tfr_bytes -= read as u64;
        Ok(read)
    }

    /// 현재 DATA 세그먼트 전송
    ///
    /// `simulate_corruption`이면 설정된 손실 확률로 체크섬을 손상시킴
    pub fn send_data(&mut self, simulate_corruption: bool) -> Result<()> {
        if self.curr_retry > self.config.max_retries {
            return Err(self.fail(ProtocolState::ExceedRetry));
        }

        self.data.checksum = if simulate_corruption {
            simulated_checksum(&self.data.payload, self.config.loss_prob, &mut *self.rng)
        } else {
            checksum(&self.data.payload, false)
        };

        if self.curr_retry == 0 {
            self.set_state(ProtocolState::DataSend);
        } else {
            self.stats.record_retransmit();
            self.set_state(ProtocolState::DataResend);
        }

        let bytes = match self.data.to_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("세그먼트 직렬화 실패: {}", e);
                return Err(self.fail(ProtocolState::BadSend));
            }
        };

        let sent = match (self.socket.as_deref(), self.server) {
            (Some(socket), Some(server)) => socket.send_to(&bytes, server),
            _ => Err(io::Error::new(io::ErrorKind::NotConnected, "socket unset")),
        };

        match sent {
            Ok(n) if n == self.seg_size => {
                debug!("DATA 전송: sq={}, len={}", self.data.sequence, self.data.payload_length);
                Ok(())
            }
            Ok(n) => {
                warn!(
                    "전송 크기 불일치: expected {} bytes, sent {} bytes",
                    self.seg_size, n
                );
                Err(self.fail(ProtocolState::BadSend))
            }
            Err(e) => {
                warn!("전송 에러: {}", e);
                Err(self.fail(ProtocolState::BadSend))
            }
        }
    }

    /// ACK 대기 및 검증
    ///
    /// 크기 → 시퀀스 → 피어 순으로 검사. `bounded`이면 타임아웃을
    /// `AckOutcome::TimedOut`으로 돌려주고, 아니면 BAD_ACK
    pub fn receive_ack(&mut self, bounded: bool) -> Result<AckOutcome> {
        self.set_state(ProtocolState::AckWait);
        self.init_segment(SegmentType::Ack, false);

        // 초과 크기 데이터그램도 크기 불일치로 잡기 위해 1바이트 여유
        let mut buf = [0u8; SEGMENT_SIZE + 1];
        let outcome = match self.socket.as_deref() {
            Some(socket) => recv_classified(socket, &mut buf),
            None => Err(io::Error::new(io::ErrorKind::NotConnected, "socket unset")),
        };

        let (len, from) = match outcome {
            Ok(RecvOutcome::Received(len, from)) => (len, from),
            Ok(RecvOutcome::TimedOut) if bounded => {
                warn!(
                    "ACK 타임아웃: sq={}, retry={}/{}",
                    self.data.sequence, self.curr_retry, self.config.max_retries
                );
                return Ok(AckOutcome::TimedOut);
            }
            Ok(RecvOutcome::TimedOut) => {
                warn!("ACK 수신 중단: sq={}", self.data.sequence);
                return Err(self.fail(ProtocolState::BadAck));
            }
            Err(e) => {
                warn!("수신 에러: {}", e);
                return Err(self.fail(ProtocolState::BadAck));
            }
        };

        if len != self.seg_size {
            warn!(
                "ACK 크기 불일치: expected {} bytes, got {} bytes",
                self.seg_size, len
            );
            return Err(self.fail(ProtocolState::BadAck));
        }

        match Segment::from_bytes(&buf[..len]) {
            Ok(segment) if segment.seg_type == SegmentType::Ack => self.ack = segment,
            Ok(segment) => {
                warn!("ACK가 아닌 세그먼트 수신: {:?}", segment.seg_type);
                return Err(self.fail(ProtocolState::BadAck));
            }
            Err(e) => {
                warn!("ACK 역직렬화 실패: {}", e);
                return Err(self.fail(ProtocolState::BadAck));
            }
        }

        if self.data.sequence != self.ack.sequence {
            warn!(
                "ACK 시퀀스 불일치: expected {}, got {}",
                self.data.sequence, self.ack.sequence
            );
            return Err(self.fail(ProtocolState::BadAckSq));
        }

        let verified = self.verify_peer(&from, sockaddr_size(&from));
        if verified != self.state {
            warn!("알 수 없는 피어의 ACK: {}", from);
            return Err(self.fail(verified));
        }

        self.set_state(ProtocolState::AckRecv);
        Ok(AckOutcome::Verified)
    }

    /// 확인된 세그먼트 반영: 시퀀스 증가 + 누적 통계
    fn advance(&mut self, bytes: usize) {
        self.data.sequence = self.data.sequence.wrapping_add(1);
        self.stats.record_ack(bytes as u64);
    }

    /// 루프 종료 후 최종 상태 결정
    fn complete(&mut self) {
        self.stats.finish();
        if self.fsize > 0 {
            self.set_state(ProtocolState::TfrComplete);
        } else {
            self.set_state(ProtocolState::EmptyFile);
        }
        info!("전송 종료 [{}]: {}", self.state, self.stats.summary());
    }

    /// 일반 모드 전송 (재전송 없음)
    pub fn send_file_normal(&mut self) -> Result<()> {
        self.set_state(ProtocolState::StartSend);

        while self.tfr_bytes > 0 {
            let read = self.read_data()?;
            self.send_data(false)?;
            self.receive_ack(false)?;
            self.advance(read);
        }

        self.complete();
        Ok(())
    }

    /// 타임아웃 모드 전송 (제한 재전송 + 손상 시뮬레이션)
    ///
    /// 소켓 수신 타임아웃을 먼저 적용. 실패하면 BAD_SOCKTOUT
    pub fn send_file_with_timeout(&mut self) -> Result<()> {
        self.set_receive_timeout()?;
        self.set_state(ProtocolState::StartSend);

        while self.tfr_bytes > 0 {
            let read = self.read_data()?;

            // 같은 페이로드를 재전송 (재읽기 없음)
            loop {
                self.send_data(true)?;
                match self.receive_ack(true)? {
                    AckOutcome::Verified => break,
                    AckOutcome::TimedOut => {
                        self.stats.record_timeout();
                        self.curr_retry += 1;
                    }
                }
            }

            self.curr_retry = 0;
            self.advance(read);
        }

        self.complete();
        Ok(())
    }

    /// 설정된 모드로 파일 전송
    pub fn transfer(&mut self) -> Result<()> {
        if self.socket.is_none() {
            return Err(Error::SocketUnset);
        }
        if self.in_file.is_none() {
            return Err(Error::NoInput);
        }

        match self.config.mode {
            TransferMode::Normal => self.send_file_normal(),
            TransferMode::Timeout => self.send_file_with_timeout(),
        }
    }

    /// 메타데이터 전송 후 파일 전송
    ///
    /// 메타데이터 전송 실패는 BAD_SEND
    pub fn send_with_metadata(&mut self) -> Result<()> {
        if !self.send_metadata() {
            return Err(self.fail(ProtocolState::BadSend));
        }

        self.transfer()
    }

    /// 전체 클라이언트 흐름: 소켓 → 파일 → 메타데이터 → 전송
    pub fn run(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.open_transport()?;
        self.open_file(path)?;
        self.send_with_metadata()
    }
}

/// 파일 하나를 서버로 전송하고 통계 반환
///
/// 출력 이름이 비어 있으면 입력 파일 이름을 사용. 성공/실패와 무관하게
/// 소켓과 파일은 반환 전에 해제됨
pub fn send_file(mut config: Config, path: impl AsRef<Path>) -> Result<TransferStats> {
    let path = path.as_ref();
    if config.out_fname.is_empty() {
        config.out_fname = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
    }

    let mut session = Session::new(config);
    let result = session.run(path);
    session.close();

    result.map(|_| session.stats().clone())
}
