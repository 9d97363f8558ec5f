//! 전송 세션 상태
//!
//! 한 번의 파일 전송에 필요한 설정, 소켓, 입력 스트림, 세그먼트 버퍼,
//! 카운터, 프로토콜 상태를 모두 소유

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::panic::Location;
use std::path::Path;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::peer::sockaddr_size;
use crate::segment::{Segment, SegmentType};
use crate::state::ProtocolState;
use crate::stats::{LogSink, SessionSnapshot, TracingSink, TransferStats};
use crate::transport::Datagram;
use crate::{Error, Result, SEGMENT_SIZE, SOCKADDR_IN_SIZE};

/// 전송 세션
pub struct Session {
    /// 설정 (모드, 서버, 타임아웃, 재시도, 손실 확률)
    pub(crate) config: Config,

    /// 현재 프로토콜 상태
    pub(crate) state: ProtocolState,

    /// 마지막 상태 전이 위치
    pub(crate) src_file: &'static str,
    pub(crate) src_line: u32,

    /// 데이터그램 소켓 (`None`이면 미설정)
    pub(crate) socket: Option<Box<dyn Datagram>>,

    /// 서버 주소
    pub(crate) server: Option<SocketAddr>,

    /// 기대 주소 구조체 크기
    pub(crate) sockaddr_size: usize,

    /// 세그먼트 와이어 크기
    pub(crate) seg_size: usize,

    /// 입력 스트림
    pub(crate) in_file: Option<Box<dyn Read + Send>>,

    /// 파일 크기
    pub(crate) fsize: u64,

    /// 아직 읽지 않은 바이트 수
    pub(crate) tfr_bytes: u64,

    /// 현재 DATA 세그먼트
    pub(crate) data: Segment,

    /// 현재 ACK 세그먼트
    pub(crate) ack: Segment,

    /// 현재 시퀀스 번호의 재전송 횟수
    pub(crate) curr_retry: u32,

    /// 누적 통계
    pub(crate) stats: TransferStats,

    /// 손상 시뮬레이션용 난수원
    pub(crate) rng: Box<dyn RngCore + Send>,

    /// 상태 전이 로그 싱크
    pub(crate) sink: Box<dyn LogSink>,
}

impl Session {
    /// 새 세션 생성 (초기 상태 INIT)
    pub fn new(config: Config) -> Self {
        Self {
            config: config.validate(),
            state: ProtocolState::Init,
            src_file: file!(),
            src_line: line!(),
            socket: None,
            server: None,
            sockaddr_size: SOCKADDR_IN_SIZE,
            seg_size: SEGMENT_SIZE,
            in_file: None,
            fsize: 0,
            tfr_bytes: 0,
            data: Segment::new(SegmentType::Data),
            ack: Segment::new(SegmentType::Ack),
            curr_retry: 0,
            stats: TransferStats::new(),
            rng: Box::new(StdRng::from_entropy()),
            sink: Box::new(TracingSink),
        }
    }

    /// 로그 싱크 교체
    pub fn with_sink(mut self, sink: impl LogSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// 난수원 교체 (테스트에서 시드 고정용)
    pub fn with_rng(mut self, rng: impl RngCore + Send + 'static) -> Self {
        self.rng = Box::new(rng);
        self
    }

    /// 세그먼트 버퍼 초기화
    pub fn init_segment(&mut self, seg_type: SegmentType, payload_only: bool) {
        match seg_type {
            SegmentType::Data => self.data.reset(seg_type, payload_only),
            SegmentType::Ack => self.ack.reset(seg_type, payload_only),
        }
    }

    /// UDP 소켓 생성 및 서버 주소 설정
    ///
    /// 소켓 생성 실패 시 상태 유지, 주소 해석 실패 시 소켓을 닫고 상태 유지.
    /// 성공하면 TFR_READY
    pub fn open_transport(&mut self) -> Result<()> {
        let socket = match UdpSocket::bind(self.config.bind_addr) {
            Ok(socket) => socket,
            Err(e) => {
                self.socket = None;
                warn!("소켓 생성 실패: {}", e);
                return Err(e.into());
            }
        };

        let ip: Ipv4Addr = match self.config.server_host.parse() {
            Ok(ip) => ip,
            Err(_) => {
                drop(socket);
                self.socket = None;
                warn!("서버 주소 해석 실패: {}", self.config.server_host);
                return Err(Error::AddressResolution(self.config.server_host.clone()));
            }
        };

        let server = SocketAddr::V4(SocketAddrV4::new(ip, self.config.server_port));
        if let Ok(local) = socket.local_addr() {
            debug!("Bound to local address: {}", local);
        }

        self.socket = Some(Box::new(socket));
        self.server = Some(server);
        self.set_state(ProtocolState::TfrReady);
        Ok(())
    }

    /// 외부에서 만든 전송 계층 연결 (TFR_READY)
    ///
    /// 기대 주소 구조체 크기는 서버 주소의 패밀리를 따름
    pub fn attach_transport(&mut self, socket: Box<dyn Datagram>, server: SocketAddr) {
        self.socket = Some(socket);
        self.server = Some(server);
        self.sockaddr_size = sockaddr_size(&server);
        self.set_state(ProtocolState::TfrReady);
    }

    /// 소켓 수신 타임아웃 설정
    ///
    /// 실패는 치명적 (BAD_SOCKTOUT)
    pub fn set_receive_timeout(&mut self) -> Result<()> {
        let timeout = self.config.timeout;
        let result = match self.socket.as_deref() {
            Some(socket) => socket.set_read_timeout(Some(timeout)),
            None => Err(io::Error::new(io::ErrorKind::NotConnected, "socket unset")),
        };

        if let Err(e) = result {
            warn!("수신 타임아웃 설정 실패 ({:?}): {}", timeout, e);
            return Err(self.fail(ProtocolState::BadSocktout));
        }

        debug!("수신 타임아웃: {:?}", timeout);
        Ok(())
    }

    /// 입력 파일 열기
    pub fn open_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let size = file.metadata()?.len();

        info!("입력 파일: {} ({} bytes)", path.display(), size);
        self.attach_input(BufReader::new(file), size);
        Ok(())
    }

    /// 임의의 입력 스트림 연결
    pub fn attach_input(&mut self, input: impl Read + Send + 'static, size: u64) {
        self.in_file = Some(Box::new(input));
        self.fsize = size;
        self.tfr_bytes = size;
    }

    /// 소켓과 입력 스트림 해제 (drop 시에도 호출)
    pub fn close(&mut self) {
        if self.socket.take().is_some() {
            debug!("소켓 해제");
        }
        if self.in_file.take().is_some() {
            debug!("입력 파일 해제");
        }
    }

    /// 상태 설정 + 호출 위치 기록 + 로그
    #[track_caller]
    pub(crate) fn set_state(&mut self, state: ProtocolState) {
        let location = Location::caller();
        self.state = state;
        self.src_file = location.file();
        self.src_line = location.line();

        let snapshot = self.snapshot();
        self.sink.log(&snapshot);
    }

    /// 에러 상태로 전이하고 전파할 에러 생성
    #[track_caller]
    pub(crate) fn fail(&mut self, state: ProtocolState) -> Error {
        self.set_state(state);
        Error::Protocol {
            state,
            file: self.src_file,
            line: self.src_line,
        }
    }

    /// 현재 세션 스냅샷
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            mode: self.config.mode,
            src_file: self.src_file,
            src_line: self.src_line,
            sequence: self.data.sequence,
            payload_length: self.data.payload_length,
            fsize: self.fsize,
            tfr_bytes: self.tfr_bytes,
            total_segments: self.stats.total_segments,
            total_file_data: self.stats.total_file_data,
            curr_retry: self.curr_retry,
            max_retries: self.config.max_retries,
        }
    }

    pub fn state(&self) -> ProtocolState {
        self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn stats(&self) -> &TransferStats {
        &self.stats
    }

    pub fn fsize(&self) -> u64 {
        self.fsize
    }

    pub fn tfr_bytes(&self) -> u64 {
        self.tfr_bytes
    }

    pub fn curr_retry(&self) -> u32 {
        self.curr_retry
    }

    pub fn data_segment(&self) -> &Segment {
        &self.data
    }

    pub fn ack_segment(&self) -> &Segment {
        &self.ack
    }

    pub fn server_addr(&self) -> Option<SocketAddr> {
        self.server
    }

    pub fn src_line(&self) -> u32 {
        self.src_line
    }

    pub fn has_socket(&self) -> bool {
        self.socket.is_some()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_deref().and_then(|s| s.local_addr().ok())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}
