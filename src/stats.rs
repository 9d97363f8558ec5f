//! 전송 통계 및 세션 스냅샷 로깅

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{error, info};

use crate::segment::SequenceNumber;
use crate::state::{ProtocolState, TransferMode};

/// 전체 전송 통계
#[derive(Debug, Clone)]
pub struct TransferStats {
    /// 시작 시간
    pub start_time: Instant,

    /// 종료 시간
    pub end_time: Option<Instant>,

    /// ACK 확인된 세그먼트 수
    pub total_segments: u64,

    /// ACK 확인된 파일 바이트
    pub total_file_data: u64,

    /// 재전송 횟수
    pub retransmissions: u64,

    /// 수신 타임아웃 횟수
    pub timeouts: u64,
}

impl TransferStats {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            end_time: None,
            total_segments: 0,
            total_file_data: 0,
            retransmissions: 0,
            timeouts: 0,
        }
    }

    /// 확인된 세그먼트 기록
    pub fn record_ack(&mut self, bytes: u64) {
        self.total_segments += 1;
        self.total_file_data += bytes;
    }

    /// 타임아웃 기록
    pub fn record_timeout(&mut self) {
        self.timeouts += 1;
    }

    /// 재전송 기록
    pub fn record_retransmit(&mut self) {
        self.retransmissions += 1;
    }

    /// 전송 종료 시각 기록
    pub fn finish(&mut self) {
        self.end_time.get_or_insert_with(Instant::now);
    }

    /// 경과 시간
    pub fn elapsed(&self) -> Duration {
        match self.end_time {
            Some(end) => end.duration_since(self.start_time),
            None => self.start_time.elapsed(),
        }
    }

    /// 처리율 (bytes/sec)
    pub fn throughput(&self) -> f64 {
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed == 0.0 {
            return 0.0;
        }
        self.total_file_data as f64 / elapsed
    }

    /// 통계 요약 문자열
    pub fn summary(&self) -> String {
        format!(
            "Elapsed: {:.2}s | Segments: {} | Bytes: {} | Throughput: {:.2} KB/s | Retransmits: {} | Timeouts: {}",
            self.elapsed().as_secs_f64(),
            self.total_segments,
            self.total_file_data,
            self.throughput() / 1_000.0,
            self.retransmissions,
            self.timeouts,
        )
    }
}

impl Default for TransferStats {
    fn default() -> Self {
        Self::new()
    }
}

/// 상태 전이 시점의 세션 스냅샷
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub state: ProtocolState,
    pub mode: TransferMode,
    pub src_file: &'static str,
    pub src_line: u32,
    pub sequence: SequenceNumber,
    pub payload_length: u32,
    pub fsize: u64,
    pub tfr_bytes: u64,
    pub total_segments: u64,
    pub total_file_data: u64,
    pub curr_retry: u32,
    pub max_retries: u32,
}

/// 로그 싱크: 모든 상태 전이마다 세션 스냅샷 수신
pub trait LogSink: Send {
    fn log(&mut self, snapshot: &SessionSnapshot);
}

/// tracing 이벤트로 출력하는 기본 싱크
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&mut self, s: &SessionSnapshot) {
        let src = format!("{}:{}", s.src_file, s.src_line);
        if s.state.is_error() {
            error!(
                state = %s.state,
                src = %src,
                sq = s.sequence,
                tfr_bytes = s.tfr_bytes,
                segments = s.total_segments,
                file_data = s.total_file_data,
                retry = s.curr_retry,
                "protocol error"
            );
        } else {
            info!(
                state = %s.state,
                mode = %s.mode,
                src = %src,
                sq = s.sequence,
                len = s.payload_length,
                fsize = s.fsize,
                tfr_bytes = s.tfr_bytes,
                segments = s.total_segments,
                file_data = s.total_file_data,
                retry = s.curr_retry,
                max_retries = s.max_retries,
                "protocol"
            );
        }
    }
}

/// 스냅샷을 메모리에 쌓는 싱크 (복제본끼리 기록 공유)
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    records: Arc<Mutex<Vec<SessionSnapshot>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 기록된 스냅샷 복사본
    pub fn snapshots(&self) -> Vec<SessionSnapshot> {
        self.records.lock().clone()
    }

    /// 기록된 상태 순서
    pub fn states(&self) -> Vec<ProtocolState> {
        self.records.lock().iter().map(|s| s.state).collect()
    }

    /// 특정 상태가 기록된 횟수
    pub fn count(&self, state: ProtocolState) -> usize {
        self.records.lock().iter().filter(|s| s.state == state).count()
    }
}

impl LogSink for RecordingSink {
    fn log(&mut self, snapshot: &SessionSnapshot) {
        self.records.lock().push(snapshot.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_ack_accumulates() {
        let mut stats = TransferStats::new();
        stats.record_ack(999);
        stats.record_ack(1);
        stats.record_retransmit();
        stats.record_timeout();
        stats.finish();

        assert_eq!(stats.total_segments, 2);
        assert_eq!(stats.total_file_data, 1000);
        assert_eq!(stats.retransmissions, 1);
        assert_eq!(stats.timeouts, 1);
        assert!(stats.summary().contains("Segments: 2"));
    }

    #[test]
    fn test_finish_freezes_elapsed() {
        let mut stats = TransferStats::new();
        stats.finish();
        let first = stats.elapsed();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(stats.elapsed(), first);
    }
}
