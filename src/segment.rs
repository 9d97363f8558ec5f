//! 세그먼트 정의 및 체크섬
//!
//! - Segment: DATA / ACK 공용 고정 크기 와이어 단위
//! - 헤더는 bincode (big-endian, 고정 길이 정수), 페이로드는 원시 바이트

use bincode::Options;
use bytes::{BufMut, Bytes, BytesMut};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{Error, Result, PAYLOAD_SIZE, SEGMENT_HEADER_SIZE, SEGMENT_SIZE};

/// 시퀀스 번호 (32비트, wrapping)
pub type SequenceNumber = u32;

/// 고정 레이아웃 직렬화 옵션 (네트워크 바이트 순서)
pub(crate) fn wire_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_big_endian()
        .with_fixint_encoding()
}

/// 세그먼트 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentType {
    /// 파일 데이터
    Data,
    /// 확인 응답
    Ack,
}

/// 세그먼트 헤더 (와이어 전용)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct SegmentHeader {
    seg_type: SegmentType,
    sequence: SequenceNumber,
    checksum: u32,
    payload_length: u32,
}

/// 세그먼트
///
/// 페이로드는 항상 PAYLOAD_SIZE 바이트. `payload_length` 이후는 0으로 채워짐
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// 세그먼트 타입
    pub seg_type: SegmentType,

    /// 시퀀스 번호
    pub sequence: SequenceNumber,

    /// 페이로드 체크섬
    pub checksum: u32,

    /// 유효 페이로드 길이 (ACK는 0)
    pub payload_length: u32,

    /// 고정 크기 페이로드 버퍼
    pub payload: [u8; PAYLOAD_SIZE],
}

impl Segment {
    /// 0으로 채워진 새 세그먼트
    pub fn new(seg_type: SegmentType) -> Self {
        Self {
            seg_type,
            sequence: 0,
            checksum: 0,
            payload_length: 0,
            payload: [0u8; PAYLOAD_SIZE],
        }
    }

    /// 데이터를 담은 DATA 세그먼트 (체크섬 계산 포함)
    ///
    /// 데이터가 PAYLOAD_SIZE보다 길면 잘림
    pub fn data(sequence: SequenceNumber, data: &[u8]) -> Self {
        let mut segment = Self::new(SegmentType::Data);
        let len = data.len().min(PAYLOAD_SIZE);
        segment.sequence = sequence;
        segment.payload[..len].copy_from_slice(&data[..len]);
        segment.payload_length = len as u32;
        segment.checksum = checksum(&segment.payload, false);
        segment
    }

    /// 주어진 시퀀스 번호에 대한 ACK 세그먼트
    pub fn ack(sequence: SequenceNumber) -> Self {
        let mut segment = Self::new(SegmentType::Ack);
        segment.sequence = sequence;
        segment
    }

    /// 세그먼트 초기화
    ///
    /// `payload_only`가 false면 전체를 0으로 만들고 타입을 설정,
    /// true면 페이로드만 0으로 만들고 타입/시퀀스/체크섬/길이는 유지
    pub fn reset(&mut self, seg_type: SegmentType, payload_only: bool) {
        if payload_only {
            self.payload.fill(0);
        } else {
            *self = Self::new(seg_type);
        }
    }

    /// 유효 페이로드 바이트
    pub fn data_bytes(&self) -> &[u8] {
        let len = (self.payload_length as usize).min(PAYLOAD_SIZE);
        &self.payload[..len]
    }

    /// 체크섬 검증
    pub fn verify_checksum(&self) -> bool {
        checksum(&self.payload, false) == self.checksum
    }

    /// 바이트로 직렬화 (항상 SEGMENT_SIZE)
    pub fn to_bytes(&self) -> Result<Bytes> {
        let header = SegmentHeader {
            seg_type: self.seg_type,
            sequence: self.sequence,
            checksum: self.checksum,
            payload_length: self.payload_length,
        };
        let header_bytes = wire_options().serialize(&header)?;

        let mut buf = BytesMut::with_capacity(SEGMENT_SIZE);
        buf.put_slice(&header_bytes);
        buf.put_slice(&self.payload);
        Ok(buf.freeze())
    }

    /// 바이트에서 역직렬화
    ///
    /// 길이가 정확히 SEGMENT_SIZE가 아니면 거부
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != SEGMENT_SIZE {
            return Err(Error::Decode {
                expected: SEGMENT_SIZE,
                got: bytes.len(),
            });
        }

        let header: SegmentHeader = wire_options().deserialize(&bytes[..SEGMENT_HEADER_SIZE])?;
        let mut payload = [0u8; PAYLOAD_SIZE];
        payload.copy_from_slice(&bytes[SEGMENT_HEADER_SIZE..]);

        Ok(Self {
            seg_type: header.seg_type,
            sequence: header.sequence,
            checksum: header.checksum,
            payload_length: header.payload_length,
            payload,
        })
    }
}

/// 페이로드 체크섬 (CRC32)
///
/// `corrupt`가 true면 실제 값의 보수를 반환하므로 검증에 반드시 실패
pub fn checksum(payload: &[u8], corrupt: bool) -> u32 {
    let crc = crc32fast::hash(payload);
    if corrupt {
        !crc
    } else {
        crc
    }
}

/// 주어진 확률로 true 반환
///
/// 확률이 0이면 난수원을 호출하지 않음
pub fn is_corrupted<R: Rng + ?Sized>(prob: f32, rng: &mut R) -> bool {
    if prob == 0.0 {
        return false;
    }

    rng.gen::<f32>() <= prob
}

/// 손상 시뮬레이션이 포함된 체크섬
pub fn simulated_checksum<R: Rng + ?Sized>(payload: &[u8], loss_prob: f32, rng: &mut R) -> u32 {
    checksum(payload, is_corrupted(loss_prob, rng))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{RngCore, SeedableRng};

    /// 호출되면 실패하는 난수원
    struct PanicRng;

    impl RngCore for PanicRng {
        fn next_u32(&mut self) -> u32 {
            panic!("random source must not be used");
        }

        fn next_u64(&mut self) -> u64 {
            panic!("random source must not be used");
        }

        fn fill_bytes(&mut self, _dest: &mut [u8]) {
            panic!("random source must not be used");
        }

        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
            panic!("random source must not be used");
        }
    }

    #[test]
    fn test_wire_size_is_fixed() {
        let data = Segment::data(7, b"hello");
        let ack = Segment::ack(7);

        assert_eq!(data.to_bytes().unwrap().len(), SEGMENT_SIZE);
        assert_eq!(ack.to_bytes().unwrap().len(), SEGMENT_SIZE);
    }

    #[test]
    fn test_header_is_big_endian() {
        let mut segment = Segment::data(0x01020304, b"x");
        segment.seg_type = SegmentType::Ack;
        let bytes = segment.to_bytes().unwrap();

        assert_eq!(&bytes[0..4], &[0, 0, 0, 1]);
        assert_eq!(&bytes[4..8], &[1, 2, 3, 4]);
        assert_eq!(&bytes[12..16], &[0, 0, 0, 1]);
        assert_eq!(bytes[SEGMENT_HEADER_SIZE], b'x');
    }

    #[test]
    fn test_segment_serialization() {
        let payload: Vec<u8> = (0..=255u8).cycle().take(PAYLOAD_SIZE - 1).collect();
        let segment = Segment::data(42, &payload);

        let bytes = segment.to_bytes().unwrap();
        let restored = Segment::from_bytes(&bytes).unwrap();

        assert_eq!(restored.seg_type, SegmentType::Data);
        assert_eq!(restored.sequence, 42);
        assert_eq!(restored.data_bytes(), payload.as_slice());
        assert!(restored.verify_checksum());
    }

    #[test]
    fn test_from_bytes_rejects_wrong_length() {
        let bytes = Segment::ack(1).to_bytes().unwrap();

        assert!(matches!(
            Segment::from_bytes(&bytes[..SEGMENT_SIZE - 1]),
            Err(Error::Decode { .. })
        ));

        let mut long = bytes.to_vec();
        long.push(0);
        assert!(Segment::from_bytes(&long).is_err());
    }

    #[test]
    fn test_from_bytes_rejects_unknown_type() {
        let mut bytes = Segment::ack(1).to_bytes().unwrap().to_vec();
        bytes[3] = 9;
        assert!(matches!(
            Segment::from_bytes(&bytes),
            Err(Error::Serialization(_))
        ));
    }

    #[test]
    fn test_reset_payload_only_keeps_header() {
        let mut segment = Segment::data(9, b"some file bytes");
        let checksum_before = segment.checksum;

        segment.reset(SegmentType::Data, true);

        assert_eq!(segment.sequence, 9);
        assert_eq!(segment.checksum, checksum_before);
        assert_eq!(segment.payload_length, 15);
        assert!(segment.payload.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_reset_full_zeroes_everything() {
        let mut segment = Segment::data(9, b"abc");
        segment.reset(SegmentType::Ack, false);

        assert_eq!(segment, Segment::new(SegmentType::Ack));
    }

    #[test]
    fn test_corrupted_checksum_never_verifies() {
        let mut segment = Segment::data(1, b"payload");
        segment.checksum = checksum(&segment.payload, true);
        assert!(!segment.verify_checksum());
    }

    #[test]
    fn test_zero_probability_skips_random_source() {
        let mut rng = PanicRng;
        assert!(!is_corrupted(0.0, &mut rng));
        assert!(!is_corrupted(-0.0, &mut rng));
    }

    #[test]
    fn test_zero_probability_never_corrupts() {
        let mut rng = StdRng::seed_from_u64(1);
        let payload = [0xABu8; PAYLOAD_SIZE];
        let good = checksum(&payload, false);

        for _ in 0..10_000 {
            assert_eq!(simulated_checksum(&payload, 0.0, &mut rng), good);
        }
    }

    #[test]
    fn test_full_probability_always_corrupts() {
        let mut rng = StdRng::seed_from_u64(2);
        let payload = [0x5Au8; PAYLOAD_SIZE];
        let good = checksum(&payload, false);

        for _ in 0..10_000 {
            assert_ne!(simulated_checksum(&payload, 1.0, &mut rng), good);
        }
    }
}
