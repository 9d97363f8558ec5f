//! 피어 검증
//!
//! 수신한 ACK가 실제로 DATA를 보낸 서버에서 왔는지 확인

use std::net::SocketAddr;

use crate::session::Session;
use crate::state::ProtocolState;
use crate::{SOCKADDR_IN6_SIZE, SOCKADDR_IN_SIZE};

/// 주소 구조체의 직렬화 크기 (sockaddr_in / sockaddr_in6)
pub fn sockaddr_size(addr: &SocketAddr) -> usize {
    match addr {
        SocketAddr::V4(_) => SOCKADDR_IN_SIZE,
        SocketAddr::V6(_) => SOCKADDR_IN6_SIZE,
    }
}

/// 관찰된 주소를 기대 주소와 비교
///
/// 크기 → 포트 → 패밀리 → 주소 순으로 검사하여 첫 불일치를 반환.
/// 모두 같으면 `current`를 그대로 반환
pub fn verify_peer(
    expected: &SocketAddr,
    expected_size: usize,
    observed: &SocketAddr,
    observed_size: usize,
    current: ProtocolState,
) -> ProtocolState {
    if observed_size != expected_size {
        return ProtocolState::BadSSize;
    }

    if observed.port() != expected.port() {
        return ProtocolState::BadSPort;
    }

    if observed.is_ipv4() != expected.is_ipv4() {
        return ProtocolState::BadSFam;
    }

    if observed.ip() != expected.ip() {
        return ProtocolState::BadSAddr;
    }

    current
}

impl Session {
    /// 세션의 서버 주소 기준 피어 검증
    pub fn verify_peer(&self, observed: &SocketAddr, observed_size: usize) -> ProtocolState {
        match self.server {
            Some(server) => verify_peer(
                &server,
                self.sockaddr_size,
                observed,
                observed_size,
                self.state,
            ),
            None => ProtocolState::BadSAddr,
        }
    }
}
