//! 데이터그램 전송 계층
//!
//! 세션은 `Box<dyn Datagram>`만 알고, 실제 소켓은 `std::net::UdpSocket`

use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

/// 데이터그램 소켓 인터페이스
pub trait Datagram: Send {
    /// 데이터그램 하나 전송
    fn send_to(&self, buf: &[u8], addr: SocketAddr) -> io::Result<usize>;

    /// 데이터그램 하나 수신
    fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;

    /// 수신 타임아웃 설정 (`None`이면 무한 대기)
    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()>;

    /// 로컬 주소
    fn local_addr(&self) -> io::Result<SocketAddr>;
}

impl Datagram for UdpSocket {
    fn send_to(&self, buf: &[u8], addr: SocketAddr) -> io::Result<usize> {
        UdpSocket::send_to(self, buf, addr)
    }

    fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        UdpSocket::recv_from(self, buf)
    }

    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        UdpSocket::set_read_timeout(self, timeout)
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        UdpSocket::local_addr(self)
    }
}

/// 수신 결과
#[derive(Debug)]
pub enum RecvOutcome {
    /// 데이터그램 수신 (바이트 수, 송신자 주소)
    Received(usize, SocketAddr),
    /// 타임아웃 내 응답 없음
    TimedOut,
}

/// 타임아웃 에러 여부 (Unix: WouldBlock, Windows: TimedOut)
pub fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

/// 수신 후 타임아웃을 별도 결과로 분류
pub fn recv_classified(socket: &dyn Datagram, buf: &mut [u8]) -> io::Result<RecvOutcome> {
    match socket.recv_from(buf) {
        Ok((len, addr)) => Ok(RecvOutcome::Received(len, addr)),
        Err(e) if is_timeout(&e) => Ok(RecvOutcome::TimedOut),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_udp_timeout_is_classified() {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket.set_read_timeout(Some(Duration::from_millis(20))).unwrap();

        let mut buf = [0u8; 16];
        let outcome = recv_classified(&socket, &mut buf).unwrap();
        assert!(matches!(outcome, RecvOutcome::TimedOut));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        assert!(Datagram::set_read_timeout(&socket, Some(Duration::ZERO)).is_err());
    }
}
