//! UDP 링크
//!
//! 세션 상대방 하나와 datagram을 주고받는 얇은 래퍼.
//! 수신 타임아웃은 소켓 상태가 아니라 호출마다 인자로 받는다.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::Instant;
use tracing::debug;

use crate::Result;

/// 상대방이 고정된 UDP 링크
#[derive(Debug, Clone)]
pub struct Link {
    socket: Arc<UdpSocket>,
    peer: SocketAddr,
}

impl Link {
    pub fn new(socket: Arc<UdpSocket>, peer: SocketAddr) -> Self {
        Self { socket, peer }
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn socket(&self) -> &Arc<UdpSocket> {
        &self.socket
    }

    /// datagram 하나 전송
    pub async fn send(&self, bytes: &[u8]) -> Result<()> {
        self.socket.send_to(bytes, self.peer).await?;
        Ok(())
    }

    /// 타임아웃 없이 상대방 datagram 대기
    pub async fn recv(&self, buf: &mut [u8]) -> Result<usize> {
        loop {
            let (len, addr) = self.socket.recv_from(buf).await?;
            if addr == self.peer {
                return Ok(len);
            }
            debug!("다른 주소의 datagram 무시: {}", addr);
        }
    }

    /// `timeout` 안에 상대방 datagram 대기, 시간 초과 시 None
    pub async fn recv_timeout(&self, buf: &mut [u8], timeout: Duration) -> Result<Option<usize>> {
        self.recv_until(buf, Instant::now() + timeout).await
    }

    /// `deadline`까지 상대방 datagram 대기, 시간 초과 시 None
    pub async fn recv_until(&self, buf: &mut [u8], deadline: Instant) -> Result<Option<usize>> {
        loop {
            match tokio::time::timeout_at(deadline, self.socket.recv_from(buf)).await {
                Err(_) => return Ok(None),
                Ok(Err(e)) => return Err(e.into()),
                Ok(Ok((len, addr))) => {
                    if addr == self.peer {
                        return Ok(Some(len));
                    }
                    debug!("다른 주소의 datagram 무시: {}", addr);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn pair() -> (Link, Link) {
        let a = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
        let b = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
        let a_addr = a.local_addr().unwrap();
        let b_addr = b.local_addr().unwrap();
        (Link::new(a, b_addr), Link::new(b, a_addr))
    }

    #[tokio::test]
    async fn test_send_recv() {
        let (a, b) = pair().await;
        a.send(b"ping").await.unwrap();

        let mut buf = [0u8; 16];
        let len = b.recv_timeout(&mut buf, Duration::from_secs(1)).await.unwrap();
        assert_eq!(len, Some(4));
        assert_eq!(&buf[..4], b"ping");
    }

    #[tokio::test]
    async fn test_recv_timeout_expires() {
        let (_a, b) = pair().await;
        let mut buf = [0u8; 16];

        let len = b
            .recv_timeout(&mut buf, Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(len, None);
    }

    #[tokio::test]
    async fn test_foreign_datagram_ignored() {
        let (a, b) = pair().await;
        let stranger = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        stranger
            .send_to(b"noise", b.socket().local_addr().unwrap())
            .await
            .unwrap();
        a.send(b"real").await.unwrap();

        let mut buf = [0u8; 16];
        let len = b.recv_timeout(&mut buf, Duration::from_secs(1)).await.unwrap();
        assert_eq!(len, Some(4));
        assert_eq!(&buf[..4], b"real");
    }
}
