//! 수신자 (요청측)
//!
//! - expected 프레임만 싱크에 기록 (버퍼링 없음)
//! - 순서가 맞지 않거나 중복된 프레임은 버리고 마지막 ACK 재전송
//! - 자체 재전송 타이머 없음, 도착한 datagram에만 반응
//! - 마지막 프레임 후 linger 동안 중복 프레임에 마지막 ACK 재전송

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::frame::{Frame, SeqId};
use crate::message::ControlMessage;
use crate::stats::TransferStats;
use crate::transport::Link;
use crate::{Config, Error, Result, FRAME_SIZE};

/// 진행 상황 로그 간격 (프레임 수)
const PROGRESS_INTERVAL: u32 = 100;

/// 수신자 ARQ 엔진
///
/// expected 커서와 출력 싱크를 단독 소유한다.
pub struct Receiver<W> {
    config: Config,
    link: Link,
    sink: W,
    expected: SeqId,
    stats: TransferStats,
}

impl<W> Receiver<W>
where
    W: AsyncWrite + Unpin,
{
    /// 새 수신자 생성 (expected = 1)
    pub fn new(config: Config, link: Link, sink: W) -> Self {
        Self {
            config,
            link,
            sink,
            expected: 1,
            stats: TransferStats::default(),
        }
    }

    /// 다음에 받을 시퀀스 ID
    pub fn expected(&self) -> SeqId {
        self.expected
    }

    /// 통계 반환
    pub fn stats(&self) -> &TransferStats {
        &self.stats
    }

    /// 싱크 반환
    pub fn into_sink(self) -> W {
        self.sink
    }

    /// total_frames개를 순서대로 받을 때까지 수신
    ///
    /// 실패해도 이미 기록한 데이터는 싱크에 남는다.
    /// 다 받은 뒤에는 마지막 ACK가 유실된 송신자가 재전송을 멈출 때까지 linger한다.
    pub async fn run(&mut self, total_frames: u32) -> Result<TransferStats> {
        self.stats = TransferStats::new(total_frames);
        self.expected = 1;

        info!("수신 시작: {} frames <- {}", total_frames, self.link.peer());

        let result = self.receive_loop(total_frames).await;
        let flushed = self.sink.flush().await;
        self.stats.finish();

        match result.and(flushed.map_err(Error::from)) {
            Ok(()) => {
                info!("수신 완료: {}", self.stats.receiver_summary());
                if let Err(e) = self.linger().await {
                    warn!("linger 중 에러 (수신 데이터는 완료): {}", e);
                }
                Ok(self.stats.clone())
            }
            Err(e) => {
                warn!("수신 실패: {} ({})", e, self.stats.receiver_summary());
                Err(e)
            }
        }
    }

    async fn receive_loop(&mut self, total_frames: u32) -> Result<()> {
        let mut buf = vec![0u8; FRAME_SIZE];

        while self.expected <= total_frames {
            let len = match self.config.idle_timeout() {
                Some(idle) => match self.link.recv_timeout(&mut buf, idle).await? {
                    Some(len) => len,
                    None => {
                        return Err(Error::IdleTimeout {
                            expected: self.expected,
                            waited_ms: idle.as_millis() as u64,
                        })
                    }
                },
                None => self.link.recv(&mut buf).await?,
            };

            if let Some(ack) = self.handle_datagram(&buf[..len]).await? {
                self.send_ack(ack).await?;
            }
        }

        Ok(())
    }

    /// 조용해질 때까지 중복 프레임에 마지막 ACK 재전송
    async fn linger(&mut self) -> Result<()> {
        let Some(linger) = self.config.linger() else {
            return Ok(());
        };
        let mut buf = vec![0u8; FRAME_SIZE];

        while let Some(len) = self.link.recv_timeout(&mut buf, linger).await? {
            if let Some(ack) = self.handle_datagram(&buf[..len]).await? {
                debug!("완료 후 중복 프레임, ACK {} 재전송", ack);
                self.send_ack(ack).await?;
            }
        }
        Ok(())
    }

    /// datagram 하나 처리, 보낼 ACK 반환 (디코딩 실패 시 None)
    pub async fn handle_datagram(&mut self, bytes: &[u8]) -> Result<Option<SeqId>> {
        match Frame::decode(bytes) {
            Ok(frame) => self.handle_frame(&frame).await.map(Some),
            Err(e) => {
                self.stats.malformed_frames += 1;
                debug!("datagram 버림: {}", e);
                Ok(None)
            }
        }
    }

    /// 프레임 하나 처리, 보낼 ACK 반환
    pub async fn handle_frame(&mut self, frame: &Frame) -> Result<SeqId> {
        let seq_id = frame.seq_id();

        if seq_id != self.expected {
            // 중복 또는 순서 어긋남: 마지막 ACK 재전송
            self.stats.out_of_order_frames += 1;
            debug!(
                "frame {} 버림 (expected {}), ACK {} 재전송",
                seq_id,
                self.expected,
                self.expected - 1
            );
            return Ok(self.expected - 1);
        }

        self.sink.write_all(frame.payload()).await?;
        self.stats.frames_delivered += 1;
        self.stats.total_bytes += frame.payload_len() as u64;
        self.expected += 1;

        debug!("frame {} 기록 ({} bytes)", seq_id, frame.payload_len());
        if seq_id % PROGRESS_INTERVAL == 0 || seq_id == self.stats.total_frames {
            info!("Progress: frame {}/{}", seq_id, self.stats.total_frames);
        }

        Ok(seq_id)
    }

    async fn send_ack(&mut self, ack: SeqId) -> Result<()> {
        self.link.send(&ControlMessage::ack(ack).to_bytes()?).await?;
        self.stats.acks_sent += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;
    use tokio::net::UdpSocket;

    use super::*;

    async fn receiver(sink: Vec<u8>) -> Receiver<Vec<u8>> {
        let socket = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
        let peer = socket.local_addr().unwrap();
        Receiver::new(Config::local_test(), Link::new(socket, peer), sink)
    }

    fn frame(seq_id: SeqId, data: &'static [u8]) -> Frame {
        Frame::new(seq_id, Bytes::from_static(data)).unwrap()
    }

    #[tokio::test]
    async fn test_in_order_frames_written() {
        let mut rx = receiver(Vec::new()).await;

        assert_eq!(rx.handle_frame(&frame(1, b"hello ")).await.unwrap(), 1);
        assert_eq!(rx.handle_frame(&frame(2, b"world")).await.unwrap(), 2);
        assert_eq!(rx.expected(), 3);
        assert_eq!(rx.into_sink(), b"hello world");
    }

    #[tokio::test]
    async fn test_duplicate_written_once() {
        let mut rx = receiver(Vec::new()).await;

        assert_eq!(rx.handle_frame(&frame(1, b"abc")).await.unwrap(), 1);
        assert_eq!(rx.handle_frame(&frame(1, b"abc")).await.unwrap(), 1);
        assert_eq!(rx.stats().out_of_order_frames, 1);
        assert_eq!(rx.into_sink(), b"abc");
    }

    #[tokio::test]
    async fn test_out_of_order_resends_last_ack() {
        let mut rx = receiver(Vec::new()).await;

        // 첫 프레임 전에 3이 오면 ACK 0
        assert_eq!(rx.handle_frame(&frame(3, b"c")).await.unwrap(), 0);
        assert_eq!(rx.handle_frame(&frame(1, b"a")).await.unwrap(), 1);
        assert_eq!(rx.handle_frame(&frame(3, b"c")).await.unwrap(), 1);
        assert_eq!(rx.handle_frame(&frame(2, b"b")).await.unwrap(), 2);
        assert_eq!(rx.handle_frame(&frame(3, b"c")).await.unwrap(), 3);
        assert_eq!(rx.into_sink(), b"abc");
    }

    #[tokio::test]
    async fn test_malformed_datagram_ignored() {
        let mut rx = receiver(Vec::new()).await;

        assert_eq!(rx.handle_datagram(&[1, 2, 3]).await.unwrap(), None);
        assert_eq!(rx.stats().malformed_frames, 1);
        assert_eq!(rx.expected(), 1);

        let bytes = frame(1, b"ok").encode().unwrap();
        assert_eq!(rx.handle_datagram(&bytes).await.unwrap(), Some(1));
        assert_eq!(rx.into_sink(), b"ok");
    }

    #[tokio::test]
    async fn test_last_ack_resent_after_completion() {
        let socket = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let link = Link::new(socket.clone(), peer.local_addr().unwrap());
        let mut rx = Receiver::new(Config::local_test(), link, Vec::new());

        let receiver_addr = socket.local_addr().unwrap();
        let sender = tokio::spawn(async move {
            let bytes = frame(1, b"only").encode().unwrap();
            let mut buf = [0u8; 16];
            let mut acks = Vec::new();

            // 첫 ACK가 유실됐다고 보고 같은 프레임을 한 번 더 전송
            for _ in 0..2 {
                peer.send_to(&bytes, receiver_addr).await.unwrap();
                let (len, _) = peer.recv_from(&mut buf).await.unwrap();
                acks.push(ControlMessage::from_bytes(&buf[..len]).unwrap().value);
            }
            acks
        });

        let stats = rx.run(1).await.unwrap();
        assert_eq!(sender.await.unwrap(), vec![1, 1]);
        assert_eq!(stats.frames_delivered, 1);
        assert_eq!(stats.acks_sent, 2);
        assert_eq!(rx.into_sink(), b"only");
    }

    #[tokio::test]
    async fn test_idle_timeout() {
        let socket = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
        let peer = socket.local_addr().unwrap();
        let config = Config {
            idle_timeout_ms: 50,
            ..Config::local_test()
        };
        let mut rx = Receiver::new(config, Link::new(socket, peer), Vec::new());

        let err = rx.run(2).await.unwrap_err();
        assert!(matches!(err, Error::IdleTimeout { expected: 1, .. }));
    }
}
