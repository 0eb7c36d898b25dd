//! 송신자 (파일 제공측)
//!
//! - 소스 스트림을 MAX_PAYLOAD 단위 프레임으로 분할
//! - Stop-and-Wait / Go-Back-N 전송
//! - ACK 타임아웃 기반 재전송, 재시도 한도 초과 시 세션 중단

use std::collections::VecDeque;
use std::path::PathBuf;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::frame::{Frame, SeqId};
use crate::loss::LossModel;
use crate::message::{ControlMessage, ProtocolVariant};
use crate::stats::TransferStats;
use crate::transport::Link;
use crate::{Config, Error, Result, MAX_PAYLOAD};

/// 진행 상황 로그 간격 (프레임 수)
const PROGRESS_INTERVAL: u32 = 100;

/// ACK 수신 버퍼 크기 (제어 메시지보다 큰 datagram도 받아서 버림)
const ACK_BUF_SIZE: usize = 512;

/// ACK 대기 결과
enum AckEvent {
    Ack(SeqId),
    Timeout,
}

/// 송신자 ARQ 엔진
///
/// 윈도우와 소스 읽기 커서를 단독 소유한다.
pub struct Sender<S, L> {
    config: Config,
    link: Link,
    source: S,
    source_path: PathBuf,
    loss: L,
    stats: TransferStats,
    max_in_flight: u32,
}

impl<S, L> Sender<S, L>
where
    S: AsyncRead + Unpin,
    L: LossModel,
{
    /// 새 송신자 생성
    pub fn new(config: Config, link: Link, source: S, loss: L) -> Self {
        Self {
            config,
            link,
            source,
            source_path: PathBuf::from("<stream>"),
            loss,
            stats: TransferStats::default(),
            max_in_flight: 0,
        }
    }

    /// 에러 메시지에 쓸 소스 경로
    pub fn with_source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = path.into();
        self
    }

    /// 전송 실행
    ///
    /// 실패해도 그 시점까지의 통계는 [`Sender::stats`]로 확인할 수 있다.
    pub async fn run(&mut self, variant: ProtocolVariant, total_frames: u32) -> Result<TransferStats> {
        self.stats = TransferStats::new(total_frames);
        self.max_in_flight = 0;

        info!(
            "{} 전송 시작: {} frames -> {}",
            variant,
            total_frames,
            self.link.peer()
        );

        let result = match variant {
            ProtocolVariant::StopAndWait => self.stop_and_wait(total_frames).await,
            ProtocolVariant::GoBackN => self.go_back_n(total_frames).await,
        };
        self.stats.finish();

        match result {
            Ok(()) => {
                info!("전송 완료: {}", self.stats.sender_summary());
                Ok(self.stats.clone())
            }
            Err(e) => {
                warn!("전송 실패: {} ({})", e, self.stats.sender_summary());
                Err(e)
            }
        }
    }

    /// 통계 반환
    pub fn stats(&self) -> &TransferStats {
        &self.stats
    }

    /// 관측된 최대 in-flight 프레임 수
    pub fn max_in_flight(&self) -> u32 {
        self.max_in_flight
    }

    async fn stop_and_wait(&mut self, total_frames: u32) -> Result<()> {
        let retry_limit = self.config.retry_limit.max(1);

        for seq_id in 1..=total_frames {
            let frame = self.next_frame(seq_id).await?;
            let mut attempts = 0u32;
            self.max_in_flight = 1;

            loop {
                if attempts >= retry_limit {
                    warn!("frame {}: {}회 시도 실패, 전송 중단", seq_id, attempts);
                    return Err(Error::TransferAborted { seq_id, attempts });
                }
                attempts += 1;

                self.transmit(&frame, attempts > 1).await?;

                let deadline = Instant::now() + self.config.ack_timeout();
                match self.await_ack(deadline).await? {
                    AckEvent::Ack(ack) if ack == seq_id => {
                        self.stats.acks_received += 1;
                        debug!("ACK {} 수신", ack);
                        break;
                    }
                    AckEvent::Ack(ack) => {
                        self.stats.stale_acks += 1;
                        info!("ACK 불일치: expected {}, got {} -> 재전송", seq_id, ack);
                    }
                    AckEvent::Timeout => {
                        self.stats.timeouts += 1;
                        info!("frame {} ACK 타임아웃 (시도 {}/{})", seq_id, attempts, retry_limit);
                    }
                }
            }

            self.log_progress(seq_id, total_frames);
        }

        Ok(())
    }

    async fn go_back_n(&mut self, total_frames: u32) -> Result<()> {
        let window_size = self.config.window_size.max(1);
        let retry_limit = self.config.retry_limit.max(1);
        let ack_timeout = self.config.ack_timeout();

        let mut base: SeqId = 1;
        let mut next_seq: SeqId = 1;
        let mut window: VecDeque<Frame> =
            VecDeque::with_capacity(window_size.min(total_frames) as usize);
        let mut timeouts_at_base = 0u32;
        let mut deadline = Instant::now() + ack_timeout;

        while base <= total_frames {
            // 윈도우 채우기
            while next_seq < base.saturating_add(window_size) && next_seq <= total_frames {
                let frame = self.next_frame(next_seq).await?;
                self.transmit(&frame, false).await?;
                window.push_back(frame);
                next_seq += 1;
            }
            self.max_in_flight = self.max_in_flight.max(next_seq - base);

            match self.await_ack(deadline).await? {
                AckEvent::Ack(ack) if ack >= base && ack < next_seq => {
                    // 누적 ACK: ack 이하 전부 확인
                    while window.front().is_some_and(|f| f.seq_id() <= ack) {
                        window.pop_front();
                    }
                    debug!("ACK {} 수신: base {} -> {}", ack, base, ack + 1);

                    base = ack + 1;
                    timeouts_at_base = 0;
                    self.stats.acks_received += 1;
                    deadline = Instant::now() + ack_timeout;
                    self.log_progress(ack, total_frames);
                }
                AckEvent::Ack(ack) => {
                    // 중복 ACK는 무시하고 같은 deadline까지 계속 대기
                    self.stats.stale_acks += 1;
                    debug!("중복/범위 밖 ACK {} 무시 (base={}, next={})", ack, base, next_seq);
                }
                AckEvent::Timeout => {
                    self.stats.timeouts += 1;
                    timeouts_at_base += 1;

                    if timeouts_at_base >= retry_limit {
                        warn!(
                            "window [{}, {}]: {}회 타임아웃, 전송 중단",
                            base,
                            next_seq - 1,
                            timeouts_at_base
                        );
                        return Err(Error::TransferAborted {
                            seq_id: base,
                            attempts: timeouts_at_base,
                        });
                    }

                    info!(
                        "ACK 타임아웃: window [{}, {}] 전체 재전송 ({}/{})",
                        base,
                        next_seq - 1,
                        timeouts_at_base,
                        retry_limit
                    );

                    for frame in &window {
                        self.transmit(frame, true).await?;
                    }
                    deadline = Instant::now() + ack_timeout;
                }
            }
        }

        Ok(())
    }

    /// 소스에서 최대 MAX_PAYLOAD 바이트 읽어 프레임 생성
    async fn next_frame(&mut self, seq_id: SeqId) -> Result<Frame> {
        let payload = self.read_payload(seq_id).await?;
        self.stats.total_bytes += payload.len() as u64;
        Frame::new(seq_id, payload)
    }

    async fn read_payload(&mut self, seq_id: SeqId) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(MAX_PAYLOAD);
        buf.resize(MAX_PAYLOAD, 0);

        let mut filled = 0;
        while filled < MAX_PAYLOAD {
            let n = self
                .source
                .read(&mut buf[filled..])
                .await
                .map_err(|e| Error::SourceUnavailable {
                    path: self.source_path.clone(),
                    reason: e.to_string(),
                })?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        if filled == 0 {
            return Err(Error::SourceUnavailable {
                path: self.source_path.clone(),
                reason: format!("frame {} 이전에 소스 종료", seq_id),
            });
        }

        buf.truncate(filled);
        Ok(buf.freeze())
    }

    /// 프레임 한 번 전송 (손실 시뮬레이션 적용)
    async fn transmit(&mut self, frame: &Frame, retransmit: bool) -> Result<()> {
        let seq_id = frame.seq_id();

        if retransmit {
            self.stats.frames_resent += 1;
        } else {
            self.stats.frames_sent += 1;
        }

        if self.loss.should_drop(seq_id) {
            self.stats.frames_dropped += 1;
            info!("frame {} 누락 (시뮬레이션)", seq_id);
            return Ok(());
        }

        self.link.send(&frame.encode()?).await?;

        if retransmit {
            debug!("frame {} 재전송 ({} bytes)", seq_id, frame.payload_len());
        } else {
            debug!("frame {} 전송 ({} bytes)", seq_id, frame.payload_len());
        }
        Ok(())
    }

    /// deadline까지 ACK 하나 대기
    async fn await_ack(&mut self, deadline: Instant) -> Result<AckEvent> {
        let mut buf = [0u8; ACK_BUF_SIZE];

        loop {
            let Some(len) = self.link.recv_until(&mut buf, deadline).await? else {
                return Ok(AckEvent::Timeout);
            };

            match ControlMessage::from_bytes(&buf[..len]) {
                Some(msg) => return Ok(AckEvent::Ack(msg.value)),
                None => debug!("ACK가 아닌 datagram 무시: {} bytes", len),
            }
        }
    }

    fn log_progress(&self, acked: SeqId, total_frames: u32) {
        if acked % PROGRESS_INTERVAL == 0 || acked == total_frames {
            info!(
                "Progress: frame {}/{} ({:.1}%)",
                acked,
                total_frames,
                acked as f64 / total_frames.max(1) as f64 * 100.0
            );
        }
    }
}
