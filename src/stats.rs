//! 전송 통계
//!
//! 엔진 인스턴스마다 하나씩 소유하며 세션 간에 공유하지 않는다.

use std::time::{Duration, Instant};

/// 세션 전송 통계
#[derive(Debug, Clone)]
pub struct TransferStats {
    /// 시작 시간
    pub start_time: Instant,

    /// 종료 시간
    pub end_time: Option<Instant>,

    /// 세션 총 프레임 수
    pub total_frames: u32,

    /// 최초 전송 프레임 수 (누락 포함)
    pub frames_sent: u64,

    /// 시뮬레이션으로 누락된 전송 수
    pub frames_dropped: u64,

    /// 재전송 프레임 수
    pub frames_resent: u64,

    /// 진행시킨 ACK 수
    pub acks_received: u64,

    /// 무시된 ACK 수 (중복 / 범위 밖)
    pub stale_acks: u64,

    /// ACK 타임아웃 횟수
    pub timeouts: u64,

    /// 싱크에 기록된 프레임 수
    pub frames_delivered: u64,

    /// 순서가 맞지 않아 버린 프레임 수
    pub out_of_order_frames: u64,

    /// 디코딩 실패 datagram 수
    pub malformed_frames: u64,

    /// 보낸 ACK 수
    pub acks_sent: u64,

    /// 페이로드 바이트 (송신: 읽은 바이트, 수신: 기록한 바이트)
    pub total_bytes: u64,
}

impl TransferStats {
    pub fn new(total_frames: u32) -> Self {
        Self {
            start_time: Instant::now(),
            end_time: None,
            total_frames,
            frames_sent: 0,
            frames_dropped: 0,
            frames_resent: 0,
            acks_received: 0,
            stale_acks: 0,
            timeouts: 0,
            frames_delivered: 0,
            out_of_order_frames: 0,
            malformed_frames: 0,
            acks_sent: 0,
            total_bytes: 0,
        }
    }

    /// 종료 시간 기록
    pub fn finish(&mut self) {
        self.end_time = Some(Instant::now());
    }

    /// 경과 시간
    pub fn elapsed(&self) -> Duration {
        match self.end_time {
            Some(end) => end.duration_since(self.start_time),
            None => self.start_time.elapsed(),
        }
    }

    /// 전체 처리율 (bytes/sec)
    pub fn throughput(&self) -> f64 {
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed == 0.0 {
            return 0.0;
        }
        self.total_bytes as f64 / elapsed
    }

    /// 전송 시도 수 (최초 + 재전송)
    pub fn transmissions(&self) -> u64 {
        self.frames_sent + self.frames_resent
    }

    /// 시뮬레이션 손실률
    pub fn drop_rate(&self) -> f64 {
        let total = self.transmissions();
        if total == 0 {
            return 0.0;
        }
        self.frames_dropped as f64 / total as f64
    }

    /// 송신측 요약
    pub fn sender_summary(&self) -> String {
        format!(
            "Elapsed: {:.2}s | Frames: {} | Sent: {} | Dropped: {} ({:.1}%) | Resent: {} | Timeouts: {} | Throughput: {:.2} KB/s",
            self.elapsed().as_secs_f64(),
            self.total_frames,
            self.frames_sent,
            self.frames_dropped,
            self.drop_rate() * 100.0,
            self.frames_resent,
            self.timeouts,
            self.throughput() / 1000.0,
        )
    }

    /// 수신측 요약
    pub fn receiver_summary(&self) -> String {
        format!(
            "Elapsed: {:.2}s | Delivered: {}/{} | Bytes: {} | Out-of-order: {} | Malformed: {} | ACKs: {}",
            self.elapsed().as_secs_f64(),
            self.frames_delivered,
            self.total_frames,
            self.total_bytes,
            self.out_of_order_frames,
            self.malformed_frames,
            self.acks_sent,
        )
    }
}

impl Default for TransferStats {
    fn default() -> Self {
        Self::new(0)
    }
}
