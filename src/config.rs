//! 전송 설정

use std::path::PathBuf;
use std::time::Duration;

/// ARQFT 설정
#[derive(Debug, Clone)]
pub struct Config {
    /// Go-Back-N 윈도우 크기 (프레임 수)
    pub window_size: u32,

    /// 프레임(Stop-and-Wait) 또는 윈도우(Go-Back-N)당 최대 전송 시도 횟수
    pub retry_limit: u32,

    /// ACK 대기 타임아웃 (밀리초)
    pub ack_timeout_ms: u64,

    /// 요청 후 프레임 수 알림 대기 타임아웃 (밀리초)
    pub request_timeout_ms: u64,

    /// 요청 재전송 횟수
    pub request_retries: u32,

    /// 수신측 유휴 타임아웃 (밀리초)
    /// 0이면 무한 대기
    pub idle_timeout_ms: u64,

    /// 마지막 프레임 수신 후 중복 프레임에 ACK를 다시 보내며 기다리는 시간 (밀리초)
    /// 송신측 ACK 타임아웃보다 길어야 마지막 ACK 유실을 복구한다. 0이면 바로 종료
    pub linger_ms: u64,

    /// 손실 시뮬레이터 시드 (None이면 OS 엔트로피)
    pub loss_seed: Option<u64>,

    /// 서버가 파일을 제공하는 디렉토리
    pub root_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window_size: 4,
            retry_limit: 5,
            ack_timeout_ms: 2000,     // 2초
            request_timeout_ms: 1000, // 1초
            request_retries: 5,
            idle_timeout_ms: 30_000, // 30초
            linger_ms: 2500,
            loss_seed: None,
            root_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// ACK 대기 타임아웃
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }

    /// 요청 응답 대기 타임아웃
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// 수신측 유휴 타임아웃 (None = 무한)
    pub fn idle_timeout(&self) -> Option<Duration> {
        if self.idle_timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.idle_timeout_ms))
        }
    }

    /// 종료 전 대기 시간 (None = 대기 없음)
    pub fn linger(&self) -> Option<Duration> {
        if self.linger_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.linger_ms))
        }
    }

    /// 루프백 테스트용 설정 (짧은 타임아웃)
    pub fn local_test() -> Self {
        Self {
            window_size: 3,
            retry_limit: 5,
            ack_timeout_ms: 100,
            request_timeout_ms: 200,
            request_retries: 5,
            idle_timeout_ms: 3000,
            linger_ms: 150,
            loss_seed: Some(7),
            root_dir: PathBuf::from("."),
        }
    }

    /// 손실 많은 환경용 설정
    pub fn lossy_network() -> Self {
        Self {
            window_size: 8,
            retry_limit: 10,
            ack_timeout_ms: 500,
            request_timeout_ms: 1000,
            request_retries: 10,
            idle_timeout_ms: 60_000,
            linger_ms: 1000,
            loss_seed: None,
            root_dir: PathBuf::from("."),
        }
    }
}
