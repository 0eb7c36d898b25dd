//! # ARQFT (ARQ File Transfer)
//!
//! UDP 기반 ARQ 파일 전송
//!
//! ## 핵심 특징
//! - **Stop-and-Wait**: 한 번에 프레임 하나만 전송, ACK 확인 후 다음 프레임
//! - **Go-Back-N**: 고정 윈도우 + 누적 ACK, 타임아웃 시 윈도우 전체 재전송
//! - **손실 시뮬레이션**: 송신측에서 확률적으로 프레임 누락 (재전송 로직 검증용)
//! - **고정 크기 프레임**: 헤더 + MAX_PAYLOAD 버퍼, 길이 필드만 신뢰
//! - **단일 태스크 세션**: 세션당 하나의 실행 흐름, 락 없음

pub mod config;
pub mod error;
pub mod frame;
pub mod loss;
pub mod message;
pub mod receiver;
pub mod sender;
pub mod session;
pub mod stats;
pub mod transport;

pub use config::Config;
pub use error::{Error, Result};
pub use frame::{Frame, SeqId};
pub use loss::{LossModel, LossSimulator, ScriptedLoss};
pub use message::{ControlMessage, ProtocolVariant, Request, TransferRequest};
pub use receiver::Receiver;
pub use sender::Sender;
pub use session::{Client, Server};
pub use stats::TransferStats;
pub use transport::Link;

/// 프레임당 최대 페이로드 (바이트)
pub const MAX_PAYLOAD: usize = 4096;

/// 프레임 헤더 크기: seq_id(4) + payload_len(4)
pub const FRAME_HEADER_SIZE: usize = 8;

/// 데이터 프레임 datagram 크기 (항상 고정)
pub const FRAME_SIZE: usize = FRAME_HEADER_SIZE + MAX_PAYLOAD;

/// 전송 요청 텍스트 버퍼 크기
pub const REQUEST_SIZE: usize = 256;

/// ACK / 프레임 수 알림 메시지 크기
pub const CONTROL_SIZE: usize = 4;

/// 기본 서버 포트
pub const DEFAULT_PORT: u16 = 2226;

/// 서버 루프 종료 요청
pub const EXIT_TOKEN: &str = "EXIT";
