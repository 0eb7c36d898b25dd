//! 에러 타입 정의

use std::path::PathBuf;

use thiserror::Error;

use crate::frame::SeqId;

/// ARQFT 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    /// 소켓 송수신 에러 (타임아웃 제외)
    #[error("전송 계층 에러: {0}")]
    TransportFailure(#[from] std::io::Error),

    #[error("직렬화 에러: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("잘못된 프레임: {reason} (len={len})")]
    MalformedFrame { len: usize, reason: &'static str },

    /// 재시도 한도 초과, 세션 중단
    #[error("전송 중단: frame={seq_id}, {attempts}회 시도 후 ACK 없음")]
    TransferAborted { seq_id: SeqId, attempts: u32 },

    #[error("소스 파일 사용 불가: {path:?} ({reason})")]
    SourceUnavailable { path: PathBuf, reason: String },

    #[error("빈 소스 파일: {path:?}")]
    EmptySource { path: PathBuf },

    #[error("유효하지 않은 요청: {0}")]
    InvalidRequest(String),

    #[error("서버가 요청 거부: {file_name}")]
    Rejected { file_name: String },

    #[error("서버 응답 없음: {attempts}회 요청")]
    NoResponse { attempts: u32 },

    /// 수신측 유휴 타임아웃 (송신측 중단 추정)
    #[error("수신 대기 타임아웃: expected={expected}, {waited_ms}ms 동안 datagram 없음")]
    IdleTimeout { expected: SeqId, waited_ms: u64 },
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, Error>;
