//! 프로토콜 제어 메시지 정의
//!
//! 데이터 프레임 외의 메시지는 datagram 크기로 구분:
//! - CONTROL_SIZE (4): ACK 또는 총 프레임 수 알림 (u32 하나)
//! - REQUEST_SIZE (256): 텍스트 요청 `"<1|2> <파일명> <손실%>"` 또는 `"EXIT"`
//! - FRAME_SIZE: 데이터 프레임

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::frame::SeqId;
use crate::{Error, Result, CONTROL_SIZE, EXIT_TOKEN, FRAME_SIZE, REQUEST_SIZE};

/// datagram 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Control,
    Request,
    Frame,
    Unknown,
}

impl MessageKind {
    /// 수신 길이로 메시지 종류 판별
    pub fn classify(len: usize) -> Self {
        match len {
            CONTROL_SIZE => MessageKind::Control,
            REQUEST_SIZE => MessageKind::Request,
            FRAME_SIZE => MessageKind::Frame,
            _ => MessageKind::Unknown,
        }
    }
}

/// 단일 정수 제어 메시지 (ACK / 총 프레임 수)
///
/// 두 용도 모두 같은 모양이며 세션 단계로 구분한다.
/// 총 프레임 수 0은 요청 거부를 뜻한다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlMessage {
    pub value: u32,
}

impl ControlMessage {
    /// 누적 ACK
    pub fn ack(seq_id: SeqId) -> Self {
        Self { value: seq_id }
    }

    /// 총 프레임 수 알림
    pub fn frame_count(total_frames: u32) -> Self {
        Self {
            value: total_frames,
        }
    }

    /// 요청 거부 알림
    pub fn reject() -> Self {
        Self::frame_count(0)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != CONTROL_SIZE {
            return None;
        }
        bincode::deserialize(bytes).ok()
    }
}

/// ARQ 프로토콜 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ProtocolVariant {
    /// 한 번에 프레임 하나
    StopAndWait = 1,

    /// 슬라이딩 윈도우 + 누적 ACK
    GoBackN = 2,
}

impl ProtocolVariant {
    /// 요청 텍스트에서 쓰는 코드
    pub fn code(&self) -> u8 {
        *self as u8
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "1" => Some(ProtocolVariant::StopAndWait),
            "2" => Some(ProtocolVariant::GoBackN),
            _ => None,
        }
    }
}

impl fmt::Display for ProtocolVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolVariant::StopAndWait => write!(f, "Stop-and-Wait"),
            ProtocolVariant::GoBackN => write!(f, "Go-Back-N"),
        }
    }
}

/// 전송 요청 (요청측 → 서버)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    /// 사용할 ARQ 방식
    pub variant: ProtocolVariant,

    /// 요청 파일명 (서버 디렉토리 기준)
    pub file_name: String,

    /// 송신측 손실 시뮬레이션 비율 (0 ~ 100)
    pub loss_percent: u8,
}

impl TransferRequest {
    pub fn new(variant: ProtocolVariant, file_name: impl Into<String>, loss_percent: u8) -> Self {
        Self {
            variant,
            file_name: file_name.into(),
            loss_percent,
        }
    }
}

impl fmt::Display for TransferRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.variant.code(),
            self.file_name,
            self.loss_percent
        )
    }
}

impl FromStr for TransferRequest {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let [variant, file_name, loss] = tokens.as_slice() else {
            return Err(Error::InvalidRequest(format!(
                "토큰 3개 필요 (<1|2> <파일명> <손실%>), got {:?}",
                line
            )));
        };

        let variant = ProtocolVariant::from_code(variant)
            .ok_or_else(|| Error::InvalidRequest(format!("알 수 없는 프로토콜: {}", variant)))?;

        let loss_percent: u8 = loss
            .parse()
            .map_err(|_| Error::InvalidRequest(format!("손실률 파싱 실패: {}", loss)))?;
        if loss_percent > 100 {
            return Err(Error::InvalidRequest(format!(
                "손실률 범위 초과: {}",
                loss_percent
            )));
        }

        Ok(Self::new(variant, *file_name, loss_percent))
    }
}

/// 서버가 받는 요청
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Transfer(TransferRequest),
    /// 서버 루프 종료
    Exit,
}

impl Request {
    /// 텍스트 한 줄 파싱
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        if line == EXIT_TOKEN {
            return Ok(Request::Exit);
        }
        Ok(Request::Transfer(line.parse()?))
    }

    /// 고정 크기 텍스트 버퍼로 직렬화 (NUL 패딩)
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let text = match self {
            Request::Transfer(req) => req.to_string(),
            Request::Exit => EXIT_TOKEN.to_string(),
        };

        // 마지막 NUL 하나는 종료 문자로 남김
        if text.len() >= REQUEST_SIZE {
            return Err(Error::InvalidRequest(format!(
                "요청이 너무 김: {} bytes (최대 {})",
                text.len(),
                REQUEST_SIZE - 1
            )));
        }

        let mut buf = text.into_bytes();
        buf.resize(REQUEST_SIZE, 0);
        Ok(buf)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        let text = std::str::from_utf8(&bytes[..end])
            .map_err(|_| Error::InvalidRequest("UTF-8 아님".into()))?;
        Self::parse(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_transfer_request() {
        let req = Request::parse("1 report.txt 10").unwrap();
        assert_eq!(
            req,
            Request::Transfer(TransferRequest::new(
                ProtocolVariant::StopAndWait,
                "report.txt",
                10
            ))
        );

        let req: TransferRequest = "  2   data.bin   0 ".parse().unwrap();
        assert_eq!(req.variant, ProtocolVariant::GoBackN);
        assert_eq!(req.file_name, "data.bin");
        assert_eq!(req.loss_percent, 0);
    }

    #[test]
    fn test_parse_exit() {
        assert_eq!(Request::parse("EXIT").unwrap(), Request::Exit);
        assert_eq!(Request::parse("EXIT\n").unwrap(), Request::Exit);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        for line in ["", "1 report.txt", "3 report.txt 10", "1 a b", "1 a 101", "1 a 10 extra"] {
            assert!(
                matches!(Request::parse(line), Err(Error::InvalidRequest(_))),
                "{:?} should be rejected",
                line
            );
        }
    }

    #[test]
    fn test_request_buffer_is_fixed_size() {
        let req = Request::Transfer(TransferRequest::new(ProtocolVariant::GoBackN, "a.txt", 25));
        let bytes = req.to_bytes().unwrap();

        assert_eq!(bytes.len(), REQUEST_SIZE);
        assert!(bytes.starts_with(b"2 a.txt 25\0"));
        assert_eq!(MessageKind::classify(bytes.len()), MessageKind::Request);
        assert_eq!(Request::from_bytes(&bytes).unwrap(), req);

        let exit = Request::Exit.to_bytes().unwrap();
        assert_eq!(Request::from_bytes(&exit).unwrap(), Request::Exit);
    }

    #[test]
    fn test_request_too_long() {
        let name = "x".repeat(REQUEST_SIZE);
        let req = Request::Transfer(TransferRequest::new(ProtocolVariant::StopAndWait, name, 0));
        assert!(req.to_bytes().is_err());
    }

    #[test]
    fn test_control_message_single_integer() {
        let ack = ControlMessage::ack(42);
        let bytes = ack.to_bytes().unwrap();

        assert_eq!(bytes, 42u32.to_le_bytes().to_vec());
        assert_eq!(MessageKind::classify(bytes.len()), MessageKind::Control);
        assert_eq!(ControlMessage::from_bytes(&bytes), Some(ack));
        assert_eq!(ControlMessage::from_bytes(&bytes[..3]), None);
        assert_eq!(ControlMessage::reject().value, 0);
    }
}
