//! 데이터 프레임 정의
//!
//! - 헤더: seq_id(u32) + payload_len(u32), bincode 고정 길이 인코딩
//! - 페이로드 영역: 항상 MAX_PAYLOAD 바이트, payload_len 이후는 0 패딩
//!
//! 수신측은 항상 FRAME_SIZE 버퍼로 읽고 길이 필드만 신뢰한다.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{Error, Result, FRAME_HEADER_SIZE, FRAME_SIZE, MAX_PAYLOAD};

/// 프레임 시퀀스 ID (1부터 시작)
pub type SeqId = u32;

/// 프레임 헤더
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameHeader {
    /// 시퀀스 ID
    pub seq_id: SeqId,

    /// 유효 페이로드 길이
    pub payload_len: u32,
}

/// 데이터 프레임 (생성 후 불변)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    header: FrameHeader,
    payload: Bytes,
}

impl Frame {
    /// 새 프레임 생성
    pub fn new(seq_id: SeqId, payload: Bytes) -> Result<Self> {
        if payload.len() > MAX_PAYLOAD {
            return Err(Error::MalformedFrame {
                len: payload.len(),
                reason: "payload exceeds MAX_PAYLOAD",
            });
        }

        Ok(Self {
            header: FrameHeader {
                seq_id,
                payload_len: payload.len() as u32,
            },
            payload,
        })
    }

    pub fn seq_id(&self) -> SeqId {
        self.header.seq_id
    }

    pub fn payload_len(&self) -> usize {
        self.header.payload_len as usize
    }

    /// 유효 페이로드 (payload_len 바이트)
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// 고정 크기 datagram으로 직렬화
    pub fn encode(&self) -> Result<Vec<u8>> {
        let header_bytes = bincode::serialize(&self.header)?;
        debug_assert_eq!(header_bytes.len(), FRAME_HEADER_SIZE);

        let mut buf = Vec::with_capacity(FRAME_SIZE);
        buf.extend_from_slice(&header_bytes);
        buf.extend_from_slice(&self.payload);
        buf.resize(FRAME_SIZE, 0);
        Ok(buf)
    }

    /// datagram에서 역직렬화
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < FRAME_HEADER_SIZE {
            return Err(Error::MalformedFrame {
                len: bytes.len(),
                reason: "shorter than frame header",
            });
        }

        let header: FrameHeader = bincode::deserialize(&bytes[..FRAME_HEADER_SIZE])?;
        let payload_len = header.payload_len as usize;

        if payload_len > MAX_PAYLOAD {
            return Err(Error::MalformedFrame {
                len: bytes.len(),
                reason: "payload_len exceeds MAX_PAYLOAD",
            });
        }

        let end = FRAME_HEADER_SIZE + payload_len;
        if bytes.len() < end {
            return Err(Error::MalformedFrame {
                len: bytes.len(),
                reason: "truncated payload",
            });
        }

        Ok(Self {
            header,
            payload: Bytes::copy_from_slice(&bytes[FRAME_HEADER_SIZE..end]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoded_frame_is_fixed_size() {
        let frame = Frame::new(1, Bytes::from_static(b"abc")).unwrap();
        let bytes = frame.encode().unwrap();

        assert_eq!(bytes.len(), FRAME_SIZE);
        assert!(bytes[FRAME_HEADER_SIZE + 3..].iter().all(|&b| b == 0));

        let restored = Frame::decode(&bytes).unwrap();
        assert_eq!(restored, frame);
    }

    #[test]
    fn test_header_layout_little_endian() {
        let frame = Frame::new(0x0102_0304, Bytes::from_static(b"xy")).unwrap();
        let bytes = frame.encode().unwrap();

        assert_eq!(&bytes[..4], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&bytes[4..8], &[2, 0, 0, 0]);
    }

    #[test]
    fn test_trailing_garbage_ignored() {
        let frame = Frame::new(7, Bytes::from_static(b"hello")).unwrap();
        let mut bytes = frame.encode().unwrap();
        for b in bytes[FRAME_HEADER_SIZE + 5..].iter_mut() {
            *b = 0xFF;
        }

        let restored = Frame::decode(&bytes).unwrap();
        assert_eq!(restored.payload().as_ref(), b"hello");
        assert_eq!(restored.payload_len(), 5);
    }

    #[test]
    fn test_short_buffer_rejected() {
        let err = Frame::decode(&[1, 0, 0]).unwrap_err();
        assert!(matches!(err, Error::MalformedFrame { len: 3, .. }));
    }

    #[test]
    fn test_oversized_length_rejected() {
        let mut bytes = vec![0u8; FRAME_SIZE];
        bytes[..4].copy_from_slice(&1u32.to_le_bytes());
        bytes[4..8].copy_from_slice(&(MAX_PAYLOAD as u32 + 1).to_le_bytes());

        assert!(matches!(
            Frame::decode(&bytes),
            Err(Error::MalformedFrame { .. })
        ));
    }

    #[test]
    fn test_truncated_payload_rejected() {
        let frame = Frame::new(2, Bytes::from(vec![9u8; 100])).unwrap();
        let bytes = frame.encode().unwrap();

        assert!(matches!(
            Frame::decode(&bytes[..FRAME_HEADER_SIZE + 50]),
            Err(Error::MalformedFrame { .. })
        ));
    }

    #[test]
    fn test_payload_over_capacity_rejected() {
        let result = Frame::new(1, Bytes::from(vec![0u8; MAX_PAYLOAD + 1]));
        assert!(result.is_err());

        let full = Frame::new(1, Bytes::from(vec![0u8; MAX_PAYLOAD])).unwrap();
        assert_eq!(full.payload_len(), MAX_PAYLOAD);
    }
}
