//! 송신측 손실 시뮬레이션
//!
//! 누락된 프레임도 논리적으로는 "전송"된 것으로 집계되고 시퀀스를 소비한다.
//! datagram만 나가지 않으므로 이후 ACK 타임아웃으로 재전송 로직이 동작한다.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::frame::SeqId;

/// 프레임 전송 여부를 결정하는 손실 모델
pub trait LossModel {
    /// true면 이번 전송 시도를 누락
    fn should_drop(&mut self, seq_id: SeqId) -> bool;
}

/// 확률 기반 손실 시뮬레이터
///
/// 호출마다 0..100 균등 난수를 뽑아 loss_percent 미만이면 누락.
#[derive(Debug, Clone)]
pub struct LossSimulator {
    loss_percent: u8,
    rng: StdRng,
}

impl LossSimulator {
    /// OS 엔트로피로 시드
    pub fn new(loss_percent: u8) -> Self {
        Self {
            loss_percent: loss_percent.min(100),
            rng: StdRng::from_entropy(),
        }
    }

    /// 고정 시드 (재현 가능한 테스트용)
    pub fn with_seed(loss_percent: u8, seed: u64) -> Self {
        Self {
            loss_percent: loss_percent.min(100),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// 설정의 시드 유무에 따라 생성
    pub fn from_seed(loss_percent: u8, seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::with_seed(loss_percent, seed),
            None => Self::new(loss_percent),
        }
    }

    pub fn loss_percent(&self) -> u8 {
        self.loss_percent
    }
}

impl LossModel for LossSimulator {
    fn should_drop(&mut self, _seq_id: SeqId) -> bool {
        if self.loss_percent == 0 {
            return false;
        }
        self.rng.gen_range(0..100u8) < self.loss_percent
    }
}

/// 지정한 프레임을 정해진 횟수만큼 누락시키는 스크립트 손실
#[derive(Debug, Clone, Default)]
pub struct ScriptedLoss {
    /// seq_id -> 남은 누락 횟수
    remaining: HashMap<SeqId, u32>,
}

impl ScriptedLoss {
    pub fn new() -> Self {
        Self::default()
    }

    /// seq_id 프레임의 처음 `times`번 전송을 누락
    pub fn drop_first(mut self, seq_id: SeqId, times: u32) -> Self {
        self.remaining.insert(seq_id, times);
        self
    }

    /// seq_id 프레임을 항상 누락
    pub fn always(self, seq_id: SeqId) -> Self {
        self.drop_first(seq_id, u32::MAX)
    }
}

impl LossModel for ScriptedLoss {
    fn should_drop(&mut self, seq_id: SeqId) -> bool {
        match self.remaining.get_mut(&seq_id) {
            Some(left) if *left > 0 => {
                *left -= 1;
                true
            }
            _ => false,
        }
    }
}

impl<L: LossModel + ?Sized> LossModel for Box<L> {
    fn should_drop(&mut self, seq_id: SeqId) -> bool {
        (**self).should_drop(seq_id)
    }
}
