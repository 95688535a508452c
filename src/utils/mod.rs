use std::time::Duration;

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;
use took::Timer;

pub mod logging;
pub mod validator;

pub type Random = Pcg64Mcg;

pub fn create_seeded_rng(seed: i128) -> Random {
    let mut rng = Pcg64Mcg::from_seed(seed.to_le_bytes());
    // discard the first few draws; nearby seeds start out correlated otherwise
    rng.next_u64();
    rng.next_u64();
    rng.next_u64();
    rng
}

#[derive(Clone, Copy, Debug)]
pub enum TimeLimit {
    Seconds(u64),
    None,
}

impl TimeLimit {
    pub fn as_seconds(&self) -> u64 {
        match self {
            Self::Seconds(seconds) => *seconds,
            Self::None => u64::MAX,
        }
    }
    pub fn is_none(&self) -> bool {
        match self {
            Self::None => true,
            _ => false,
        }
    }
}

pub struct Countdown {
    start: Timer,
    time_limit: TimeLimit,
}

impl Countdown {
    pub fn new(start: Timer, limit: TimeLimit) -> Self {
        Self {
            start,
            time_limit: limit,
        }
    }

    pub fn unlimited() -> Self {
        Self {
            start: Timer::new(),
            time_limit: TimeLimit::None,
        }
    }

    pub fn time_remaining(&self) -> u64 {
        if let TimeLimit::Seconds(value) = self.time_limit {
            let duration = self.start.took().as_std().as_secs();
            if duration > value {
                0
            } else {
                value - duration
            }
        } else {
            u64::MAX
        }
    }

    pub fn is_finished(&self) -> bool {
        self.time_remaining() == 0
    }

    pub fn is_time_remaining(&self) -> bool {
        self.time_remaining() != 0
    }

    pub fn time_elapsed(&self) -> Duration {
        self.start.took().clone().into_std()
    }
}
