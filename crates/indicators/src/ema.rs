//! Exponential moving averages
//!
//! Multiplier `k = 2 / (period + 1)`, seeded with the SMA of the first
//! `period` samples. Until then the EMA reports `None` and contributes
//! nothing to scoring.

use berg_core::{Side, Tick};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Single-period EMA
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    multiplier: Decimal,
    seed_sum: Decimal,
    samples: usize,
    value: Option<Decimal>,
}

impl Ema {
    /// Create an EMA; a zero period is treated as 1
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            multiplier: Decimal::TWO / Decimal::from(period as u64 + 1),
            seed_sum: Decimal::ZERO,
            samples: 0,
            value: None,
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Feed a sample, returns the value once initialized
    pub fn update(&mut self, sample: Decimal) -> Option<Decimal> {
        self.samples += 1;
        match self.value {
            Some(prev) => {
                self.value = Some(sample * self.multiplier + prev * (Decimal::ONE - self.multiplier));
            }
            None => {
                self.seed_sum += sample;
                if self.samples >= self.period {
                    self.value = Some(self.seed_sum / Decimal::from(self.period as u64));
                }
            }
        }
        self.value
    }

    /// Current value, `None` until `period` samples were seen
    pub fn value(&self) -> Option<Decimal> {
        self.value
    }

    pub fn is_initialized(&self) -> bool {
        self.value.is_some()
    }

    pub fn reset(&mut self) {
        self.seed_sum = Decimal::ZERO;
        self.samples = 0;
        self.value = None;
    }
}

/// How many EMAs agree with a direction at a price
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmaAlignment {
    /// EMAs on the supporting side of price
    pub aligned: u8,
    /// EMAs on the opposing side of price
    pub opposed: u8,
    /// EMAs with a value (uninitialized ones count as neither)
    pub initialized: u8,
    /// Total EMAs in the set
    pub total: u8,
}

impl EmaAlignment {
    /// aligned - opposed, in [-total, total]
    pub fn net(&self) -> i32 {
        self.aligned as i32 - self.opposed as i32
    }
}

/// A set of EMAs over the same samples (default 9/21/50)
#[derive(Debug, Clone)]
pub struct EmaSet {
    emas: Vec<Ema>,
}

impl EmaSet {
    pub fn new(periods: &[usize]) -> Self {
        Self {
            emas: periods.iter().map(|p| Ema::new(*p)).collect(),
        }
    }

    pub fn update(&mut self, sample: Decimal) {
        for ema in &mut self.emas {
            ema.update(sample);
        }
    }

    /// (period, value) for every EMA
    pub fn values(&self) -> Vec<(usize, Option<Decimal>)> {
        self.emas.iter().map(|e| (e.period(), e.value())).collect()
    }

    /// A bid is supported when price trades above an EMA, an ask when below
    pub fn alignment(&self, side: Side, price: Tick) -> EmaAlignment {
        let price = Decimal::from(price);
        let mut result = EmaAlignment {
            total: self.emas.len() as u8,
            ..Default::default()
        };
        for value in self.emas.iter().filter_map(|e| e.value()) {
            result.initialized += 1;
            let above = price > value;
            let below = price < value;
            match side {
                Side::Bid if above => result.aligned += 1,
                Side::Bid if below => result.opposed += 1,
                Side::Ask if below => result.aligned += 1,
                Side::Ask if above => result.opposed += 1,
                _ => {}
            }
        }
        result
    }

    pub fn reset(&mut self) {
        for ema in &mut self.emas {
            ema.reset();
        }
    }
}
