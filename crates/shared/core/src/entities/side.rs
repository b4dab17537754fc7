use serde::{Deserialize, Serialize};
use std::fmt;

/// Book side of a resting order, and the direction of a signal
///
/// A bid-side signal is a long setup (buyers defending a price),
/// an ask-side signal is a short setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    /// Returns the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }

    /// +1 for bid (long), -1 for ask (short)
    pub fn sign(&self) -> i64 {
        match self {
            Side::Bid => 1,
            Side::Ask => -1,
        }
    }

    /// Aggressor whose flow agrees with this side
    pub fn aligned_aggressor(&self) -> Aggressor {
        match self {
            Side::Bid => Aggressor::Buy,
            Side::Ask => Aggressor::Sell,
        }
    }

    /// Ticks moved in this side's favour going from `from` to `to`
    pub fn favorable_ticks(&self, from: i64, to: i64) -> i64 {
        (to - from) * self.sign()
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Bid => write!(f, "bid"),
            Side::Ask => write!(f, "ask"),
        }
    }
}

/// Aggressor side of a trade print
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggressor {
    Buy,
    Sell,
}

impl Aggressor {
    /// +1 for buy aggressor, -1 for sell aggressor
    pub fn sign(&self) -> i64 {
        match self {
            Aggressor::Buy => 1,
            Aggressor::Sell => -1,
        }
    }

    /// Book side this aggressor is trading into the direction of
    pub fn as_side(&self) -> Side {
        match self {
            Aggressor::Buy => Side::Bid,
            Aggressor::Sell => Side::Ask,
        }
    }
}
