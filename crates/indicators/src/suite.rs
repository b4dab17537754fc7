//! Indicator Suite
//!
//! Owns one instance of every engine and detector and feeds them from the
//! trade stream in arrival order. The confluence scorer and risk calculator
//! take a shared reference to the suite; nothing here is global.

use berg_core::{Tick, Timestamp, Trade};
use chrono::Duration;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::atr::{Atr, AtrLevel};
use crate::bar::BarBuilder;
use crate::cvd::{CvdConfig, CvdEngine, CvdTrend, Divergence};
use crate::dom::{DomConfig, LiquidityAnalyzer, LiquidityLevel};
use crate::ema::EmaSet;
use crate::microstructure::{
    BigFishConfig, BigFishDetector, KeyLevelKind, SpeedLevel, StopHuntConfig, StopHuntDetector,
    TailBias, TapeSpeedConfig, TapeSpeedTracker, VolumeTailConfig, VolumeTailDetector,
};
use crate::volume_profile::{ValueArea, VolumeProfile, VolumeProfileConfig};
use crate::vwap::Vwap;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub bar_interval_secs: i64,
    pub ema_periods: Vec<usize>,
    pub atr_period: usize,
    /// Closed-bar ATR values averaged into the ATR baseline
    pub atr_baseline_window: usize,
    /// Baseline multiplier for the ATR level classification
    pub atr_level_multiplier: Decimal,
    pub cvd: CvdConfig,
    pub volume_profile: VolumeProfileConfig,
    pub dom: DomConfig,
    pub big_fish: BigFishConfig,
    pub volume_tail: VolumeTailConfig,
    pub tape_speed: TapeSpeedConfig,
    pub stop_hunt: StopHuntConfig,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            bar_interval_secs: 60,
            ema_periods: vec![9, 21, 50],
            atr_period: 14,
            atr_baseline_window: 50,
            atr_level_multiplier: dec!(1.5),
            cvd: CvdConfig::default(),
            volume_profile: VolumeProfileConfig::default(),
            dom: DomConfig::default(),
            big_fish: BigFishConfig::default(),
            volume_tail: VolumeTailConfig::default(),
            tape_speed: TapeSpeedConfig::default(),
            stop_hunt: StopHuntConfig::default(),
        }
    }
}

/// Point-in-time indicator readings for reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorValues {
    pub cvd: i64,
    pub cvd_trend: CvdTrend,
    pub cvd_strength: u8,
    pub divergence: Divergence,
    pub vwap: Option<Decimal>,
    pub poc: Option<Tick>,
    pub value_area: Option<ValueArea>,
    pub atr: Option<Decimal>,
    pub atr_level: Option<AtrLevel>,
    pub emas: Vec<(usize, Option<Decimal>)>,
    pub dom_imbalance: Decimal,
    pub tail_bias: TailBias,
    pub tape_speed: SpeedLevel,
    pub last_price: Option<Tick>,
}

#[derive(Debug, Clone)]
pub struct IndicatorSuite {
    config: IndicatorConfig,
    bars: BarBuilder,
    cvd: CvdEngine,
    profile: VolumeProfile,
    emas: EmaSet,
    vwap: Vwap,
    atr: Atr,
    dom: LiquidityAnalyzer,
    big_fish: BigFishDetector,
    tails: VolumeTailDetector,
    tape: TapeSpeedTracker,
    stop_hunt: StopHuntDetector,
    last_price: Option<Tick>,
    trades: u64,
}

impl IndicatorSuite {
    pub fn new(config: IndicatorConfig) -> Self {
        Self {
            bars: BarBuilder::new(Duration::seconds(config.bar_interval_secs)),
            cvd: CvdEngine::new(config.cvd.clone()),
            profile: VolumeProfile::new(config.volume_profile.clone()),
            emas: EmaSet::new(&config.ema_periods),
            vwap: Vwap::new(),
            atr: Atr::new(config.atr_period, config.atr_baseline_window),
            dom: LiquidityAnalyzer::new(config.dom.clone()),
            big_fish: BigFishDetector::new(config.big_fish.clone()),
            tails: VolumeTailDetector::new(config.volume_tail.clone()),
            tape: TapeSpeedTracker::new(config.tape_speed.clone()),
            stop_hunt: StopHuntDetector::new(config.stop_hunt.clone()),
            last_price: None,
            trades: 0,
            config,
        }
    }

    /// Feed one trade print to every engine
    pub fn on_trade(&mut self, trade: &Trade) {
        if let Some(bar) = self.bars.update(trade) {
            self.atr.update(&bar);
            self.emas.update(Decimal::from(bar.close));
            self.refresh_profile_levels();
            log::trace!(
                "[Indicators] Bar closed: o={} h={} l={} c={} v={}",
                bar.open,
                bar.high,
                bar.low,
                bar.close,
                bar.volume
            );
        }

        self.cvd.update(trade);
        self.profile.update(trade);
        self.vwap.update(trade);
        self.big_fish.update(trade);
        self.tails.update(trade);
        self.tape.update(trade);

        // Levels move with every print; the detector keeps a level fixed while probing it
        if let Some(vwap) = self.vwap.value().and_then(|v| v.round().to_i64()) {
            self.stop_hunt.set_level(KeyLevelKind::Vwap, vwap);
        }
        if let Some((low, high)) = self.tails.range() {
            self.stop_hunt.set_level(KeyLevelKind::RangeHigh, high);
            self.stop_hunt.set_level(KeyLevelKind::RangeLow, low);
        }
        self.stop_hunt.update(trade);

        self.last_price = Some(trade.price);
        self.trades += 1;
    }

    fn refresh_profile_levels(&mut self) {
        if let Some(va) = self.profile.value_area() {
            self.stop_hunt.set_level(KeyLevelKind::Poc, va.poc);
            self.stop_hunt.set_level(KeyLevelKind::ValueAreaHigh, va.high);
            self.stop_hunt.set_level(KeyLevelKind::ValueAreaLow, va.low);
        }
    }

    /// Rescan book depth for support/resistance (rate-limited by the DOM config)
    pub fn on_depth(
        &mut self,
        bids: &[LiquidityLevel],
        asks: &[LiquidityLevel],
        reference: Tick,
        now: Timestamp,
    ) -> bool {
        self.dom.scan(bids, asks, reference, now)
    }

    /// Session rollover: session-anchored accumulators start over
    ///
    /// EMAs and ATR carry across sessions.
    pub fn reset_session(&mut self) {
        log::info!(
            "[Indicators] Session reset after {} trades (CVD {})",
            self.trades,
            self.cvd.value()
        );
        self.cvd.reset();
        self.profile.reset();
        self.vwap.reset();
        self.tails.reset();
        self.big_fish.reset();
        self.stop_hunt.reset();
    }

    /// Clear all state, as if freshly constructed
    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }

    pub fn config(&self) -> &IndicatorConfig {
        &self.config
    }

    pub fn cvd(&self) -> &CvdEngine {
        &self.cvd
    }

    pub fn profile(&self) -> &VolumeProfile {
        &self.profile
    }

    pub fn emas(&self) -> &EmaSet {
        &self.emas
    }

    pub fn vwap(&self) -> &Vwap {
        &self.vwap
    }

    pub fn atr(&self) -> &Atr {
        &self.atr
    }

    pub fn dom(&self) -> &LiquidityAnalyzer {
        &self.dom
    }

    pub fn big_fish(&self) -> &BigFishDetector {
        &self.big_fish
    }

    pub fn tails(&self) -> &VolumeTailDetector {
        &self.tails
    }

    pub fn tape(&self) -> &TapeSpeedTracker {
        &self.tape
    }

    pub fn stop_hunt(&self) -> &StopHuntDetector {
        &self.stop_hunt
    }

    pub fn last_price(&self) -> Option<Tick> {
        self.last_price
    }

    /// Trades processed since construction
    pub fn trade_count(&self) -> u64 {
        self.trades
    }

    /// ATR level against the configured baseline multiplier
    pub fn atr_level(&self) -> Option<AtrLevel> {
        self.atr.level(self.config.atr_level_multiplier)
    }

    pub fn values(&self, now: Timestamp) -> IndicatorValues {
        let value_area = self.profile.value_area();
        IndicatorValues {
            cvd: self.cvd.value(),
            cvd_trend: self.cvd.trend(),
            cvd_strength: self.cvd.strength(),
            divergence: self.cvd.divergence(),
            vwap: self.vwap.value(),
            poc: value_area.map(|va| va.poc),
            value_area,
            atr: self.atr.value(),
            atr_level: self.atr_level(),
            emas: self.emas.values(),
            dom_imbalance: self.dom.imbalance_ratio(),
            tail_bias: self.tails.reading().bias,
            tape_speed: self.tape.reading(now).level,
            last_price: self.last_price,
        }
    }
}

impl Default for IndicatorSuite {
    fn default() -> Self {
        Self::new(IndicatorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_suite_feeds_every_engine() {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 15, 0, 0).unwrap();
        let mut suite = IndicatorSuite::default();
        for i in 0..180 {
            let ts = t0 + Duration::seconds(i);
            suite.on_trade(&Trade::buy(1000 + i % 7, 3, ts));
        }
        assert_eq!(suite.trade_count(), 180);
        assert_eq!(suite.cvd().value(), 540);
        assert!(suite.vwap().value().is_some());
        assert_eq!(suite.last_price(), Some(1000 + 179 % 7));

        let values = suite.values(t0 + Duration::seconds(180));
        assert_eq!(values.cvd, 540);
        assert!(values.poc.is_some());
        // Only two bars closed: EMAs and ATR still warming up
        assert!(values.emas.iter().all(|(_, v)| v.is_none()));
        assert_eq!(values.atr, None);
    }

    #[test]
    fn test_session_reset_keeps_smoothers() {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 15, 0, 0).unwrap();
        let mut suite = IndicatorSuite::new(IndicatorConfig {
            ema_periods: vec![2],
            atr_period: 2,
            ..Default::default()
        });
        for i in 0..5 {
            suite.on_trade(&Trade::sell(1000 + i, 10, t0 + Duration::minutes(i)));
        }
        assert!(suite.atr().value().is_some());

        suite.reset_session();
        assert_eq!(suite.cvd().value(), 0);
        assert_eq!(suite.vwap().value(), None);
        assert!(suite.atr().value().is_some());
        assert!(suite.emas().values()[0].1.is_some());
    }
}
