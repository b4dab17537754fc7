//! Risk Parameter Calculator
//!
//! Synthesizes stop and target distances from three sources:
//! - ATR, optionally scaled by session phase
//! - The nearest qualifying DOM support/resistance walls
//! - Average excursions of recently resolved signals
//!
//! Stop: a qualifying DOM stop when DOM priority is on, otherwise the widest
//! candidate, capped. Target: the nearest candidate clearing
//! `stop × min_reward_risk × tolerance`, raised to the exact minimum ratio
//! when needed. Results are annotated, never rejected.

use berg_core::{SessionPhase, Side, Tick};
use berg_indicators::IndicatorSuite;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::memory::TradeMemory;
use crate::parameters::{
    ImprovedLevels, LegSource, MAX_SCORE_ADJUSTMENT, MIN_SCORE_ADJUSTMENT, RiskCandidate,
    RiskConfig, RiskIssue, RiskParameters, RiskQuality,
};

/// State the calculator reads for one signal
#[derive(Debug, Clone, Copy)]
pub struct RiskInputs<'a> {
    pub side: Side,
    pub entry_price: Tick,
    pub phase: SessionPhase,
    pub indicators: &'a IndicatorSuite,
    pub memory: &'a TradeMemory,
}

fn ceil_ticks(value: Decimal) -> i64 {
    value.ceil().to_i64().unwrap_or(i64::MAX)
}

fn floor_ticks(value: Decimal) -> i64 {
    value.floor().to_i64().unwrap_or(0)
}

#[derive(Debug, Clone, Default)]
pub struct RiskCalculator {
    config: RiskConfig,
}

impl RiskCalculator {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    fn atr_candidate(&self, inputs: &RiskInputs<'_>) -> Option<RiskCandidate> {
        let atr = inputs.indicators.atr().value().filter(|v| v.is_sign_positive() && !v.is_zero())?;
        let scale = if self.config.session_scaling {
            inputs.phase.volatility_scale()
        } else {
            Decimal::ONE
        };
        Some(RiskCandidate {
            source: LegSource::Atr,
            stop_ticks: Some(ceil_ticks(atr * self.config.atr_stop_multiplier * scale)),
            target_ticks: Some(ceil_ticks(atr * self.config.atr_target_multiplier * scale)),
        })
    }

    fn dom_candidate(&self, inputs: &RiskInputs<'_>) -> Option<RiskCandidate> {
        let dom = inputs.indicators.dom();
        let entry = inputs.entry_price;
        let qualifies = |volume: u64| volume >= self.config.dom_min_volume;
        let buffer = self.config.dom_buffer_ticks;

        let support = dom.support().filter(|l| qualifies(l.volume));
        let resistance = dom.resistance().filter(|l| qualifies(l.volume));

        // Stop just beyond the wall behind the entry, target just in front of the wall ahead
        let (stop, target) = match inputs.side {
            Side::Bid => (
                support
                    .filter(|l| l.price < entry)
                    .map(|l| entry - l.price + buffer),
                resistance
                    .filter(|l| l.price > entry)
                    .map(|l| (l.price - entry - 1).max(1)),
            ),
            Side::Ask => (
                resistance
                    .filter(|l| l.price > entry)
                    .map(|l| l.price - entry + buffer),
                support
                    .filter(|l| l.price < entry)
                    .map(|l| (entry - l.price - 1).max(1)),
            ),
        };

        if stop.is_none() && target.is_none() {
            return None;
        }
        Some(RiskCandidate {
            source: LegSource::Dom,
            stop_ticks: stop,
            target_ticks: target,
        })
    }

    fn memory_candidate(&self, inputs: &RiskInputs<'_>) -> Option<RiskCandidate> {
        if inputs.memory.len() < self.config.memory_min_trades.max(1) {
            return None;
        }
        let stop = inputs.memory.avg_mae().map(|mae| ceil_ticks(mae) + 1);
        let target = inputs
            .memory
            .avg_mfe()
            .map(floor_ticks)
            .filter(|t| *t > 0);
        Some(RiskCandidate {
            source: LegSource::Memory,
            stop_ticks: stop,
            target_ticks: target,
        })
    }

    pub fn calculate(&self, inputs: &RiskInputs<'_>) -> RiskParameters {
        let cfg = &self.config;
        let fixed = RiskCandidate {
            source: LegSource::Fixed,
            stop_ticks: Some(cfg.fixed_stop_ticks),
            target_ticks: Some(cfg.fixed_target_ticks),
        };
        let dom = self.dom_candidate(inputs);
        let sourced: Vec<RiskCandidate> = [self.atr_candidate(inputs), dom, self.memory_candidate(inputs)]
            .into_iter()
            .flatten()
            .collect();

        // === Stop ===
        let dom_stop = dom.filter(|_| cfg.dom_priority).and_then(|c| c.stop_ticks);
        let (raw_stop, stop_source) = match dom_stop {
            Some(stop) if stop > 0 => (stop, LegSource::Dom),
            _ => sourced
                .iter()
                .filter_map(|c| c.stop_ticks.filter(|s| *s > 0).map(|s| (s, c.source)))
                .fold(None, |best: Option<(i64, LegSource)>, (s, src)| match best {
                    Some((b, _)) if b >= s => best,
                    _ => Some((s, src)),
                })
                .unwrap_or((cfg.fixed_stop_ticks, LegSource::Fixed)),
        };
        let stop_capped = raw_stop > cfg.max_stop_ticks;
        let stop = raw_stop.min(cfg.max_stop_ticks).max(cfg.min_stop_ticks).max(1);

        // === Target ===
        let required = Decimal::from(stop) * cfg.min_reward_risk;
        let min_target = ceil_ticks(required);
        let tolerance_floor = required * cfg.ratio_tolerance;

        let nearest = sourced
            .iter()
            .chain(std::iter::once(&fixed))
            .filter_map(|c| c.target_ticks.map(|t| (t, c.source)))
            .filter(|(t, _)| Decimal::from(*t) >= tolerance_floor && *t <= cfg.max_target_ticks)
            .fold(None, |best: Option<(i64, LegSource)>, (t, src)| match best {
                Some((b, _)) if b <= t => best,
                _ => Some((t, src)),
            });

        let (mut target, target_source, mut force_adjusted) = match nearest {
            Some((t, src)) if t >= min_target => (t, src, false),
            Some((_, src)) => (min_target, src, true),
            None => (min_target, LegSource::RatioAdjusted, true),
        };
        let target_capped = target > cfg.max_target_ticks;
        if target_capped {
            target = cfg.max_target_ticks;
            force_adjusted = true;
        }

        let reward_risk = Decimal::from(target) / Decimal::from(stop);
        let accepted = reward_risk >= cfg.min_reward_risk;

        let quality = self.assess(
            stop,
            raw_stop,
            target,
            reward_risk,
            accepted,
            stop_capped,
            force_adjusted,
        );

        log::debug!(
            "[Risk] {} @ {}: stop {} ({}) target {} ({}) R:R {} accepted={} issue={:?}",
            inputs.side,
            inputs.entry_price,
            stop,
            stop_source,
            target,
            target_source,
            reward_risk.round_dp(2),
            accepted,
            quality.issue
        );

        let mut candidates = sourced;
        candidates.push(fixed);

        RiskParameters {
            stop_ticks: stop,
            target_ticks: target,
            reward_risk,
            accepted,
            stop_source,
            target_source,
            force_adjusted,
            quality,
            candidates,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn assess(
        &self,
        stop: i64,
        raw_stop: i64,
        target: i64,
        reward_risk: Decimal,
        accepted: bool,
        stop_capped: bool,
        force_adjusted: bool,
    ) -> RiskQuality {
        let cfg = &self.config;
        let rr = reward_risk.round_dp(2);

        let quality = if !accepted {
            let improved_stop = floor_ticks(Decimal::from(cfg.max_target_ticks) / cfg.min_reward_risk);
            let feasible = improved_stop >= cfg.min_stop_ticks;
            RiskQuality {
                issue: RiskIssue::PoorRewardRisk,
                explanation: format!(
                    "R:R {} below minimum {}: stop {} needs target {} but targets are capped at {}",
                    rr,
                    cfg.min_reward_risk,
                    stop,
                    ceil_ticks(Decimal::from(stop) * cfg.min_reward_risk),
                    cfg.max_target_ticks
                ),
                improvement_feasible: feasible,
                improved: feasible.then_some(ImprovedLevels {
                    stop_ticks: improved_stop,
                    target_ticks: cfg.max_target_ticks,
                }),
                score_adjustment: if feasible { -10 } else { -15 },
            }
        } else if stop_capped {
            RiskQuality {
                issue: RiskIssue::StopCapped,
                explanation: format!(
                    "Widest stop {} capped at {}; structure may sit beyond the stop",
                    raw_stop, stop
                ),
                improvement_feasible: false,
                improved: None,
                score_adjustment: -5,
            }
        } else if force_adjusted {
            RiskQuality {
                issue: RiskIssue::ForcedTarget,
                explanation: format!(
                    "No natural target cleared {}R; target set to {} to meet it",
                    cfg.min_reward_risk, target
                ),
                improvement_feasible: true,
                improved: None,
                score_adjustment: -3,
            }
        } else {
            RiskQuality {
                issue: RiskIssue::None,
                explanation: format!("Natural target at {}R", rr),
                improvement_feasible: false,
                improved: None,
                score_adjustment: if reward_risk >= Decimal::TWO { 5 } else { 2 },
            }
        };

        RiskQuality {
            score_adjustment: quality
                .score_adjustment
                .clamp(MIN_SCORE_ADJUSTMENT, MAX_SCORE_ADJUSTMENT),
            ..quality
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::TradeExcursion;
    use berg_core::Trade;
    use berg_indicators::{IndicatorConfig, LiquidityLevel};
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn memory_with(mfe: i64, mae: i64) -> TradeMemory {
        let mut memory = TradeMemory::new(20);
        for _ in 0..5 {
            memory.record(TradeExcursion {
                side: Side::Bid,
                entry_price: 1000,
                mfe_ticks: mfe,
                mae_ticks: mae,
                profitable: mfe > mae,
                closed_at: Utc::now(),
            });
        }
        memory
    }

    fn inputs<'a>(suite: &'a IndicatorSuite, memory: &'a TradeMemory) -> RiskInputs<'a> {
        RiskInputs {
            side: Side::Bid,
            entry_price: 1000,
            phase: SessionPhase::Midday,
            indicators: suite,
            memory,
        }
    }

    #[test]
    fn test_fixed_fallback() {
        let suite = IndicatorSuite::default();
        let memory = TradeMemory::default();
        let params = RiskCalculator::default().calculate(&inputs(&suite, &memory));

        assert_eq!((params.stop_ticks, params.target_ticks), (8, 16));
        assert_eq!(params.stop_source, LegSource::Fixed);
        assert_eq!(params.target_source, LegSource::Fixed);
        assert_eq!(params.reward_risk, dec!(2));
        assert!(params.accepted);
        assert!(!params.force_adjusted);
        assert_eq!(params.quality.issue, RiskIssue::None);
        assert_eq!(params.score_adjustment(), 5);
    }

    #[test]
    fn test_atr_with_session_scaling() {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 17, 0, 0).unwrap();
        let mut suite = IndicatorSuite::new(IndicatorConfig {
            atr_period: 1,
            ..Default::default()
        });
        suite.on_trade(&Trade::buy(1000, 1, t0));
        suite.on_trade(&Trade::buy(1010, 1, t0 + Duration::seconds(10)));
        suite.on_trade(&Trade::buy(1005, 1, t0 + Duration::seconds(60)));
        assert_eq!(suite.atr().value(), Some(dec!(10)));

        let memory = TradeMemory::default();
        let params = RiskCalculator::default().calculate(&inputs(&suite, &memory));
        // 10 × 1.5 × 0.85 = 12.75, 10 × 3.0 × 0.85 = 25.5
        assert_eq!(params.stop_ticks, 13);
        assert_eq!(params.stop_source, LegSource::Atr);
        assert_eq!(params.target_ticks, 26);
        assert_eq!(params.target_source, LegSource::Atr);
        assert!(params.accepted);
    }

    #[test]
    fn test_dom_stop_priority() {
        let mut suite = IndicatorSuite::default();
        suite.on_depth(
            &[LiquidityLevel { price: 995, volume: 100 }],
            &[LiquidityLevel { price: 1020, volume: 80 }],
            1000,
            Utc::now(),
        );
        let memory = memory_with(30, 15);
        let params = RiskCalculator::default().calculate(&inputs(&suite, &memory));

        // 1000 - 995 + 2 buffer, though memory wants 16
        assert_eq!(params.stop_ticks, 7);
        assert_eq!(params.stop_source, LegSource::Dom);
        // Needs 10.5: fixed 16 is the nearest clearing target (DOM 19, memory 30)
        assert_eq!(params.target_ticks, 16);
        assert_eq!(params.target_source, LegSource::Fixed);
    }

    #[test]
    fn test_near_miss_is_nudged() {
        let suite = IndicatorSuite::default();
        // stop 20, memory target 29 against a required 30
        let memory = memory_with(29, 19);
        let params = RiskCalculator::default().calculate(&inputs(&suite, &memory));

        assert_eq!(params.stop_ticks, 20);
        assert_eq!(params.target_ticks, 30);
        assert_eq!(params.target_source, LegSource::Memory);
        assert!(params.force_adjusted);
        assert!(params.accepted);
        assert_eq!(params.quality.issue, RiskIssue::ForcedTarget);
    }

    #[test]
    fn test_ratio_adjusted_target() {
        let suite = IndicatorSuite::default();
        let memory = memory_with(10, 19);
        let params = RiskCalculator::default().calculate(&inputs(&suite, &memory));

        assert_eq!(params.target_ticks, 30);
        assert_eq!(params.target_source, LegSource::RatioAdjusted);
        assert_eq!(params.score_adjustment(), -3);
    }

    #[test]
    fn test_poor_ratio_is_annotated_not_rejected() {
        let suite = IndicatorSuite::default();
        let memory = memory_with(10, 19);
        let calculator = RiskCalculator::new(RiskConfig {
            max_target_ticks: 20,
            ..Default::default()
        });
        let params = calculator.calculate(&inputs(&suite, &memory));

        assert_eq!((params.stop_ticks, params.target_ticks), (20, 20));
        assert!(!params.accepted);
        assert!(params.force_adjusted);
        assert_eq!(params.quality.issue, RiskIssue::PoorRewardRisk);
        assert!(params.quality.improvement_feasible);
        assert_eq!(
            params.quality.improved,
            Some(ImprovedLevels {
                stop_ticks: 13,
                target_ticks: 20
            })
        );
        assert_eq!(params.score_adjustment(), -10);
    }

    #[test]
    fn test_low_ratio_always_force_adjusted() {
        let suite = IndicatorSuite::default();
        for mae in [0, 3, 7, 12, 19, 30, 45] {
            for mfe in [1, 5, 14, 29, 60, 200] {
                for max_target in [10, 20, 45, 120] {
                    let memory = memory_with(mfe, mae);
                    let calculator = RiskCalculator::new(RiskConfig {
                        max_target_ticks: max_target,
                        ..Default::default()
                    });
                    let params = calculator.calculate(&inputs(&suite, &memory));
                    if params.reward_risk < dec!(1.5) {
                        assert!(params.force_adjusted, "mfe={} mae={} cap={}", mfe, mae, max_target);
                        assert!(!params.accepted);
                    }
                    assert!(params.stop_ticks <= 40);
                    assert!((-15..=5).contains(&params.score_adjustment()));
                }
            }
        }
    }
}
