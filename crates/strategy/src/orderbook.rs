//! Order Book Aggregator
//!
//! Market-by-order replica for a single instrument. Tracks every resting
//! order by id and aggregates them into per-price levels (order count and
//! total size). Levels touched since the last book update are remembered
//! so the iceberg detector only re-evaluates what changed.

use berg_core::{Order, OrderId, Side, Size, Tick, Timestamp};
use berg_indicators::LiquidityLevel;
use indexmap::IndexSet;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Orders resting at one price
#[derive(Debug, Clone, Default)]
pub struct PriceLevel {
    order_ids: HashSet<OrderId>,
    total_size: Size,
}

impl PriceLevel {
    pub fn order_count(&self) -> usize {
        self.order_ids.len()
    }

    pub fn total_size(&self) -> Size {
        self.total_size
    }
}

/// Aggregate view of one price level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelStats {
    pub side: Side,
    pub price: Tick,
    pub order_count: usize,
    pub total_size: Size,
}

/// Live per-order and per-level book state
///
/// Bids and asks are both keyed by tick in a BTreeMap; best bid is the
/// last bid key, best ask the first ask key.
#[derive(Debug, Clone, Default)]
pub struct OrderBookAggregator {
    orders: HashMap<OrderId, Order>,
    bids: BTreeMap<Tick, PriceLevel>,
    asks: BTreeMap<Tick, PriceLevel>,
    /// Levels changed since the last `take_touched`, in first-touch order
    touched: IndexSet<(Side, Tick)>,
    last_update: Option<Timestamp>,
}

impl OrderBookAggregator {
    /// Create a new empty book
    pub fn new() -> Self {
        Self::default()
    }

    fn levels_mut(&mut self, side: Side) -> &mut BTreeMap<Tick, PriceLevel> {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }

    fn levels(&self, side: Side) -> &BTreeMap<Tick, PriceLevel> {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    fn touch(&mut self, side: Side, price: Tick) {
        self.touched.insert((side, price));
    }

    fn insert_into_level(&mut self, order: &Order) {
        let level = self.levels_mut(order.side).entry(order.price).or_default();
        level.order_ids.insert(order.id);
        level.total_size += order.size;
        self.touch(order.side, order.price);
    }

    fn remove_from_level(&mut self, order: &Order) {
        let levels = self.levels_mut(order.side);
        if let Some(level) = levels.get_mut(&order.price) {
            if level.order_ids.remove(&order.id) {
                level.total_size = level.total_size.saturating_sub(order.size);
            }
            if level.order_ids.is_empty() {
                levels.remove(&order.price);
            }
        }
        self.touch(order.side, order.price);
    }

    // === Order Events ===

    /// A new order rests in the book; returns the stats of its level
    ///
    /// A duplicate id replaces the stored order.
    pub fn on_add(&mut self, order: Order) -> LevelStats {
        if let Some(previous) = self.orders.remove(&order.id) {
            log::debug!("[OrderBook] Duplicate add for order {}, replacing", order.id);
            self.remove_from_level(&previous);
        }
        self.insert_into_level(&order);
        self.last_update = Some(order.inserted_at);
        let (side, price) = (order.side, order.price);
        self.orders.insert(order.id, order);
        self.level_stats(side, price)
    }

    /// An order moved and/or resized; identity is kept
    ///
    /// Returns the stats of the level it now rests at, `None` for unknown ids.
    pub fn on_replace(
        &mut self,
        order_id: OrderId,
        price: Tick,
        size: Size,
        timestamp: Timestamp,
    ) -> Option<LevelStats> {
        let Some(previous) = self.orders.get(&order_id).cloned() else {
            log::debug!("[OrderBook] Replace for unknown order {}", order_id);
            return None;
        };
        self.remove_from_level(&previous);

        let updated = Order {
            price,
            size,
            ..previous
        };
        self.insert_into_level(&updated);
        let side = updated.side;
        self.orders.insert(order_id, updated);
        self.last_update = Some(timestamp);
        Some(self.level_stats(side, price))
    }

    /// An order left the book; returns the stats of the level it left
    pub fn on_cancel(&mut self, order_id: OrderId, timestamp: Timestamp) -> Option<LevelStats> {
        let Some(order) = self.orders.remove(&order_id) else {
            log::debug!("[OrderBook] Cancel for unknown order {}", order_id);
            return None;
        };
        self.remove_from_level(&order);
        self.last_update = Some(timestamp);
        Some(self.level_stats(order.side, order.price))
    }

    /// Levels changed since the previous call, with their current stats
    pub fn take_touched(&mut self) -> Vec<LevelStats> {
        let touched = std::mem::take(&mut self.touched);
        touched
            .into_iter()
            .map(|(side, price)| self.level_stats(side, price))
            .collect()
    }

    // === Level Queries ===

    /// Stats for a level; empty levels report zero orders and size
    pub fn level_stats(&self, side: Side, price: Tick) -> LevelStats {
        let (order_count, total_size) = self
            .levels(side)
            .get(&price)
            .map(|l| (l.order_count(), l.total_size()))
            .unwrap_or((0, 0));
        LevelStats {
            side,
            price,
            order_count,
            total_size,
        }
    }

    /// Top `n` levels of one side, best first
    pub fn depth(&self, side: Side, n: usize) -> Vec<LiquidityLevel> {
        let to_level = |(price, level): (&Tick, &PriceLevel)| LiquidityLevel {
            price: *price,
            volume: level.total_size,
        };
        match side {
            Side::Bid => self.bids.iter().rev().take(n).map(to_level).collect(),
            Side::Ask => self.asks.iter().take(n).map(to_level).collect(),
        }
    }

    /// Resting order by id
    pub fn order(&self, order_id: OrderId) -> Option<&Order> {
        self.orders.get(&order_id)
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    pub fn last_update(&self) -> Option<Timestamp> {
        self.last_update
    }

    // === Price Queries ===

    /// Best bid price and size
    pub fn best_bid(&self) -> Option<(Tick, Size)> {
        self.bids.iter().next_back().map(|(p, l)| (*p, l.total_size))
    }

    /// Best ask price and size
    pub fn best_ask(&self) -> Option<(Tick, Size)> {
        self.asks.iter().next().map(|(p, l)| (*p, l.total_size))
    }

    /// Mid price in ticks (may be a half tick)
    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some((bid, _)), Some((ask, _))) => {
                Some((Decimal::from(bid) + Decimal::from(ask)) / Decimal::TWO)
            }
            _ => None,
        }
    }

    /// Spread in ticks
    pub fn spread(&self) -> Option<Tick> {
        match (self.best_bid(), self.best_ask()) {
            (Some((bid, _)), Some((ask, _))) => Some(ask - bid),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Drop all state
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
