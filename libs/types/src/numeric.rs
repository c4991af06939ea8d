//! Tick-size grid
//!
//! Venues quote prices on a price-dependent grid. The schedule is a
//! staircase of tiers, each valid below an upper bound. Grid arithmetic
//! uses `Decimal` so steps such as 0.01 snap exactly; synthesized prices
//! enter and leave as `f64`. Rounding is HALF_UP.

use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::TickSizeError;

/// One tier of the staircase: prices strictly below `below` use `step`.
/// The last tier has no bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickSizeTier {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub below: Option<Decimal>,
    pub step: Decimal,
}

impl TickSizeTier {
    pub fn below(bound: i64, step: i64) -> Self {
        Self {
            below: Some(Decimal::from(bound)),
            step: Decimal::from(step),
        }
    }

    pub fn rest(step: i64) -> Self {
        Self {
            below: None,
            step: Decimal::from(step),
        }
    }
}

/// Price-dependent minimum increment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TickSizeTier>", into = "Vec<TickSizeTier>")]
pub struct TickSizeSchedule {
    tiers: Vec<TickSizeTier>,
}

impl TickSizeSchedule {
    /// Build a schedule from tiers ordered by ascending bound.
    pub fn new(tiers: Vec<TickSizeTier>) -> Result<Self, TickSizeError> {
        if tiers.is_empty() {
            return Err(TickSizeError::Empty);
        }

        let mut last_bound: Option<Decimal> = None;
        for (i, tier) in tiers.iter().enumerate() {
            if tier.step <= Decimal::ZERO {
                return Err(TickSizeError::NonPositiveStep { tier: i });
            }
            let is_last = i + 1 == tiers.len();
            match (tier.below, is_last) {
                (None, false) => return Err(TickSizeError::UnboundedTier { tier: i }),
                (Some(_), true) => return Err(TickSizeError::MissingFinalTier),
                (Some(bound), false) => {
                    if last_bound.is_some_and(|prev| bound <= prev) {
                        return Err(TickSizeError::UnorderedBounds { tier: i });
                    }
                    last_bound = Some(bound);
                }
                (None, true) => {}
            }
        }

        Ok(Self { tiers })
    }

    /// The IDX fraction table: <200→1, <500→2, <2000→5, <5000→10, else 25.
    pub fn idx() -> Self {
        Self {
            tiers: vec![
                TickSizeTier::below(200, 1),
                TickSizeTier::below(500, 2),
                TickSizeTier::below(2000, 5),
                TickSizeTier::below(5000, 10),
                TickSizeTier::rest(25),
            ],
        }
    }

    /// A flat grid with one step for every price.
    pub fn uniform(step: Decimal) -> Result<Self, TickSizeError> {
        Self::new(vec![TickSizeTier { below: None, step }])
    }

    pub fn tiers(&self) -> &[TickSizeTier] {
        &self.tiers
    }

    /// Step size for a price level.
    pub fn step_for(&self, price: f64) -> f64 {
        self.step_decimal(to_decimal(price))
            .to_f64()
            .unwrap_or(0.0)
    }

    /// Round to the nearest grid point.
    pub fn round(&self, price: f64) -> f64 {
        self.snap(price, GridSnap::Nearest)
    }

    /// Round to the grid without leaving `[low, high]`.
    ///
    /// A nearest-grid value outside the band moves one grid unit inward.
    /// When no grid point lies inside the band the clamped raw price is
    /// returned.
    pub fn round_within(&self, price: f64, low: f64, high: f64) -> f64 {
        let mut rounded = self.round(price);
        if rounded < low {
            rounded = self.snap(low, GridSnap::Up);
        } else if rounded > high {
            rounded = self.snap(high, GridSnap::Down);
        }

        if rounded < low || rounded > high {
            price.clamp(low, high)
        } else {
            rounded
        }
    }

    /// Whether `price` already sits on the grid.
    pub fn is_on_grid(&self, price: f64) -> bool {
        let d = to_decimal(price);
        let step = self.step_decimal(d);
        (d % step).is_zero()
    }

    fn step_decimal(&self, price: Decimal) -> Decimal {
        self.tiers
            .iter()
            .find(|t| t.below.map_or(true, |bound| price < bound))
            .map(|t| t.step)
            .unwrap_or(Decimal::ONE)
    }

    fn snap(&self, price: f64, mode: GridSnap) -> f64 {
        if !price.is_finite() {
            return price;
        }
        let d = to_decimal(price);
        let step = self.step_decimal(d);
        let units = d / step;
        let units = match mode {
            GridSnap::Nearest => {
                units.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            }
            GridSnap::Up => units.ceil(),
            GridSnap::Down => units.floor(),
        };
        (units * step).to_f64().unwrap_or(price)
    }
}

impl Default for TickSizeSchedule {
    fn default() -> Self {
        Self::idx()
    }
}

impl TryFrom<Vec<TickSizeTier>> for TickSizeSchedule {
    type Error = TickSizeError;

    fn try_from(tiers: Vec<TickSizeTier>) -> Result<Self, Self::Error> {
        Self::new(tiers)
    }
}

impl From<TickSizeSchedule> for Vec<TickSizeTier> {
    fn from(schedule: TickSizeSchedule) -> Self {
        schedule.tiers
    }
}

#[derive(Debug, Clone, Copy)]
enum GridSnap {
    Nearest,
    Up,
    Down,
}

fn to_decimal(price: f64) -> Decimal {
    Decimal::from_f64(price).unwrap_or(Decimal::ZERO)
}
