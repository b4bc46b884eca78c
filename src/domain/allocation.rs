//! Capped market-cap weighting.
//!
//! Weights are proportional to market-cap share among the first
//! `basket_size` ranked assets, with no single weight above `weight_cap`.
//! The excess mass of capped assets is redistributed over the uncapped ones
//! by repeatedly growing a common scale factor until the weights sum to 1.

use tracing::trace;

use super::asset::Snapshot;
use super::error::AllocationError;

/// Allowed distance of the weight sum from 1.
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Iteration guard for the reweighting loop.
pub const MAX_ITERATIONS: usize = 1000;

/// Target weights for one snapshot, index-aligned with `Snapshot::assets`.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub weights: Vec<f64>,
    pub iterations: usize,
}

impl Allocation {
    pub fn sum(&self) -> f64 {
        self.weights.iter().sum()
    }

    pub fn weight_at(&self, index: usize) -> f64 {
        self.weights.get(index).copied().unwrap_or(0.0)
    }
}

/// Computes capped target weights over the first `basket_size` assets.
///
/// Assets outside the basket and assets without a positive market cap get a
/// weight of zero. Fails with [`AllocationError::Infeasible`] when the
/// eligible assets cannot absorb the whole mass under the cap, and with
/// [`AllocationError::NotConverged`] if the loop exceeds [`MAX_ITERATIONS`].
pub fn allocate(
    snapshot: &Snapshot,
    basket_size: usize,
    weight_cap: f64,
) -> Result<Allocation, AllocationError> {
    let basket_len = basket_size.min(snapshot.len());
    let basket = &snapshot.assets[..basket_len];

    let total_market_cap: f64 = basket.iter().map(|a| a.market_cap_usd.max(0.0)).sum();
    let eligible = basket.iter().filter(|a| a.market_cap_usd > 0.0).count();

    if eligible == 0 || total_market_cap <= 0.0 {
        return Err(AllocationError::EmptyBasket);
    }
    if (eligible as f64) * weight_cap < 1.0 - WEIGHT_TOLERANCE {
        return Err(AllocationError::Infeasible {
            eligible,
            weight_cap,
        });
    }

    let shares: Vec<f64> = basket
        .iter()
        .map(|a| a.market_cap_usd.max(0.0) / total_market_cap)
        .collect();

    let mut weights = vec![0.0; snapshot.len()];
    let mut factor = 1.0_f64;
    let mut sum = 0.0;

    for iteration in 1..=MAX_ITERATIONS {
        let mut pinned = 0.0;
        let mut free = 0.0;
        for (weight, share) in weights.iter_mut().zip(&shares) {
            let trial = share * factor;
            if trial >= weight_cap {
                *weight = weight_cap;
                pinned += weight_cap;
            } else {
                *weight = trial;
                free += trial;
            }
        }
        sum = pinned + free;
        trace!(iteration, factor, sum, "reweighting");

        if (sum - 1.0).abs() <= WEIGHT_TOLERANCE {
            return Ok(Allocation {
                weights,
                iterations: iteration,
            });
        }
        if free <= 0.0 {
            return Err(AllocationError::Infeasible {
                eligible,
                weight_cap,
            });
        }
        // Scale the uncapped assets so they fill exactly the mass left over
        // by the capped ones. With nothing capped this is `factor / sum`.
        factor *= (1.0 - pinned) / free;
    }

    Err(AllocationError::NotConverged {
        iterations: MAX_ITERATIONS,
        sum,
    })
}
