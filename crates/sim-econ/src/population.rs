//! Population model: group shares, trust in government and income tiers.
//!
//! Shares are redistributed stochastically inside each [`GroupSet`] while the
//! set's total is conserved exactly; no global normalisation to 1.0 is done.

use serde::{Deserialize, Serialize};
use sim_core::{
    GroupSet, GroupTable, HappinessPolicy, Keyed, KeyedTable, PopulationGroup, RandomSource,
};

/// Bounds of the multiplicative share jitter.
pub const SIZE_JITTER: (f64, f64) = (-0.04, 0.04);
/// Bounds of the random term in trust and income updates.
pub const DRIFT_JITTER: (f64, f64) = (-0.02, 0.03);

/// One demographic group as read from the store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupState {
    /// Share of the region's population.
    pub size: f64,
    pub trust: f64,
    /// Present for income tiers only.
    pub avg_income: Option<f64>,
}

/// Policy-driven trust deltas for the month.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrustDeltas {
    pub everyone: f64,
    per_group: GroupTable<f64>,
}

impl TrustDeltas {
    /// Build from raw per-group deltas. Mirror-pair secondaries (Socialist,
    /// Non Religious) ignore their own entry and take the negated delta of
    /// their primary.
    pub fn new(everyone: f64, raw: GroupTable<f64>) -> Self {
        let per_group = KeyedTable::from_fn(|g: PopulationGroup| match g.mirrored_from() {
            Some(primary) => -raw[primary],
            None => raw[g],
        });
        Self { everyone, per_group }
    }

    pub fn for_group(&self, group: PopulationGroup) -> f64 {
        self.per_group[group]
    }
}

/// Aggregates produced by one population update.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PopulationSummary {
    /// Size-weighted trust over all groups.
    pub happiness: f64,
    /// Size-weighted average income over the income tiers.
    pub weighted_avg_income: f64,
}

/// Jitter each share and rescale so the slice keeps its original total.
///
/// If the jittered total is not positive the shares are left untouched.
pub fn rebalance_shares<R: RandomSource + ?Sized>(sizes: &mut [f64], rng: &mut R) {
    let original_total: f64 = sizes.iter().sum();
    let randomized: Vec<f64> = sizes
        .iter()
        .map(|s| s * (1.0 + rng.uniform(SIZE_JITTER.0, SIZE_JITTER.1)))
        .collect();
    let randomized_total: f64 = randomized.iter().sum();
    if !(randomized_total > 0.0) {
        return;
    }
    let scale = original_total / randomized_total;
    for (s, r) in sizes.iter_mut().zip(randomized) {
        *s = r * scale;
    }
}

/// Advance every group by one month and return the derived aggregates.
pub fn update_population<R: RandomSource + ?Sized>(
    groups: &mut GroupTable<GroupState>,
    deltas: &TrustDeltas,
    gdp_growth: f64,
    happiness_policy: HappinessPolicy,
    rng: &mut R,
) -> PopulationSummary {
    for &set in GroupSet::ALL {
        let members: Vec<PopulationGroup> = set.members().collect();
        let mut sizes: Vec<f64> = members.iter().map(|&g| groups[g].size).collect();
        rebalance_shares(&mut sizes, rng);
        for (g, size) in members.into_iter().zip(sizes) {
            groups[g].size = size;
        }
    }

    for (group, state) in groups.iter_mut() {
        let change = deltas.for_group(group)
            + deltas.everyone
            + rng.uniform(DRIFT_JITTER.0, DRIFT_JITTER.1);
        state.trust *= 1.0 + change;
    }

    for (group, state) in groups.iter_mut() {
        if !group.is_income_tier() {
            continue;
        }
        if let Some(income) = state.avg_income.as_mut() {
            *income *= 1.0 + gdp_growth + rng.uniform(DRIFT_JITTER.0, DRIFT_JITTER.1);
        }
    }

    let summary = summarize(groups, happiness_policy);
    tracing::debug!(
        happiness = summary.happiness,
        avg_income = summary.weighted_avg_income,
        "population updated"
    );
    summary
}

/// Size-weighted happiness and income; zero when the weights sum to zero.
pub fn summarize(
    groups: &GroupTable<GroupState>,
    happiness_policy: HappinessPolicy,
) -> PopulationSummary {
    let (mut trust_num, mut trust_den) = (0.0, 0.0);
    let (mut income_num, mut income_den) = (0.0, 0.0);
    for (group, state) in groups.iter() {
        trust_num += state.trust * state.size;
        trust_den += state.size;
        if group.is_income_tier() {
            if let Some(income) = state.avg_income {
                income_num += income * state.size;
                income_den += state.size;
            }
        }
    }
    let happiness = if trust_den > 0.0 { trust_num / trust_den } else { 0.0 };
    let weighted_avg_income = if income_den > 0.0 {
        income_num / income_den
    } else {
        0.0
    };
    PopulationSummary {
        happiness: happiness_policy.apply(happiness),
        weighted_avg_income,
    }
}
