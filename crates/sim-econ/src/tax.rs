//! Tax policy: per-category rates and effects folded into policy coefficients.

use serde::{Deserialize, Serialize};
use sim_core::{TaxClass, TaxTable};

/// Rates are stored as thousandths (e.g. "150" means 15%).
pub const RATE_SCALE: f64 = 1000.0;

/// Convert a stored rate into a fraction.
pub fn scale_rate(stored: f64) -> f64 {
    stored / RATE_SCALE
}

/// Elasticities of one tax towards the economy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TaxEffect {
    /// Towards consumer spending or economic growth.
    pub effect1: f64,
    /// Towards poverty, unemployment or inflation.
    pub effect2: f64,
}

/// Aggregate coefficients derived from the tax schedule.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TaxCoefficients {
    pub consumer_spending_change: f64,
    pub poverty_rate_change: f64,
    pub economic_growth: f64,
    pub inflation_rate: f64,
    pub unemployment_rate: f64,
}

/// Everything policy-driven a region needs for one month.
///
/// Owned by a single region run; nothing here is shared between regions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyContext {
    pub tax: TaxCoefficients,
    /// Extra growth granted by the month's policy decisions.
    pub end_of_month_growth: f64,
    /// Extra population change granted by the month's policy decisions.
    pub population_change: f64,
}

/// Fold rates and effects into the aggregate coefficients.
pub fn derive_coefficients(
    rates: &TaxTable<f64>,
    effects: &TaxTable<TaxEffect>,
) -> TaxCoefficients {
    let mut c = TaxCoefficients::default();
    for (tax, &rate) in rates.iter() {
        let e = effects[tax];
        match tax.class() {
            TaxClass::Income => {
                c.consumer_spending_change -= rate * e.effect1;
                c.poverty_rate_change += rate * e.effect2;
            }
            TaxClass::Consumption => {
                c.consumer_spending_change -= rate * e.effect1;
                c.inflation_rate += rate * e.effect2;
            }
            TaxClass::Savings => {
                c.consumer_spending_change -= rate * e.effect1;
                c.economic_growth -= rate * e.effect2;
            }
            TaxClass::Sector => {
                c.economic_growth -= rate * e.effect1;
                c.unemployment_rate += rate * e.effect2;
            }
        }
    }
    tracing::debug!(?c, "derived tax coefficients");
    c
}
