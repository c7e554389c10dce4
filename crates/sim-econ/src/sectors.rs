//! Economic sectors and GDP.
//!
//! Ordinary sectors evolve from their own inputs plus feedback from last
//! month's key metrics. Public Service follows the administrative budget.
//! Illicit is derived last, from the preliminary GDP of everything else.

use serde::{Deserialize, Serialize};
use sim_core::{
    GdpComposition, Keyed, KeyedTable, RandomSource, Sector, SectorTable, SectorTuning,
};

use crate::tax::PolicyContext;

/// Random spread applied to every ordinary sector.
pub const SECTOR_JITTER: (f64, f64) = (-0.015, 0.015);
/// Mandated monthly contraction of Public Service.
pub const PUBLIC_SERVICE_CHANGE: (f64, f64) = (-0.045, -0.035);

/// One sector row as read from the store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SectorInputs {
    pub base_size: f64,
    pub one_time: f64,
    pub gov_spending: f64,
    /// Elasticity towards consumer spending.
    pub cs_effect: f64,
}

/// Last month's metrics that feed back into sector output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SectorFeedback {
    pub happiness: f64,
    pub primary_education: f64,
    pub secondary_education: f64,
    pub tertiary_education: f64,
    pub crime_rate: f64,
    pub productivity: f64,
    pub life_expectancy: f64,
    pub interest_rate: f64,
}

/// Result of the sector pass.
#[derive(Clone, Debug, PartialEq)]
pub struct SectorOutcome {
    pub outputs: SectorTable<f64>,
    /// Ordinary sectors plus Public Service, before Illicit is derived.
    pub preliminary_gdp: f64,
    pub final_gdp: f64,
    /// `final_gdp / old_gdp - 1`; zero when there is no previous GDP.
    pub gdp_growth: f64,
}

/// Combined feedback multiplier term for one ordinary sector.
pub fn feedback(
    tuning: &SectorTuning,
    policy: &PolicyContext,
    cs_effect: f64,
    m: &SectorFeedback,
) -> f64 {
    tuning.consumer_spending * (policy.tax.consumer_spending_change * cs_effect)
        + tuning.happiness * (1.0 - m.happiness + 0.5)
        + tuning.primary_education * (1.0 - m.primary_education + 0.5)
        + tuning.secondary_education * (1.0 - m.secondary_education + 0.5)
        + tuning.tertiary_education * (1.0 - m.tertiary_education + 0.5)
        + tuning.crime * (1.0 - 0.5 - m.crime_rate)
        + tuning.productivity * (1000.0 - m.productivity).abs() / 1000.0
        + tuning.life_expectancy * (1.0 - m.life_expectancy / 65.0)
        + tuning.interest_rate * (0.03 - m.interest_rate)
}

/// Output of an ordinary sector before the random spread.
pub fn intermediate_output(
    input: &SectorInputs,
    tuning: &SectorTuning,
    policy: &PolicyContext,
) -> f64 {
    (input.base_size
        + input.one_time * tuning.one_time_share
        + input.gov_spending * tuning.gov_spending_share)
        * (1.0 + policy.tax.economic_growth + policy.end_of_month_growth)
}

pub fn ordinary_output<R: RandomSource + ?Sized>(
    input: &SectorInputs,
    tuning: &SectorTuning,
    policy: &PolicyContext,
    metrics: &SectorFeedback,
    rng: &mut R,
) -> f64 {
    let intermediate = intermediate_output(input, tuning, policy);
    let fb = feedback(tuning, policy, input.cs_effect, metrics);
    intermediate * (1.0 + fb) * (1.0 + rng.uniform(SECTOR_JITTER.0, SECTOR_JITTER.1))
}

pub fn public_service_output<R: RandomSource + ?Sized>(admin_spending: f64, rng: &mut R) -> f64 {
    admin_spending * (1.0 + rng.uniform(PUBLIC_SERVICE_CHANGE.0, PUBLIC_SERVICE_CHANGE.1))
}

/// Illicit activity scales with the legal economy and the crime rate.
/// Never negative; non-decreasing in `crime_rate`.
pub fn illicit_output(preliminary_gdp: f64, crime_rate: f64) -> f64 {
    preliminary_gdp.max(0.0) * crime_rate.clamp(0.0, 1.0)
}

/// Sum of the sectors that count towards GDP.
pub fn gdp(outputs: &SectorTable<f64>, composition: GdpComposition) -> f64 {
    outputs
        .iter()
        .filter(|(s, _)| match s {
            Sector::PublicService => composition.include_public_service,
            Sector::Illicit => composition.include_illicit,
            _ => true,
        })
        .map(|(_, v)| *v)
        .sum()
}

/// Run both sector passes.
pub fn update_sectors<R: RandomSource + ?Sized>(
    inputs: &SectorTable<SectorInputs>,
    old_gdp: f64,
    policy: &PolicyContext,
    metrics: &SectorFeedback,
    tuning: &SectorTuning,
    composition: GdpComposition,
    rng: &mut R,
) -> SectorOutcome {
    let mut outputs: SectorTable<f64> = KeyedTable::default();
    for &sector in Sector::ALL {
        outputs[sector] = match sector {
            Sector::Illicit => continue,
            Sector::PublicService => public_service_output(inputs[sector].gov_spending, rng),
            _ => ordinary_output(&inputs[sector], tuning, policy, metrics, rng),
        };
        tracing::debug!(%sector, value = outputs[sector], "sector updated");
    }

    let preliminary_gdp: f64 = outputs
        .iter()
        .filter(|(s, _)| *s != Sector::Illicit)
        .map(|(_, v)| *v)
        .sum();
    outputs[Sector::Illicit] = illicit_output(preliminary_gdp, metrics.crime_rate);

    let final_gdp = gdp(&outputs, composition);
    let gdp_growth = if old_gdp > 0.0 {
        final_gdp / old_gdp - 1.0
    } else {
        tracing::warn!(old_gdp, "no previous GDP; growth taken as zero");
        0.0
    };
    SectorOutcome {
        outputs,
        preliminary_gdp,
        final_gdp,
        gdp_growth,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tax::TaxCoefficients;
    use proptest::prelude::*;
    use sim_core::{FixedDraw, SeededRandom};

    /// Metric values that make every feedback term except consumer spending vanish.
    fn neutral() -> SectorFeedback {
        SectorFeedback {
            happiness: 1.5,
            primary_education: 1.5,
            secondary_education: 1.5,
            tertiary_education: 1.5,
            crime_rate: 0.5,
            productivity: 1000.0,
            life_expectancy: 65.0,
            interest_rate: 0.03,
        }
    }

    fn policy(growth: f64, cs: f64) -> PolicyContext {
        PolicyContext {
            tax: TaxCoefficients {
                economic_growth: growth,
                consumer_spending_change: cs,
                ..TaxCoefficients::default()
            },
            ..PolicyContext::default()
        }
    }

    fn unit(base: f64) -> SectorInputs {
        SectorInputs {
            base_size: base,
            one_time: 0.0,
            gov_spending: 0.0,
            cs_effect: 1.0,
        }
    }

    #[test]
    fn neutral_metrics_give_zero_feedback() {
        let fb = feedback(&SectorTuning::default(), &policy(0.0, 0.0), 1.0, &neutral());
        assert!(fb.abs() < 1e-12);
    }

    #[test]
    fn single_sector_default_weights() {
        let p = policy(0.01, 0.10);
        let tuning = SectorTuning::default();
        assert!((intermediate_output(&unit(1000.0), &tuning, &p) - 1010.0).abs() < 1e-9);
        let out = ordinary_output(&unit(1000.0), &tuning, &p, &neutral(), &mut FixedDraw(0.0));
        assert!((out - 1050.4).abs() < 1e-9);
    }

    #[test]
    fn single_sector_unit_consumer_weight() {
        let p = policy(0.01, 0.10);
        let tuning = SectorTuning {
            consumer_spending: 1.0,
            ..SectorTuning::default()
        };
        let out = ordinary_output(&unit(1000.0), &tuning, &p, &neutral(), &mut FixedDraw(0.0));
        assert!((out - 1111.0).abs() < 1e-9);
    }

    #[test]
    fn one_time_and_government_spending_shares() {
        let input = SectorInputs {
            base_size: 100.0,
            one_time: 40.0,
            gov_spending: 10.0,
            cs_effect: 0.0,
        };
        let v = intermediate_output(&input, &SectorTuning::default(), &policy(0.0, 0.0));
        assert!((v - 116.0).abs() < 1e-9);
    }

    #[test]
    fn public_service_contracts() {
        let v = public_service_output(1000.0, &mut FixedDraw(-0.04));
        assert!((v - 960.0).abs() < 1e-9);
        let mut rng = SeededRandom::new(9);
        for _ in 0..100 {
            let v = public_service_output(1000.0, &mut rng);
            assert!(v > 955.0 - 1e-9 && v <= 965.0);
        }
    }

    #[test]
    fn gdp_membership_follows_composition() {
        let mut inputs: SectorTable<SectorInputs> = KeyedTable::default();
        for s in Sector::ordinary() {
            inputs[s] = unit(100.0);
        }
        inputs[Sector::PublicService].gov_spending = 500.0;
        let metrics = SectorFeedback {
            crime_rate: 0.1,
            ..neutral()
        };
        let run = |composition| {
            update_sectors(
                &inputs,
                1000.0,
                &policy(0.0, 0.0),
                &metrics,
                &SectorTuning::default(),
                composition,
                &mut FixedDraw(0.0),
            )
        };

        let base = run(GdpComposition::default());
        let ordinary: f64 = Sector::ordinary().map(|s| base.outputs[s]).sum();
        assert!((base.final_gdp - ordinary).abs() < 1e-6);
        let preliminary = ordinary + base.outputs[Sector::PublicService];
        assert!((base.preliminary_gdp - preliminary).abs() < 1e-6);
        assert!((base.outputs[Sector::Illicit] - base.preliminary_gdp * 0.1).abs() < 1e-6);
        assert!((base.gdp_growth - (base.final_gdp / 1000.0 - 1.0)).abs() < 1e-12);

        let all = run(GdpComposition {
            include_public_service: true,
            include_illicit: true,
        });
        let everything: f64 = all.outputs.iter().map(|(_, v)| *v).sum();
        assert!((all.final_gdp - everything).abs() < 1e-6);
    }

    #[test]
    fn zero_previous_gdp_means_zero_growth() {
        let out = update_sectors(
            &KeyedTable::default(),
            0.0,
            &PolicyContext::default(),
            &neutral(),
            &SectorTuning::default(),
            GdpComposition::default(),
            &mut FixedDraw(0.0),
        );
        assert_eq!(out.gdp_growth, 0.0);
    }

    proptest! {
        #[test]
        fn illicit_monotone_in_crime(
            gdp in -1.0e12f64..1.0e12,
            a in 0.0f64..1.0,
            b in 0.0f64..1.0,
        ) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let l = illicit_output(gdp, lo);
            let h = illicit_output(gdp, hi);
            prop_assert!(l >= 0.0);
            prop_assert!(h >= l);
        }
    }
}
