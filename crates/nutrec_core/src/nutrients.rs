//! Per-capita nutrient excretion and the collection loss chain.
//!
//! All quantities are kg per capita per day. Losses compound: each stage
//! percentage applies to the previous stage's output.

use serde::{Deserialize, Serialize};

use crate::model::NutrientTriple;

/// Sampled diet and metabolism parameters for one scenario
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DietInputs {
    /// kcal/cap/d
    pub e_cal: f64,
    /// Vegetable protein, g/cap/d
    pub p_veg: f64,
    /// Animal protein, g/cap/d
    pub p_anim: f64,
    /// Fraction of food wasted at the household
    pub loss_cons: f64,
    /// N fraction of total protein
    pub n_prot: f64,
    /// P fraction of vegetable protein
    pub p_prot_v: f64,
    /// P fraction of animal protein
    pub p_prot_a: f64,
    /// kg K per kcal
    pub k_cal: f64,
    /// Fraction of intake excreted
    pub excreted: NutrientTriple,
    /// Percent of the excreted total found in urine
    pub urine_percent: NutrientTriple,
}

/// Stage efficiencies, all in percent
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StageEfficiencies {
    /// Share captured by the UDDT
    pub collection: NutrientTriple,
    /// Share lost in transport
    pub transport_loss: NutrientTriple,
    /// Share lost in storage
    pub storage_loss: NutrientTriple,
}

/// Nutrient flows through the collection chain
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NutrientFlow {
    pub excreted_total: NutrientTriple,
    pub excreted_urine: NutrientTriple,
    pub excreted_feces: NutrientTriple,
    /// Urine fraction captured by the toilet
    pub after_collection: NutrientTriple,
    /// Urine fraction remaining after transport and storage
    pub after_transport_storage: NutrientTriple,
}

/// Percentages are clamped to [0, 100] so no stage can create mass
fn fraction(percent: f64) -> f64 {
    percent.clamp(0.0, 100.0) / 100.0
}

/// Total excretion per nutrient (kg/cap/d)
#[must_use]
pub fn excreted_total(diet: &DietInputs) -> NutrientTriple {
    let retained = 1.0 - diet.loss_cons;
    let p_tot = diet.p_veg + diet.p_anim;

    let n = p_tot * diet.n_prot * retained * diet.excreted.n / 1000.0;
    let p = (diet.p_prot_v * diet.p_veg + diet.p_prot_a * diet.p_anim)
        * retained
        * diet.excreted.p
        / 1000.0;
    let k = diet.e_cal * diet.k_cal * retained * diet.excreted.k;

    NutrientTriple::new(n, p, k)
}

/// Run the full excretion and loss chain
#[must_use]
pub fn nutrient_flow(diet: &DietInputs, efficiencies: &StageEfficiencies) -> NutrientFlow {
    let excreted_total = excreted_total(diet);
    let excreted_urine = excreted_total.zip_with(diet.urine_percent, |t, pct| t * fraction(pct));
    let excreted_feces = excreted_total - excreted_urine;

    let after_collection =
        excreted_urine.zip_with(efficiencies.collection, |m, pct| m * fraction(pct));
    let after_transport = after_collection
        .zip_with(efficiencies.transport_loss, |m, pct| m * (1.0 - fraction(pct)));
    let after_transport_storage =
        after_transport.zip_with(efficiencies.storage_loss, |m, pct| m * (1.0 - fraction(pct)));

    NutrientFlow {
        excreted_total,
        excreted_urine,
        excreted_feces,
        after_collection,
        after_transport_storage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diet() -> DietInputs {
        DietInputs {
            e_cal: 2100.0,
            p_veg: 50.0,
            p_anim: 10.0,
            loss_cons: 0.1,
            n_prot: 0.16,
            p_prot_v: 0.011,
            p_prot_a: 0.011,
            k_cal: 0.0000015,
            excreted: NutrientTriple::new(1.0, 1.0, 1.0),
            urine_percent: NutrientTriple::new(88.0, 67.0, 73.0),
        }
    }

    #[test]
    fn nitrogen_scales_from_protein() {
        let total = excreted_total(&diet());
        // 60 g protein * 0.16 N * 0.9 retained / 1000
        assert!((total.n - 0.00864).abs() < 1e-12);
        assert!((total.p - 60.0 * 0.011 * 0.9 / 1000.0).abs() < 1e-12);
        assert!((total.k - 2100.0 * 0.0000015 * 0.9).abs() < 1e-12);
    }

    #[test]
    fn urine_and_feces_partition_the_total() {
        let flow = nutrient_flow(&diet(), &StageEfficiencies::default());
        let sum = flow.excreted_urine.total() + flow.excreted_feces.total();
        assert!((sum - flow.excreted_total.total()).abs() < 1e-15);
        assert!((flow.excreted_urine.n - flow.excreted_total.n * 0.88).abs() < 1e-15);
    }

    #[test]
    fn losses_compound_from_each_stage() {
        let eff = StageEfficiencies {
            collection: NutrientTriple::new(80.0, 80.0, 80.0),
            transport_loss: NutrientTriple::new(10.0, 10.0, 10.0),
            storage_loss: NutrientTriple::new(50.0, 50.0, 50.0),
        };
        let flow = nutrient_flow(&diet(), &eff);
        let expected = flow.excreted_urine.n * 0.8 * 0.9 * 0.5;
        assert!((flow.after_transport_storage.n - expected).abs() < 1e-15);
        // additive losses would give 0.8 * (1 - 0.6)
        assert!((flow.after_transport_storage.n - flow.excreted_urine.n * 0.32).abs() > 1e-6);
    }

    #[test]
    fn out_of_range_percentages_cannot_create_mass() {
        let eff = StageEfficiencies {
            collection: NutrientTriple::new(120.0, 100.0, 100.0),
            transport_loss: NutrientTriple::new(-5.0, 0.0, 0.0),
            storage_loss: NutrientTriple::new(0.0, 0.0, 0.0),
        };
        let flow = nutrient_flow(&diet(), &eff);
        assert!(flow.after_collection.n <= flow.excreted_urine.n);
        assert!(flow.after_transport_storage.n <= flow.after_collection.n);
    }
}
