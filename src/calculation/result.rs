// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::fmt;

use crate::loci::{LociInfo, Locus};
use crate::utils::NUMERICAL_EPSILON;

/// A probability in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Derefable, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Probability(#[deref] f64);

impl Probability {
    /// Normalize a weight by the total weight. Overshoots caused by floating point
    /// accumulation are capped, the value is rounded if `decimal_places` is given.
    pub(crate) fn from_ratio(weight: f64, total: f64, decimal_places: Option<u32>) -> Self {
        let mut value = weight / total;
        if value > 1.0 && value - 1.0 < NUMERICAL_EPSILON {
            value = 1.0;
        }
        if value < 0.0 && value > -NUMERICAL_EPSILON {
            value = 0.0;
        }
        if let Some(decimal_places) = decimal_places {
            let factor = 10f64.powi(decimal_places as i32);
            value = (value * factor).round() / factor;
        }
        Probability(value)
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Probability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Probabilities of 0, 1 and 2 mismatches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct MismatchDistribution {
    zero_mismatch: Probability,
    one_mismatch: Probability,
    two_mismatch: Probability,
}

impl MismatchDistribution {
    pub(crate) fn from_weights(
        weights: &[f64; 3],
        total: f64,
        decimal_places: Option<u32>,
    ) -> Self {
        MismatchDistribution {
            zero_mismatch: Probability::from_ratio(weights[0], total, decimal_places),
            one_mismatch: Probability::from_ratio(weights[1], total, decimal_places),
            two_mismatch: Probability::from_ratio(weights[2], total, decimal_places),
        }
    }

    /// Probability of the given number of mismatches (0, 1 or 2).
    pub fn mismatches(&self, count: usize) -> Option<Probability> {
        match count {
            0 => Some(self.zero_mismatch),
            1 => Some(self.one_mismatch),
            2 => Some(self.two_mismatch),
            _ => None,
        }
    }

    /// Probability of the two alleles at a locus being a match.
    pub fn match_probability(&self) -> Probability {
        self.zero_mismatch
    }
}

/// Result of one patient/donor calculation.
///
/// Per-locus and aggregate distributions are `None` if the locus was not compared (untyped on
/// either side, excluded, or DPB1) or if either phenotype is unrepresented in its frequency
/// set. The aggregate is also `None` if no locus was compared at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters, CopyGetters)]
pub struct MatchProbabilityResult {
    #[getset(get = "pub")]
    per_locus: LociInfo<Option<MismatchDistribution>>,
    /// Distribution of the total mismatch count over all compared loci. Probabilities of more
    /// than two mismatches make up the remainder.
    #[getset(get_copy = "pub")]
    aggregate: Option<MismatchDistribution>,
    #[getset(get_copy = "pub")]
    is_patient_phenotype_unrepresented: bool,
    #[getset(get_copy = "pub")]
    is_donor_phenotype_unrepresented: bool,
    #[getset(get = "pub")]
    compared_loci: Vec<Locus>,
    #[getset(get_copy = "pub")]
    patient_genotype_count: usize,
    #[getset(get_copy = "pub")]
    donor_genotype_count: usize,
}

impl MatchProbabilityResult {
    pub(crate) fn computed(
        per_locus: LociInfo<Option<MismatchDistribution>>,
        aggregate: Option<MismatchDistribution>,
        compared_loci: Vec<Locus>,
        patient_genotype_count: usize,
        donor_genotype_count: usize,
    ) -> Self {
        MatchProbabilityResult {
            per_locus,
            aggregate,
            is_patient_phenotype_unrepresented: false,
            is_donor_phenotype_unrepresented: false,
            compared_loci,
            patient_genotype_count,
            donor_genotype_count,
        }
    }

    pub(crate) fn unrepresented(
        is_patient_phenotype_unrepresented: bool,
        is_donor_phenotype_unrepresented: bool,
        compared_loci: Vec<Locus>,
        patient_genotype_count: usize,
        donor_genotype_count: usize,
    ) -> Self {
        MatchProbabilityResult {
            per_locus: LociInfo::default(),
            aggregate: None,
            is_patient_phenotype_unrepresented,
            is_donor_phenotype_unrepresented,
            compared_loci,
            patient_genotype_count,
            donor_genotype_count,
        }
    }

    pub fn locus(&self, locus: Locus) -> Option<&MismatchDistribution> {
        self.per_locus.get(locus).as_ref()
    }

    pub fn is_unrepresented(&self) -> bool {
        self.is_patient_phenotype_unrepresented || self.is_donor_phenotype_unrepresented
    }

    pub fn zero_mismatch_probability(&self) -> Option<Probability> {
        self.aggregate.map(|aggregate| aggregate.zero_mismatch())
    }

    pub fn one_mismatch_probability(&self) -> Option<Probability> {
        self.aggregate.map(|aggregate| aggregate.one_mismatch())
    }

    pub fn two_mismatch_probability(&self) -> Option<Probability> {
        self.aggregate.map(|aggregate| aggregate.two_mismatch())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probability_overshoot_and_rounding() {
        assert_eq!(*Probability::from_ratio(1.0 + 1e-12, 1.0, None), 1.0);
        assert_eq!(*Probability::from_ratio(1.0, 3.0, Some(2)), 0.33);
        assert_eq!(*Probability::from_ratio(2.0, 3.0, Some(4)), 0.6667);
    }

    #[test]
    fn test_unrepresented_result_serialization() {
        let result = MatchProbabilityResult::unrepresented(true, false, vec![Locus::A], 3, 1);
        let json = serde_json::to_value(&result).unwrap();
        assert!(json["aggregate"].is_null());
        assert!(json["per_locus"]["A"].is_null());
        assert_eq!(json["is_patient_phenotype_unrepresented"], true);
        assert_eq!(result.zero_mismatch_probability(), None);
    }
}
