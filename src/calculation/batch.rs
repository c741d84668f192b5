// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use anyhow::Result;
use rayon::prelude::*;

use crate::calculation::match_probability::{MatchProbabilityCalculator, MatchProbabilityInput};
use crate::calculation::result::MatchProbabilityResult;

/// Outcome of one request of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PairOutcome {
    Computed {
        id: Option<String>,
        result: MatchProbabilityResult,
    },
    Failed {
        id: Option<String>,
        reason: String,
    },
}

impl PairOutcome {
    pub fn id(&self) -> Option<&str> {
        match self {
            PairOutcome::Computed { id, .. } | PairOutcome::Failed { id, .. } => id.as_deref(),
        }
    }

    pub fn result(&self) -> Option<&MatchProbabilityResult> {
        match self {
            PairOutcome::Computed { result, .. } => Some(result),
            PairOutcome::Failed { .. } => None,
        }
    }
}

/// Calculate all requests on a dedicated pool of `threads` workers (0 means one per core).
/// Failing requests are reported in their outcome and never abort the batch. Outcomes are
/// returned in input order.
pub fn calculate_batch(
    calculator: &MatchProbabilityCalculator<'_>,
    inputs: &[MatchProbabilityInput],
    threads: usize,
) -> Result<Vec<PairOutcome>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()?;
    info!(
        "calculating {} patient/donor pairs on {} threads",
        inputs.len(),
        pool.current_num_threads()
    );

    let outcomes: Vec<PairOutcome> = pool.install(|| {
        inputs
            .par_iter()
            .map(|input| match calculator.calculate(input) {
                Ok(result) => PairOutcome::Computed {
                    id: input.id.clone(),
                    result,
                },
                Err(e) => {
                    warn!(
                        "calculation{} failed: {}",
                        input
                            .id
                            .as_ref()
                            .map_or_else(String::new, |id| format!(" of {}", id)),
                        e
                    );
                    PairOutcome::Failed {
                        id: input.id.clone(),
                        reason: e.to_string(),
                    }
                }
            })
            .collect()
    });

    let n_failed = outcomes
        .iter()
        .filter(|outcome| outcome.result().is_none())
        .count();
    if n_failed > 0 {
        warn!("{} of {} calculations failed", n_failed, outcomes.len());
    }
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use itertools::Itertools;

    use crate::calculation::match_probability::{DonorTyping, MatchProbabilityCalculatorBuilder};
    use crate::config::CalculatorConfig;
    use crate::frequencies::{
        FrequencyIndexCache, FrequencySetSelection, Haplotype, HaplotypeFrequency,
        HaplotypeFrequencyIndex,
    };
    use crate::loci::{Locus, LocusInfo};
    use crate::phenotype::Phenotype;
    use crate::typing::NomenclatureTables;

    fn selection(population_id: &str) -> FrequencySetSelection {
        FrequencySetSelection::new(population_id.to_owned(), "3.50.0".to_owned())
    }

    fn cache() -> FrequencyIndexCache {
        let index = HaplotypeFrequencyIndex::build(
            selection("EUR"),
            vec![HaplotypeFrequency::new(
                Haplotype::from_alleles("01:01", "08:01", "07:01", "02:01", "03:01"),
                0.1,
                "EUR".to_owned(),
                "3.50.0".to_owned(),
            )],
        )
        .unwrap();
        let mut cache = FrequencyIndexCache::default();
        cache.insert(index);
        cache
    }

    fn input(id: &str, population_id: &str) -> MatchProbabilityInput {
        let phenotype = Phenotype::from_typings(vec![
            (Locus::A, "01:01", "01:01"),
            (Locus::B, "08:01", "08:01"),
            (Locus::C, "07:01", "07:01"),
            (Locus::Dqb1, "02:01", "02:01"),
            (Locus::Drb1, "03:01", "03:01"),
        ]);
        MatchProbabilityInput {
            id: Some(id.to_owned()),
            patient: phenotype.clone(),
            donor: DonorTyping::Phenotype(phenotype),
            patient_frequency_set: selection(population_id),
            donor_frequency_set: selection(population_id),
            nomenclature_version: "3.50.0".to_owned(),
            excluded_loci: BTreeSet::new(),
        }
    }

    #[test]
    fn test_failures_do_not_abort_batch() {
        let cache = cache();
        let calculator = MatchProbabilityCalculatorBuilder::default()
            .frequencies(&cache)
            .converter(Arc::new(NomenclatureTables::default()))
            .build()
            .unwrap();

        let inputs = vec![
            input("first", "EUR"),
            input("second", "XYZ"),
            input("third", "EUR"),
        ];
        let outcomes = calculate_batch(&calculator, &inputs, 2).unwrap();

        assert_eq!(outcomes.len(), 3);
        assert_eq!(
            outcomes.iter().map(|outcome| outcome.id()).collect::<Vec<_>>(),
            vec![Some("first"), Some("second"), Some("third")]
        );
        assert_relative_eq!(
            *outcomes[0].result().unwrap().zero_mismatch_probability().unwrap(),
            1.0
        );
        match &outcomes[1] {
            PairOutcome::Failed { reason, .. } => assert!(reason.contains("XYZ")),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(outcomes[2].result().is_some());

        let json = serde_json::to_value(&outcomes[1]).unwrap();
        assert_eq!(json["status"], "failed");
    }

    #[test]
    fn test_timeout_fails_only_its_pair() {
        let cache = cache();
        let calculator = MatchProbabilityCalculatorBuilder::default()
            .frequencies(&cache)
            .converter(Arc::new(NomenclatureTables::default()))
            .config(CalculatorConfig {
                pair_timeout_ms: Some(0),
                ..Default::default()
            })
            .build()
            .unwrap();

        let mut large = input("large", "EUR");
        let a_list = (1..=70).map(|i| format!("01:{:02}", i)).join("/");
        large
            .patient
            .set(Locus::A, LocusInfo::new(Some(a_list.clone()), Some(a_list)));
        large.patient.set(
            Locus::B,
            LocusInfo::new(Some("08:01/07:02".to_owned()), Some("08:01/07:02".to_owned())),
        );
        let inputs = vec![input("first", "EUR"), large, input("third", "EUR")];
        let outcomes = calculate_batch(&calculator, &inputs, 2).unwrap();

        assert!(outcomes[0].result().is_some());
        match &outcomes[1] {
            PairOutcome::Failed { id, reason } => {
                assert_eq!(id.as_deref(), Some("large"));
                assert!(reason.contains("time limit"));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(outcomes[2].result().is_some());
    }
}
