// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use derive_builder::Builder;

use crate::calculation::likelihood::{GenotypeLikelihoodCalculator, WeightedGenotype};
use crate::calculation::result::{MatchProbabilityResult, MismatchDistribution};
use crate::config::CalculatorConfig;
use crate::constants::DEADLINE_CHECK_INTERVAL;
use crate::errors::{Error, Subject};
use crate::frequencies::{FrequencyIndexCache, FrequencySetSelection, HaplotypeFrequencyIndex};
use crate::loci::{LociInfo, Locus};
use crate::phenotype::{AllelePair, ExpandedPhenotype, Genotype, Phenotype, PhenotypeExpander};
use crate::typing::{ConversionChain, HlaConverter};
use crate::utils::Deadline;

/// Typing of the donor: either a possibly ambiguous phenotype, or a genotype that is already
/// known with certainty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "typing", rename_all = "lowercase")]
pub enum DonorTyping {
    Phenotype(Phenotype),
    Genotype(Genotype),
}

/// A single patient/donor calculation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchProbabilityInput {
    #[serde(default)]
    pub id: Option<String>,
    pub patient: Phenotype,
    pub donor: DonorTyping,
    pub patient_frequency_set: FrequencySetSelection,
    pub donor_frequency_set: FrequencySetSelection,
    pub nomenclature_version: String,
    #[serde(default)]
    pub excluded_loci: BTreeSet<Locus>,
}

impl MatchProbabilityInput {
    /// Frequency sets this request needs to be calculated.
    pub fn required_frequency_sets(&self) -> Vec<FrequencySetSelection> {
        let mut selections = vec![self.patient_frequency_set.clone()];
        if let DonorTyping::Phenotype(_) = self.donor {
            selections.push(self.donor_frequency_set.clone());
        }
        selections
    }
}

/// Donor side after expansion.
enum ExpandedDonor<'a> {
    Phenotype(ExpandedPhenotype),
    Genotype(&'a Genotype),
}

impl ExpandedDonor<'_> {
    fn is_typed(&self, locus: Locus) -> bool {
        match self {
            ExpandedDonor::Phenotype(expanded) => expanded.is_typed(locus),
            ExpandedDonor::Genotype(genotype) => genotype.is_typed(locus),
        }
    }
}

/// Candidate genotypes of one side, projected onto the compared loci.
struct Candidates {
    weighted: Vec<(LociInfo<Option<AllelePair>>, f64)>,
    count: usize,
}

impl Candidates {
    /// Merge candidates that are indistinguishable at the compared loci. Insertion order is
    /// kept so that accumulation is deterministic. Weights are scaled such that the largest
    /// one is 1, which keeps their ratios and prevents pair weights from underflowing.
    fn collapse<I>(genotypes: I, compared_loci: &[Locus], count: usize) -> Self
    where
        I: IntoIterator<Item = WeightedGenotype>,
    {
        let mut positions: HashMap<LociInfo<Option<AllelePair>>, usize> = HashMap::new();
        let mut weighted: Vec<(LociInfo<Option<AllelePair>>, f64)> = Vec::new();
        for genotype in genotypes {
            let likelihood = genotype.likelihood();
            let genotype = genotype.into_genotype();
            let projection = LociInfo::from_fn(|locus| {
                if compared_loci.contains(&locus) {
                    genotype.get(locus).as_ref().map(|pair| {
                        if pair.position_1 <= pair.position_2 {
                            pair.clone()
                        } else {
                            AllelePair::new(pair.position_2.clone(), pair.position_1.clone())
                        }
                    })
                } else {
                    None
                }
            });
            match positions.get(&projection) {
                Some(i) => weighted[*i].1 += likelihood,
                None => {
                    positions.insert(projection.clone(), weighted.len());
                    weighted.push((projection, likelihood));
                }
            }
        }

        let max = weighted
            .iter()
            .map(|(_, weight)| *weight)
            .fold(0.0, f64::max);
        if max > 0.0 {
            for (_, weight) in &mut weighted {
                *weight /= max;
            }
        }

        Candidates { weighted, count }
    }

    fn is_unrepresented(&self) -> bool {
        self.weighted.is_empty()
    }

    /// False if the likelihoods of all represented candidates underflowed to zero.
    fn has_weight(&self) -> bool {
        self.weighted.iter().any(|(_, weight)| *weight > 0.0)
    }
}

/// Calculates mismatch probabilities between patients and donors.
#[derive(Builder)]
#[builder(pattern = "owned")]
pub struct MatchProbabilityCalculator<'a> {
    frequencies: &'a FrequencyIndexCache,
    converter: Arc<dyn HlaConverter>,
    #[builder(default)]
    config: CalculatorConfig,
}

impl MatchProbabilityCalculator<'_> {
    pub fn config(&self) -> &CalculatorConfig {
        &self.config
    }

    pub fn calculate(
        &self,
        input: &MatchProbabilityInput,
    ) -> Result<MatchProbabilityResult, Error> {
        let deadline = Deadline::start(self.config.pair_timeout_ms);
        let conversion = ConversionChain::with_fallbacks(
            Arc::clone(&self.converter),
            &input.nomenclature_version,
            &self.config.fallback_nomenclature_versions,
        );
        let expander = PhenotypeExpander::new(&conversion);

        let patient_expanded = expand(&expander, &input.patient, Subject::Patient)?;
        let donor_expanded = match &input.donor {
            DonorTyping::Phenotype(phenotype) => {
                ExpandedDonor::Phenotype(expand(&expander, phenotype, Subject::Donor)?)
            }
            DonorTyping::Genotype(genotype) => ExpandedDonor::Genotype(genotype),
        };
        let compared_loci: Vec<Locus> = Locus::calculated()
            .filter(|locus| {
                !input.excluded_loci.contains(locus)
                    && patient_expanded.is_typed(*locus)
                    && donor_expanded.is_typed(*locus)
            })
            .collect();

        let patient_index = self.frequencies.index(&input.patient_frequency_set)?;
        let patient = self.candidates(
            &patient_expanded,
            patient_index,
            Subject::Patient,
            &compared_loci,
            &deadline,
        )?;
        let donor = match &donor_expanded {
            ExpandedDonor::Phenotype(expanded) => {
                let donor_index = self.frequencies.index(&input.donor_frequency_set)?;
                self.candidates(
                    expanded,
                    donor_index,
                    Subject::Donor,
                    &compared_loci,
                    &deadline,
                )?
            }
            ExpandedDonor::Genotype(genotype) => Candidates::collapse(
                vec![WeightedGenotype::certain((*genotype).clone())],
                &compared_loci,
                1,
            ),
        };

        if patient.is_unrepresented() || donor.is_unrepresented() {
            info!(
                "no match probability{}: patient unrepresented: {}, donor unrepresented: {}",
                input.id.as_ref().map_or_else(String::new, |id| format!(" for {}", id)),
                patient.is_unrepresented(),
                donor.is_unrepresented()
            );
            return Ok(MatchProbabilityResult::unrepresented(
                patient.is_unrepresented(),
                donor.is_unrepresented(),
                compared_loci,
                patient.count,
                donor.count,
            ));
        }
        for (candidates, subject) in &[(&patient, Subject::Patient), (&donor, Subject::Donor)] {
            if !candidates.has_weight() {
                return Err(Error::LikelihoodUnderflow { subject: *subject });
            }
        }

        let n_pairs = patient.weighted.len().saturating_mul(donor.weighted.len());
        if n_pairs > self.config.max_genotype_pairs {
            return Err(Error::TooManyGenotypePairs {
                candidates: n_pairs,
                max: self.config.max_genotype_pairs,
            });
        }

        let mut per_locus: LociInfo<[f64; 3]> = LociInfo::default();
        let mut aggregate = [0.0; 3];
        let mut total = 0.0;
        let mut accumulated = 0;
        for (patient_genotype, patient_weight) in &patient.weighted {
            for (donor_genotype, donor_weight) in &donor.weighted {
                let weight = patient_weight * donor_weight;
                total += weight;

                let mut mismatches = 0;
                for locus in &compared_loci {
                    if let (Some(patient_pair), Some(donor_pair)) =
                        (patient_genotype.get(*locus), donor_genotype.get(*locus))
                    {
                        let count = patient_pair.mismatch_count(donor_pair) as usize;
                        per_locus.get_mut(*locus)[count] += weight;
                        mismatches += count;
                    }
                }
                if mismatches < aggregate.len() {
                    aggregate[mismatches] += weight;
                }

                accumulated += 1;
                if accumulated % DEADLINE_CHECK_INTERVAL == 0 {
                    deadline.check()?;
                }
            }
        }
        debug!(
            "accumulated {} genotype pairs over loci {:?}",
            accumulated, compared_loci
        );

        let decimal_places = self.config.decimal_places;
        let per_locus = per_locus.map(|locus, weights| {
            if compared_loci.contains(&locus) {
                Some(MismatchDistribution::from_weights(
                    weights,
                    total,
                    decimal_places,
                ))
            } else {
                None
            }
        });
        let aggregate = if compared_loci.is_empty() {
            info!(
                "no locus is typed on both sides and not excluded{}",
                input.id.as_ref().map_or_else(String::new, |id| format!(" for {}", id))
            );
            None
        } else {
            Some(MismatchDistribution::from_weights(
                &aggregate,
                total,
                decimal_places,
            ))
        };

        Ok(MatchProbabilityResult::computed(
            per_locus,
            aggregate,
            compared_loci,
            patient.count,
            donor.count,
        ))
    }

    fn candidates(
        &self,
        expanded: &ExpandedPhenotype,
        index: &HaplotypeFrequencyIndex,
        subject: Subject,
        compared_loci: &[Locus],
        deadline: &Deadline,
    ) -> Result<Candidates, Error> {
        let count = expanded.genotype_count();
        let calculator = GenotypeLikelihoodCalculator::new(index);
        let mut represented = Vec::new();
        for (i, genotype) in expanded
            .bounded_genotypes(subject, self.config.max_genotypes_per_subject)?
            .enumerate()
        {
            if (i + 1) % DEADLINE_CHECK_INTERVAL == 0 {
                deadline.check()?;
            }
            let weighted = calculator.weigh(genotype);
            if weighted.is_represented() {
                represented.push(weighted);
            }
        }
        debug!(
            "{} of {} {} candidate genotypes are represented in {}",
            represented.len(),
            count,
            subject,
            index.selection()
        );

        Ok(Candidates::collapse(represented, compared_loci, count))
    }
}

fn expand(
    expander: &PhenotypeExpander<'_>,
    phenotype: &Phenotype,
    subject: Subject,
) -> Result<ExpandedPhenotype, Error> {
    let expanded = expander.expand(phenotype);
    if expanded.is_empty() {
        return Err(Error::NoCandidateGenotypes { subject });
    }
    Ok(expanded)
}
