// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::collections::HashSet;

use itertools::Itertools;

use crate::errors::{Error, Subject};
use crate::loci::{LociInfo, Locus, LocusInfo};
use crate::phenotype::{AllelePair, Genotype, Phenotype};
use crate::typing::{classify, ConversionChain};

/// Expands ambiguous phenotypes into the candidate genotypes consistent with them.
#[derive(Debug, new)]
pub struct PhenotypeExpander<'a> {
    conversion: &'a ConversionChain,
}

impl PhenotypeExpander<'_> {
    /// Resolve every typing of the phenotype once. Genotypes are enumerated lazily from the
    /// returned value.
    pub fn expand(&self, phenotype: &Phenotype) -> ExpandedPhenotype {
        ExpandedPhenotype {
            combinations: LociInfo::from_fn(|locus| self.locus_combinations(phenotype, locus)),
        }
    }

    fn locus_combinations(&self, phenotype: &Phenotype, locus: Locus) -> Vec<Option<AllelePair>> {
        if !locus.is_calculated() {
            return vec![None];
        }
        if !phenotype.is_typed(locus) {
            if locus.may_be_untyped() {
                return vec![None];
            }
            warn!("required locus {} is not typed", locus);
            return Vec::new();
        }

        let typings = phenotype.get(locus);
        let candidates = typings.map(|typing| {
            typing
                .as_deref()
                .map_or_else(Vec::new, |typing| self.position_candidates(locus, typing))
        });

        let pairs = unordered_pairs(&candidates.position_1, &candidates.position_2);
        if pairs.is_empty() && locus.may_be_untyped() {
            warn!(
                "typing at locus {} cannot be resolved, treating the locus as untyped",
                locus
            );
            return vec![None];
        }
        pairs.into_iter().map(Some).collect()
    }

    fn position_candidates(&self, locus: Locus, typing: &str) -> Vec<String> {
        let classified = match classify(typing) {
            Ok(classified) => classified,
            Err(e) => {
                warn!("{} (locus {})", e, locus);
                return Vec::new();
            }
        };

        let alleles = if classified.category().requires_conversion() {
            match self.conversion.resolve(locus, &classified) {
                Ok(alleles) => alleles,
                Err(e) => {
                    warn!("{}", e);
                    Vec::new()
                }
            }
        } else {
            classified.local_alleles().unwrap_or_default()
        };
        if alleles.is_empty() {
            debug!(
                "typing {} at locus {} does not contribute any candidate allele",
                typing, locus
            );
        }

        alleles.into_iter().unique().collect()
    }
}

/// Cross product of the alternatives at both positions of a locus. (x, y) and (y, x) describe
/// the same genotype and are kept once, in the orientation seen first.
pub(crate) fn unordered_pairs(first: &[String], second: &[String]) -> Vec<AllelePair> {
    let mut seen = HashSet::new();
    first
        .iter()
        .cartesian_product(second.iter())
        .filter(|(x, y)| {
            if x <= y {
                seen.insert((*x, *y))
            } else {
                seen.insert((*y, *x))
            }
        })
        .map(|(x, y)| LocusInfo::new(x.clone(), y.clone()))
        .collect()
}

/// Resolved candidate allele pairs of a phenotype, per locus.
///
/// Genotypes are the cross product of the per-locus candidates. They are never materialized
/// here: each call of [`ExpandedPhenotype::genotypes`] starts a fresh enumeration.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedPhenotype {
    combinations: LociInfo<Vec<Option<AllelePair>>>,
}

impl ExpandedPhenotype {
    pub fn combinations(&self, locus: Locus) -> &[Option<AllelePair>] {
        self.combinations.get(locus)
    }

    /// Number of genotypes the enumeration will yield (saturating).
    pub fn genotype_count(&self) -> usize {
        Locus::calculated()
            .map(|locus| self.combinations.get(locus).len())
            .fold(1usize, |count, n| count.saturating_mul(n))
    }

    pub fn is_empty(&self) -> bool {
        self.genotype_count() == 0
    }

    /// Whether the locus resolved to concrete allele pairs, i.e. is neither untyped nor
    /// without candidates.
    pub fn is_typed(&self, locus: Locus) -> bool {
        let combinations = self.combinations.get(locus);
        !combinations.is_empty() && combinations.iter().all(Option::is_some)
    }

    pub fn genotypes(&self) -> impl Iterator<Item = Genotype> + '_ {
        Locus::calculated()
            .map(move |locus| self.combinations.get(locus).iter())
            .multi_cartesian_product()
            .map(|pairs| {
                let mut genotype = Genotype::default();
                for (locus, pair) in Locus::calculated().zip(pairs) {
                    genotype.set(locus, pair.clone());
                }
                genotype
            })
    }

    /// Like [`ExpandedPhenotype::genotypes`], but refuses to start if the enumeration would
    /// exceed `max` genotypes.
    pub fn bounded_genotypes(
        &self,
        subject: Subject,
        max: usize,
    ) -> Result<impl Iterator<Item = Genotype> + '_, Error> {
        let candidates = self.genotype_count();
        if candidates > max {
            return Err(Error::ExpansionTooLarge {
                subject,
                candidates,
                max,
            });
        }
        Ok(self.genotypes())
    }
}
