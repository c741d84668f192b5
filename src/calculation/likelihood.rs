// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use itertools::Itertools;

use crate::frequencies::{Haplotype, HaplotypeFrequencyIndex};
use crate::loci::{LociInfo, Locus};
use crate::phenotype::Genotype;

/// A candidate genotype with its (unnormalized) likelihood.
#[derive(Debug, Clone, PartialEq, new, Getters, CopyGetters)]
pub struct WeightedGenotype {
    #[getset(get = "pub")]
    genotype: Genotype,
    #[getset(get_copy = "pub")]
    likelihood: f64,
    /// False if no phase assignment of the genotype has both haplotypes in the frequency set.
    #[getset(get_copy = "pub")]
    is_represented: bool,
}

impl WeightedGenotype {
    /// A genotype known with certainty.
    pub fn certain(genotype: Genotype) -> Self {
        WeightedGenotype::new(genotype, 1.0, true)
    }

    pub fn into_genotype(self) -> Genotype {
        self.genotype
    }
}

/// Phase assignments of a genotype, i.e. the distinct unordered pairs of haplotypes it can be
/// split into.
///
/// With `h` heterozygous loci there are `2^(h-1)` assignments (one if `h == 0`): the first
/// heterozygous locus keeps its orientation, all others are flipped independently.
pub(crate) fn diplotypes(genotype: &Genotype) -> Vec<(Haplotype, Haplotype)> {
    let heterozygous = Locus::calculated()
        .filter(|locus| {
            genotype
                .get(*locus)
                .as_ref()
                .map_or(false, |pair| !pair.is_homozygous())
        })
        .collect_vec();
    let n_assignments = if heterozygous.is_empty() {
        1
    } else {
        1usize << (heterozygous.len() - 1)
    };

    (0..n_assignments)
        .map(|assignment| {
            let flipped = |locus: Locus| {
                heterozygous
                    .iter()
                    .skip(1)
                    .position(|other| *other == locus)
                    .map_or(false, |i| assignment & (1 << i) != 0)
            };
            let mut first = LociInfo::default();
            let mut second = LociInfo::default();
            for locus in Locus::calculated() {
                if let Some(pair) = genotype.get(locus) {
                    let (x, y) = if flipped(locus) {
                        (&pair.position_2, &pair.position_1)
                    } else {
                        (&pair.position_1, &pair.position_2)
                    };
                    first.set(locus, Some(x.clone()));
                    second.set(locus, Some(y.clone()));
                }
            }
            (Haplotype::new(first), Haplotype::new(second))
        })
        .collect()
}

/// Likelihood of genotypes under the two-haplotype population model.
#[derive(Debug, new)]
pub struct GenotypeLikelihoodCalculator<'a> {
    index: &'a HaplotypeFrequencyIndex,
}

impl GenotypeLikelihoodCalculator<'_> {
    /// Sum of the likelihoods of all represented phase assignments: f(h)^2 for identical
    /// haplotypes, 2 f(h1) f(h2) otherwise. `None` if no assignment is represented.
    pub fn likelihood(&self, genotype: &Genotype) -> Option<f64> {
        let mut likelihood = None;
        for (first, second) in diplotypes(genotype) {
            let (f1, f2) = match (self.index.frequency(&first), self.index.frequency(&second)) {
                (Some(f1), Some(f2)) => (f1, f2),
                _ => continue,
            };
            let contribution = if first == second {
                f1 * f1
            } else {
                2.0 * f1 * f2
            };
            *likelihood.get_or_insert(0.0) += contribution;
        }
        likelihood
    }

    pub fn weigh(&self, genotype: Genotype) -> WeightedGenotype {
        match self.likelihood(&genotype) {
            Some(likelihood) => WeightedGenotype::new(genotype, likelihood, true),
            None => {
                debug!(
                    "genotype {} is unrepresented in frequency set {}",
                    genotype.display(),
                    self.index.selection()
                );
                WeightedGenotype::new(genotype, 0.0, false)
            }
        }
    }
}
