// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use itertools::Itertools;

use crate::loci::{LociInfo, Locus, LocusInfo};

pub mod expansion;

pub use expansion::{ExpandedPhenotype, PhenotypeExpander};

/// Reported typing of an individual: per locus, two possibly ambiguous typing strings.
/// `None` at a position denotes "not typed".
pub type Phenotype = LociInfo<LocusInfo<Option<String>>>;

/// Two concrete allele names at a locus.
pub type AllelePair = LocusInfo<String>;

/// A fully concrete phenotype. `None` at a locus means the locus is untyped (or, for DPB1,
/// not applicable).
pub type Genotype = LociInfo<Option<AllelePair>>;

impl Phenotype {
    /// Build a phenotype from string pairs, e.g. for tests and tooling.
    pub fn from_typings<'a, I>(typings: I) -> Self
    where
        I: IntoIterator<Item = (Locus, &'a str, &'a str)>,
    {
        let mut phenotype = Phenotype::default();
        for (locus, position_1, position_2) in typings {
            phenotype.set(
                locus,
                LocusInfo::new(Some(position_1.to_owned()), Some(position_2.to_owned())),
            );
        }
        phenotype
    }

    /// A locus counts as typed if both positions carry a non-blank typing.
    pub fn is_typed(&self, locus: Locus) -> bool {
        self.get(locus)
            .positions()
            .iter()
            .all(|typing| typing.as_ref().map_or(false, |t| !t.trim().is_empty()))
    }
}

impl Genotype {
    pub fn from_alleles<'a, I>(alleles: I) -> Self
    where
        I: IntoIterator<Item = (Locus, &'a str, &'a str)>,
    {
        let mut genotype = Genotype::default();
        for (locus, allele_1, allele_2) in alleles {
            genotype.set(
                locus,
                Some(LocusInfo::new(allele_1.to_owned(), allele_2.to_owned())),
            );
        }
        genotype
    }

    pub fn is_typed(&self, locus: Locus) -> bool {
        self.get(locus).is_some()
    }

    /// Compact representation, e.g. `A*01:01+02:01 B*08:01+07:02`.
    pub fn display(&self) -> String {
        Locus::CALCULATED
            .iter()
            .filter_map(|locus| {
                self.get(*locus).as_ref().map(|pair| {
                    format!("{}*{}+{}", locus, pair.position_1, pair.position_2)
                })
            })
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phenotype_typed_loci() {
        let mut phenotype = Phenotype::from_typings(vec![
            (Locus::A, "01:01", "02:01"),
            (Locus::B, "08:01", "07:02"),
        ]);
        phenotype.set(Locus::C, LocusInfo::new(Some("07:01".to_owned()), None));
        assert!(phenotype.is_typed(Locus::A));
        assert!(!phenotype.is_typed(Locus::C));
        assert!(!phenotype.is_typed(Locus::Drb1));
    }

    #[test]
    fn test_genotype_display() {
        let genotype = Genotype::from_alleles(vec![
            (Locus::A, "01:01", "02:01"),
            (Locus::Drb1, "03:01", "15:01"),
        ]);
        assert_eq!(genotype.display(), "A*01:01+02:01 DRB1*03:01+15:01");
    }
}
