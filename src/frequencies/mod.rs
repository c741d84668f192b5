// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Population haplotype frequencies.

use std::fmt;

use crate::loci::{LociInfo, Locus};

pub mod index;
pub mod repository;

pub use index::{FrequencyIndexCache, HaplotypeFrequencyIndex};
pub use repository::{
    CsvFrequencySetRepository, FrequencySetRepository, InMemoryFrequencySetRepository,
};

/// Alleles of a haplotype at the calculated loci. `None` at C or DQB1 denotes a haplotype
/// marginalised over that locus. DPB1 is always `None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Derefable, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Haplotype(#[deref] LociInfo<Option<String>>);

impl Haplotype {
    pub fn new(alleles: LociInfo<Option<String>>) -> Self {
        let mut alleles = alleles;
        alleles.dpb1 = None;
        Haplotype(alleles)
    }

    pub fn from_alleles(a: &str, b: &str, c: &str, dqb1: &str, drb1: &str) -> Self {
        let mut alleles = LociInfo::default();
        alleles.a = Some(a.to_owned());
        alleles.b = Some(b.to_owned());
        alleles.c = Some(c.to_owned());
        alleles.dqb1 = Some(dqb1.to_owned());
        alleles.drb1 = Some(drb1.to_owned());
        Haplotype(alleles)
    }

    /// Loci at which this haplotype carries an allele.
    pub fn typed_loci(&self) -> LociInfo<bool> {
        self.0.map(|_, allele| allele.is_some())
    }

    /// Copy of this haplotype with the given loci dropped.
    pub fn marginalised(&self, typed_loci: &LociInfo<bool>) -> Haplotype {
        Haplotype(
            self.0
                .map(|locus, allele| allele.clone().filter(|_| *typed_loci.get(locus))),
        )
    }

    pub fn is_complete(&self) -> bool {
        Locus::calculated().all(|locus| self.0.get(locus).is_some())
    }
}

impl fmt::Display for Haplotype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let alleles: Vec<String> = Locus::calculated()
            .map(|locus| match self.0.get(locus) {
                Some(allele) => format!("{}*{}", locus, allele),
                None => format!("{}*-", locus),
            })
            .collect();
        write!(f, "{}", alleles.join("~"))
    }
}

/// Population and nomenclature version a frequency set is selected by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, new)]
pub struct FrequencySetSelection {
    pub population_id: String,
    pub nomenclature_version: String,
}

impl fmt::Display for FrequencySetSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (nomenclature {})",
            self.population_id, self.nomenclature_version
        )
    }
}

/// Frequency of a complete haplotype within a population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, new, Getters, CopyGetters)]
pub struct HaplotypeFrequency {
    #[getset(get = "pub")]
    haplotype: Haplotype,
    #[getset(get_copy = "pub")]
    frequency: f64,
    #[getset(get = "pub")]
    population_id: String,
    #[getset(get = "pub")]
    nomenclature_version: String,
}
