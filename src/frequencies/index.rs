// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::collections::HashMap;

use itertools::Itertools;

use crate::constants::FREQUENCY_TOLERANCE;
use crate::errors::{frequency_set_unavailable, Error};
use crate::frequencies::repository::FrequencySetRepository;
use crate::frequencies::{FrequencySetSelection, Haplotype, HaplotypeFrequency};
use crate::loci::{LociInfo, Locus};

/// Combinations of untyped loci that lookups may ask for.
fn typed_loci_masks() -> Vec<LociInfo<bool>> {
    Locus::calculated()
        .filter(|locus| locus.may_be_untyped())
        .powerset()
        .map(|dropped| {
            LociInfo::from_fn(|locus| locus.is_calculated() && !dropped.contains(&locus))
        })
        .collect()
}

/// Read-only haplotype frequencies of one population and nomenclature version.
///
/// Besides the full five-locus haplotypes, the index holds the frequencies marginalised over
/// C, DQB1, or both, so that individuals untyped at these loci can be looked up.
#[derive(Debug, Clone, Getters)]
pub struct HaplotypeFrequencyIndex {
    #[getset(get = "pub")]
    selection: FrequencySetSelection,
    frequencies: HashMap<LociInfo<bool>, HashMap<Haplotype, f64>>,
}

impl HaplotypeFrequencyIndex {
    pub fn build<I>(selection: FrequencySetSelection, frequencies: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = HaplotypeFrequency>,
    {
        let invalid = |msg: String| Error::InvalidFrequencySet {
            population_id: selection.population_id.clone(),
            nomenclature_version: selection.nomenclature_version.clone(),
            msg,
        };

        let mut full = HashMap::new();
        for haplotype_frequency in frequencies {
            let frequency = haplotype_frequency.frequency();
            let haplotype = haplotype_frequency.haplotype();
            if !haplotype.is_complete() {
                return Err(invalid(format!("haplotype {} is incomplete", haplotype)));
            }
            if !frequency.is_finite() || frequency < 0.0 || frequency > 1.0 + FREQUENCY_TOLERANCE
            {
                return Err(invalid(format!(
                    "frequency {} of haplotype {} is not within [0, 1]",
                    frequency, haplotype
                )));
            }
            if full.insert(haplotype.clone(), frequency).is_some() {
                return Err(invalid(format!("duplicate haplotype {}", haplotype)));
            }
        }
        if full.is_empty() {
            return Err(frequency_set_unavailable(
                &selection.population_id,
                &selection.nomenclature_version,
                "frequency set is empty",
            ));
        }
        // absent and zero frequencies are treated alike
        full.retain(|_, frequency| *frequency > 0.0);

        let mut index = HashMap::new();
        for mask in typed_loci_masks() {
            let mut marginal: HashMap<Haplotype, f64> = HashMap::new();
            for (haplotype, frequency) in &full {
                *marginal.entry(haplotype.marginalised(&mask)).or_insert(0.0) += frequency;
            }
            index.insert(mask, marginal);
        }

        debug!(
            "indexed {} haplotypes of frequency set {}",
            full.len(),
            selection
        );

        Ok(HaplotypeFrequencyIndex {
            selection,
            frequencies: index,
        })
    }

    /// Frequency of the haplotype, marginalised over the loci it leaves untyped.
    /// `None` if the haplotype is not represented.
    pub fn frequency(&self, haplotype: &Haplotype) -> Option<f64> {
        self.frequencies
            .get(&haplotype.typed_loci())?
            .get(haplotype)
            .copied()
    }

    /// Number of represented five-locus haplotypes.
    pub fn len(&self) -> usize {
        self.frequencies
            .get(&LociInfo::from_fn(|locus| locus.is_calculated()))
            .map_or(0, |frequencies| frequencies.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Frequency indexes needed by a batch of calculations, built once and read-only thereafter.
#[derive(Debug, Default)]
pub struct FrequencyIndexCache {
    indexes: HashMap<FrequencySetSelection, HaplotypeFrequencyIndex>,
    failures: HashMap<FrequencySetSelection, Error>,
}

impl FrequencyIndexCache {
    /// Load and index every distinct selection. Failures are remembered per selection and
    /// reported to each calculation that needs the respective set.
    pub fn build<R, I>(repository: &R, selections: I) -> Self
    where
        R: FrequencySetRepository + ?Sized,
        I: IntoIterator<Item = FrequencySetSelection>,
    {
        let mut cache = FrequencyIndexCache::default();
        for selection in selections {
            if cache.indexes.contains_key(&selection) || cache.failures.contains_key(&selection)
            {
                continue;
            }
            let index = repository
                .load(&selection.population_id, &selection.nomenclature_version)
                .map_err(|e| {
                    frequency_set_unavailable(
                        &selection.population_id,
                        &selection.nomenclature_version,
                        &format!("{:#}", e),
                    )
                })
                .and_then(|frequencies| {
                    HaplotypeFrequencyIndex::build(selection.clone(), frequencies)
                });
            match index {
                Ok(index) => {
                    info!(
                        "loaded {} haplotype frequencies for {}",
                        index.len(),
                        selection
                    );
                    cache.indexes.insert(selection, index);
                }
                Err(e) => {
                    warn!("{}", e);
                    cache.failures.insert(selection, e);
                }
            }
        }
        cache
    }

    pub fn insert(&mut self, index: HaplotypeFrequencyIndex) {
        let selection = index.selection().clone();
        self.failures.remove(&selection);
        self.indexes.insert(selection, index);
    }

    pub fn index(
        &self,
        selection: &FrequencySetSelection,
    ) -> Result<&HaplotypeFrequencyIndex, Error> {
        if let Some(index) = self.indexes.get(selection) {
            return Ok(index);
        }
        Err(match self.failures.get(selection) {
            Some(e @ Error::FrequencySetUnavailable { .. }) => e.clone(),
            Some(e) => frequency_set_unavailable(
                &selection.population_id,
                &selection.nomenclature_version,
                &e.to_string(),
            ),
            None => frequency_set_unavailable(
                &selection.population_id,
                &selection.nomenclature_version,
                "frequency set has not been loaded",
            ),
        })
    }

    pub fn lookup(
        &self,
        population_id: &str,
        nomenclature_version: &str,
        haplotype: &Haplotype,
    ) -> Option<f64> {
        self.indexes
            .get(&FrequencySetSelection::new(
                population_id.to_owned(),
                nomenclature_version.to_owned(),
            ))?
            .frequency(haplotype)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frequencies::InMemoryFrequencySetRepository;

    fn selection() -> FrequencySetSelection {
        FrequencySetSelection::new("EUR".to_owned(), "3.50.0".to_owned())
    }

    fn frequency(haplotype: Haplotype, frequency: f64) -> HaplotypeFrequency {
        HaplotypeFrequency::new(haplotype, frequency, "EUR".to_owned(), "3.50.0".to_owned())
    }

    fn index() -> HaplotypeFrequencyIndex {
        HaplotypeFrequencyIndex::build(
            selection(),
            vec![
                frequency(
                    Haplotype::from_alleles("01:01", "08:01", "07:01", "02:01", "03:01"),
                    0.1,
                ),
                frequency(
                    Haplotype::from_alleles("01:01", "08:01", "07:02", "02:01", "03:01"),
                    0.05,
                ),
                frequency(
                    Haplotype::from_alleles("02:01", "07:02", "07:02", "06:02", "15:01"),
                    0.2,
                ),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_full_lookup() {
        let index = index();
        assert_eq!(index.len(), 3);
        assert_relative_eq!(
            index
                .frequency(&Haplotype::from_alleles(
                    "02:01", "07:02", "07:02", "06:02", "15:01"
                ))
                .unwrap(),
            0.2
        );
        assert_eq!(
            index.frequency(&Haplotype::from_alleles(
                "03:01", "07:02", "07:02", "06:02", "15:01"
            )),
            None
        );
    }

    #[test]
    fn test_marginalised_lookup() {
        let index = index();
        let mut haplotype = Haplotype::from_alleles("01:01", "08:01", "07:01", "02:01", "03:01");
        let untyped_c = LociInfo::from_fn(|locus| locus.is_calculated() && locus != Locus::C);
        haplotype = haplotype.marginalised(&untyped_c);
        assert_relative_eq!(index.frequency(&haplotype).unwrap(), 0.15);
    }

    #[test]
    fn test_masks_cover_optional_loci() {
        let masks = typed_loci_masks();
        assert_eq!(masks.len(), 4);
        for mask in &masks {
            assert!(*mask.get(Locus::A) && *mask.get(Locus::B) && *mask.get(Locus::Drb1));
            assert!(!*mask.get(Locus::Dpb1));
        }
        let untyped_both = masks
            .iter()
            .filter(|mask| !*mask.get(Locus::C) && !*mask.get(Locus::Dqb1))
            .count();
        assert_eq!(untyped_both, 1);
    }

    #[test]
    fn test_invalid_sets() {
        let duplicate = Haplotype::from_alleles("01:01", "08:01", "07:01", "02:01", "03:01");
        let result = HaplotypeFrequencyIndex::build(
            selection(),
            vec![
                frequency(duplicate.clone(), 0.1),
                frequency(duplicate.clone(), 0.2),
            ],
        );
        assert!(matches!(result, Err(Error::InvalidFrequencySet { .. })));

        let result = HaplotypeFrequencyIndex::build(selection(), vec![frequency(duplicate, 1.5)]);
        assert!(matches!(result, Err(Error::InvalidFrequencySet { .. })));

        let result = HaplotypeFrequencyIndex::build(selection(), Vec::new());
        assert!(matches!(result, Err(Error::FrequencySetUnavailable { .. })));
    }

    #[test]
    fn test_cache() {
        let mut repository = InMemoryFrequencySetRepository::default();
        repository.insert(
            "EUR",
            "3.50.0",
            vec![(
                Haplotype::from_alleles("01:01", "08:01", "07:01", "02:01", "03:01"),
                0.1,
            )],
        );
        let missing = FrequencySetSelection::new("AFR".to_owned(), "3.50.0".to_owned());
        let cache = FrequencyIndexCache::build(&repository, vec![selection(), missing.clone()]);

        assert!(cache.index(&selection()).is_ok());
        assert!(matches!(
            cache.index(&missing),
            Err(Error::FrequencySetUnavailable { .. })
        ));
        assert_relative_eq!(
            cache
                .lookup(
                    "EUR",
                    "3.50.0",
                    &Haplotype::from_alleles("01:01", "08:01", "07:01", "02:01", "03:01")
                )
                .unwrap(),
            0.1
        );
        assert_eq!(
            cache.lookup(
                "EUR",
                "3.40.0",
                &Haplotype::from_alleles("01:01", "08:01", "07:01", "02:01", "03:01")
            ),
            None
        );
    }
}
