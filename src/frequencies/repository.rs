// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};

use crate::frequencies::{FrequencySetSelection, Haplotype, HaplotypeFrequency};

/// Source of haplotype frequency sets.
pub trait FrequencySetRepository {
    fn load(
        &self,
        population_id: &str,
        nomenclature_version: &str,
    ) -> Result<Vec<HaplotypeFrequency>>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FrequencyRecord {
    #[serde(rename = "A")]
    a: String,
    #[serde(rename = "B")]
    b: String,
    #[serde(rename = "C")]
    c: String,
    #[serde(rename = "DQB1")]
    dqb1: String,
    #[serde(rename = "DRB1")]
    drb1: String,
    frequency: f64,
}

/// Frequency sets stored as CSV files under `<root>/<nomenclature_version>/<population_id>.csv`
/// with header `A,B,C,DQB1,DRB1,frequency`.
#[derive(Debug, Clone, new)]
pub struct CsvFrequencySetRepository {
    root: PathBuf,
}

impl CsvFrequencySetRepository {
    pub fn path(&self, population_id: &str, nomenclature_version: &str) -> Result<PathBuf> {
        for component in &[population_id, nomenclature_version] {
            if component.is_empty()
                || component.contains(std::path::is_separator)
                || component.starts_with('.')
            {
                bail!("invalid frequency set identifier '{}'", component);
            }
        }
        Ok(self
            .root
            .join(nomenclature_version)
            .join(format!("{}.csv", population_id)))
    }

    fn read(
        path: &Path,
        population_id: &str,
        nomenclature_version: &str,
    ) -> Result<Vec<HaplotypeFrequency>> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .with_context(|| format!("unable to open frequency set {}", path.display()))?;

        let mut frequencies = Vec::new();
        for (i, record) in reader.deserialize().enumerate() {
            let record: FrequencyRecord = record.with_context(|| {
                format!("invalid record {} in frequency set {}", i + 1, path.display())
            })?;
            frequencies.push(HaplotypeFrequency::new(
                Haplotype::from_alleles(
                    &record.a,
                    &record.b,
                    &record.c,
                    &record.dqb1,
                    &record.drb1,
                ),
                record.frequency,
                population_id.to_owned(),
                nomenclature_version.to_owned(),
            ));
        }
        Ok(frequencies)
    }
}

impl FrequencySetRepository for CsvFrequencySetRepository {
    fn load(
        &self,
        population_id: &str,
        nomenclature_version: &str,
    ) -> Result<Vec<HaplotypeFrequency>> {
        let path = self.path(population_id, nomenclature_version)?;
        let frequencies = Self::read(&path, population_id, nomenclature_version)?;
        debug!(
            "read {} haplotype frequencies from {}",
            frequencies.len(),
            path.display()
        );
        Ok(frequencies)
    }
}

/// Frequency sets held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFrequencySetRepository {
    sets: HashMap<FrequencySetSelection, Vec<HaplotypeFrequency>>,
}

impl InMemoryFrequencySetRepository {
    pub fn insert(
        &mut self,
        population_id: &str,
        nomenclature_version: &str,
        frequencies: Vec<(Haplotype, f64)>,
    ) {
        let frequencies = frequencies
            .into_iter()
            .map(|(haplotype, frequency)| {
                HaplotypeFrequency::new(
                    haplotype,
                    frequency,
                    population_id.to_owned(),
                    nomenclature_version.to_owned(),
                )
            })
            .collect();
        self.sets.insert(
            FrequencySetSelection::new(population_id.to_owned(), nomenclature_version.to_owned()),
            frequencies,
        );
    }
}

impl FrequencySetRepository for InMemoryFrequencySetRepository {
    fn load(
        &self,
        population_id: &str,
        nomenclature_version: &str,
    ) -> Result<Vec<HaplotypeFrequency>> {
        self.sets
            .get(&FrequencySetSelection::new(
                population_id.to_owned(),
                nomenclature_version.to_owned(),
            ))
            .cloned()
            .ok_or_else(|| {
                anyhow!(
                    "no frequency set stored for population {} and nomenclature version {}",
                    population_id,
                    nomenclature_version
                )
            })
    }
}
