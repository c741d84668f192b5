// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};

use crate::constants::{
    DEFAULT_MAX_GENOTYPES_PER_SUBJECT, DEFAULT_MAX_GENOTYPE_PAIRS, DEFAULT_THREADS,
};

/// Settings of the match probability calculation.
///
/// ```yaml
/// max_genotypes_per_subject: 100000
/// fallback_nomenclature_versions: ["3.40.0"]
/// decimal_places: 4
/// pair_timeout_ms: 30000
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculatorConfig {
    /// Expansions of a single phenotype beyond this number of genotypes are refused.
    pub max_genotypes_per_subject: usize,
    /// Represented patient x donor genotype pairs beyond this number are refused.
    pub max_genotype_pairs: usize,
    /// Nomenclature versions to try, in order, when a code cannot be converted at the
    /// requested version.
    pub fallback_nomenclature_versions: Vec<String>,
    /// Round reported probabilities to this many decimal places.
    pub decimal_places: Option<u32>,
    /// Give up on a single patient/donor pair after this many milliseconds.
    pub pair_timeout_ms: Option<u64>,
    pub threads: usize,
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        CalculatorConfig {
            max_genotypes_per_subject: DEFAULT_MAX_GENOTYPES_PER_SUBJECT,
            max_genotype_pairs: DEFAULT_MAX_GENOTYPE_PAIRS,
            fallback_nomenclature_versions: Vec::new(),
            decimal_places: None,
            pair_timeout_ms: None,
            threads: DEFAULT_THREADS,
        }
    }
}

impl CalculatorConfig {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref()).with_context(|| {
            format!("unable to open configuration {}", path.as_ref().display())
        })?;
        let config = serde_yaml::from_reader(file)
            .with_context(|| format!("invalid configuration {}", path.as_ref().display()))?;
        Ok(config)
    }
}
