// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use crate::loci::Locus;

use strum_macros::Display;
use thiserror::Error;

/// Side of a patient/donor pair an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Subject {
    Patient,
    Donor,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("malformed HLA typing '{typing}': cannot be assigned to any typing category")]
    MalformedTyping { typing: String },
    #[error("unable to convert {code} at locus {locus} (tried nomenclature versions: {versions})")]
    ConversionFailure {
        locus: Locus,
        code: String,
        versions: String,
    },
    #[error("no haplotype frequency set available for population {population_id} and nomenclature version {nomenclature_version}: {reason}")]
    FrequencySetUnavailable {
        population_id: String,
        nomenclature_version: String,
        reason: String,
    },
    #[error("invalid haplotype frequency set for population {population_id} and nomenclature version {nomenclature_version}: {msg}")]
    InvalidFrequencySet {
        population_id: String,
        nomenclature_version: String,
        msg: String,
    },
    #[error("{subject} phenotype expands to {candidates} candidate genotypes, exceeding the configured maximum of {max}")]
    ExpansionTooLarge {
        subject: Subject,
        candidates: usize,
        max: usize,
    },
    #[error("{candidates} patient/donor genotype pairs exceed the configured maximum of {max}")]
    TooManyGenotypePairs { candidates: usize, max: usize },
    #[error("{subject} phenotype does not expand to any candidate genotype: a required locus is missing, malformed or cannot be converted")]
    NoCandidateGenotypes { subject: Subject },
    #[error("likelihoods of all represented {subject} candidate genotypes underflow to zero")]
    LikelihoodUnderflow { subject: Subject },
    #[error("calculation exceeded the time limit of {limit_ms}ms")]
    Timeout { limit_ms: u64 },
    #[error("invalid locus name '{name}'")]
    InvalidLocus { name: String },
}

pub(crate) fn frequency_set_unavailable(
    population_id: &str,
    nomenclature_version: &str,
    reason: &str,
) -> Error {
    Error::FrequencySetUnavailable {
        population_id: population_id.to_owned(),
        nomenclature_version: nomenclature_version.to_owned(),
        reason: reason.to_owned(),
    }
}
