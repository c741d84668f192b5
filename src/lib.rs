// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Estimation of HLA mismatch probabilities between a patient and a donor.
//!
//! Ambiguous typings are expanded into candidate genotypes, each candidate is weighted by its
//! likelihood under a two-haplotype population model, and the weighted patient and donor
//! candidates are cross-compared to obtain the probability of 0, 1 or 2 mismatches per locus
//! and in aggregate.

#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate derive_new;
#[macro_use]
extern crate getset;
#[macro_use]
extern crate derefable;
#[cfg(test)]
#[macro_use]
extern crate approx;

pub mod calculation;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod frequencies;
pub mod loci;
pub mod phenotype;
pub mod typing;
pub(crate) mod utils;

pub use crate::calculation::batch::{calculate_batch, PairOutcome};
pub use crate::calculation::match_probability::{
    DonorTyping, MatchProbabilityCalculator, MatchProbabilityCalculatorBuilder,
    MatchProbabilityInput,
};
pub use crate::calculation::result::{MatchProbabilityResult, MismatchDistribution, Probability};
pub use crate::config::CalculatorConfig;
pub use crate::errors::{Error, Subject};
pub use crate::loci::{LociInfo, Locus, LocusInfo};
pub use crate::phenotype::{AllelePair, Genotype, Phenotype};
