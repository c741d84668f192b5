// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

pub mod batch;
pub mod likelihood;
pub mod match_probability;
pub mod result;

pub use likelihood::{GenotypeLikelihoodCalculator, WeightedGenotype};
