// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

// Upper bound of candidate genotypes a single phenotype may expand to before the calculation
// is refused.
pub const DEFAULT_MAX_GENOTYPES_PER_SUBJECT: usize = 250_000;

// Upper bound of represented patient x donor genotype pairs that are accumulated.
pub const DEFAULT_MAX_GENOTYPE_PAIRS: usize = 50_000_000;

// Frequencies are accepted with this tolerance above 1.0 before a set is considered invalid.
pub const FREQUENCY_TOLERANCE: f64 = 1e-9;

// The deadline of a pair is checked after this many accumulated genotype pairs.
pub const DEADLINE_CHECK_INTERVAL: usize = 4096;

pub const DEFAULT_THREADS: usize = 1;
