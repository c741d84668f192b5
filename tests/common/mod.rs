use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use serde_derive::Deserialize;

use hla_match_prob::frequencies::{CsvFrequencySetRepository, FrequencyIndexCache};
use hla_match_prob::typing::NomenclatureTables;
use hla_match_prob::{
    CalculatorConfig, Error, Locus, MatchProbabilityCalculatorBuilder, MatchProbabilityInput,
    MatchProbabilityResult, MismatchDistribution,
};

pub(crate) fn resources() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/resources")
}

pub(crate) fn nomenclature() -> NomenclatureTables {
    NomenclatureTables::from_path(resources().join("nomenclature.json"))
        .expect("Failed to load nomenclature tables")
}

pub(crate) fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub(crate) fn load_testcase(path: impl AsRef<Path>) -> Result<Testcase> {
    let reader = File::open(path.as_ref().join("testcase.yaml"))?;
    Ok(serde_yaml::from_reader(reader)?)
}

#[derive(Debug, Deserialize)]
pub(crate) struct Testcase {
    #[serde(default)]
    pub(crate) config: CalculatorConfig,
    pub(crate) input: MatchProbabilityInput,
    #[serde(default)]
    expected: Option<Expected>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Expected {
    #[serde(default)]
    patient_unrepresented: bool,
    #[serde(default)]
    donor_unrepresented: bool,
    patient_genotype_count: Option<usize>,
    donor_genotype_count: Option<usize>,
    aggregate: Option<[f64; 3]>,
    #[serde(default)]
    loci: BTreeMap<Locus, [f64; 3]>,
}

impl Testcase {
    pub(crate) fn run(&self) -> Result<Result<MatchProbabilityResult, Error>> {
        let repository = CsvFrequencySetRepository::new(resources().join("frequencies"));
        let cache = FrequencyIndexCache::build(&repository, self.input.required_frequency_sets());
        let calculator = MatchProbabilityCalculatorBuilder::default()
            .frequencies(&cache)
            .converter(Arc::new(nomenclature()))
            .config(self.config.clone())
            .build()?;
        Ok(calculator.calculate(&self.input))
    }

    pub(crate) fn check(&self, outcome: &Result<MatchProbabilityResult, Error>) {
        match (&self.error, outcome) {
            (Some(expected), Err(e)) => assert!(
                e.to_string().contains(expected.as_str()),
                "unexpected error: {}",
                e
            ),
            (Some(expected), Ok(result)) => {
                panic!("expected error '{}', got {:?}", expected, result)
            }
            (None, Err(e)) => panic!("unexpected error: {}", e),
            (None, Ok(result)) => self
                .expected
                .as_ref()
                .expect("testcase has neither expected result nor error")
                .check(result),
        }
    }
}

fn check_distribution(locus: &str, observed: &MismatchDistribution, expected: &[f64; 3]) {
    for (count, expected) in expected.iter().enumerate() {
        let observed = observed.mismatches(count).unwrap();
        assert!(
            relative_eq!(*observed, *expected, epsilon = 1e-9),
            "{}: P({} mismatches) is {}, expected {}",
            locus,
            count,
            observed,
            expected
        );
    }
}

impl Expected {
    fn check(&self, result: &MatchProbabilityResult) {
        assert_eq!(
            result.is_patient_phenotype_unrepresented(),
            self.patient_unrepresented
        );
        assert_eq!(
            result.is_donor_phenotype_unrepresented(),
            self.donor_unrepresented
        );
        if let Some(count) = self.patient_genotype_count {
            assert_eq!(result.patient_genotype_count(), count);
        }
        if let Some(count) = self.donor_genotype_count {
            assert_eq!(result.donor_genotype_count(), count);
        }

        match (&self.aggregate, result.aggregate()) {
            (Some(expected), Some(observed)) => {
                check_distribution("aggregate", &observed, expected)
            }
            (None, None) => (),
            (expected, observed) => panic!(
                "aggregate: expected {:?}, got {:?}",
                expected, observed
            ),
        }

        for locus in &[Locus::A, Locus::B, Locus::C, Locus::Dpb1, Locus::Dqb1, Locus::Drb1] {
            match (self.loci.get(locus), result.locus(*locus)) {
                (Some(expected), Some(observed)) => {
                    check_distribution(&locus.to_string(), observed, expected)
                }
                (None, None) => (),
                (expected, observed) => panic!(
                    "{}: expected {:?}, got {:?}",
                    locus, expected, observed
                ),
            }
        }
    }
}
