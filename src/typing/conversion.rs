// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use itertools::Itertools;

use crate::errors::Error;
use crate::loci::Locus;
use crate::typing::category::{ClassifiedTyping, TypingCategory};

/// Nomenclature service resolving ambiguous codes (MAC, XX codes, G/P groups, serology) to
/// the allele names they stand for.
pub trait HlaConverter: Send + Sync {
    fn convert_ambiguous_code(
        &self,
        category: TypingCategory,
        locus: Locus,
        code: &str,
        nomenclature_version: &str,
    ) -> Result<Vec<String>>;
}

/// One way of resolving a code: a converter queried at a given nomenclature version.
#[derive(Clone, new, Getters)]
pub struct LookupStrategy {
    #[getset(get = "pub")]
    label: String,
    converter: Arc<dyn HlaConverter>,
    #[getset(get = "pub")]
    nomenclature_version: String,
}

impl fmt::Debug for LookupStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LookupStrategy")
            .field("label", &self.label)
            .field("nomenclature_version", &self.nomenclature_version)
            .finish()
    }
}

/// Ordered list of lookup strategies. Strategies are tried in sequence until one of them
/// yields alleles; every failure is logged before falling through to the next one.
#[derive(Debug, Clone, Default)]
pub struct ConversionChain {
    strategies: Vec<LookupStrategy>,
}

impl ConversionChain {
    pub fn new(strategies: Vec<LookupStrategy>) -> Self {
        ConversionChain { strategies }
    }

    /// Query the given converter at the primary version first, then at each fallback version.
    pub fn with_fallbacks(
        converter: Arc<dyn HlaConverter>,
        primary_version: &str,
        fallback_versions: &[String],
    ) -> Self {
        let mut strategies = vec![LookupStrategy::new(
            "primary".to_owned(),
            Arc::clone(&converter),
            primary_version.to_owned(),
        )];
        strategies.extend(
            fallback_versions
                .iter()
                .filter(|version| version.as_str() != primary_version)
                .map(|version| {
                    LookupStrategy::new(
                        format!("fallback {}", version),
                        Arc::clone(&converter),
                        version.clone(),
                    )
                }),
        );
        ConversionChain { strategies }
    }

    pub fn strategies(&self) -> &[LookupStrategy] {
        &self.strategies
    }

    pub fn resolve(&self, locus: Locus, typing: &ClassifiedTyping) -> Result<Vec<String>, Error> {
        let category = typing.category();
        let code = typing.code();
        for strategy in &self.strategies {
            match strategy.converter.convert_ambiguous_code(
                category,
                locus,
                &code,
                &strategy.nomenclature_version,
            ) {
                Ok(alleles) if !alleles.is_empty() => {
                    debug!(
                        "{} {} at locus {} resolved to {} alleles via {} (nomenclature {})",
                        category,
                        code,
                        locus,
                        alleles.len(),
                        strategy.label,
                        strategy.nomenclature_version
                    );
                    return Ok(alleles);
                }
                Ok(_) => warn!(
                    "{} {} at locus {} resolved to no alleles via {} (nomenclature {})",
                    category, code, locus, strategy.label, strategy.nomenclature_version
                ),
                Err(e) => warn!(
                    "failed to convert {} {} at locus {} via {} (nomenclature {}): {}",
                    category, code, locus, strategy.label, strategy.nomenclature_version, e
                ),
            }
        }

        Err(Error::ConversionFailure {
            locus,
            code,
            versions: self
                .strategies
                .iter()
                .map(|strategy| strategy.nomenclature_version.as_str())
                .join(", "),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::anyhow;

    /// Knows `01:AB` only in version 3.40.0 and counts its invocations.
    #[derive(Default)]
    struct VersionedConverter {
        calls: AtomicUsize,
    }

    impl HlaConverter for VersionedConverter {
        fn convert_ambiguous_code(
            &self,
            _category: TypingCategory,
            _locus: Locus,
            code: &str,
            nomenclature_version: &str,
        ) -> Result<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match (code, nomenclature_version) {
                ("01:AB", "3.40.0") => Ok(vec!["01:01".to_owned(), "01:02".to_owned()]),
                ("01:EMPTY", _) => Ok(Vec::new()),
                _ => Err(anyhow!("unknown code {}", code)),
            }
        }
    }

    fn nmdp(code: &str) -> ClassifiedTyping {
        ClassifiedTyping::NmdpCode {
            family: "01".to_owned(),
            code: code.to_owned(),
        }
    }

    #[test]
    fn test_fallback_to_secondary_version() {
        let converter = Arc::new(VersionedConverter::default());
        let chain = ConversionChain::with_fallbacks(
            converter.clone(),
            "3.50.0",
            &["3.40.0".to_owned()],
        );
        assert_eq!(chain.strategies().len(), 2);
        let alleles = chain.resolve(Locus::A, &nmdp("AB")).unwrap();
        assert_eq!(alleles, vec!["01:01", "01:02"]);
        assert_eq!(converter.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_stop_at_first_success() {
        let converter = Arc::new(VersionedConverter::default());
        let chain = ConversionChain::with_fallbacks(
            converter.clone(),
            "3.40.0",
            &["3.50.0".to_owned(), "3.40.0".to_owned()],
        );
        // the duplicate of the primary version is not queried twice
        assert_eq!(chain.strategies().len(), 2);
        chain.resolve(Locus::A, &nmdp("AB")).unwrap();
        assert_eq!(converter.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_all_strategies_failing() {
        let chain = ConversionChain::with_fallbacks(
            Arc::new(VersionedConverter::default()),
            "3.50.0",
            &["3.40.0".to_owned()],
        );
        assert_eq!(
            chain.resolve(Locus::B, &nmdp("EMPTY")),
            Err(Error::ConversionFailure {
                locus: Locus::B,
                code: "01:EMPTY".to_owned(),
                versions: "3.50.0, 3.40.0".to_owned(),
            })
        );
    }
}
