// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use itertools::Itertools;

use crate::loci::Locus;
use crate::typing::category::TypingCategory;
use crate::typing::conversion::HlaConverter;

/// Lookup tables of a single nomenclature release.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NomenclatureRelease {
    /// Allele names per locus (keyed by locus name), used to resolve XX codes.
    #[serde(default)]
    pub alleles: BTreeMap<String, Vec<String>>,
    /// Explicit members of MAC codes, G groups, P groups and serological antigens, per
    /// locus name and code.
    #[serde(default)]
    pub codes: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

/// File based nomenclature service, keyed by nomenclature version.
///
/// ```json
/// {"releases": {"3.50.0": {"alleles": {"A": ["01:01", "01:02"]},
///                          "codes": {"A": {"01:AB": ["01:01", "01:02"]}}}}}
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NomenclatureTables {
    #[serde(default)]
    releases: BTreeMap<String, NomenclatureRelease>,
}

impl NomenclatureTables {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path.as_ref()).with_context(|| {
            format!(
                "unable to open nomenclature tables {}",
                path.as_ref().display()
            )
        })?);
        Ok(serde_json::from_reader(reader).with_context(|| {
            format!(
                "invalid nomenclature tables in {}",
                path.as_ref().display()
            )
        })?)
    }

    pub fn insert_release(&mut self, nomenclature_version: &str, release: NomenclatureRelease) {
        self.releases.insert(nomenclature_version.to_owned(), release);
    }

    fn release(&self, nomenclature_version: &str) -> Result<&NomenclatureRelease> {
        self.releases
            .get(nomenclature_version)
            .ok_or_else(|| anyhow!("unknown nomenclature version {}", nomenclature_version))
    }
}

impl NomenclatureRelease {
    fn xx_code_members(&self, locus: Locus, code: &str) -> Result<Vec<String>> {
        let family = code
            .strip_suffix(":XX")
            .ok_or_else(|| anyhow!("{} is not an XX code", code))?;
        let alleles = self
            .alleles
            .get(locus.to_string().as_str())
            .ok_or_else(|| anyhow!("no alleles known for locus {}", locus))?;
        Ok(alleles
            .iter()
            .filter(|allele| allele.split(':').next() == Some(family))
            .cloned()
            .unique()
            .collect())
    }
}

impl HlaConverter for NomenclatureTables {
    fn convert_ambiguous_code(
        &self,
        category: TypingCategory,
        locus: Locus,
        code: &str,
        nomenclature_version: &str,
    ) -> Result<Vec<String>> {
        let release = self.release(nomenclature_version)?;
        if category == TypingCategory::XxCode {
            return release.xx_code_members(locus, code);
        }
        release
            .codes
            .get(locus.to_string().as_str())
            .and_then(|codes| codes.get(code))
            .cloned()
            .ok_or_else(|| {
                anyhow!(
                    "unknown {} {} at locus {} in nomenclature version {}",
                    category,
                    code,
                    locus,
                    nomenclature_version
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> NomenclatureTables {
        serde_json::from_str(
            r#"{"releases": {"3.50.0": {
                "alleles": {"A": ["01:01", "01:02", "02:01", "01:01"]},
                "codes": {"A": {"01:AB": ["01:01", "01:02"], "1": ["01:01"]}}
            }}}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_xx_code() {
        let alleles = tables()
            .convert_ambiguous_code(TypingCategory::XxCode, Locus::A, "01:XX", "3.50.0")
            .unwrap();
        assert_eq!(alleles, vec!["01:01", "01:02"]);
    }

    #[test]
    fn test_explicit_codes() {
        let tables = tables();
        assert_eq!(
            tables
                .convert_ambiguous_code(TypingCategory::NmdpCode, Locus::A, "01:AB", "3.50.0")
                .unwrap(),
            vec!["01:01", "01:02"]
        );
        assert_eq!(
            tables
                .convert_ambiguous_code(TypingCategory::Serology, Locus::A, "1", "3.50.0")
                .unwrap(),
            vec!["01:01"]
        );
    }

    #[test]
    fn test_unknown_lookups() {
        let tables = tables();
        assert!(tables
            .convert_ambiguous_code(TypingCategory::NmdpCode, Locus::A, "01:CD", "3.50.0")
            .is_err());
        assert!(tables
            .convert_ambiguous_code(TypingCategory::NmdpCode, Locus::A, "01:AB", "3.40.0")
            .is_err());
        assert!(tables
            .convert_ambiguous_code(TypingCategory::XxCode, Locus::B, "08:XX", "3.50.0")
            .is_err());
    }
}
