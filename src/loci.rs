// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::str::FromStr;

use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::errors::Error;

/// HLA locus.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Locus {
    A,
    B,
    C,
    Dpb1,
    Dqb1,
    Drb1,
}

impl Locus {
    /// Loci that take part in haplotype frequencies and match probability calculation.
    /// DPB1 is never calculated.
    pub const CALCULATED: [Locus; 5] = [Locus::A, Locus::B, Locus::C, Locus::Dqb1, Locus::Drb1];

    /// Loci that have to be typed for a phenotype to be expandable.
    pub const REQUIRED: [Locus; 3] = [Locus::A, Locus::B, Locus::Drb1];

    /// Owned iterator over the calculated loci, in enumeration order.
    pub fn calculated() -> impl Iterator<Item = Locus> {
        Locus::iter().filter(|locus| locus.is_calculated())
    }

    pub fn is_calculated(self) -> bool {
        self != Locus::Dpb1
    }

    pub fn is_required(self) -> bool {
        Self::REQUIRED.contains(&self)
    }

    /// Loci for which frequency lookups fall back to sets marginalised over the locus when
    /// it is untyped.
    pub fn may_be_untyped(self) -> bool {
        matches!(self, Locus::C | Locus::Dqb1)
    }

    pub fn parse(name: &str) -> Result<Self, Error> {
        Locus::from_str(name.trim()).map_err(|_| Error::InvalidLocus {
            name: name.to_owned(),
        })
    }
}

/// One value per locus.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct LociInfo<T> {
    #[serde(default)]
    pub a: T,
    #[serde(default)]
    pub b: T,
    #[serde(default)]
    pub c: T,
    #[serde(default)]
    pub dpb1: T,
    #[serde(default)]
    pub dqb1: T,
    #[serde(default)]
    pub drb1: T,
}

impl<T> LociInfo<T> {
    pub fn from_fn<F: FnMut(Locus) -> T>(mut f: F) -> Self {
        LociInfo {
            a: f(Locus::A),
            b: f(Locus::B),
            c: f(Locus::C),
            dpb1: f(Locus::Dpb1),
            dqb1: f(Locus::Dqb1),
            drb1: f(Locus::Drb1),
        }
    }

    pub fn get(&self, locus: Locus) -> &T {
        match locus {
            Locus::A => &self.a,
            Locus::B => &self.b,
            Locus::C => &self.c,
            Locus::Dpb1 => &self.dpb1,
            Locus::Dqb1 => &self.dqb1,
            Locus::Drb1 => &self.drb1,
        }
    }

    pub fn get_mut(&mut self, locus: Locus) -> &mut T {
        match locus {
            Locus::A => &mut self.a,
            Locus::B => &mut self.b,
            Locus::C => &mut self.c,
            Locus::Dpb1 => &mut self.dpb1,
            Locus::Dqb1 => &mut self.dqb1,
            Locus::Drb1 => &mut self.drb1,
        }
    }

    pub fn set(&mut self, locus: Locus, value: T) {
        *self.get_mut(locus) = value;
    }

    pub fn map<U, F: FnMut(Locus, &T) -> U>(&self, mut f: F) -> LociInfo<U> {
        LociInfo::from_fn(|locus| f(locus, self.get(locus)))
    }

    /// Iterate over all loci in enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = (Locus, &T)> + '_ {
        Locus::iter().map(move |locus| (locus, self.get(locus)))
    }
}

/// The two positions of a locus. The order carries no biological meaning but is kept
/// through all transformations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize, new)]
pub struct LocusInfo<T> {
    pub position_1: T,
    pub position_2: T,
}

impl<T> LocusInfo<T> {
    pub fn map<U, F: FnMut(&T) -> U>(&self, mut f: F) -> LocusInfo<U> {
        LocusInfo {
            position_1: f(&self.position_1),
            position_2: f(&self.position_2),
        }
    }

    pub fn positions(&self) -> [&T; 2] {
        [&self.position_1, &self.position_2]
    }
}

impl<T: PartialEq> LocusInfo<T> {
    pub fn is_homozygous(&self) -> bool {
        self.position_1 == self.position_2
    }

    /// Whether both loci carry the same unordered pair of values.
    pub fn unordered_eq(&self, other: &Self) -> bool {
        (self.position_1 == other.position_1 && self.position_2 == other.position_2)
            || (self.position_1 == other.position_2 && self.position_2 == other.position_1)
    }

    /// Number of mismatches (0, 1 or 2) between two unordered pairs, compared as multisets.
    pub fn mismatch_count(&self, other: &Self) -> u8 {
        if self.unordered_eq(other) {
            0
        } else if other.positions().contains(&&self.position_1)
            || other.positions().contains(&&self.position_2)
        {
            1
        } else {
            2
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(a: &str, b: &str) -> LocusInfo<String> {
        LocusInfo::new(a.to_owned(), b.to_owned())
    }

    #[test]
    fn test_locus_parse() {
        assert_eq!(Locus::parse("dqb1").unwrap(), Locus::Dqb1);
        assert_eq!(Locus::parse("DRB1").unwrap(), Locus::Drb1);
        assert_eq!(Locus::Dqb1.to_string(), "DQB1");
        assert!(Locus::parse("DRB3").is_err());
    }

    #[test]
    fn test_mismatch_count() {
        assert_eq!(pair("01:01", "02:01").mismatch_count(&pair("02:01", "01:01")), 0);
        assert_eq!(pair("01:01", "02:01").mismatch_count(&pair("01:01", "03:01")), 1);
        assert_eq!(pair("01:01", "02:01").mismatch_count(&pair("03:01", "24:02")), 2);
        // shared allele is counted once for homozygous pairs
        assert_eq!(pair("01:01", "01:01").mismatch_count(&pair("01:01", "02:01")), 1);
        assert_eq!(pair("01:01", "02:01").mismatch_count(&pair("01:01", "01:01")), 1);
    }

    #[test]
    fn test_loci_info_roundtrip_keys() {
        let mut info: LociInfo<Option<u8>> = LociInfo::default();
        info.set(Locus::Dqb1, Some(3));
        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("\"DQB1\":3"));
        let parsed: LociInfo<Option<u8>> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, info);
    }
}
