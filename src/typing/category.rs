// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use itertools::Itertools;
use regex::Regex;
use strum_macros::{Display, EnumIter, IntoStaticStr};

use crate::errors::Error;

lazy_static! {
    static ref LOCUS_PREFIX_RE: Regex =
        Regex::new(r"^(?:HLA-)?(?:A|B|C|DPB1|DQB1|DRB1)?\*").unwrap();
    static ref ALLELE_RE: Regex =
        Regex::new(r"^(?P<family>\d+)(?P<rest>(?::\d+){1,3})(?P<suffix>[NLSQAC])?$").unwrap();
    static ref XX_CODE_RE: Regex = Regex::new(r"^(?P<family>\d+):XX$").unwrap();
    static ref NMDP_CODE_RE: Regex = Regex::new(r"^(?P<family>\d+):(?P<code>[A-Z]{2,})$").unwrap();
    static ref G_GROUP_RE: Regex = Regex::new(r"^\d+(?::\d+){1,3}G$").unwrap();
    static ref P_GROUP_RE: Regex = Regex::new(r"^\d+:\d+P$").unwrap();
    static ref SEROLOGY_RE: Regex = Regex::new(r"^\d+$").unwrap();
    static ref SUBTYPE_RE: Regex = Regex::new(r"^\d+$").unwrap();
}

/// Ambiguity category of a raw typing.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    IntoStaticStr,
)]
pub enum TypingCategory {
    SingleAllele,
    TwoFieldAllele,
    ThreeOrFourFieldAllele,
    AlleleNameList,
    AlleleSubtypeList,
    NmdpCode,
    XxCode,
    GGroup,
    PGroup,
    Serology,
    Unrepresented,
}

impl TypingCategory {
    /// Whether members of this category can only be resolved with nomenclature data.
    pub fn requires_conversion(self) -> bool {
        matches!(
            self,
            TypingCategory::NmdpCode
                | TypingCategory::XxCode
                | TypingCategory::GGroup
                | TypingCategory::PGroup
                | TypingCategory::Serology
        )
    }
}

/// A classified typing together with everything needed to expand it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifiedTyping {
    /// Allele carrying an expression suffix, e.g. `01:01:01:02N`.
    SingleAllele { name: String, suffix: char },
    TwoFieldAllele { family: String, subtype: String },
    ThreeOrFourFieldAllele { name: String, fields: usize },
    AlleleNameList { alleles: Vec<String> },
    /// E.g. `01:01/02/03`, denoting `01:01`, `01:02` and `01:03`.
    AlleleSubtypeList { family: String, subtypes: Vec<String> },
    NmdpCode { family: String, code: String },
    XxCode { family: String },
    GGroup { name: String },
    PGroup { name: String },
    Serology { antigen: String },
    Unrepresented { typing: String },
}

impl ClassifiedTyping {
    pub fn category(&self) -> TypingCategory {
        match self {
            ClassifiedTyping::SingleAllele { .. } => TypingCategory::SingleAllele,
            ClassifiedTyping::TwoFieldAllele { .. } => TypingCategory::TwoFieldAllele,
            ClassifiedTyping::ThreeOrFourFieldAllele { .. } => {
                TypingCategory::ThreeOrFourFieldAllele
            }
            ClassifiedTyping::AlleleNameList { .. } => TypingCategory::AlleleNameList,
            ClassifiedTyping::AlleleSubtypeList { .. } => TypingCategory::AlleleSubtypeList,
            ClassifiedTyping::NmdpCode { .. } => TypingCategory::NmdpCode,
            ClassifiedTyping::XxCode { .. } => TypingCategory::XxCode,
            ClassifiedTyping::GGroup { .. } => TypingCategory::GGroup,
            ClassifiedTyping::PGroup { .. } => TypingCategory::PGroup,
            ClassifiedTyping::Serology { .. } => TypingCategory::Serology,
            ClassifiedTyping::Unrepresented { .. } => TypingCategory::Unrepresented,
        }
    }

    /// Normalized typing string (without locus prefix), as handed to the conversion service.
    pub fn code(&self) -> String {
        match self {
            ClassifiedTyping::SingleAllele { name, suffix } => format!("{}{}", name, suffix),
            ClassifiedTyping::TwoFieldAllele { family, subtype } => {
                format!("{}:{}", family, subtype)
            }
            ClassifiedTyping::ThreeOrFourFieldAllele { name, .. } => name.clone(),
            ClassifiedTyping::AlleleNameList { alleles } => alleles.join("/"),
            ClassifiedTyping::AlleleSubtypeList { family, subtypes } => {
                format!("{}:{}", family, subtypes.join("/"))
            }
            ClassifiedTyping::NmdpCode { family, code } => format!("{}:{}", family, code),
            ClassifiedTyping::XxCode { family } => format!("{}:XX", family),
            ClassifiedTyping::GGroup { name } | ClassifiedTyping::PGroup { name } => name.clone(),
            ClassifiedTyping::Serology { antigen } => antigen.clone(),
            ClassifiedTyping::Unrepresented { typing } => typing.clone(),
        }
    }

    /// Alleles this typing resolves to without nomenclature data, `None` if it needs
    /// conversion.
    pub fn local_alleles(&self) -> Option<Vec<String>> {
        match self {
            ClassifiedTyping::SingleAllele { .. }
            | ClassifiedTyping::TwoFieldAllele { .. }
            | ClassifiedTyping::ThreeOrFourFieldAllele { .. } => Some(vec![self.code()]),
            ClassifiedTyping::AlleleNameList { alleles } => Some(alleles.clone()),
            ClassifiedTyping::AlleleSubtypeList { family, subtypes } => Some(
                subtypes
                    .iter()
                    .map(|subtype| format!("{}:{}", family, subtype))
                    .collect(),
            ),
            ClassifiedTyping::Unrepresented { .. } => Some(Vec::new()),
            ClassifiedTyping::NmdpCode { .. }
            | ClassifiedTyping::XxCode { .. }
            | ClassifiedTyping::GGroup { .. }
            | ClassifiedTyping::PGroup { .. }
            | ClassifiedTyping::Serology { .. } => None,
        }
    }
}

fn strip_locus_prefix(typing: &str) -> &str {
    match LOCUS_PREFIX_RE.find(typing) {
        Some(m) => &typing[m.end()..],
        None => typing,
    }
}

fn malformed(typing: &str) -> Error {
    Error::MalformedTyping {
        typing: typing.to_owned(),
    }
}

fn classify_allele(typing: &str) -> Option<ClassifiedTyping> {
    let caps = ALLELE_RE.captures(typing)?;
    let family = caps["family"].to_owned();
    let rest = &caps["rest"];
    let fields = 1 + rest.matches(':').count();

    Some(match caps.name("suffix") {
        Some(suffix) => ClassifiedTyping::SingleAllele {
            name: typing[..typing.len() - 1].to_owned(),
            suffix: suffix.as_str().chars().next()?,
        },
        None if fields == 2 => ClassifiedTyping::TwoFieldAllele {
            family,
            subtype: rest[1..].to_owned(),
        },
        None => ClassifiedTyping::ThreeOrFourFieldAllele {
            name: typing.to_owned(),
            fields,
        },
    })
}

fn classify_list(typing: &str) -> Result<ClassifiedTyping, Error> {
    let members = typing
        .split('/')
        .map(|member| strip_locus_prefix(member.trim()))
        .collect_vec();
    if members.iter().any(|member| member.is_empty()) {
        return Err(malformed(typing));
    }

    if members.iter().all(|member| ALLELE_RE.is_match(member)) {
        return Ok(ClassifiedTyping::AlleleNameList {
            alleles: members.iter().map(|member| (*member).to_owned()).collect(),
        });
    }

    match classify_allele(members[0]) {
        Some(ClassifiedTyping::TwoFieldAllele { family, subtype })
            if members[1..].iter().all(|member| SUBTYPE_RE.is_match(member)) =>
        {
            let mut subtypes = vec![subtype];
            subtypes.extend(members[1..].iter().map(|member| (*member).to_owned()));
            Ok(ClassifiedTyping::AlleleSubtypeList { family, subtypes })
        }
        _ => Err(malformed(typing)),
    }
}

/// Assign a raw typing string to its ambiguity category.
///
/// Classification is purely lexical. Any `HLA-<locus>*`, `<locus>*` or `*` prefix is ignored.
pub fn classify(typing: &str) -> Result<ClassifiedTyping, Error> {
    let trimmed = typing.trim();
    let stripped = strip_locus_prefix(trimmed);
    if stripped.is_empty() {
        return Err(malformed(typing));
    }

    if stripped.eq_ignore_ascii_case("NEW") {
        return Ok(ClassifiedTyping::Unrepresented {
            typing: stripped.to_owned(),
        });
    }
    if stripped.contains('/') {
        return classify_list(stripped);
    }
    if let Some(caps) = XX_CODE_RE.captures(stripped) {
        return Ok(ClassifiedTyping::XxCode {
            family: caps["family"].to_owned(),
        });
    }
    if let Some(caps) = NMDP_CODE_RE.captures(stripped) {
        return Ok(ClassifiedTyping::NmdpCode {
            family: caps["family"].to_owned(),
            code: caps["code"].to_owned(),
        });
    }
    if G_GROUP_RE.is_match(stripped) {
        return Ok(ClassifiedTyping::GGroup {
            name: stripped.to_owned(),
        });
    }
    if P_GROUP_RE.is_match(stripped) {
        return Ok(ClassifiedTyping::PGroup {
            name: stripped.to_owned(),
        });
    }
    if SEROLOGY_RE.is_match(stripped) {
        return Ok(ClassifiedTyping::Serology {
            antigen: stripped.to_owned(),
        });
    }

    classify_allele(stripped).ok_or_else(|| malformed(typing))
}
