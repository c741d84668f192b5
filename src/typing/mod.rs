// Copyright 2020 Johannes Köster.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

//! Classification of raw typings and resolution of ambiguous codes.

pub mod category;
pub mod conversion;
pub mod nomenclature;

pub use category::{classify, ClassifiedTyping, TypingCategory};
pub use conversion::{ConversionChain, HlaConverter, LookupStrategy};
pub use nomenclature::{NomenclatureRelease, NomenclatureTables};
