//! Federative unit (UF) codes
//!
//! The remote lookup page only accepts the 27 codes below: one per state
//! plus the federal district. Matching is exact and case-sensitive.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Maximum number of regions accepted in a single request
pub const MAX_REGIONS: usize = 5;

/// A validated region code
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    AC,
    AL,
    AP,
    AM,
    BA,
    CE,
    DF,
    ES,
    GO,
    MA,
    MT,
    MS,
    MG,
    PA,
    PB,
    PR,
    PE,
    PI,
    RJ,
    RN,
    RS,
    RO,
    RR,
    SC,
    SP,
    SE,
    TO,
}

impl Region {
    /// Every valid region, in declaration order
    pub const ALL: [Region; 27] = [
        Region::AC,
        Region::AL,
        Region::AP,
        Region::AM,
        Region::BA,
        Region::CE,
        Region::DF,
        Region::ES,
        Region::GO,
        Region::MA,
        Region::MT,
        Region::MS,
        Region::MG,
        Region::PA,
        Region::PB,
        Region::PR,
        Region::PE,
        Region::PI,
        Region::RJ,
        Region::RN,
        Region::RS,
        Region::RO,
        Region::RR,
        Region::SC,
        Region::SP,
        Region::SE,
        Region::TO,
    ];

    /// The two-letter code used by the remote form
    pub const fn as_str(self) -> &'static str {
        match self {
            Region::AC => "AC",
            Region::AL => "AL",
            Region::AP => "AP",
            Region::AM => "AM",
            Region::BA => "BA",
            Region::CE => "CE",
            Region::DF => "DF",
            Region::ES => "ES",
            Region::GO => "GO",
            Region::MA => "MA",
            Region::MT => "MT",
            Region::MS => "MS",
            Region::MG => "MG",
            Region::PA => "PA",
            Region::PB => "PB",
            Region::PR => "PR",
            Region::PE => "PE",
            Region::PI => "PI",
            Region::RJ => "RJ",
            Region::RN => "RN",
            Region::RS => "RS",
            Region::RO => "RO",
            Region::RR => "RR",
            Region::SC => "SC",
            Region::SP => "SP",
            Region::SE => "SE",
            Region::TO => "TO",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = Error;

    fn from_str(code: &str) -> Result<Self> {
        Region::ALL
            .iter()
            .copied()
            .find(|region| region.as_str() == code)
            .ok_or_else(|| Error::InvalidRegion(code.to_string()))
    }
}

/// Check a (already trimmed) code against the fixed set of regions
pub fn is_valid_region(code: &str) -> bool {
    code.parse::<Region>().is_ok()
}
