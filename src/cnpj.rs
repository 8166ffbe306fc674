//! CNPJ cleaning, formatting and checksum validation
//!
//! A CNPJ is the 14-digit Brazilian company registry number. The last two
//! digits are mod-11 check digits computed over the preceding ones.

use serde::{Serialize, Serializer};

use crate::error::{Result, SearchError};

const CNPJ_LEN: usize = 14;
const FIRST_WEIGHTS: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
const SECOND_WEIGHTS: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

/// Removes every non-digit character
pub fn clean(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Formats as `NN.NNN.NNN/NNNN-NN`
///
/// Input that does not clean to exactly 14 digits is returned cleaned but
/// otherwise untouched.
pub fn format(raw: &str) -> String {
    let digits = clean(raw);
    if digits.len() != CNPJ_LEN {
        return digits;
    }
    format!(
        "{}.{}.{}/{}-{}",
        &digits[0..2],
        &digits[2..5],
        &digits[5..8],
        &digits[8..12],
        &digits[12..14]
    )
}

/// Validates length, rejects repeated digits and checks both check digits
pub fn validate(raw: &str) -> bool {
    let digits: Vec<u32> = clean(raw).chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() != CNPJ_LEN {
        return false;
    }
    if digits.iter().all(|d| *d == digits[0]) {
        return false;
    }

    check_digit(&digits[..12], &FIRST_WEIGHTS) == digits[12]
        && check_digit(&digits[..13], &SECOND_WEIGHTS) == digits[13]
}

fn check_digit(digits: &[u32], weights: &[u32]) -> u32 {
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    let rem = sum % 11;
    if rem < 2 {
        0
    } else {
        11 - rem
    }
}

/// A checksum-validated CNPJ
///
/// Holds the cleaned digits. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cnpj {
    digits: String,
}

impl Cnpj {
    pub fn parse(raw: &str) -> Result<Self> {
        if !validate(raw) {
            return Err(SearchError::InvalidIdentifier(raw.to_string()));
        }
        Ok(Self {
            digits: clean(raw),
        })
    }

    /// Digits only, e.g. `08049394000184`
    pub fn digits(&self) -> &str {
        &self.digits
    }

    /// Punctuated form, e.g. `08.049.394/0001-84`
    pub fn formatted(&self) -> String {
        format(&self.digits)
    }
}

impl std::fmt::Display for Cnpj {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.formatted())
    }
}

impl std::str::FromStr for Cnpj {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Cnpj {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.formatted())
    }
}
