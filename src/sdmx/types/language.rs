//! Language priority lists in the `Accept-Language` syntax.

use std::fmt;
use std::str::FromStr;

use super::error::{Result, SdmxError};

pub const ANY_RANGE: &str = "*";

/// A language range with its weight (`q` value).
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageRange {
    /// Lowercased range, e.g. `fr-be` or `*`.
    pub range: String,
    pub weight: f64,
}

/// Ordered, weighted language ranges, highest weight first.
#[derive(Debug, Clone, PartialEq)]
pub struct LanguagePriorityList {
    ranges: Vec<LanguageRange>,
}

impl LanguagePriorityList {
    /// The list accepting any language.
    pub fn any() -> LanguagePriorityList {
        LanguagePriorityList {
            ranges: vec![LanguageRange {
                range: ANY_RANGE.to_string(),
                weight: 1.0,
            }],
        }
    }

    /// Parses a list such as `fr-BE,fr;q=0.8,en;q=0.5`.
    ///
    /// Ranges weighted `q=0` are dropped; the others are stably sorted by
    /// decreasing weight.
    pub fn parse(text: &str) -> Result<LanguagePriorityList> {
        let mut ranges = Vec::new();
        for item in text.split(',') {
            let mut parts = item.split(';');
            let range = parts.next().unwrap_or_default().trim();
            if !is_valid_range(range) {
                return Err(SdmxError::InvalidLanguageRange(item.trim().to_string()));
            }
            let mut weight = 1.0;
            for param in parts {
                weight = parse_weight(param)
                    .ok_or_else(|| SdmxError::InvalidLanguageRange(item.trim().to_string()))?;
            }
            if weight > 0.0 {
                ranges.push(LanguageRange {
                    range: range.to_ascii_lowercase(),
                    weight,
                });
            }
        }
        ranges.sort_by(|a, b| b.weight.total_cmp(&a.weight));
        Ok(LanguagePriorityList { ranges })
    }

    pub fn ranges(&self) -> &[LanguageRange] {
        &self.ranges
    }
}

impl Default for LanguagePriorityList {
    fn default() -> Self {
        LanguagePriorityList::any()
    }
}

impl fmt::Display for LanguagePriorityList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, range) in self.ranges.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(&range.range)?;
            if range.weight < 1.0 {
                write!(f, ";q={}", range.weight)?;
            }
        }
        Ok(())
    }
}

impl FromStr for LanguagePriorityList {
    type Err = SdmxError;

    fn from_str(s: &str) -> Result<Self> {
        LanguagePriorityList::parse(s)
    }
}

fn is_valid_range(range: &str) -> bool {
    if range == ANY_RANGE {
        return true;
    }
    let mut subtags = range.split('-');
    let primary_ok = subtags
        .next()
        .is_some_and(|s| {
            s == ANY_RANGE || ((1..=8).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_alphabetic()))
        });
    primary_ok
        && subtags.all(|s| {
            s == ANY_RANGE || ((1..=8).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_alphanumeric()))
        })
}

fn parse_weight(param: &str) -> Option<f64> {
    let (name, value) = param.trim().split_once('=')?;
    if !name.trim().eq_ignore_ascii_case("q") {
        return None;
    }
    let weight: f64 = value.trim().parse().ok()?;
    (0.0..=1.0).contains(&weight).then_some(weight)
}
