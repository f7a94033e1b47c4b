//! Dimensional keys and their containment algebra.
//!
//! A [`Key`] is an ordered vector of per-dimension codes. Each code is either
//! a concrete value, the empty string (wildcard) or a `+`-joined set of
//! values. Keys are used both to build outbound requests and to filter
//! decoded series.

use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::ops::Index;
use std::str::FromStr;

use super::models::DataStructure;

const ALL_KEYWORD: &str = "all";
const WILDCARD: &str = "";
const MULTI_VALUE_SEPARATOR: char = '+';
const DIMENSION_SEPARATOR: char = '.';

/// An immutable dimensional key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key {
    codes: Vec<String>,
}

impl Key {
    /// The key that matches every other key, whatever its length.
    pub const ALL: Key = Key { codes: Vec::new() };

    /// Parses a dotted key such as `A.BE..EUR` or `M.FR+DE.*`.
    ///
    /// Never fails: `all`, `*` and the empty string map to [`Key::ALL`],
    /// other `*` and `+` codes become wildcards and anything else is kept as
    /// a literal code.
    pub fn parse(text: &str) -> Key {
        let text = text.trim();
        if text == ALL_KEYWORD {
            return Key::ALL;
        }
        Key::of(text.split(DIMENSION_SEPARATOR))
    }

    /// Builds a key from explicit codes.
    ///
    /// An empty list and a lone wildcard both yield [`Key::ALL`].
    pub fn of<I, S>(codes: I) -> Key
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let codes: Vec<String> = codes.into_iter().map(|c| normalize_code(c.as_ref())).collect();
        if codes.len() == 1 && codes[0] == WILDCARD {
            return Key::ALL;
        }
        Key { codes }
    }

    /// Returns a builder indexed on the dimensions of `structure`.
    pub fn builder(structure: &DataStructure) -> KeyBuilder {
        KeyBuilder::from_structure(structure)
    }

    /// Number of dimensions in this key (zero for [`Key::ALL`]).
    pub fn size(&self) -> usize {
        self.codes.len()
    }

    /// Returns the code at `index`, or `None` if out of range.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.codes.get(index).map(String::as_str)
    }

    /// `true` for [`Key::ALL`]; [`Key::of`] folds a lone wildcard into it.
    pub fn is_all(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn is_wildcard(&self, index: usize) -> bool {
        self.get(index).is_some_and(|c| c == WILDCARD)
    }

    pub fn is_multi_value(&self, index: usize) -> bool {
        self.get(index).is_some_and(|c| c.contains(MULTI_VALUE_SEPARATOR))
    }

    /// A key designates a single series when every code is concrete.
    pub fn is_series(&self) -> bool {
        !self.codes.is_empty() && self.codes.iter().all(|c| is_concrete(c))
    }

    /// Checks whether `other` falls within this key.
    ///
    /// Multi-value codes are compared literally against the other key's
    /// code; they are only expanded server-side when a request is sent.
    pub fn contains(&self, other: &Key) -> bool {
        if self.is_all() {
            return true;
        }
        if self.size() != other.size() {
            return false;
        }
        self.codes
            .iter()
            .zip(&other.codes)
            .all(|(mine, theirs)| mine == WILDCARD || mine == theirs)
    }

    /// Strict containment: `self` contains `other` and differs from it.
    pub fn supersedes(&self, other: &Key) -> bool {
        self != other && self.contains(other)
    }

    /// Explains why this key does not fit `structure`, or `None` if it does.
    ///
    /// Codes are checked against non-empty dimension codelists, one
    /// `+`-separated value at a time.
    pub fn validate_on(&self, structure: &DataStructure) -> Option<String> {
        if self.is_all() {
            return None;
        }
        let dimensions = structure.dimensions();
        if self.size() != dimensions.len() {
            return Some(format!(
                "Invalid key size, expected {} dimensions but got {}",
                dimensions.len(),
                self.size()
            ));
        }
        for (code, dimension) in self.codes.iter().zip(dimensions) {
            let codes = &dimension.codelist.codes;
            if code.is_empty() || codes.is_empty() {
                continue;
            }
            if let Some(unknown) = code
                .split(MULTI_VALUE_SEPARATOR)
                .find(|value| !codes.contains_key(*value))
            {
                return Some(format!(
                    "Unknown code '{}' for dimension '{}'",
                    unknown, dimension.id
                ));
            }
        }
        None
    }
}

impl Index<usize> for Key {
    type Output = str;

    fn index(&self, index: usize) -> &str {
        &self.codes[index]
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_all() {
            return f.write_str(ALL_KEYWORD);
        }
        write_codes(f, &self.codes)
    }
}

impl FromStr for Key {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Key::parse(s))
    }
}

/// Incremental key construction bound to a dimension-id → position index.
///
/// Decoders keep one builder per cursor and call [`clear`](Self::clear)
/// between series, so code buffers are reused instead of reallocated.
#[derive(Debug, Clone)]
pub struct KeyBuilder {
    index: HashMap<String, usize>,
    codes: Vec<String>,
}

impl KeyBuilder {
    /// Indexes dimensions by their declared position.
    pub fn from_structure(structure: &DataStructure) -> KeyBuilder {
        KeyBuilder::from_names(structure.dimensions().iter().map(|d| d.id.as_str()))
    }

    /// Indexes dimensions in the order the names are given.
    pub fn from_names<I, S>(names: I) -> KeyBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let index: HashMap<String, usize> = names
            .into_iter()
            .enumerate()
            .map(|(position, name)| (name.into(), position))
            .collect();
        KeyBuilder {
            codes: vec![String::new(); index.len()],
            index,
        }
    }

    /// Sets the code of dimension `id`. Unknown ids are ignored.
    pub fn put(&mut self, id: &str, value: &str) -> &mut Self {
        if let Some(&position) = self.index.get(id) {
            let code = &mut self.codes[position];
            code.clear();
            code.push_str(value);
        }
        self
    }

    /// Returns `true` if `id` is one of the indexed dimensions.
    pub fn is_dimension(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Resets every position to the wildcard, keeping allocations.
    pub fn clear(&mut self) -> &mut Self {
        self.codes.iter_mut().for_each(String::clear);
        self
    }

    pub fn size(&self) -> usize {
        self.codes.len()
    }

    /// Returns the current code at `index`, or `None` if out of range.
    pub fn get_item(&self, index: usize) -> Option<&str> {
        self.codes.get(index).map(String::as_str)
    }

    pub fn is_series(&self) -> bool {
        !self.codes.is_empty() && self.codes.iter().all(|c| is_concrete(c))
    }

    pub fn build(&self) -> Key {
        Key::of(&self.codes)
    }
}

impl fmt::Display for KeyBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.build(), f)
    }
}

fn normalize_code(code: &str) -> String {
    match code.trim() {
        "*" | "+" => WILDCARD.to_string(),
        trimmed => trimmed.to_string(),
    }
}

fn is_concrete(code: &str) -> bool {
    !code.is_empty() && code != "*" && !code.contains(MULTI_VALUE_SEPARATOR)
}

fn write_codes(f: &mut fmt::Formatter<'_>, codes: &[String]) -> fmt::Result {
    for (i, code) in codes.iter().enumerate() {
        if i > 0 {
            f.write_str(".")?;
        }
        f.write_str(code)?;
    }
    Ok(())
}
