//! Query values: key filter plus level of detail.

use std::fmt;
use std::str::FromStr;

use super::error::{Result, SdmxError};
use super::key::Key;
use super::models::{Meta, Series};
use crate::sdmx::iter::{QueryIterator, QueryResultIterator};

/// Amount of information requested for each series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Detail {
    #[default]
    Full,
    DataOnly,
    SeriesKeysOnly,
    NoData,
}

impl Detail {
    pub fn is_data_requested(self) -> bool {
        matches!(self, Detail::Full | Detail::DataOnly)
    }

    pub fn is_meta_requested(self) -> bool {
        matches!(self, Detail::Full | Detail::NoData)
    }
}

impl fmt::Display for Detail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Detail::Full => "full",
            Detail::DataOnly => "dataonly",
            Detail::SeriesKeysOnly => "serieskeysonly",
            Detail::NoData => "nodata",
        })
    }
}

impl FromStr for Detail {
    type Err = SdmxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace(['_', '-'], "").as_str() {
            "full" => Ok(Detail::Full),
            "dataonly" => Ok(Detail::DataOnly),
            "serieskeysonly" => Ok(Detail::SeriesKeysOnly),
            "nodata" => Ok(Detail::NoData),
            _ => Err(SdmxError::UnknownFormat(format!("detail '{}'", s))),
        }
    }
}

/// Projection of series according to a [`Detail`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DataFilter {
    pub detail: Detail,
}

impl DataFilter {
    pub const FULL: DataFilter = DataFilter { detail: Detail::Full };

    pub fn new(detail: Detail) -> DataFilter {
        DataFilter { detail }
    }

    pub fn is_data_requested(&self) -> bool {
        self.detail.is_data_requested()
    }

    pub fn is_meta_requested(&self) -> bool {
        self.detail.is_meta_requested()
    }

    /// Returns a projected copy of `series`; the input is left untouched.
    pub fn apply(&self, series: &Series) -> Series {
        let meta = if self.is_meta_requested() {
            series.meta.clone()
        } else {
            Meta::new()
        };
        let obs = match (self.is_data_requested(), self.is_meta_requested()) {
            (false, _) => Vec::new(),
            (true, true) => series.obs.clone(),
            (true, false) => series.obs.iter().map(|o| o.without_meta()).collect(),
        };
        Series {
            key: series.key.clone(),
            meta,
            obs,
        }
    }
}

/// Key filter plus detail projection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DataQuery {
    pub key: Key,
    pub filter: DataFilter,
}

impl Default for DataQuery {
    fn default() -> Self {
        DataQuery::ALL
    }
}

impl DataQuery {
    pub const ALL: DataQuery = DataQuery {
        key: Key::ALL,
        filter: DataFilter::FULL,
    };

    pub fn new(key: Key, detail: Detail) -> DataQuery {
        DataQuery {
            key,
            filter: DataFilter::new(detail),
        }
    }

    pub fn detail(&self) -> Detail {
        self.filter.detail
    }

    /// Returns `true` if `series` passes the key filter.
    pub fn matches(&self, series: &Series) -> bool {
        self.key.contains(&series.key)
    }

    /// Lazily filters and projects a sequence of series.
    pub fn execute<I>(&self, series: I) -> QueryIterator<I::IntoIter>
    where
        I: IntoIterator<Item = Series>,
    {
        QueryIterator::new(self.clone(), series.into_iter())
    }

    /// Same as [`execute`](Self::execute) over a fallible sequence, such as a
    /// cursor-backed [`SeriesIterator`](crate::sdmx::iter::SeriesIterator).
    /// Errors pass through unfiltered.
    pub fn execute_results<I>(&self, series: I) -> QueryResultIterator<I::IntoIter>
    where
        I: IntoIterator<Item = Result<Series>>,
    {
        QueryResultIterator::new(self.clone(), series.into_iter())
    }
}
