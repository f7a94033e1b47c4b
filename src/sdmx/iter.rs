//! Iterators layered over cursors and series sequences.
//!
//! 1. [`SeriesIterator`] - Drains a [`DataCursor`] into whole [`Series`]
//! 2. [`QueryIterator`] - Filters and projects series by a [`DataQuery`]
//! 3. [`QueryResultIterator`] - Same, over fallible (cursor-backed) items
//!
//! # Example
//! ```no_run
//! # use sdmx_reader::{DataCursor, DataQuery, Detail, Key, SdmxReader, DataFormat, DataStructure};
//! # fn demo(reader: &SdmxReader, structure: &DataStructure, xml: &[u8]) -> sdmx_reader::Result<()> {
//! let cursor = reader.data_cursor(xml, DataFormat::GenericData21, structure);
//! let query = DataQuery::new(Key::parse("A.BE"), Detail::DataOnly);
//! for series in query.execute_results(cursor.into_series()) {
//!     println!("{}", series?.key);
//! }
//! # Ok(())
//! # }
//! ```

use log::{trace, warn};

use super::cursor::DataCursor;
use super::types::error::Result;
use super::types::models::{Obs, Series};
use super::types::query::DataQuery;

/// Lazy sequence of series read from a cursor.
///
/// The cursor is closed as soon as it is exhausted or fails, and on drop.
pub struct SeriesIterator<C: DataCursor> {
    cursor: C,
    done: bool,
}

impl<C: DataCursor> SeriesIterator<C> {
    pub fn new(cursor: C) -> SeriesIterator<C> {
        SeriesIterator { cursor, done: false }
    }

    fn read_series(&mut self) -> Result<Option<Series>> {
        if !self.cursor.next_series()? {
            return Ok(None);
        }
        let key = self.cursor.series_key()?.clone();
        let meta = self.cursor.series_attributes()?.clone();
        let mut obs = Vec::new();
        while self.cursor.next_obs()? {
            obs.push(Obs {
                period: self.cursor.obs_period()?.to_string(),
                value: self.cursor.obs_value()?,
                meta: self.cursor.obs_attributes()?.clone(),
            });
        }
        trace!("Series {} read with {} observations", key, obs.len());
        Ok(Some(Series::new(key, meta, obs)))
    }

    fn finish(&mut self) {
        self.done = true;
        if let Err(e) = self.cursor.close() {
            warn!("Failed to close data cursor: {}", e);
        }
    }
}

impl<C: DataCursor> Iterator for SeriesIterator<C> {
    type Item = Result<Series>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_series() {
            Ok(Some(series)) => Some(Ok(series)),
            Ok(None) => {
                self.finish();
                None
            }
            Err(e) => {
                self.finish();
                Some(Err(e))
            }
        }
    }
}

impl<C: DataCursor> Drop for SeriesIterator<C> {
    fn drop(&mut self) {
        if !self.done {
            self.finish();
        }
    }
}

/// Series passing a query's key filter, projected by its detail.
///
/// Created by [`DataQuery::execute()`].
pub struct QueryIterator<I> {
    query: DataQuery,
    source: I,
}

impl<I> QueryIterator<I> {
    pub(crate) fn new(query: DataQuery, source: I) -> QueryIterator<I> {
        QueryIterator { query, source }
    }
}

impl<I: Iterator<Item = Series>> Iterator for QueryIterator<I> {
    type Item = Series;

    fn next(&mut self) -> Option<Series> {
        let query = &self.query;
        self.source
            .by_ref()
            .find(|series| query.matches(series))
            .map(|series| query.filter.apply(&series))
    }
}

/// Fallible counterpart of [`QueryIterator`]; errors are passed through.
///
/// Created by [`DataQuery::execute_results()`].
pub struct QueryResultIterator<I> {
    query: DataQuery,
    source: I,
}

impl<I> QueryResultIterator<I> {
    pub(crate) fn new(query: DataQuery, source: I) -> QueryResultIterator<I> {
        QueryResultIterator { query, source }
    }
}

impl<I: Iterator<Item = Result<Series>>> Iterator for QueryResultIterator<I> {
    type Item = Result<Series>;

    fn next(&mut self) -> Option<Result<Series>> {
        let query = &self.query;
        self.source
            .by_ref()
            .find(|item| item.as_ref().map_or(true, |series| query.matches(series)))
            .map(|item| item.map(|series| query.filter.apply(&series)))
    }
}
