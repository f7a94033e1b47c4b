//! The pull-iteration contract shared by every data decoder.
//!
//! A [`DataCursor`] walks a data message one series, then one observation,
//! at a time:
//!
//! ```text
//! Fresh ──next_series()──▶ InSeries ──next_obs()──▶ InObs ─┐
//!   │                         │  ▲                    ▲     │ next_obs()
//!   │                         │  └──── next_series() ─┼─────┘
//!   ▼                         ▼                       │
//! Exhausted ◀─next_series()─ EndOfSeries ◀─next_obs()─┘
//!
//! close() from any state ──▶ Closed
//! ```
//!
//! Accessors are only valid in the states that produce their value. Calling
//! them elsewhere is a programming error ([`SdmxError::IllegalState`]); using
//! a closed cursor is a decode error ([`SdmxError::CursorClosed`]).

use super::iter::SeriesIterator;
use super::types::error::{Result, SdmxError};
use super::types::key::Key;
use super::types::models::{Meta, Series};

/// Forward-only, single-use reader over series and observations.
///
/// Implementations are not reentrant and must be used from one thread at a
/// time.
pub trait DataCursor {
    /// Moves to the next series. Returns `false` once the data set is exhausted.
    fn next_series(&mut self) -> Result<bool>;

    /// Moves to the next observation of the current series. Returns `false`
    /// at the end of the series.
    fn next_obs(&mut self) -> Result<bool>;

    fn series_key(&self) -> Result<&Key>;

    fn series_attributes(&self) -> Result<&Meta>;

    fn obs_period(&self) -> Result<&str>;

    fn obs_value(&self) -> Result<Option<f64>>;

    fn obs_attributes(&self) -> Result<&Meta>;

    /// Releases the underlying reader. Safe to call more than once.
    fn close(&mut self) -> Result<()>;

    fn is_closed(&self) -> bool;

    /// Adapts this cursor into a lazy sequence of [`Series`].
    fn into_series(self) -> SeriesIterator<Self>
    where
        Self: Sized,
    {
        SeriesIterator::new(self)
    }
}

impl<C: DataCursor + ?Sized> DataCursor for Box<C> {
    fn next_series(&mut self) -> Result<bool> {
        (**self).next_series()
    }

    fn next_obs(&mut self) -> Result<bool> {
        (**self).next_obs()
    }

    fn series_key(&self) -> Result<&Key> {
        (**self).series_key()
    }

    fn series_attributes(&self) -> Result<&Meta> {
        (**self).series_attributes()
    }

    fn obs_period(&self) -> Result<&str> {
        (**self).obs_period()
    }

    fn obs_value(&self) -> Result<Option<f64>> {
        (**self).obs_value()
    }

    fn obs_attributes(&self) -> Result<&Meta> {
        (**self).obs_attributes()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn is_closed(&self) -> bool {
        (**self).is_closed()
    }
}

/// Position of a cursor in its state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    Fresh,
    InSeries,
    InObs,
    EndOfSeries,
    Exhausted,
    /// A decode error occurred; only `close()` remains valid.
    Failed,
    Closed,
}

impl CursorState {
    /// Guard for `next_series()` / `next_obs()`.
    pub fn check_usable(self) -> Result<()> {
        match self {
            CursorState::Closed => Err(SdmxError::CursorClosed),
            CursorState::Failed => Err(SdmxError::CursorFailed),
            _ => Ok(()),
        }
    }

    /// Guard for series accessors.
    pub fn check_series(self) -> Result<()> {
        self.check_usable()?;
        match self {
            CursorState::InSeries | CursorState::InObs | CursorState::EndOfSeries => Ok(()),
            _ => Err(SdmxError::IllegalState("no current series")),
        }
    }

    /// Guard for observation accessors.
    pub fn check_obs(self) -> Result<()> {
        self.check_usable()?;
        match self {
            CursorState::InObs => Ok(()),
            _ => Err(SdmxError::IllegalState("no current observation")),
        }
    }

    /// Guard for `next_obs()`: `Ok(false)` means there is nothing left to read.
    pub fn check_next_obs(self) -> Result<bool> {
        self.check_usable()?;
        match self {
            CursorState::Fresh => Err(SdmxError::IllegalState("next_obs() called before next_series()")),
            CursorState::InSeries | CursorState::InObs => Ok(true),
            _ => Ok(false),
        }
    }
}

/// Cursor over already decoded series, e.g. a cached data set.
pub struct SeriesCursor<I> {
    source: I,
    state: CursorState,
    series: Option<Series>,
    obs_index: usize,
}

impl<I: Iterator<Item = Series>> SeriesCursor<I> {
    pub fn new<S>(series: S) -> SeriesCursor<I>
    where
        S: IntoIterator<Item = Series, IntoIter = I>,
    {
        SeriesCursor {
            source: series.into_iter(),
            state: CursorState::Fresh,
            series: None,
            obs_index: 0,
        }
    }

    fn current(&self) -> Result<&Series> {
        self.series
            .as_ref()
            .ok_or(SdmxError::IllegalState("no current series"))
    }
}

impl<I: Iterator<Item = Series>> DataCursor for SeriesCursor<I> {
    fn next_series(&mut self) -> Result<bool> {
        self.state.check_usable()?;
        self.series = self.source.next();
        self.obs_index = 0;
        self.state = if self.series.is_some() {
            CursorState::InSeries
        } else {
            CursorState::Exhausted
        };
        Ok(self.series.is_some())
    }

    fn next_obs(&mut self) -> Result<bool> {
        if !self.state.check_next_obs()? {
            return Ok(false);
        }
        if self.state == CursorState::InObs {
            self.obs_index += 1;
        }
        let available = self.current()?.obs.len() > self.obs_index;
        self.state = if available {
            CursorState::InObs
        } else {
            CursorState::EndOfSeries
        };
        Ok(available)
    }

    fn series_key(&self) -> Result<&Key> {
        self.state.check_series()?;
        Ok(&self.current()?.key)
    }

    fn series_attributes(&self) -> Result<&Meta> {
        self.state.check_series()?;
        Ok(&self.current()?.meta)
    }

    fn obs_period(&self) -> Result<&str> {
        self.state.check_obs()?;
        Ok(&self.current()?.obs[self.obs_index].period)
    }

    fn obs_value(&self) -> Result<Option<f64>> {
        self.state.check_obs()?;
        Ok(self.current()?.obs[self.obs_index].value)
    }

    fn obs_attributes(&self) -> Result<&Meta> {
        self.state.check_obs()?;
        Ok(&self.current()?.obs[self.obs_index].meta)
    }

    fn close(&mut self) -> Result<()> {
        self.series = None;
        self.state = CursorState::Closed;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.state == CursorState::Closed
    }
}
