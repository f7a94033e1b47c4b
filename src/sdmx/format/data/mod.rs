//! # Data Message Decoding
//!
//! One cursor driver, [`XmlDataCursor`], walks any data message. What differs
//! between message shapes is how a series head and an observation are read,
//! and that is delegated to a closed set of dialects:
//!
//! ```text
//! DataFormat ──▶ Dialect::Generic(&GENERIC_20 | &GENERIC_21) ──▶ generic.rs
//!            └─▶ Dialect::Compact                           ──▶ compact.rs
//! ```
//!
//! Dialects read into a [`Scratch`] owned by the cursor and handed to each
//! step, so decoding allocates nothing per observation beyond its strings.

use std::fmt;
use std::io::BufRead;
use std::str::FromStr;

use log::{debug, info, trace};

use crate::sdmx::codec::stream::{Visit, XmlStream, is_named};
use crate::sdmx::cursor::{CursorState, DataCursor};
use crate::sdmx::types::error::{Result, SdmxError};
use crate::sdmx::types::key::{Key, KeyBuilder};
use crate::sdmx::types::models::{DataStructure, Meta};

pub mod compact;
pub mod generic;

use generic::GenericSchema;

/// Shape and protocol version of a data message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataFormat {
    GenericData20,
    GenericData21,
    CompactData20,
    CompactData21,
}

impl DataFormat {
    fn dialect(self) -> Dialect {
        match self {
            DataFormat::GenericData20 => Dialect::Generic(&generic::GENERIC_20),
            DataFormat::GenericData21 => Dialect::Generic(&generic::GENERIC_21),
            // both versions put component ids in tag attributes
            DataFormat::CompactData20 | DataFormat::CompactData21 => Dialect::Compact,
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DataFormat::GenericData20 => "generic20",
            DataFormat::GenericData21 => "generic21",
            DataFormat::CompactData20 => "compact20",
            DataFormat::CompactData21 => "compact21",
        })
    }
}

impl FromStr for DataFormat {
    type Err = SdmxError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | '.' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "generic20" | "genericdata20" => Ok(DataFormat::GenericData20),
            "generic21" | "genericdata21" => Ok(DataFormat::GenericData21),
            "compact20" | "compactdata20" => Ok(DataFormat::CompactData20),
            "compact21" | "compactdata21" | "structurespecific21" => Ok(DataFormat::CompactData21),
            _ => Err(SdmxError::UnknownFormat(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Dialect {
    Generic(&'static GenericSchema),
    Compact,
}

/// What is left of the current series element after its head was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesBody {
    /// The series element is fully consumed; no observations remain.
    Closed,
    /// The reader is inside the series element, before its next child.
    Open,
    /// The reader stands on an `Obs` tag whose content is still unread.
    ObsPending { empty: bool },
}

/// Per-cursor decode buffers, reset between series and observations.
#[derive(Debug, Clone)]
pub struct Scratch {
    pub key: KeyBuilder,
    pub series_meta: Meta,
    pub obs_period: Option<String>,
    pub obs_value: Option<f64>,
    pub obs_meta: Meta,
    pub time_dimension_id: String,
    pub primary_measure_id: String,
}

impl Scratch {
    pub fn new(structure: &DataStructure) -> Scratch {
        Scratch {
            key: KeyBuilder::from_structure(structure),
            series_meta: Meta::new(),
            obs_period: None,
            obs_value: None,
            obs_meta: Meta::new(),
            time_dimension_id: structure.time_dimension_id().to_string(),
            primary_measure_id: structure.primary_measure_id().to_string(),
        }
    }

    fn clear_series(&mut self) {
        self.key.clear();
        self.series_meta.clear();
        self.clear_obs();
    }

    fn clear_obs(&mut self) {
        self.obs_period = None;
        self.obs_value = None;
        self.obs_meta.clear();
    }
}

/// Parses an observation value. Missing or unparsable values, and `NaN`,
/// are absent.
pub fn parse_value(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Streaming cursor over an SDMX-ML data message.
pub struct XmlDataCursor<R> {
    stream: Option<XmlStream<R>>,
    format: DataFormat,
    dialect: Dialect,
    state: CursorState,
    /// Depth of the `DataSet` content, once entered.
    dataset_depth: Option<usize>,
    body: SeriesBody,
    scratch: Scratch,
    key: Key,
    series_count: usize,
}

impl<R: BufRead> XmlDataCursor<R> {
    pub fn new(reader: R, format: DataFormat, structure: &DataStructure) -> XmlDataCursor<R> {
        XmlDataCursor::from_stream(XmlStream::new(reader), format, structure)
    }

    pub fn from_stream(stream: XmlStream<R>, format: DataFormat, structure: &DataStructure) -> XmlDataCursor<R> {
        debug!("Opening {} cursor on structure {}", format, structure.reference());
        XmlDataCursor {
            stream: Some(stream),
            format,
            dialect: format.dialect(),
            state: CursorState::Fresh,
            dataset_depth: None,
            body: SeriesBody::Closed,
            scratch: Scratch::new(structure),
            key: Key::ALL,
            series_count: 0,
        }
    }

    pub fn format(&self) -> DataFormat {
        self.format
    }

    /// Marks the cursor failed when a step errors.
    fn settle(&mut self, result: Result<bool>) -> Result<bool> {
        if let Err(e) = &result {
            debug!("{} cursor failed: {}", self.format, e);
            self.state = CursorState::Failed;
        }
        result
    }

    fn read_series(&mut self) -> Result<bool> {
        let stream = self.stream.as_mut().ok_or(SdmxError::CursorClosed)?;
        let dataset_depth = match self.dataset_depth {
            Some(depth) => depth,
            None if enter_dataset(stream)? => {
                self.dataset_depth = Some(stream.depth());
                stream.depth()
            }
            None => {
                info!("{} message carries no data set", self.format);
                self.state = CursorState::Exhausted;
                return Ok(false);
            }
        };
        stream.unwind_to(dataset_depth)?;

        self.scratch.clear_series();
        let body = match self.dialect {
            Dialect::Generic(schema) => generic::next_series(stream, schema, &mut self.scratch)?,
            Dialect::Compact => compact::next_series(stream, &mut self.scratch)?,
        };
        let Some(body) = body else {
            info!("{} cursor exhausted after {} series", self.format, self.series_count);
            self.body = SeriesBody::Closed;
            self.state = CursorState::Exhausted;
            return Ok(false);
        };

        if !self.scratch.key.is_series() {
            return Err(SdmxError::InvalidSeriesKey(self.scratch.key.to_string()));
        }
        self.key = self.scratch.key.build();
        self.body = body;
        self.series_count += 1;
        self.state = CursorState::InSeries;
        trace!("Series {}", self.key);
        Ok(true)
    }

    fn read_obs(&mut self) -> Result<bool> {
        let stream = self.stream.as_mut().ok_or(SdmxError::CursorClosed)?;
        self.scratch.clear_obs();
        let found = match (self.dialect, self.body) {
            (_, SeriesBody::Closed) => false,
            (Dialect::Generic(schema), SeriesBody::ObsPending { empty }) => {
                generic::next_obs(stream, schema, &mut self.scratch, Some(empty))?
            }
            (Dialect::Generic(schema), SeriesBody::Open) => {
                generic::next_obs(stream, schema, &mut self.scratch, None)?
            }
            (Dialect::Compact, _) => compact::next_obs(stream, &mut self.scratch)?,
        };
        if found {
            self.body = SeriesBody::Open;
            self.state = CursorState::InObs;
        } else {
            self.body = SeriesBody::Closed;
            self.state = CursorState::EndOfSeries;
        }
        Ok(found)
    }
}

/// Descends from the document root into the first non-empty `DataSet`.
fn enter_dataset<R: BufRead>(stream: &mut XmlStream<R>) -> Result<bool> {
    let mut found = false;
    stream.next_while(|s, _, empty| {
        if empty {
            return Ok(Visit::Halt);
        }
        s.next_while(|_, e, empty| {
            if is_named(e, b"DataSet") && !empty {
                found = true;
                return Ok(Visit::Suspend);
            }
            Ok(Visit::Continue)
        })?;
        Ok(if found { Visit::Suspend } else { Visit::Halt })
    })?;
    Ok(found)
}

impl<R> XmlDataCursor<R> {
    /// Drops the token reader, at most once.
    fn release(&mut self) {
        if self.stream.take().is_some() {
            debug!("Closing {} cursor after {} series", self.format, self.series_count);
        }
    }
}

impl<R> Drop for XmlDataCursor<R> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<R: BufRead> DataCursor for XmlDataCursor<R> {
    fn next_series(&mut self) -> Result<bool> {
        self.state.check_usable()?;
        if self.state == CursorState::Exhausted {
            return Ok(false);
        }
        let result = self.read_series();
        self.settle(result)
    }

    fn next_obs(&mut self) -> Result<bool> {
        if !self.state.check_next_obs()? {
            return Ok(false);
        }
        let result = self.read_obs();
        self.settle(result)
    }

    fn series_key(&self) -> Result<&Key> {
        self.state.check_series()?;
        Ok(&self.key)
    }

    fn series_attributes(&self) -> Result<&Meta> {
        self.state.check_series()?;
        Ok(&self.scratch.series_meta)
    }

    fn obs_period(&self) -> Result<&str> {
        self.state.check_obs()?;
        self.scratch
            .obs_period
            .as_deref()
            .ok_or(SdmxError::IllegalState("no current observation"))
    }

    fn obs_value(&self) -> Result<Option<f64>> {
        self.state.check_obs()?;
        Ok(self.scratch.obs_value)
    }

    fn obs_attributes(&self) -> Result<&Meta> {
        self.state.check_obs()?;
        Ok(&self.scratch.obs_meta)
    }

    fn close(&mut self) -> Result<()> {
        self.release();
        self.state = CursorState::Closed;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.state == CursorState::Closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdmx::types::models::ResourceRef;
    use std::cell::Cell;
    use std::io::Read;
    use std::rc::Rc;

    #[test]
    fn format_names_are_lenient() {
        assert_eq!("generic20".parse::<DataFormat>().unwrap(), DataFormat::GenericData20);
        assert_eq!("GenericData_21".parse::<DataFormat>().unwrap(), DataFormat::GenericData21);
        assert_eq!("compact-2.0".parse::<DataFormat>().unwrap(), DataFormat::CompactData20);
        assert!("edi".parse::<DataFormat>().is_err());
        assert_eq!(DataFormat::CompactData21.to_string(), "compact21");
    }

    #[test]
    fn values_parse_as_doubles() {
        assert_eq!(parse_value(" 1.5 "), Some(1.5));
        assert_eq!(parse_value("-2e3"), Some(-2000.0));
        assert_eq!(parse_value("NaN"), None);
        assert_eq!(parse_value(""), None);
        assert_eq!(parse_value("n/a"), None);
    }

    /// Input that records when the cursor lets go of it.
    struct TrackedInput {
        bytes: &'static [u8],
        released: Rc<Cell<bool>>,
    }

    impl Read for TrackedInput {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.bytes.read(buf)
        }
    }

    impl BufRead for TrackedInput {
        fn fill_buf(&mut self) -> std::io::Result<&[u8]> {
            Ok(self.bytes)
        }

        fn consume(&mut self, amt: usize) {
            self.bytes = &self.bytes[amt..];
        }
    }

    impl Drop for TrackedInput {
        fn drop(&mut self) {
            self.released.set(true);
        }
    }

    fn tracked_cursor() -> (XmlDataCursor<TrackedInput>, Rc<Cell<bool>>) {
        let structure = DataStructure::new(
            ResourceRef::of(Some("ECB"), "ECB_EXR1", Some("1.0")),
            "Exchange Rates".to_string(),
            Vec::new(),
            Vec::new(),
            "TIME_PERIOD".to_string(),
            "OBS_VALUE".to_string(),
        );
        let released = Rc::new(Cell::new(false));
        let input = TrackedInput {
            bytes: b"<GenericData><DataSet/></GenericData>",
            released: Rc::clone(&released),
        };
        (XmlDataCursor::new(input, DataFormat::GenericData21, &structure), released)
    }

    #[test]
    fn reader_is_released_on_close_and_on_drop() {
        let (mut cursor, released) = tracked_cursor();
        cursor.close().unwrap();
        assert!(released.get());
        assert!(cursor.is_closed());
        cursor.close().unwrap();
        drop(cursor);

        let (cursor, released) = tracked_cursor();
        assert!(!released.get());
        drop(cursor);
        assert!(released.get());
    }
}
