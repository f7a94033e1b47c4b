//! Generic dialect: keys, attributes and observation fields are child elements.
//!
//! ```text
//! Series
//! ├── SeriesKey/Value (concept|id, value)
//! ├── Attributes/Value (concept|id, value)
//! └── Obs*
//!     ├── Time (2.0, text) | ObsDimension (2.1, value)
//!     ├── ObsValue (value)
//!     └── Attributes/Value
//! ```

use std::io::BufRead;

use super::{Scratch, SeriesBody, parse_value};
use crate::sdmx::codec::stream::{Visit, XmlStream, attribute, is_named, required_attribute};
use crate::sdmx::format::structure::common::text_of;
use crate::sdmx::types::error::{Result, SdmxError};

/// Where a generic observation carries its time period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeEncoding {
    /// Text content of the named element.
    Text(&'static str),
    /// `value` attribute of the named element.
    Attribute(&'static str),
}

/// Element and attribute names that differ between generic versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenericSchema {
    /// Attribute naming the component on `Value` elements.
    pub component_attr: &'static str,
    pub time: TimeEncoding,
}

pub const GENERIC_20: GenericSchema = GenericSchema {
    component_attr: "concept",
    time: TimeEncoding::Text("Time"),
};

pub const GENERIC_21: GenericSchema = GenericSchema {
    component_attr: "id",
    time: TimeEncoding::Attribute("ObsDimension"),
};

/// Scans the data set for the next series and parses its head.
///
/// Stops at the first `Obs` child, leaving the reader inside it.
pub fn next_series<R: BufRead>(
    stream: &mut XmlStream<R>,
    schema: &GenericSchema,
    scratch: &mut Scratch,
) -> Result<Option<SeriesBody>> {
    let mut body = None;
    stream.next_while(|s, e, empty| {
        if !is_named(e, b"Series") {
            return Ok(Visit::Continue);
        }
        if empty {
            body = Some(SeriesBody::Closed);
            return Ok(Visit::Suspend);
        }
        let mut pending = None;
        let head = s.next_while(|s, e, empty| {
            match e.local_name().as_ref() {
                b"SeriesKey" if !empty => values(s, schema, |id, value| {
                    scratch.key.put(id, value);
                })?,
                b"Attributes" if !empty => values(s, schema, |id, value| {
                    scratch.series_meta.insert(id.to_string(), value.to_string());
                })?,
                b"Obs" => {
                    pending = Some(empty);
                    return Ok(Visit::Suspend);
                }
                _ => {}
            }
            Ok(Visit::Continue)
        })?;
        body = Some(match (head, pending) {
            (Visit::Suspend, Some(empty)) => SeriesBody::ObsPending { empty },
            _ => SeriesBody::Closed,
        });
        Ok(Visit::Suspend)
    })?;
    Ok(body)
}

/// Reads the next observation of the current series into `scratch`.
///
/// `pending` is set when the reader already stands on an `Obs` tag
/// (`Some(true)` for a self-closing one).
pub fn next_obs<R: BufRead>(
    stream: &mut XmlStream<R>,
    schema: &GenericSchema,
    scratch: &mut Scratch,
    pending: Option<bool>,
) -> Result<bool> {
    let empty = match pending {
        Some(empty) => empty,
        None => {
            let mut found = None;
            let outcome = stream.next_while(|_, e, empty| {
                if is_named(e, b"Obs") {
                    found = Some(empty);
                    return Ok(Visit::Suspend);
                }
                Ok(Visit::Continue)
            })?;
            match (outcome, found) {
                (Visit::Suspend, Some(empty)) => empty,
                _ => return Ok(false),
            }
        }
    };

    if !empty {
        stream.next_while(|s, e, empty| {
            let name = e.local_name();
            match (schema.time, name.as_ref()) {
                (TimeEncoding::Text(tag), n) if n == tag.as_bytes() => {
                    scratch.obs_period = Some(text_of(s, empty)?);
                }
                (TimeEncoding::Attribute(tag), n) if n == tag.as_bytes() => {
                    scratch.obs_period = Some(required_attribute(e, "value", tag)?);
                }
                (_, b"ObsValue") => {
                    scratch.obs_value = attribute(e, b"value")?.as_deref().and_then(parse_value);
                }
                (_, b"Attributes") if !empty => values(s, schema, |id, value| {
                    scratch.obs_meta.insert(id.to_string(), value.to_string());
                })?,
                _ => {}
            }
            Ok(Visit::Continue)
        })?;
    }

    if scratch.obs_period.is_none() {
        let element = match schema.time {
            TimeEncoding::Text(tag) | TimeEncoding::Attribute(tag) => tag,
        };
        return Err(SdmxError::MissingElement {
            element,
            context: format!("observation of series {}", scratch.key),
        });
    }
    Ok(true)
}

/// Visits `Value` children, passing each component id and value to `f`.
fn values<R, F>(stream: &mut XmlStream<R>, schema: &GenericSchema, mut f: F) -> Result<()>
where
    R: BufRead,
    F: FnMut(&str, &str),
{
    stream.next_while(|_, e, _| {
        if is_named(e, b"Value") {
            let id = required_attribute(e, schema.component_attr, "Value")?;
            let value = required_attribute(e, "value", "Value")?;
            f(&id, &value);
        }
        Ok(Visit::Continue)
    })?;
    Ok(())
}
