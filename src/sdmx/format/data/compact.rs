//! Compact dialect: every component value is an attribute of its tag.
//!
//! ```text
//! DataSet
//! └── Series FREQ="A" REF_AREA="BE" TITLE="..."
//!     └── Obs TIME_PERIOD="2001" OBS_VALUE="1.5" OBS_STATUS="A"
//! ```
//!
//! Attribute names are component ids from the data structure. On a `Series`
//! tag, dimension ids build the key and the rest become series attributes.
//! On an `Obs` tag, the time dimension and primary measure are pulled out and
//! the rest become observation attributes.

use std::io::BufRead;

use super::{Scratch, SeriesBody, parse_value};
use crate::sdmx::codec::stream::{Visit, XmlStream, for_each_attribute, is_named};
use crate::sdmx::types::error::{Result, SdmxError};

/// Scans the data set for the next `Series` tag and reads its attributes.
pub fn next_series<R: BufRead>(stream: &mut XmlStream<R>, scratch: &mut Scratch) -> Result<Option<SeriesBody>> {
    let mut body = None;
    stream.next_while(|_, e, empty| {
        if !is_named(e, b"Series") {
            return Ok(Visit::Continue);
        }
        for_each_attribute(e, |id, value| {
            if scratch.key.is_dimension(id) {
                scratch.key.put(id, value);
            } else {
                scratch.series_meta.insert(id.to_string(), value.to_string());
            }
            Ok(())
        })?;
        body = Some(if empty { SeriesBody::Closed } else { SeriesBody::Open });
        Ok(Visit::Suspend)
    })?;
    Ok(body)
}

/// Reads the next `Obs` tag of the current series into `scratch`.
pub fn next_obs<R: BufRead>(stream: &mut XmlStream<R>, scratch: &mut Scratch) -> Result<bool> {
    let mut found = false;
    stream.next_while(|s, e, empty| {
        if !is_named(e, b"Obs") {
            return Ok(Visit::Continue);
        }
        for_each_attribute(e, |id, value| {
            if id == scratch.time_dimension_id {
                scratch.obs_period = Some(value.to_string());
            } else if id == scratch.primary_measure_id {
                scratch.obs_value = parse_value(value);
            } else {
                scratch.obs_meta.insert(id.to_string(), value.to_string());
            }
            Ok(())
        })?;
        if !empty {
            // annotations and other children carry nothing we read
            s.unwind_to(s.depth() - 1)?;
        }
        found = true;
        Ok(Visit::Suspend)
    })?;

    if found && scratch.obs_period.is_none() {
        return Err(SdmxError::MissingElement {
            element: "Obs",
            context: format!(
                "time dimension '{}' of series {}",
                scratch.time_dimension_id, scratch.key
            ),
        });
    }
    Ok(found)
}
