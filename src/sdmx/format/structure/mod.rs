//! # Structure Parsing Dispatcher
//!
//! Entry point for decoding structure messages. Dispatches to the
//! version-specific parser; both share the resolution rules of [`common`].

use std::fmt;
use std::io::BufRead;
use std::str::FromStr;

use crate::sdmx::codec::stream::XmlStream;
use crate::sdmx::types::error::{Result, SdmxError};
use crate::sdmx::types::language::LanguagePriorityList;

pub mod common;
pub mod v20;
pub mod v21;

pub use common::StructureMessage;

/// Protocol version of a structure message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructureFormat {
    /// SDMX-ML 2.0 `KeyFamilies`.
    Structure20,
    /// SDMX-ML 2.1 `DataStructures`.
    Structure21,
}

impl fmt::Display for StructureFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StructureFormat::Structure20 => "structure20",
            StructureFormat::Structure21 => "structure21",
        })
    }
}

impl FromStr for StructureFormat {
    type Err = SdmxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "structure20" | "2.0" | "20" => Ok(StructureFormat::Structure20),
            "structure21" | "2.1" | "21" => Ok(StructureFormat::Structure21),
            _ => Err(SdmxError::UnknownFormat(s.to_string())),
        }
    }
}

/// Decodes a structure message in the given format.
pub fn parse<R: BufRead>(
    stream: &mut XmlStream<R>,
    format: StructureFormat,
    languages: &LanguagePriorityList,
) -> Result<StructureMessage> {
    match format {
        StructureFormat::Structure20 => v20::parse(stream, languages),
        StructureFormat::Structure21 => v21::parse(stream, languages),
    }
}
