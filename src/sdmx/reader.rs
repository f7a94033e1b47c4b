use std::borrow::Cow;
use std::io::{BufRead, Cursor};

use log::info;

use super::codec::stream::XmlStream;
use super::cursor::DataCursor;
use super::format::data::{DataFormat, XmlDataCursor};
use super::format::structure::{self, StructureFormat, StructureMessage};
use super::types::error::Result;
use super::types::language::LanguagePriorityList;
use super::types::models::{DataSet, DataStructure, Dataflow, DataflowRef};
use super::types::query::DataQuery;
use super::utils;

/// Settings shared by every decode of an [`SdmxReader`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodeOptions {
    /// Preferred languages for labels.
    pub languages: LanguagePriorityList,
    /// Explicit input encoding label. Auto-detected from the BOM or the XML
    /// declaration when `None`. Only applies to the `*_from_bytes` methods.
    pub encoding: Option<String>,
}

/// Entry point for decoding SDMX-ML structure and data messages.
///
/// Stream-based methods take any [`BufRead`] holding UTF-8; the
/// `*_from_bytes` variants transcode other encodings first.
#[derive(Debug, Clone, Default)]
pub struct SdmxReader {
    options: DecodeOptions,
}

impl SdmxReader {
    pub fn new(options: DecodeOptions) -> SdmxReader {
        SdmxReader { options }
    }

    /// Reader selecting labels by `languages`.
    pub fn with_languages(languages: LanguagePriorityList) -> SdmxReader {
        SdmxReader::new(DecodeOptions {
            languages,
            ..Default::default()
        })
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Decodes a whole structure message: data structures and dataflows.
    ///
    /// # Errors
    /// Returns a decode error if the message is malformed, lacks a required
    /// component, or a dimension has no resolvable codelist.
    pub fn structure_message<R: BufRead>(&self, input: R, format: StructureFormat) -> Result<StructureMessage> {
        let mut stream = XmlStream::new(input);
        structure::parse(&mut stream, format, &self.options.languages)
    }

    /// Decodes the data structures of a structure message.
    pub fn structures<R: BufRead>(&self, input: R, format: StructureFormat) -> Result<Vec<DataStructure>> {
        Ok(self.structure_message(input, format)?.structures)
    }

    /// Decodes the dataflows of a structure message.
    pub fn dataflows<R: BufRead>(&self, input: R, format: StructureFormat) -> Result<Vec<Dataflow>> {
        Ok(self.structure_message(input, format)?.dataflows)
    }

    /// Opens a streaming cursor over a data message.
    ///
    /// Nothing is read until the first `next_series()`.
    pub fn data_cursor<R: BufRead>(&self, input: R, format: DataFormat, structure: &DataStructure) -> XmlDataCursor<R> {
        XmlDataCursor::new(input, format, structure)
    }

    /// Like [`data_cursor`](Self::data_cursor), type-erased.
    pub fn boxed_cursor<'a, R: BufRead + 'a>(
        &self,
        input: R,
        format: DataFormat,
        structure: &DataStructure,
    ) -> Box<dyn DataCursor + 'a> {
        Box::new(self.data_cursor(input, format, structure))
    }

    /// Reads a data message eagerly, keeping the series selected by `query`.
    ///
    /// # Errors
    /// The first decode error aborts the read; no partial data set is returned.
    pub fn data_set<R: BufRead>(
        &self,
        input: R,
        format: DataFormat,
        structure: &DataStructure,
        flow_ref: DataflowRef,
        query: &DataQuery,
    ) -> Result<DataSet> {
        let cursor = self.data_cursor(input, format, structure);
        let data = query.execute_results(cursor.into_series()).collect::<Result<Vec<_>>>()?;
        info!("Data set {} read: {} series for key {}", flow_ref, data.len(), query.key);
        Ok(DataSet {
            flow_ref,
            query: query.clone(),
            data,
        })
    }

    /// Transcodes `bytes` to UTF-8 as configured.
    pub fn decode_input<'a>(&self, bytes: &'a [u8]) -> Cursor<Cow<'a, [u8]>> {
        Cursor::new(utils::to_utf8(bytes, self.options.encoding.as_deref()))
    }

    pub fn structure_message_from_bytes(&self, bytes: &[u8], format: StructureFormat) -> Result<StructureMessage> {
        self.structure_message(self.decode_input(bytes), format)
    }

    pub fn structures_from_bytes(&self, bytes: &[u8], format: StructureFormat) -> Result<Vec<DataStructure>> {
        self.structures(self.decode_input(bytes), format)
    }

    pub fn dataflows_from_bytes(&self, bytes: &[u8], format: StructureFormat) -> Result<Vec<Dataflow>> {
        self.dataflows(self.decode_input(bytes), format)
    }

    pub fn data_cursor_from_bytes<'a>(
        &self,
        bytes: &'a [u8],
        format: DataFormat,
        structure: &DataStructure,
    ) -> XmlDataCursor<Cursor<Cow<'a, [u8]>>> {
        self.data_cursor(self.decode_input(bytes), format, structure)
    }

    pub fn data_set_from_bytes(
        &self,
        bytes: &[u8],
        format: DataFormat,
        structure: &DataStructure,
        flow_ref: DataflowRef,
        query: &DataQuery,
    ) -> Result<DataSet> {
        self.data_set(self.decode_input(bytes), format, structure, flow_ref, query)
    }
}
