//! Core SDMX decoding module

pub mod codec;
pub mod cursor;
pub mod format;
pub mod iter;
pub mod reader;
pub mod types;
pub mod utils;

pub use cursor::{DataCursor, SeriesCursor};
pub use format::data::{DataFormat, XmlDataCursor};
pub use format::structure::{StructureFormat, StructureMessage};
pub use iter::SeriesIterator;
pub use reader::{DecodeOptions, SdmxReader};
pub use types::error::{Result, SdmxError};
pub use types::key::{Key, KeyBuilder};
pub use types::language::LanguagePriorityList;
pub use types::models;
pub use types::query::{DataFilter, DataQuery, Detail};
