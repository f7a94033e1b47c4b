//! # sdmx-reader
//!
//! A decoder for SDMX-ML statistical messages.
//! Reads structure messages (SDMX 2.0 key families and SDMX 2.1 data
//! structures) and streams Generic and Compact data messages series by
//! series, with key filtering and detail projection on top.
pub mod sdmx;

// Re-export the main types for convenience
pub use sdmx::{
    DataCursor,
    DataFilter,
    DataFormat,
    DataQuery,
    DecodeOptions,
    Detail,
    Key,
    KeyBuilder,
    LanguagePriorityList,
    Result,
    SdmxError,
    SdmxReader,
    StructureFormat,
    models::{
        Attribute,
        AttributeRelationship,
        Codelist,
        DataSet,
        DataStructure,
        Dataflow,
        Dimension,
        Obs,
        ResourceRef,
        Series,
    },
};
