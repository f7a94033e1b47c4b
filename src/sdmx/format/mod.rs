//! Message format layer for SDMX-ML.
//!
//! This module bridges the token reader in [`codec`](crate::sdmx::codec)
//! and the high-level [`SdmxReader`](crate::sdmx::reader::SdmxReader).
//!
//! # Module Organization
//!
//! - [`structure`]: Decodes structure messages into data structures and dataflows
//! - [`data`]: Streams data messages through a [`DataCursor`](crate::sdmx::cursor::DataCursor)
//!
//! # Architecture
//!
//! ```text
//! Structure message:              Data message:
//! ┌──────────────────┐            ┌──────────────────┐
//! │ Codelists        │            │ Header           │ ← skipped
//! │ Concepts         │            ├──────────────────┤
//! │ DataStructures / │            │ DataSet          │
//! │ KeyFamilies      │            │  ├ Series        │ ← next_series()
//! │ Dataflows        │            │  │  └ Obs*       │ ← next_obs()
//! └──────────────────┘            │  └ Series ...    │
//!   structure::parse()            └──────────────────┘
//!                                   data::XmlDataCursor
//! ```

pub mod data;
pub mod structure;
