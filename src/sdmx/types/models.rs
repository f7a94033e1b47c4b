//! Core data structures for SDMX structural metadata and time series.
//!
//! This module defines the value types produced by the decoders:
//! - Resource references and codelists
//! - Data structure definitions (dimensions, attributes, measure)
//! - Dataflows
//! - Series, observations and materialized data sets

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::error::{Result, SdmxError};
use super::key::Key;
use super::query::DataQuery;

/// Attribute values keyed by attribute id.
pub type Meta = BTreeMap<String, String>;

const DEFAULT_AGENCY: &str = "all";
const DEFAULT_VERSION: &str = "latest";

/// A maintainable artefact reference: `(agency, id, version)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceRef {
    pub agency: String,
    pub id: String,
    pub version: String,
}

pub type DataflowRef = ResourceRef;
pub type DataStructureRef = ResourceRef;
pub type CodelistRef = ResourceRef;

impl ResourceRef {
    /// Builds a reference, substituting defaults for missing agency or version.
    pub fn of(agency: Option<&str>, id: &str, version: Option<&str>) -> ResourceRef {
        ResourceRef {
            agency: non_blank(agency).unwrap_or(DEFAULT_AGENCY).to_string(),
            id: id.to_string(),
            version: non_blank(version).unwrap_or(DEFAULT_VERSION).to_string(),
        }
    }

    /// Reference carrying only an id, as SDMX 2.0 messages often do.
    pub fn from_id(id: &str) -> ResourceRef {
        ResourceRef::of(None, id, None)
    }

    /// Parses `ID`, `AGENCY,ID` or `AGENCY,ID,VERSION`.
    pub fn parse(text: &str) -> Result<ResourceRef> {
        let parts: Vec<&str> = text.trim().split(',').map(str::trim).collect();
        let (agency, id, version) = match parts.as_slice() {
            [id] => (None, *id, None),
            [agency, id] => (Some(*agency), *id, None),
            [agency, id, version] => (Some(*agency), *id, Some(*version)),
            _ => return Err(SdmxError::InvalidReference(text.to_string())),
        };
        if id.is_empty() {
            return Err(SdmxError::InvalidReference(text.to_string()));
        }
        Ok(ResourceRef::of(agency, id, version))
    }

    /// Returns `true` if `other` is designated by this reference, where a
    /// default agency or version acts as a wildcard.
    pub fn contains(&self, other: &ResourceRef) -> bool {
        self.id == other.id
            && (self.agency == DEFAULT_AGENCY || self.agency == other.agency)
            && (self.version == DEFAULT_VERSION || self.version == other.version)
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.agency, self.id, self.version)
    }
}

impl FromStr for ResourceRef {
    type Err = SdmxError;

    fn from_str(s: &str) -> Result<Self> {
        ResourceRef::parse(s)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// A list of codes with their localized labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Codelist {
    pub reference: CodelistRef,
    pub codes: BTreeMap<String, String>,
}

impl Codelist {
    /// An empty codelist standing in for an unresolved reference.
    pub fn empty(reference: CodelistRef) -> Codelist {
        Codelist {
            reference,
            codes: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimension {
    pub id: String,
    /// 1-based position of the dimension in series keys.
    pub position: usize,
    pub label: String,
    pub codelist: Codelist,
}

/// Level at which an attribute applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeRelationship {
    Observation,
    Series,
    Group,
    Dataflow,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub id: String,
    pub label: String,
    pub codelist: Option<Codelist>,
    pub relationship: AttributeRelationship,
}

/// A data structure definition (DSD).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataStructure {
    reference: DataStructureRef,
    label: String,
    dimensions: Vec<Dimension>,
    attributes: Vec<Attribute>,
    time_dimension_id: String,
    primary_measure_id: String,
}

impl DataStructure {
    /// Creates a structure; dimensions are ordered by position.
    pub fn new(
        reference: DataStructureRef,
        label: String,
        mut dimensions: Vec<Dimension>,
        attributes: Vec<Attribute>,
        time_dimension_id: String,
        primary_measure_id: String,
    ) -> DataStructure {
        dimensions.sort_by_key(|d| d.position);
        DataStructure {
            reference,
            label,
            dimensions,
            attributes,
            time_dimension_id,
            primary_measure_id,
        }
    }

    pub fn reference(&self) -> &DataStructureRef {
        &self.reference
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Dimensions in key order.
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn time_dimension_id(&self) -> &str {
        &self.time_dimension_id
    }

    pub fn primary_measure_id(&self) -> &str {
        &self.primary_measure_id
    }

    pub fn dimension(&self, id: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.id == id)
    }

    pub fn attribute(&self, id: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.id == id)
    }
}

/// A dataflow: a named view over a data structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataflow {
    pub reference: DataflowRef,
    pub structure_ref: DataStructureRef,
    pub name: String,
    pub description: Option<String>,
}

/// A single observation.
#[derive(Debug, Clone, PartialEq)]
pub struct Obs {
    /// Raw SDMX time period, e.g. `2010`, `2010-Q1`, `2010-01-31`.
    pub period: String,
    pub value: Option<f64>,
    pub meta: Meta,
}

impl Obs {
    /// Total order on `(period, value)`; missing values sort first.
    pub fn compare(&self, other: &Obs) -> Ordering {
        self.period
            .cmp(&other.period)
            .then_with(|| match (self.value, other.value) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                (a, b) => a.is_some().cmp(&b.is_some()),
            })
    }

    /// Copy of this observation without attributes.
    pub fn without_meta(&self) -> Obs {
        Obs {
            period: self.period.clone(),
            value: self.value,
            meta: Meta::new(),
        }
    }
}

/// A time series: key, series-level attributes and ordered observations.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub key: Key,
    pub meta: Meta,
    pub obs: Vec<Obs>,
}

impl Series {
    /// Creates a series; observations are sorted by `(period, value)`.
    pub fn new(key: Key, meta: Meta, mut obs: Vec<Obs>) -> Series {
        obs.sort_by(Obs::compare);
        Series { key, meta, obs }
    }

    /// A series without observations nor attributes.
    pub fn skeleton(key: Key) -> Series {
        Series {
            key,
            meta: Meta::new(),
            obs: Vec::new(),
        }
    }

    pub fn is_skeleton(&self) -> bool {
        self.meta.is_empty() && self.obs.is_empty()
    }
}

/// A fully materialized response to a data query.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSet {
    pub flow_ref: DataflowRef,
    pub query: DataQuery,
    pub data: Vec<Series>,
}

impl DataSet {
    /// Applies `query` eagerly to the materialized series.
    pub fn get_data(&self, query: &DataQuery) -> Vec<Series> {
        query.execute(self.data.iter().cloned()).collect()
    }
}
