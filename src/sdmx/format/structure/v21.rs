//! Parser for SDMX 2.1 structure messages (`DataStructure` shape).
//!
//! ```text
//! Structure
//! ├── Header
//! └── Structures
//!     ├── Dataflows/Dataflow ─ Name, Description, Structure/Ref
//!     ├── Codelists/Codelist ─ Name, Code/Name
//!     ├── Concepts/ConceptScheme/Concept ─ Name, CoreRepresentation/Enumeration/Ref
//!     └── DataStructures/DataStructure
//!         ├── Name
//!         └── DataStructureComponents
//!             ├── DimensionList ─ Dimension | MeasureDimension, TimeDimension
//!             ├── AttributeList ─ Attribute/AttributeRelationship
//!             └── MeasureList ─ PrimaryMeasure
//! ```

use std::collections::BTreeMap;
use std::io::BufRead;

use log::{debug, info};
use quick_xml::events::BytesStart;

use super::common::{
    ComponentDecl, DsdContext, RefMatching, StructureMessage, enter_root, for_each_child, localized,
};
use crate::sdmx::codec::stream::{Visit, XmlStream, attribute, is_named, required_attribute};
use crate::sdmx::types::error::{Result, SdmxError};
use crate::sdmx::types::language::LanguagePriorityList;
use crate::sdmx::types::models::{
    Attribute, Codelist, DataStructure, Dataflow, Dimension, ResourceRef,
};

/// Decodes a whole SDMX 2.1 structure message.
pub fn parse<R: BufRead>(
    stream: &mut XmlStream<R>,
    languages: &LanguagePriorityList,
) -> Result<StructureMessage> {
    info!("Parsing SDMX 2.1 structure message");
    let mut ctx = DsdContext::new(languages.clone(), RefMatching::Full);
    let mut message = StructureMessage::default();

    enter_root(stream, "Structure")?;
    for_each_child(stream, b"Structures", |s, _, empty| {
        if empty {
            return Ok(());
        }
        s.next_while(|s, e, empty| {
            if empty {
                return Ok(Visit::Continue);
            }
            match e.local_name().as_ref() {
                b"Codelists" => parse_codelists(s, &mut ctx)?,
                b"Concepts" => parse_concepts(s, &mut ctx)?,
                b"DataStructures" => parse_data_structures(s, &mut ctx, &mut message.structures)?,
                b"Dataflows" => parse_dataflows(s, &ctx, &mut message.dataflows)?,
                _ => {}
            }
            Ok(Visit::Continue)
        })?;
        Ok(())
    })?;

    info!(
        "Structure message parsed: {} data structures, {} dataflows",
        message.structures.len(),
        message.dataflows.len()
    );
    Ok(message)
}

/// Reads `agencyID`, `id` and `version` from a maintainable artefact or a `Ref`.
fn resource_ref(e: &BytesStart<'_>, element: &'static str) -> Result<ResourceRef> {
    let id = required_attribute(e, "id", element)?;
    let agency = attribute(e, b"agencyID")?;
    let version = attribute(e, b"version")?;
    Ok(ResourceRef::of(agency.as_deref(), &id, version.as_deref()))
}

/// Finds the first `Ref` below the element just entered.
fn nested_ref<R: BufRead>(stream: &mut XmlStream<R>, empty: bool) -> Result<Option<ResourceRef>> {
    let mut found = None;
    if empty {
        return Ok(found);
    }
    stream.next_while(|s, e, empty| {
        if is_named(e, b"Ref") {
            found = Some(resource_ref(e, "Ref")?);
            return Ok(Visit::Halt);
        }
        if !empty {
            found = nested_ref(s, false)?;
            if found.is_some() {
                return Ok(Visit::Halt);
            }
        }
        Ok(Visit::Continue)
    })?;
    Ok(found)
}

fn parse_codelists<R: BufRead>(stream: &mut XmlStream<R>, ctx: &mut DsdContext) -> Result<()> {
    for_each_child(stream, b"Codelist", |s, e, empty| {
        let reference = resource_ref(e, "Codelist")?;
        let mut codes = BTreeMap::new();
        if !empty {
            let mut label = ctx.text_builder();
            for_each_child(s, b"Code", |s, e, empty| {
                let id = required_attribute(e, "id", "Code")?;
                label.clear();
                if !empty {
                    for_each_child(s, b"Name", |s, e, empty| {
                        let (lang, text) = localized(s, e, empty)?;
                        label.put(lang.as_deref(), text);
                        Ok(())
                    })?;
                }
                codes.insert(id.clone(), label.build_or(&id));
                Ok(())
            })?;
        }
        ctx.add_codelist(Codelist { reference, codes });
        Ok(())
    })
}

fn parse_concepts<R: BufRead>(stream: &mut XmlStream<R>, ctx: &mut DsdContext) -> Result<()> {
    for_each_child(stream, b"ConceptScheme", |s, _, empty| {
        if empty {
            return Ok(());
        }
        for_each_child(s, b"Concept", |s, e, empty| {
            let id = required_attribute(e, "id", "Concept")?;
            let mut label = ctx.text_builder();
            let mut core = None;
            if !empty {
                s.next_while(|s, e, empty| {
                    match e.local_name().as_ref() {
                        b"Name" => {
                            let (lang, text) = localized(s, e, empty)?;
                            label.put(lang.as_deref(), text);
                        }
                        b"CoreRepresentation" => core = nested_ref(s, empty)?,
                        _ => {}
                    }
                    Ok(Visit::Continue)
                })?;
            }
            let label = label.build_or(&id);
            ctx.add_concept(id, label, core);
            Ok(())
        })
    })
}

fn parse_dataflows<R: BufRead>(
    stream: &mut XmlStream<R>,
    ctx: &DsdContext,
    out: &mut Vec<Dataflow>,
) -> Result<()> {
    for_each_child(stream, b"Dataflow", |s, e, empty| {
        let reference = resource_ref(e, "Dataflow")?;
        let mut name = ctx.text_builder();
        let mut description = ctx.text_builder();
        let mut structure_ref = None;
        if !empty {
            s.next_while(|s, e, empty| {
                match e.local_name().as_ref() {
                    b"Name" => {
                        let (lang, text) = localized(s, e, empty)?;
                        name.put(lang.as_deref(), text);
                    }
                    b"Description" => {
                        let (lang, text) = localized(s, e, empty)?;
                        description.put(lang.as_deref(), text);
                    }
                    b"Structure" => structure_ref = nested_ref(s, empty)?,
                    _ => {}
                }
                Ok(Visit::Continue)
            })?;
        }
        let structure_ref = structure_ref.ok_or_else(|| SdmxError::MissingElement {
            element: "Structure",
            context: format!("dataflow {}", reference),
        })?;
        debug!("Dataflow {} -> {}", reference, structure_ref);
        out.push(Dataflow {
            name: name.build_or(&reference.id),
            description: description.build(),
            reference,
            structure_ref,
        });
        Ok(())
    })
}

/// Components collected while walking `DataStructureComponents`.
#[derive(Default)]
struct Components {
    dimensions: Vec<Dimension>,
    attributes: Vec<Attribute>,
    time_dimension: Option<String>,
    primary_measure: Option<String>,
}

fn parse_data_structures<R: BufRead>(
    stream: &mut XmlStream<R>,
    ctx: &mut DsdContext,
    out: &mut Vec<DataStructure>,
) -> Result<()> {
    for_each_child(stream, b"DataStructure", |s, e, empty| {
        let reference = resource_ref(e, "DataStructure")?;
        ctx.start_structure();
        let mut label = ctx.text_builder();
        let mut components = Components::default();
        if !empty {
            s.next_while(|s, e, empty| {
                match e.local_name().as_ref() {
                    b"Name" => {
                        let (lang, text) = localized(s, e, empty)?;
                        label.put(lang.as_deref(), text);
                    }
                    b"DataStructureComponents" if !empty => parse_components(s, ctx, &mut components)?,
                    _ => {}
                }
                Ok(Visit::Continue)
            })?;
        }
        let context = || format!("data structure {}", reference);
        let time_dimension = components.time_dimension.ok_or_else(|| SdmxError::MissingElement {
            element: "TimeDimension",
            context: context(),
        })?;
        let primary_measure = components.primary_measure.ok_or_else(|| SdmxError::MissingElement {
            element: "PrimaryMeasure",
            context: context(),
        })?;
        debug!(
            "Data structure {}: {} dimensions, {} attributes",
            reference,
            components.dimensions.len(),
            components.attributes.len()
        );
        out.push(DataStructure::new(
            reference.clone(),
            label.build_or(&reference.id),
            components.dimensions,
            components.attributes,
            time_dimension,
            primary_measure,
        ));
        Ok(())
    })
}

fn parse_components<R: BufRead>(
    stream: &mut XmlStream<R>,
    ctx: &mut DsdContext,
    components: &mut Components,
) -> Result<()> {
    stream.next_while(|s, e, empty| {
        if empty {
            return Ok(Visit::Continue);
        }
        match e.local_name().as_ref() {
            b"DimensionList" => s.next_while(|s, e, empty| {
                match e.local_name().as_ref() {
                    b"Dimension" | b"MeasureDimension" => {
                        let position = attribute(e, b"position")?
                            .map(|p| parse_position(&p))
                            .transpose()?;
                        let decl = component(s, e, empty, "Dimension")?;
                        components.dimensions.push(ctx.dimension(decl, position)?);
                    }
                    b"TimeDimension" => {
                        components.time_dimension = Some(required_attribute(e, "id", "TimeDimension")?);
                    }
                    _ => {}
                }
                Ok(Visit::Continue)
            })?,
            b"AttributeList" => s.next_while(|s, e, empty| {
                if is_named(e, b"Attribute") {
                    let decl = component(s, e, empty, "Attribute")?;
                    components.attributes.push(ctx.attribute(decl));
                }
                Ok(Visit::Continue)
            })?,
            b"MeasureList" => s.next_while(|_, e, _| {
                if is_named(e, b"PrimaryMeasure") {
                    components.primary_measure = Some(required_attribute(e, "id", "PrimaryMeasure")?);
                }
                Ok(Visit::Continue)
            })?,
            _ => Visit::Continue,
        };
        Ok(Visit::Continue)
    })?;
    Ok(())
}

/// Reads the concept identity, local representation and attribute relationship.
fn component<R: BufRead>(
    stream: &mut XmlStream<R>,
    e: &BytesStart<'_>,
    empty: bool,
    element: &'static str,
) -> Result<ComponentDecl> {
    let mut decl = ComponentDecl {
        id: required_attribute(e, "id", element)?,
        ..Default::default()
    };
    if empty {
        return Ok(decl);
    }
    stream.next_while(|s, e, empty| {
        match e.local_name().as_ref() {
            b"ConceptIdentity" => decl.concept_id = nested_ref(s, empty)?.map(|r| r.id),
            b"LocalRepresentation" => decl.local_codelist = nested_ref(s, empty)?,
            b"AttributeRelationship" if !empty => {
                s.next_while(|_, e, _| {
                    match e.local_name().as_ref() {
                        b"Dimension" => decl.dimension_refs += 1,
                        b"PrimaryMeasure" => decl.measure_ref = true,
                        _ => {}
                    }
                    Ok(Visit::Continue)
                })?;
            }
            _ => {}
        }
        Ok(Visit::Continue)
    })?;
    Ok(decl)
}

fn parse_position(text: &str) -> Result<usize> {
    match text.trim().parse::<usize>() {
        Ok(position) if position > 0 => Ok(position),
        _ => Err(SdmxError::InvalidFormat(format!("Invalid dimension position '{}'", text))),
    }
}
