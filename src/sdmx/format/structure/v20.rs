//! Parser for SDMX 2.0 structure messages (`KeyFamily` shape).
//!
//! Components reference concepts with `conceptRef` and codelists by bare id
//! through the `codelist` attribute.

use std::collections::BTreeMap;
use std::io::BufRead;

use log::{debug, info, warn};
use quick_xml::events::BytesStart;

use super::common::{
    ComponentDecl, DsdContext, RefMatching, StructureMessage, enter_root, for_each_child, localized, text_of,
};
use crate::sdmx::codec::stream::{Visit, XmlStream, attribute, is_named, required_attribute};
use crate::sdmx::types::error::{Result, SdmxError};
use crate::sdmx::types::language::LanguagePriorityList;
use crate::sdmx::types::models::{
    AttributeRelationship, Codelist, CodelistRef, DataStructure, Dataflow, ResourceRef,
};

/// Decodes a whole SDMX 2.0 structure message.
pub fn parse<R: BufRead>(
    stream: &mut XmlStream<R>,
    languages: &LanguagePriorityList,
) -> Result<StructureMessage> {
    info!("Parsing SDMX 2.0 structure message");
    let mut ctx = DsdContext::new(languages.clone(), RefMatching::IdOnly);
    let mut message = StructureMessage::default();

    enter_root(stream, "Structure")?;
    stream.next_while(|s, e, empty| {
        if empty {
            return Ok(Visit::Continue);
        }
        match e.local_name().as_ref() {
            b"CodeLists" => parse_codelists(s, &mut ctx)?,
            b"Concepts" => parse_concepts(s, &mut ctx)?,
            b"KeyFamilies" => parse_key_families(s, &mut ctx, &mut message.structures)?,
            b"Dataflows" => parse_dataflows(s, &ctx, &mut message.dataflows)?,
            _ => {}
        }
        Ok(Visit::Continue)
    })?;

    info!(
        "Structure message parsed: {} key families, {} dataflows",
        message.structures.len(),
        message.dataflows.len()
    );
    Ok(message)
}

fn maintainable_ref(e: &BytesStart<'_>, element: &'static str) -> Result<ResourceRef> {
    let id = required_attribute(e, "id", element)?;
    let agency = attribute(e, b"agencyID")?;
    let version = attribute(e, b"version")?;
    Ok(ResourceRef::of(agency.as_deref(), &id, version.as_deref()))
}

fn parse_codelists<R: BufRead>(stream: &mut XmlStream<R>, ctx: &mut DsdContext) -> Result<()> {
    for_each_child(stream, b"CodeList", |s, e, empty| {
        let reference = maintainable_ref(e, "CodeList")?;
        let mut codes = BTreeMap::new();
        if !empty {
            let mut label = ctx.text_builder();
            for_each_child(s, b"Code", |s, e, empty| {
                let value = required_attribute(e, "value", "Code")?;
                label.clear();
                if !empty {
                    for_each_child(s, b"Description", |s, e, empty| {
                        let (lang, text) = localized(s, e, empty)?;
                        label.put(lang.as_deref(), text);
                        Ok(())
                    })?;
                }
                codes.insert(value.clone(), label.build_or(&value));
                Ok(())
            })?;
        }
        ctx.add_codelist(Codelist { reference, codes });
        Ok(())
    })
}

fn parse_concepts<R: BufRead>(stream: &mut XmlStream<R>, ctx: &mut DsdContext) -> Result<()> {
    stream.next_while(|s, e, empty| {
        match e.local_name().as_ref() {
            b"Concept" => parse_concept(s, e, empty, ctx)?,
            b"ConceptScheme" if !empty => {
                for_each_child(s, b"Concept", |s, e, empty| parse_concept(s, e, empty, ctx))?
            }
            _ => {}
        }
        Ok(Visit::Continue)
    })?;
    Ok(())
}

fn parse_concept<R: BufRead>(
    stream: &mut XmlStream<R>,
    e: &BytesStart<'_>,
    empty: bool,
    ctx: &mut DsdContext,
) -> Result<()> {
    let id = required_attribute(e, "id", "Concept")?;
    let agency = attribute(e, b"coreRepresentationAgency")?;
    let core = attribute(e, b"coreRepresentation")?
        .map(|codelist| CodelistRef::of(agency.as_deref(), &codelist, None));
    let mut label = ctx.text_builder();
    if !empty {
        for_each_child(stream, b"Name", |s, e, empty| {
            let (lang, text) = localized(s, e, empty)?;
            label.put(lang.as_deref(), text);
            Ok(())
        })?;
    }
    let label = label.build_or(&id);
    ctx.add_concept(id, label, core);
    Ok(())
}

fn parse_dataflows<R: BufRead>(
    stream: &mut XmlStream<R>,
    ctx: &DsdContext,
    out: &mut Vec<Dataflow>,
) -> Result<()> {
    for_each_child(stream, b"Dataflow", |s, e, empty| {
        let reference = maintainable_ref(e, "Dataflow")?;
        let mut name = ctx.text_builder();
        let mut description = ctx.text_builder();
        let (mut kf_id, mut kf_agency, mut kf_version) = (None, None, None);
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
                    b"KeyFamilyRef" if !empty => {
                        s.next_while(|s, e, empty| {
                            match e.local_name().as_ref() {
                                b"KeyFamilyID" => kf_id = Some(text_of(s, empty)?),
                                b"KeyFamilyAgencyID" => kf_agency = Some(text_of(s, empty)?),
                                b"Version" => kf_version = Some(text_of(s, empty)?),
                                _ => {}
                            }
                            Ok(Visit::Continue)
                        })?;
                    }
                    _ => {}
                }
                Ok(Visit::Continue)
            })?;
        }
        let kf_id = kf_id.filter(|id| !id.is_empty()).ok_or_else(|| SdmxError::MissingElement {
            element: "KeyFamilyID",
            context: format!("dataflow {}", reference),
        })?;
        let structure_ref = ResourceRef::of(kf_agency.as_deref(), &kf_id, kf_version.as_deref());
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

fn parse_key_families<R: BufRead>(
    stream: &mut XmlStream<R>,
    ctx: &mut DsdContext,
    out: &mut Vec<DataStructure>,
) -> Result<()> {
    for_each_child(stream, b"KeyFamily", |s, e, empty| {
        let reference = maintainable_ref(e, "KeyFamily")?;
        ctx.start_structure();
        let mut label = ctx.text_builder();
        let mut dimensions = Vec::new();
        let mut attributes = Vec::new();
        let mut time_dimension = None;
        let mut primary_measure = None;
        if !empty {
            s.next_while(|s, e, empty| {
                match e.local_name().as_ref() {
                    b"Name" => {
                        let (lang, text) = localized(s, e, empty)?;
                        label.put(lang.as_deref(), text);
                    }
                    b"Components" if !empty => {
                        s.next_while(|s, e, empty| {
                            match e.local_name().as_ref() {
                                b"Dimension" => {
                                    let decl = component(s, e, empty, "Dimension")?;
                                    dimensions.push(ctx.dimension(decl, None)?);
                                }
                                b"TimeDimension" => {
                                    time_dimension = Some(required_attribute(e, "conceptRef", "TimeDimension")?);
                                }
                                b"PrimaryMeasure" => {
                                    primary_measure = Some(required_attribute(e, "conceptRef", "PrimaryMeasure")?);
                                }
                                b"Attribute" => {
                                    let decl = component(s, e, empty, "Attribute")?;
                                    attributes.push(ctx.attribute(decl));
                                }
                                _ => {}
                            }
                            Ok(Visit::Continue)
                        })?;
                    }
                    _ => {}
                }
                Ok(Visit::Continue)
            })?;
        }
        let time_dimension = time_dimension.ok_or_else(|| SdmxError::MissingElement {
            element: "TimeDimension",
            context: format!("key family {}", reference),
        })?;
        let primary_measure = primary_measure.ok_or_else(|| SdmxError::MissingElement {
            element: "PrimaryMeasure",
            context: format!("key family {}", reference),
        })?;
        debug!(
            "Key family {}: {} dimensions, {} attributes",
            reference,
            dimensions.len(),
            attributes.len()
        );
        out.push(DataStructure::new(
            reference.clone(),
            label.build_or(&reference.id),
            dimensions,
            attributes,
            time_dimension,
            primary_measure,
        ));
        Ok(())
    })
}

/// Reads a 2.0 component declaration and its attachment children.
fn component<R: BufRead>(
    stream: &mut XmlStream<R>,
    e: &BytesStart<'_>,
    empty: bool,
    element: &'static str,
) -> Result<ComponentDecl> {
    let concept = required_attribute(e, "conceptRef", element)?;
    let agency = attribute(e, b"codelistAgency")?;
    let version = attribute(e, b"codelistVersion")?;
    let local_codelist = attribute(e, b"codelist")?
        .map(|codelist| CodelistRef::of(agency.as_deref(), &codelist, version.as_deref()));
    let attachment = match attribute(e, b"attachmentLevel")? {
        Some(level) => attachment_level(&level),
        None => None,
    };
    let mut decl = ComponentDecl {
        id: concept.clone(),
        concept_id: Some(concept),
        local_codelist,
        attachment,
        ..Default::default()
    };
    if !empty {
        stream.next_while(|_, e, _| {
            if is_named(e, b"AttachmentMeasure") {
                decl.measure_ref = true;
            }
            Ok(Visit::Continue)
        })?;
    }
    Ok(decl)
}

fn attachment_level(level: &str) -> Option<AttributeRelationship> {
    match level {
        "Observation" => Some(AttributeRelationship::Observation),
        "Series" => Some(AttributeRelationship::Series),
        "Group" => Some(AttributeRelationship::Group),
        "DataSet" => Some(AttributeRelationship::Dataflow),
        other => {
            warn!("Unknown attachment level '{}', inferring from structure", other);
            None
        }
    }
}
