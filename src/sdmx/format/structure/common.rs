//! Resolution logic shared by the v2.0 and v2.1 structure decoders.
//!
//! Both decoders make a single forward pass and feed what they read into a
//! [`DsdContext`]: codelists and concepts declared earlier in the message
//! are later resolved when dimensions and attributes reference them.

use std::collections::HashMap;
use std::io::BufRead;

use log::{trace, warn};
use quick_xml::events::BytesStart;

use crate::sdmx::codec::stream::{Visit, XmlStream, attribute, is_named, name_of};
use crate::sdmx::codec::text::TextBuilder;
use crate::sdmx::types::error::{Result, SdmxError};
use crate::sdmx::types::language::LanguagePriorityList;
use crate::sdmx::types::models::{
    Attribute, AttributeRelationship, Codelist, CodelistRef, DataStructure, Dataflow, Dimension,
};

/// Everything decoded from one structure message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructureMessage {
    pub structures: Vec<DataStructure>,
    pub dataflows: Vec<Dataflow>,
}

/// How codelist references are matched against declared codelists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefMatching {
    /// SDMX 2.0: bare codelist id.
    IdOnly,
    /// SDMX 2.1: agency, id and version.
    Full,
}

#[derive(Debug, Clone)]
struct Concept {
    label: String,
    core_representation: Option<CodelistRef>,
}

/// What a decoder collected about one dimension or attribute.
#[derive(Debug, Clone, Default)]
pub struct ComponentDecl {
    pub id: String,
    pub concept_id: Option<String>,
    /// Local representation, which wins over the concept's core representation.
    pub local_codelist: Option<CodelistRef>,
    pub dimension_refs: usize,
    pub measure_ref: bool,
    /// Explicit attachment level, as declared by SDMX 2.0 messages.
    pub attachment: Option<AttributeRelationship>,
}

/// Transient state of one structure decode.
pub struct DsdContext {
    languages: LanguagePriorityList,
    matching: RefMatching,
    codelists: Vec<Codelist>,
    concepts: HashMap<String, Concept>,
    dimension_count: usize,
}

impl DsdContext {
    pub fn new(languages: LanguagePriorityList, matching: RefMatching) -> DsdContext {
        DsdContext {
            languages,
            matching,
            codelists: Vec::new(),
            concepts: HashMap::new(),
            dimension_count: 0,
        }
    }

    pub fn languages(&self) -> &LanguagePriorityList {
        &self.languages
    }

    pub fn text_builder(&self) -> TextBuilder {
        TextBuilder::new(self.languages.clone())
    }

    pub fn add_codelist(&mut self, codelist: Codelist) {
        trace!("Codelist {} with {} codes", codelist.reference, codelist.codes.len());
        self.codelists.push(codelist);
    }

    pub fn add_concept(&mut self, id: String, label: String, core_representation: Option<CodelistRef>) {
        self.concepts.insert(
            id,
            Concept {
                label,
                core_representation,
            },
        );
    }

    /// Restarts the dimension count for a new data structure.
    pub fn start_structure(&mut self) {
        self.dimension_count = 0;
    }

    pub fn dimension_count(&self) -> usize {
        self.dimension_count
    }

    /// Label of a component: its concept's label, else its id.
    pub fn label(&self, decl: &ComponentDecl) -> String {
        let concept_id = decl.concept_id.as_deref().unwrap_or(&decl.id);
        match self.concepts.get(concept_id) {
            Some(concept) => concept.label.clone(),
            None => {
                warn!("Unknown concept '{}' for component '{}'", concept_id, decl.id);
                decl.id.clone()
            }
        }
    }

    /// Local representation if present, else the concept's core representation.
    pub fn codelist_ref(&self, decl: &ComponentDecl) -> Option<CodelistRef> {
        decl.local_codelist.clone().or_else(|| {
            let concept_id = decl.concept_id.as_deref().unwrap_or(&decl.id);
            self.concepts
                .get(concept_id)
                .and_then(|c| c.core_representation.clone())
        })
    }

    /// The declared codelist matching `reference`, or an empty one keyed by it.
    pub fn codelist(&self, reference: CodelistRef) -> Codelist {
        let found = self.codelists.iter().find(|c| match self.matching {
            RefMatching::IdOnly => c.reference.id == reference.id,
            RefMatching::Full => reference.contains(&c.reference),
        });
        match found {
            Some(codelist) => codelist.clone(),
            None => {
                warn!("Codelist {} not found in message, using an empty one", reference);
                Codelist::empty(reference)
            }
        }
    }

    /// Resolves a dimension and counts it.
    pub fn dimension(&mut self, decl: ComponentDecl, position: Option<usize>) -> Result<Dimension> {
        self.dimension_count += 1;
        let reference = self
            .codelist_ref(&decl)
            .ok_or_else(|| SdmxError::UnresolvedReference {
                kind: "codelist",
                reference: format!("dimension '{}'", decl.id),
            })?;
        Ok(Dimension {
            position: position.unwrap_or(self.dimension_count),
            label: self.label(&decl),
            codelist: self.codelist(reference),
            id: decl.id,
        })
    }

    /// Resolves an attribute; must be called after all dimensions are counted.
    pub fn attribute(&self, decl: ComponentDecl) -> Attribute {
        let relationship = decl
            .attachment
            .unwrap_or_else(|| self.relationship(decl.dimension_refs, decl.measure_ref));
        Attribute {
            label: self.label(&decl),
            codelist: self.codelist_ref(&decl).map(|r| self.codelist(r)),
            relationship,
            id: decl.id,
        }
    }

    /// Infers the attachment level from the referenced components.
    pub fn relationship(&self, dimension_refs: usize, measure_ref: bool) -> AttributeRelationship {
        match dimension_refs {
            0 if measure_ref => AttributeRelationship::Observation,
            0 => AttributeRelationship::Dataflow,
            d if d < self.dimension_count => AttributeRelationship::Group,
            _ => AttributeRelationship::Series,
        }
    }
}

/// Enters the root element `name`, failing on any other root.
pub fn enter_root<R: BufRead>(stream: &mut XmlStream<R>, name: &'static str) -> Result<()> {
    let mut root = None;
    let outcome = stream.next_while(|_, e, _| {
        root = Some(name_of(e));
        Ok(Visit::Suspend)
    })?;
    match root {
        Some(found) if outcome == Visit::Suspend && found == name => Ok(()),
        found => Err(SdmxError::MissingElement {
            element: name,
            context: format!("message root (found {})", found.as_deref().unwrap_or("nothing")),
        }),
    }
}

/// Reads `xml:lang` and the text of a localized element.
pub fn localized<R: BufRead>(
    stream: &mut XmlStream<R>,
    e: &BytesStart<'_>,
    empty: bool,
) -> Result<(Option<String>, String)> {
    let lang = attribute(e, b"xml:lang")?;
    Ok((lang, text_of(stream, empty)?))
}

/// Text content of the element just entered; empty for self-closing tags.
pub fn text_of<R: BufRead>(stream: &mut XmlStream<R>, empty: bool) -> Result<String> {
    if empty {
        Ok(String::new())
    } else {
        stream.read_text().map(|t| t.trim().to_string())
    }
}

/// Visits direct children named `name`, calling `f` for each.
pub fn for_each_child<R, F>(stream: &mut XmlStream<R>, name: &[u8], mut f: F) -> Result<()>
where
    R: BufRead,
    F: FnMut(&mut XmlStream<R>, &BytesStart<'_>, bool) -> Result<()>,
{
    stream.next_while(|s, e, empty| {
        if is_named(e, name) {
            f(s, e, empty)?;
        }
        Ok(Visit::Continue)
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context_with_dimensions(count: usize) -> DsdContext {
        let mut ctx = DsdContext::new(LanguagePriorityList::any(), RefMatching::Full);
        ctx.add_concept("FREQ".into(), "Frequency".into(), Some(CodelistRef::from_id("CL_FREQ")));
        for i in 0..count {
            ctx.dimension(
                ComponentDecl {
                    id: format!("D{}", i),
                    concept_id: Some("FREQ".into()),
                    ..Default::default()
                },
                None,
            )
            .unwrap();
        }
        ctx
    }

    #[test]
    fn relationship_follows_dimension_references() {
        let ctx = context_with_dimensions(3);
        assert_eq!(ctx.relationship(0, true), AttributeRelationship::Observation);
        assert_eq!(ctx.relationship(0, false), AttributeRelationship::Dataflow);
        assert_eq!(ctx.relationship(2, false), AttributeRelationship::Group);
        assert_eq!(ctx.relationship(3, false), AttributeRelationship::Series);
    }

    #[test]
    fn local_representation_wins_over_core() {
        let mut ctx = context_with_dimensions(0);
        let dimension = ctx
            .dimension(
                ComponentDecl {
                    id: "FREQ".into(),
                    concept_id: Some("FREQ".into()),
                    local_codelist: Some(CodelistRef::of(Some("ECB"), "CL_FREQ_LOCAL", Some("1.0"))),
                    ..Default::default()
                },
                None,
            )
            .unwrap();
        assert_eq!(dimension.codelist.reference.id, "CL_FREQ_LOCAL");
        assert!(dimension.codelist.codes.is_empty());
        assert_eq!(dimension.label, "Frequency");
        assert_eq!(dimension.position, 1);
    }

    #[test]
    fn dimension_without_any_codelist_is_rejected() {
        let mut ctx = context_with_dimensions(0);
        let err = ctx
            .dimension(
                ComponentDecl {
                    id: "REF_AREA".into(),
                    ..Default::default()
                },
                None,
            )
            .unwrap_err();
        assert!(matches!(err, SdmxError::UnresolvedReference { .. }));
    }
}
