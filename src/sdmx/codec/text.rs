//! Localized text selection.
//!
//! SDMX messages carry names and descriptions once per language
//! (`<Name xml:lang="fr">…</Name>`). Decoders collect them in document order
//! and pick the best one for the caller's [`LanguagePriorityList`].

use crate::sdmx::types::language::{ANY_RANGE, LanguagePriorityList};

/// Language assumed when an element has no `xml:lang` attribute.
pub const DEFAULT_LANG: &str = "en";

/// Picks the best text for `languages` among `(lang, text)` entries.
///
/// Performs an RFC 4647 lookup over the entry tags. Without a match, falls
/// back to the `en` entry, then to the first non-blank entry.
pub fn select<'a>(languages: &LanguagePriorityList, entries: &'a [(String, String)]) -> Option<&'a str> {
    let find = |tag: &str| {
        entries
            .iter()
            .find(|(lang, text)| lang.eq_ignore_ascii_case(tag) && !text.trim().is_empty())
            .map(|(_, text)| text.as_str())
    };

    for range in languages.ranges() {
        if range.range == ANY_RANGE {
            continue;
        }
        let mut candidate = range.range.replace("-*", "");
        loop {
            if let Some(text) = find(&candidate) {
                return Some(text);
            }
            if !truncate_tag(&mut candidate) {
                break;
            }
        }
    }

    find(DEFAULT_LANG).or_else(|| {
        entries
            .iter()
            .map(|(_, text)| text.as_str())
            .find(|text| !text.trim().is_empty())
    })
}

/// Drops the last subtag, and a dangling singleton before it.
fn truncate_tag(tag: &mut String) -> bool {
    let Some(pos) = tag.rfind('-') else {
        return false;
    };
    tag.truncate(pos);
    if let Some(pos) = tag.rfind('-')
        && tag.len() - pos == 2
    {
        tag.truncate(pos);
    }
    true
}

/// Accumulates localized texts for one element and resolves the best one.
#[derive(Debug, Clone)]
pub struct TextBuilder {
    languages: LanguagePriorityList,
    entries: Vec<(String, String)>,
}

impl TextBuilder {
    pub fn new(languages: LanguagePriorityList) -> TextBuilder {
        TextBuilder {
            languages,
            entries: Vec::new(),
        }
    }

    /// Records `text` for `lang` (defaults to [`DEFAULT_LANG`]).
    pub fn put(&mut self, lang: Option<&str>, text: impl Into<String>) -> &mut Self {
        let lang = lang.filter(|l| !l.trim().is_empty()).unwrap_or(DEFAULT_LANG);
        self.entries.push((lang.to_string(), text.into()));
        self
    }

    pub fn clear(&mut self) -> &mut Self {
        self.entries.clear();
        self
    }

    pub fn build(&self) -> Option<String> {
        select(&self.languages, &self.entries).map(str::to_string)
    }

    /// Like [`build`](Self::build), with a fallback (usually the element id).
    pub fn build_or(&self, default: &str) -> String {
        self.build().unwrap_or_else(|| default.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(l, t)| (l.to_string(), t.to_string()))
            .collect()
    }

    #[test]
    fn lookup_truncates_ranges() {
        let langs = LanguagePriorityList::parse("fr-BE-x-custom,nl;q=0.5").unwrap();
        let texts = entries(&[("en", "Belgium"), ("fr", "Belgique"), ("nl", "België")]);
        assert_eq!(select(&langs, &texts), Some("Belgique"));
    }

    #[test]
    fn lookup_honors_weights() {
        let langs = LanguagePriorityList::parse("de;q=0.2,nl;q=0.9").unwrap();
        let texts = entries(&[("de", "Belgien"), ("nl", "België")]);
        assert_eq!(select(&langs, &texts), Some("België"));
    }

    #[test]
    fn falls_back_to_english_then_first_non_blank() {
        let langs = LanguagePriorityList::parse("ja").unwrap();
        assert_eq!(
            select(&langs, &entries(&[("fr", "Belgique"), ("en", "Belgium")])),
            Some("Belgium")
        );
        assert_eq!(
            select(&langs, &entries(&[("fr", " "), ("en", ""), ("nl", "België")])),
            Some("België")
        );
        assert_eq!(select(&langs, &entries(&[("fr", "  ")])), None);
        assert_eq!(select(&langs, &[]), None);
    }

    #[test]
    fn any_range_only_uses_fallbacks() {
        let texts = entries(&[("fr", "Belgique"), ("nl", "België")]);
        assert_eq!(select(&LanguagePriorityList::any(), &texts), Some("Belgique"));
    }

    #[test]
    fn builder_defaults_missing_lang_and_id() {
        let mut builder = TextBuilder::new(LanguagePriorityList::parse("en").unwrap());
        assert_eq!(builder.build_or("EXR"), "EXR");
        builder.put(None, "Exchange rates");
        assert_eq!(builder.build().as_deref(), Some("Exchange rates"));
        builder.clear();
        assert_eq!(builder.build(), None);
    }
}
