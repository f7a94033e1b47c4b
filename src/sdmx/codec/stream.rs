//! Forward-only tag reader with suspend/resume scanning.
//!
//! [`XmlStream`] wraps a quick-xml pull reader and tracks element depth, so
//! decoders can walk one nesting level at a time with [`XmlStream::next_while`]
//! and stop in the middle of a document without buffering siblings.

use std::io::BufRead;

use log::trace;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::sdmx::types::error::{Result, SdmxError};

/// Answer of a visitor, and outcome of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// Keep scanning; whatever is left of the visited element is skipped.
    Continue,
    /// Stop at the closing tag of the current scope.
    Halt,
    /// Stop right here, leaving the reader inside the visited element.
    Suspend,
}

/// Incremental XML token reader.
pub struct XmlStream<R> {
    reader: Reader<R>,
    /// Number of currently open elements.
    depth: usize,
    /// Event buffers, one per active nesting level, reused across calls.
    buffers: Vec<Vec<u8>>,
}

impl<R: BufRead> XmlStream<R> {
    pub fn new(inner: R) -> XmlStream<R> {
        let mut reader = Reader::from_reader(inner);
        reader.config_mut().trim_text(true);
        XmlStream {
            reader,
            depth: 0,
            buffers: Vec::new(),
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Byte offset of the reader, for error messages.
    pub fn position(&self) -> u64 {
        self.reader.buffer_position() as u64
    }

    /// Visits the child elements of the current scope.
    ///
    /// The visitor receives each child start tag and whether it is
    /// self-closing. Returns [`Visit::Halt`] once the scope's closing tag has
    /// been consumed (or the document ended, at root level) and
    /// [`Visit::Suspend`] when the visitor suspended.
    pub fn next_while<F>(&mut self, mut visitor: F) -> Result<Visit>
    where
        F: FnMut(&mut Self, &BytesStart<'_>, bool) -> Result<Visit>,
    {
        self.with_buffer(|s, buf| s.scan(buf, &mut visitor))
    }

    fn scan<F>(&mut self, buf: &mut Vec<u8>, visitor: &mut F) -> Result<Visit>
    where
        F: FnMut(&mut Self, &BytesStart<'_>, bool) -> Result<Visit>,
    {
        let base = self.depth;
        loop {
            buf.clear();
            match self.reader.read_event_into(buf)? {
                Event::Start(e) => {
                    self.depth += 1;
                    match visitor(self, &e, false)? {
                        Visit::Continue => self.unwind_to(base)?,
                        Visit::Halt => {
                            self.unwind_to(base)?;
                            return self.close_scope(base);
                        }
                        Visit::Suspend => return Ok(Visit::Suspend),
                    }
                }
                Event::Empty(e) => match visitor(self, &e, true)? {
                    Visit::Continue => {}
                    Visit::Halt => return self.close_scope(base),
                    Visit::Suspend => return Ok(Visit::Suspend),
                },
                Event::End(_) => {
                    if self.depth == 0 {
                        return Err(SdmxError::InvalidFormat(format!(
                            "Unbalanced closing tag at byte {}",
                            self.position()
                        )));
                    }
                    self.depth -= 1;
                    return Ok(Visit::Halt);
                }
                Event::Eof => return self.end_of_document(base),
                _ => {}
            }
        }
    }

    /// Consumes the remaining content of the current scope, closing tag included.
    fn close_scope(&mut self, base: usize) -> Result<Visit> {
        if base == 0 {
            return Ok(Visit::Halt);
        }
        self.unwind_to(base - 1)?;
        Ok(Visit::Halt)
    }

    /// Reads and discards events until only `depth` elements remain open.
    pub fn unwind_to(&mut self, depth: usize) -> Result<()> {
        if self.depth <= depth {
            return Ok(());
        }
        trace!("Skipping from depth {} to {}", self.depth, depth);
        self.with_buffer(|s, buf| s.skip_into(buf, depth))
    }

    fn skip_into(&mut self, buf: &mut Vec<u8>, depth: usize) -> Result<()> {
        while self.depth > depth {
            buf.clear();
            match self.reader.read_event_into(buf)? {
                Event::Start(_) => self.depth += 1,
                Event::End(_) => self.depth -= 1,
                Event::Eof => {
                    return Err(SdmxError::InvalidFormat(format!(
                        "Unexpected end of document with {} open elements",
                        self.depth
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Reads the text content of the element just entered, up to its closing tag.
    ///
    /// Text of nested elements is ignored.
    pub fn read_text(&mut self) -> Result<String> {
        self.with_buffer(Self::text_into)
    }

    fn text_into(&mut self, buf: &mut Vec<u8>) -> Result<String> {
        let base = self.depth;
        let mut text = String::new();
        while self.depth >= base {
            buf.clear();
            match self.reader.read_event_into(buf)? {
                Event::Text(t) if self.depth == base => text.push_str(&t.unescape()?),
                Event::CData(c) if self.depth == base => text.push_str(&String::from_utf8_lossy(&c)),
                Event::Start(_) => self.depth += 1,
                Event::End(_) => self.depth -= 1,
                Event::Eof => return self.end_of_document(base).map(|_| text),
                _ => {}
            }
        }
        Ok(text)
    }

    /// Lends a pooled event buffer to `f`, returning it to the pool on every path.
    fn with_buffer<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self, &mut Vec<u8>) -> Result<T>,
    {
        let mut buf = self.buffers.pop().unwrap_or_default();
        let outcome = f(self, &mut buf);
        buf.clear();
        self.buffers.push(buf);
        outcome
    }

    fn end_of_document(&self, base: usize) -> Result<Visit> {
        if base == 0 {
            Ok(Visit::Halt)
        } else {
            Err(SdmxError::InvalidFormat(format!(
                "Unexpected end of document with {} open elements",
                self.depth
            )))
        }
    }
}

/// Returns `true` if the tag's local name (namespace prefix ignored) is `name`.
pub fn is_named(e: &BytesStart<'_>, name: &[u8]) -> bool {
    e.local_name().as_ref() == name
}

/// Local name of a tag, for messages.
pub fn name_of(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

/// Returns the unescaped value of attribute `name`, if present.
pub fn attribute(e: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>> {
    match e.try_get_attribute(name)? {
        Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

/// Like [`attribute`], failing when the attribute is absent.
pub fn required_attribute(
    e: &BytesStart<'_>,
    name: &'static str,
    element: &'static str,
) -> Result<String> {
    attribute(e, name.as_bytes())?.ok_or(SdmxError::MissingAttribute {
        element,
        attribute: name,
    })
}

/// Calls `f` with every non-namespaced attribute of the tag.
///
/// Qualified attributes (`xsi:type`, `xml:lang`, `xmlns`, …) carry no
/// component values and are left out.
pub fn for_each_attribute<F>(e: &BytesStart<'_>, mut f: F) -> Result<()>
where
    F: FnMut(&str, &str) -> Result<()>,
{
    for attr in e.attributes() {
        let attr = attr?;
        let key = attr.key.as_ref();
        if key.contains(&b':') || key == b"xmlns" {
            continue;
        }
        let key = std::str::from_utf8(key)
            .map_err(|err| SdmxError::InvalidFormat(format!("Attribute name is not UTF-8: {}", err)))?;
        let value = attr.unescape_value()?;
        f(key, &value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<root><a><x>skipped</x></a><b id="1"/><c>text<d>nested</d> more</c><e/></root>"#;

    #[test]
    fn suspends_and_resumes_at_each_level() {
        let mut stream = XmlStream::new(DOC.as_bytes());
        let mut seen = Vec::new();

        let outcome = stream
            .next_while(|_, e, _| Ok(if is_named(e, b"root") { Visit::Suspend } else { Visit::Continue }))
            .unwrap();
        assert_eq!(outcome, Visit::Suspend);
        assert_eq!(stream.depth(), 1);

        let outcome = stream
            .next_while(|_, e, empty| {
                seen.push((name_of(e), empty));
                Ok(if is_named(e, b"b") { Visit::Suspend } else { Visit::Continue })
            })
            .unwrap();
        assert_eq!(outcome, Visit::Suspend);
        assert_eq!(stream.depth(), 1);

        let mut text = String::new();
        let outcome = stream
            .next_while(|s, e, empty| {
                seen.push((name_of(e), empty));
                if is_named(e, b"c") {
                    text = s.read_text()?;
                }
                Ok(Visit::Continue)
            })
            .unwrap();
        assert_eq!(outcome, Visit::Halt);
        assert_eq!(stream.depth(), 0);
        assert_eq!(text, "textmore");
        assert_eq!(
            seen,
            vec![
                ("a".to_string(), false),
                ("b".to_string(), true),
                ("c".to_string(), false),
                ("e".to_string(), true)
            ]
        );
    }

    #[test]
    fn halt_skips_to_scope_end() {
        let mut stream = XmlStream::new(DOC.as_bytes());
        stream.next_while(|_, _, _| Ok(Visit::Suspend)).unwrap();
        let outcome = stream.next_while(|_, _, _| Ok(Visit::Halt)).unwrap();
        assert_eq!(outcome, Visit::Halt);
        assert_eq!(stream.depth(), 0);
    }

    #[test]
    fn truncated_document_is_an_error() {
        let mut stream = XmlStream::new("<root><a>".as_bytes());
        stream.next_while(|_, _, _| Ok(Visit::Suspend)).unwrap();
        let err = stream.next_while(|_, _, _| Ok(Visit::Continue)).unwrap_err();
        assert!(err.is_decode_error());
    }

    #[test]
    fn buffers_return_to_the_pool_on_errors() {
        let mut stream = XmlStream::new("<root><a><b>".as_bytes());
        stream.next_while(|_, _, _| Ok(Visit::Suspend)).unwrap();
        assert_eq!(stream.buffers.len(), 1);
        assert!(stream.unwind_to(0).is_err());
        assert_eq!(stream.buffers.len(), 1);

        let mut stream = XmlStream::new("<root><a>text<b>".as_bytes());
        stream.next_while(|_, _, _| Ok(Visit::Suspend)).unwrap();
        assert!(stream.read_text().is_err());
        assert_eq!(stream.buffers.len(), 1);
    }

    #[test]
    fn attribute_helpers_skip_qualified_names() {
        let mut stream = XmlStream::new(r#"<s xsi:type="x" FREQ="A" TITLE="a &amp; b"/>"#.as_bytes());
        let mut pairs = Vec::new();
        stream
            .next_while(|_, e, _| {
                for_each_attribute(e, |k, v| {
                    pairs.push((k.to_string(), v.to_string()));
                    Ok(())
                })?;
                assert_eq!(attribute(e, b"xsi:type")?.as_deref(), Some("x"));
                Ok(Visit::Continue)
            })
            .unwrap();
        assert_eq!(
            pairs,
            vec![
                ("FREQ".to_string(), "A".to_string()),
                ("TITLE".to_string(), "a & b".to_string())
            ]
        );
    }
}
