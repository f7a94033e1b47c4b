//! Input encoding helpers.
//!
//! The XML reader works on UTF-8. Messages in other encodings are transcoded
//! up front with `encoding_rs`, using (highest priority first) a byte order
//! mark, an explicit label, or the `encoding` of the XML declaration.

use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_8};
use log::{debug, warn};

/// How far into the document the XML declaration is searched for.
const DECLARATION_WINDOW: usize = 256;

/// Resolves an encoding label such as `ISO-8859-1` or `utf-16le`.
///
/// Unknown labels fall back to UTF-8.
pub fn parse_encoding(label: &str) -> &'static Encoding {
    match Encoding::for_label(label.trim().as_bytes()) {
        Some(encoding) => encoding,
        None => {
            warn!("Unknown encoding label '{}', assuming UTF-8", label);
            UTF_8
        }
    }
}

/// Detects the encoding of a message from its BOM or XML declaration.
pub fn detect_encoding(bytes: &[u8]) -> &'static Encoding {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        debug!("Encoding {} from byte order mark", encoding.name());
        return encoding;
    }
    match declared_encoding(bytes) {
        Some(label) => {
            let encoding = parse_encoding(&label);
            debug!("Encoding {} from XML declaration", encoding.name());
            encoding
        }
        None => UTF_8,
    }
}

/// Returns the `encoding` pseudo-attribute of a leading `<?xml ...?>`.
fn declared_encoding(bytes: &[u8]) -> Option<String> {
    let window = &bytes[..bytes.len().min(DECLARATION_WINDOW)];
    let head = String::from_utf8_lossy(window);
    let declaration = head.trim_start().strip_prefix("<?xml")?;
    let declaration = &declaration[..declaration.find("?>")?];
    let rest = &declaration[declaration.find("encoding")? + "encoding".len()..];
    let rest = rest.trim_start().strip_prefix('=')?.trim_start();
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let value = &rest[1..];
    Some(value[..value.find(quote)?].to_string())
}

/// Returns the message as UTF-8, transcoding only when needed.
///
/// A BOM always wins over the label, as it does for `encoding_rs`.
pub fn to_utf8<'a>(bytes: &'a [u8], label: Option<&str>) -> Cow<'a, [u8]> {
    let encoding = label.map(parse_encoding).unwrap_or_else(|| detect_encoding(bytes));
    let (text, actual, had_errors) = encoding.decode(bytes);
    if had_errors {
        warn!("Malformed {} sequences replaced while transcoding", actual.name());
    }
    if actual != UTF_8 {
        debug!("Transcoded {} bytes from {}", bytes.len(), actual.name());
    }
    match text {
        Cow::Borrowed(s) => Cow::Borrowed(s.as_bytes()),
        Cow::Owned(s) => Cow::Owned(s.into_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declaration_encoding_is_found() {
        let xml = br#"<?xml version="1.0" encoding='ISO-8859-1'?><a/>"#;
        assert_eq!(declared_encoding(xml).as_deref(), Some("ISO-8859-1"));
        assert_eq!(detect_encoding(xml), encoding_rs::WINDOWS_1252);
        assert_eq!(declared_encoding(b"<a/>"), None);
    }

    #[test]
    fn latin1_input_is_transcoded() {
        let xml = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><a>Belgi\xeb</a>";
        let utf8 = to_utf8(xml, None);
        assert!(String::from_utf8(utf8.into_owned()).unwrap().contains("België"));
    }

    #[test]
    fn utf8_input_is_borrowed() {
        let xml = "<a>Belgïe</a>".as_bytes();
        assert!(matches!(to_utf8(xml, None), Cow::Borrowed(_)));
        assert_eq!(parse_encoding("no-such-charset"), UTF_8);
    }
}
