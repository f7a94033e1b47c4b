//! Custom error types for the sdmx-reader crate.

use thiserror::Error;

/// The primary error type for all operations in this crate.
///
/// Variants fall in three groups:
/// - decode errors ([`is_decode_error`](Self::is_decode_error)), raised by the
///   structure and data decoders and by closed/failed cursors,
/// - caller misuse ([`IllegalState`](Self::IllegalState)),
/// - invalid caller input (language ranges, references, format names).
#[derive(Debug, Error)]
pub enum SdmxError {
    /// An error originating from I/O operations.
    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),

    /// The token stream is not well-formed XML.
    #[error("Malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    /// A tag attribute could not be parsed.
    #[error("Malformed XML attribute: {0}")]
    XmlAttribute(#[from] quick_xml::events::attributes::AttrError),

    /// The message is well-formed but does not follow the expected SDMX layout.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// A required element is absent.
    #[error("Missing element '{element}' in {context}")]
    MissingElement {
        element: &'static str,
        context: String,
    },

    /// A required attribute is absent from an element.
    #[error("Missing attribute '{attribute}' on element '{element}'")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    /// A decoded series key contains a wildcard or a multi-value token.
    #[error("Invalid series key '{0}': every dimension must carry a single code")]
    InvalidSeriesKey(String),

    /// A reference to a concept or codelist could not be resolved.
    #[error("Unresolved {kind} reference '{reference}'")]
    UnresolvedReference {
        kind: &'static str,
        reference: String,
    },

    /// The cursor was used after `close()`.
    #[error("Cursor is closed")]
    CursorClosed,

    /// The cursor hit a decode error earlier and cannot be resumed.
    #[error("Cursor failed on a previous decode error and must be discarded")]
    CursorFailed,

    /// An accessor was called outside the cursor state that produces its value.
    #[error("Illegal cursor state: {0}")]
    IllegalState(&'static str),

    /// A language range or priority list could not be parsed.
    #[error("Invalid language range: {0}")]
    InvalidLanguageRange(String),

    /// A resource reference string could not be parsed.
    #[error("Invalid resource reference: {0}")]
    InvalidReference(String),

    /// A data or structure format name is not recognized.
    #[error("Unknown format: {0}")]
    UnknownFormat(String),
}

impl SdmxError {
    /// Returns `true` for programming errors (accessor called in the wrong cursor state).
    pub fn is_illegal_state(&self) -> bool {
        matches!(self, SdmxError::IllegalState(_))
    }

    /// Returns `true` for the I/O-like category: anything raised while reading a message.
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            SdmxError::Io(_)
                | SdmxError::Xml(_)
                | SdmxError::XmlAttribute(_)
                | SdmxError::InvalidFormat(_)
                | SdmxError::MissingElement { .. }
                | SdmxError::MissingAttribute { .. }
                | SdmxError::InvalidSeriesKey(_)
                | SdmxError::UnresolvedReference { .. }
                | SdmxError::CursorClosed
                | SdmxError::CursorFailed
        )
    }
}

/// A convenience `Result` type alias using the crate's `SdmxError` type.
pub type Result<T> = std::result::Result<T, SdmxError>;
