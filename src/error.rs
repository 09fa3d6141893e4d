use thiserror::Error;

/// Errors raised while building a caller-supplied [`crate::schema::Schema`].
///
/// `sanitize` and its siblings never fail: every malformed *document* is a
/// routine case handled by the tokenizer and policy engine. This type only
/// covers misuse at schema-construction time, which happens once, well
/// before any untrusted input is touched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    /// The same `tag::attr` (or `*::attr`) key was registered twice with
    /// different attribute types.
    #[error("duplicate attribute key `{0}` in schema")]
    DuplicateAttributeKey(String),

    /// An element name was registered twice with different flags.
    #[error("duplicate element `{0}` in schema")]
    DuplicateElement(String),
}
