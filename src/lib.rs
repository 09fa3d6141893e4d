//! A resilient HTML tokenizer paired with an element/attribute policy
//! engine: the tokenize-and-filter half of an HTML sanitizer.
//!
//! The tokenizer never raises on malformed input: unterminated
//! comments, unterminated quoted attribute values, and deeply bogus
//! markup are all routine cases that degrade gracefully rather than
//! panicking or looping. The [`sanitizer::BalancingSanitizer`] wraps it
//! with a schema-driven element/attribute allow-list, an open-element
//! stack, and a serializer, giving the top-level [`sanitize`] function a
//! total, pure `&str -> String` signature.
//!
//! ```
//! let out = html_sanitizer::sanitize("<script>evil()</script><b>ok</b>", None, None);
//! assert_eq!(out, "<b>ok</b>");
//! ```

mod attributes;
mod codec;
mod error;
mod policy;
mod sanitizer;
mod schema;
mod splitter;
mod token;
mod tokenizer;

pub use codec::{escape_attrib, normalize_rcdata, unescape_entities};
pub use error::SchemaError;
pub use policy::{make_tag_policy, sanitize_attribs, CssPolicy, NmTokenPolicy, TagPolicy, UriRewriter};
pub use sanitizer::{make_html_sanitizer, make_sax_parser, sanitize, sanitize_with_policy, SaxHandler};
pub use schema::{AttrType, ElementFlags, Schema, SchemaBuilder};
