//! The element/attribute schema tables. Spec-wise these are external,
//! caller-supplied data; this module bundles a sensible default allow-list
//! (the classic "safe subset" of formatting, structural, and linking
//! elements) so `sanitize()` works out of the box, plus a builder for
//! callers who want their own.

use std::sync::LazyLock;

use bitflags::bitflags;
use rustc_hash::FxHashMap;

use crate::codec::ascii_fold;
use crate::error::SchemaError;

bitflags! {
    /// Flags describing how an element participates in balancing and
    /// serialization.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ElementFlags: u8 {
        /// Drop the element and everything inside it.
        const UNSAFE          = 0b0000_0001;
        /// Void element: never has or needs an end tag.
        const EMPTY           = 0b0000_0010;
        /// May be implicitly closed by a sibling or ancestor close.
        const OPTIONAL_ENDTAG = 0b0000_0100;
        /// Body is raw text, terminated only by its own end tag.
        const CDATA           = 0b0000_1000;
        /// Body is text with entities resolved but no tags.
        const RCDATA          = 0b0001_0000;
        /// The tag itself is elided; children are kept.
        const FOLDABLE        = 0b0010_0000;
    }
}

/// The per-attribute value grammar the policy engine dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrType {
    None,
    Script,
    Style,
    Id,
    IdRef,
    IdRefs,
    GlobalName,
    LocalName,
    Classes,
    Uri,
    UriFragment,
}

/// Bundled element/attribute allow-lists plus an optional caller-supplied
/// override set, built once and shared across every `sanitize` call.
#[derive(Debug, Clone)]
pub struct Schema {
    elements: FxHashMap<String, ElementFlags>,
    attribs: FxHashMap<String, AttrType>,
}

impl Schema {
    /// The bundled default schema. Cheap to call repeatedly: it hands
    /// back a reference to a lazily-built, process-wide static.
    pub fn builtin() -> &'static Schema {
        static SCHEMA: LazyLock<Schema> = LazyLock::new(Schema::default_impl);
        &SCHEMA
    }

    /// Starts building a custom schema from scratch (no bundled defaults).
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    pub(crate) fn element_flags(&self, name: &str) -> Option<ElementFlags> {
        self.elements.get(name).copied()
    }

    pub(crate) fn is_known_element(&self, name: &str) -> bool {
        self.elements.contains_key(name)
    }

    /// Looks up `tag::attr`, falling back to `*::attr`.
    pub(crate) fn attr_type(&self, tag: &str, attr: &str) -> Option<AttrType> {
        self.attribs
            .get(&format!("{tag}::{attr}"))
            .or_else(|| self.attribs.get(&format!("*::{attr}")))
            .copied()
    }

    fn default_impl() -> Schema {
        use AttrType::*;
        use ElementFlags as F;

        let elements: &[(&str, ElementFlags)] = &[
            ("a", F::empty()),
            ("abbr", F::empty()),
            ("b", F::empty()),
            ("blockquote", F::empty()),
            ("br", F::EMPTY),
            ("caption", F::empty()),
            ("cite", F::empty()),
            ("code", F::empty()),
            ("dd", F::OPTIONAL_ENDTAG),
            ("dl", F::empty()),
            ("dt", F::OPTIONAL_ENDTAG),
            ("div", F::empty()),
            ("em", F::empty()),
            ("figcaption", F::empty()),
            ("figure", F::empty()),
            ("form", F::UNSAFE),
            ("h1", F::empty()),
            ("h2", F::empty()),
            ("h3", F::empty()),
            ("h4", F::empty()),
            ("h5", F::empty()),
            ("h6", F::empty()),
            ("hr", F::EMPTY),
            ("i", F::empty()),
            ("iframe", F::UNSAFE),
            ("img", F::EMPTY),
            ("kbd", F::empty()),
            ("label", F::empty()),
            ("li", F::OPTIONAL_ENDTAG),
            ("mark", F::empty()),
            ("noscript", F::FOLDABLE),
            ("object", F::UNSAFE),
            ("ol", F::empty()),
            ("p", F::OPTIONAL_ENDTAG),
            ("pre", F::empty()),
            ("q", F::empty()),
            ("s", F::empty()),
            ("samp", F::empty()),
            ("script", F::from_bits_truncate(F::UNSAFE.bits() | F::CDATA.bits())),
            ("small", F::empty()),
            ("span", F::empty()),
            ("strong", F::empty()),
            ("style", F::from_bits_truncate(F::UNSAFE.bits() | F::CDATA.bits())),
            ("sub", F::empty()),
            ("sup", F::empty()),
            ("table", F::empty()),
            ("tbody", F::OPTIONAL_ENDTAG),
            ("td", F::OPTIONAL_ENDTAG),
            ("tfoot", F::OPTIONAL_ENDTAG),
            ("th", F::OPTIONAL_ENDTAG),
            ("thead", F::OPTIONAL_ENDTAG),
            ("time", F::empty()),
            ("title", F::RCDATA),
            ("textarea", F::RCDATA),
            ("tr", F::OPTIONAL_ENDTAG),
            ("u", F::empty()),
            ("ul", F::empty()),
            ("var", F::empty()),
        ];

        let attribs: &[(&str, AttrType)] = &[
            ("*::id", Id),
            ("*::class", Classes),
            ("*::title", None),
            ("*::lang", None),
            ("*::dir", None),
            ("*::style", Style),
            ("*::onclick", Script),
            ("*::onerror", Script),
            ("*::onload", Script),
            ("*::onmouseover", Script),
            ("a::href", Uri),
            ("a::name", LocalName),
            ("a::target", None),
            ("a::rel", None),
            ("img::src", Uri),
            ("img::alt", None),
            ("img::width", None),
            ("img::height", None),
            ("blockquote::cite", Uri),
            ("q::cite", Uri),
            ("label::for", IdRef),
            ("td::headers", IdRefs),
            ("th::headers", IdRefs),
            ("*::href", UriFragment),
        ];

        Schema {
            elements: elements.iter().map(|(k, v)| ((*k).to_string(), *v)).collect(),
            attribs: attribs.iter().map(|(k, v)| ((*k).to_string(), *v)).collect(),
        }
    }
}

/// Incrementally builds a [`Schema`] from scratch.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    elements: FxHashMap<String, ElementFlags>,
    attribs: FxHashMap<String, AttrType>,
}

impl SchemaBuilder {
    /// Registers an element. `name` is folded to ASCII-lowercase.
    pub fn element(mut self, name: &str, flags: ElementFlags) -> Result<Self, SchemaError> {
        let key = ascii_fold(name);
        if self.elements.insert(key.clone(), flags).is_some() {
            return Err(SchemaError::DuplicateElement(key));
        }
        Ok(self)
    }

    /// Registers an attribute rule keyed by `tag::attr` or `*::attr`.
    /// `tag` and `attr` are each folded to ASCII-lowercase.
    pub fn attribute(mut self, tag: &str, attr: &str, atype: AttrType) -> Result<Self, SchemaError> {
        let key = format!("{}::{}", ascii_fold(tag), ascii_fold(attr));
        if self.attribs.insert(key.clone(), atype).is_some() {
            return Err(SchemaError::DuplicateAttributeKey(key));
        }
        Ok(self)
    }

    pub fn build(self) -> Schema {
        Schema {
            elements: self.elements,
            attribs: self.attribs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_knows_common_elements() {
        let schema = Schema::builtin();
        assert!(schema.is_known_element("b"));
        assert!(schema.is_known_element("img"));
        assert!(!schema.is_known_element("blink"));
    }

    #[test]
    fn script_is_unsafe_and_cdata() {
        let flags = Schema::builtin().element_flags("script").unwrap();
        assert!(flags.contains(ElementFlags::UNSAFE));
        assert!(flags.contains(ElementFlags::CDATA));
    }

    #[test]
    fn attr_lookup_falls_back_to_wildcard() {
        let schema = Schema::builtin();
        assert_eq!(schema.attr_type("div", "class"), Some(AttrType::Classes));
        assert_eq!(schema.attr_type("a", "href"), Some(AttrType::Uri));
        assert_eq!(schema.attr_type("div", "onclick"), Some(AttrType::Script));
    }

    #[test]
    fn builder_rejects_duplicate_keys() {
        let result = SchemaBuilder::default()
            .element("b", ElementFlags::empty())
            .unwrap()
            .element("b", ElementFlags::EMPTY);
        assert!(matches!(result, Err(SchemaError::DuplicateElement(_))));
    }
}
