//! Per-attribute-type dispatch: URI rewriting, name-token policy, and the
//! (optional) CSS declaration collaborator. This is the layer the host
//! plugs its own trust decisions into.

use log::debug;

use crate::codec::escape_attrib;
use crate::schema::{AttrType, ElementFlags, Schema};

/// Rewrites (or rejects) a URI-valued attribute. Returning `None` deletes
/// the attribute.
pub trait UriRewriter {
    fn rewrite(&self, uri: &str) -> Option<String>;
}

impl<F: Fn(&str) -> Option<String>> UriRewriter for F {
    fn rewrite(&self, uri: &str) -> Option<String> {
        self(uri)
    }
}

/// Rewrites (or rejects) an id/class/name-token-valued attribute.
pub trait NmTokenPolicy {
    fn rewrite(&self, token: &str) -> Option<String>;
}

impl<F: Fn(&str) -> Option<String>> NmTokenPolicy for F {
    fn rewrite(&self, token: &str) -> Option<String> {
        self(token)
    }
}

/// One CSS property's sanitized token list, or `None` to drop the
/// declaration.
pub trait CssPolicy {
    /// Parses and sanitizes a `style` attribute's declaration list,
    /// returning the declarations re-serialized and joined by `" ; "`, or
    /// `None` if every declaration was dropped. CSS declaration parsing
    /// itself is the caller's responsibility; this crate never implements
    /// one.
    fn sanitize_declarations(&self, text: &str, uri_rewriter: Option<&dyn UriRewriter>) -> Option<String>;
}

/// Decides whether a start tag (and its attributes) survive at all.
/// Returning `None` drops the tag.
pub trait TagPolicy {
    fn check(&self, tag: &str, attrs: Vec<(String, Option<String>)>) -> Option<Vec<(String, Option<String>)>>;
}

impl<F: Fn(&str, Vec<(String, Option<String>)>) -> Option<Vec<(String, Option<String>)>>> TagPolicy for F {
    fn check(&self, tag: &str, attrs: Vec<(String, Option<String>)>) -> Option<Vec<(String, Option<String>)>> {
        self(tag, attrs)
    }
}

fn uri_scheme(uri: &str) -> Option<&str> {
    let end = uri.find(|c| matches!(c, ':' | '/' | '?' | '#' | ' '))?;
    (uri.as_bytes().get(end) == Some(&b':') && end > 0).then(|| &uri[..end])
}

fn scheme_is_allowed(scheme: Option<&str>) -> bool {
    match scheme {
        None => true,
        Some(s) => matches!(s.to_ascii_lowercase().as_str(), "http" | "https" | "mailto"),
    }
}

/// Walks `attrs` pairwise, looking each one up in `schema` and applying
/// the matching grammar. Attributes that end up `None` are dropped by the
/// caller at serialization time, not removed from the vec here, so
/// ordering and indices stay stable for any collaborator that inspects
/// them mid-pass.
pub fn sanitize_attribs(
    schema: &Schema,
    tag: &str,
    mut attrs: Vec<(String, Option<String>)>,
    uri_rewriter: Option<&dyn UriRewriter>,
    nmtoken_policy: Option<&dyn NmTokenPolicy>,
    css_policy: Option<&dyn CssPolicy>,
) -> Vec<(String, Option<String>)> {
    for (name, value) in &mut attrs {
        let Some(raw) = value.take() else { continue };
        let atype = schema.attr_type(tag, name);
        *value = atype.and_then(|t| apply_attr_type(t, &raw, uri_rewriter, nmtoken_policy, css_policy));
        if value.is_none() {
            debug!("dropped attribute `{name}` on <{tag}>");
        }
    }
    attrs
}

fn apply_attr_type(
    atype: AttrType,
    raw: &str,
    uri_rewriter: Option<&dyn UriRewriter>,
    nmtoken_policy: Option<&dyn NmTokenPolicy>,
    css_policy: Option<&dyn CssPolicy>,
) -> Option<String> {
    match atype {
        AttrType::None => Some(raw.to_string()),
        AttrType::Script => None,
        AttrType::Style => match css_policy {
            Some(policy) => policy.sanitize_declarations(raw, uri_rewriter),
            None => None,
        },
        AttrType::Id
        | AttrType::IdRef
        | AttrType::IdRefs
        | AttrType::GlobalName
        | AttrType::LocalName
        | AttrType::Classes => match nmtoken_policy {
            Some(policy) => policy.rewrite(raw),
            None => Some(raw.to_string()),
        },
        AttrType::Uri => {
            if scheme_is_allowed(uri_scheme(raw)) {
                uri_rewriter.and_then(|r| r.rewrite(raw))
            } else {
                None
            }
        }
        AttrType::UriFragment => {
            let frag = raw.strip_prefix('#')?;
            let rewritten = match nmtoken_policy {
                Some(policy) => policy.rewrite(frag)?,
                None => frag.to_string(),
            };
            Some(format!("#{rewritten}"))
        }
    }
}

/// Builds a [`TagPolicy`] closure from a URI rewriter and name-token
/// policy: `UNSAFE` elements are always dropped, everything else gets its
/// attributes run through [`sanitize_attribs`].
pub fn make_tag_policy<'a>(
    schema: &'a Schema,
    uri_rewriter: Option<&'a dyn UriRewriter>,
    nmtoken_policy: Option<&'a dyn NmTokenPolicy>,
    css_policy: Option<&'a dyn CssPolicy>,
) -> impl Fn(&str, Vec<(String, Option<String>)>) -> Option<Vec<(String, Option<String>)>> + 'a {
    move |tag, attrs| {
        let flags = schema.element_flags(tag).unwrap_or(ElementFlags::empty());
        if flags.contains(ElementFlags::UNSAFE) {
            return None;
        }
        Some(sanitize_attribs(schema, tag, attrs, uri_rewriter, nmtoken_policy, css_policy))
    }
}

/// Escapes an attribute value for serialization, matching the text
/// codec's `escape_attrib`. Exposed here since the sanitizer output stage
/// is the only caller.
pub(crate) fn serialize_attr_value(v: &str) -> String {
    escape_attrib(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_attrs_are_deleted() {
        let out = sanitize_attribs(
            Schema::builtin(),
            "img",
            vec![("onerror".to_string(), Some("y".to_string()))],
            None,
            None,
            None,
        );
        assert_eq!(out[0].1, None);
    }

    #[test]
    fn uri_without_rewriter_is_deleted_even_if_scheme_allowed() {
        let out = sanitize_attribs(
            Schema::builtin(),
            "a",
            vec![("href".to_string(), Some("http://ok/".to_string()))],
            None,
            None,
            None,
        );
        assert_eq!(out[0].1, None);
    }

    #[test]
    fn uri_with_bad_scheme_is_deleted_even_with_rewriter() {
        let identity = |s: &str| Some(s.to_string());
        let out = sanitize_attribs(
            Schema::builtin(),
            "a",
            vec![("href".to_string(), Some("javascript:bad()".to_string()))],
            Some(&identity),
            None,
            None,
        );
        assert_eq!(out[0].1, None);
    }

    #[test]
    fn uri_with_good_scheme_and_rewriter_passes_through() {
        let identity = |s: &str| Some(s.to_string());
        let out = sanitize_attribs(
            Schema::builtin(),
            "a",
            vec![("href".to_string(), Some("http://ok/".to_string()))],
            Some(&identity),
            None,
            None,
        );
        assert_eq!(out[0].1.as_deref(), Some("http://ok/"));
    }

    #[test]
    fn style_without_css_policy_is_deleted() {
        let out = sanitize_attribs(
            Schema::builtin(),
            "div",
            vec![("style".to_string(), Some("color: red".to_string()))],
            None,
            None,
            None,
        );
        assert_eq!(out[0].1, None);
    }

    #[test]
    fn unknown_attribute_is_deleted() {
        let out = sanitize_attribs(
            Schema::builtin(),
            "div",
            vec![("bogus".to_string(), Some("x".to_string()))],
            None,
            None,
            None,
        );
        assert_eq!(out[0].1, None);
    }

    #[test]
    fn make_tag_policy_drops_unsafe_elements() {
        let policy = make_tag_policy(Schema::builtin(), None, None, None);
        assert!(policy.check("script", vec![]).is_none());
    }
}
