//! Entity decoding/encoding and the handful of escaping rules the rest of
//! the crate leans on. Every function here is total: there is no input for
//! which these can fail or panic.

/// Whitespace as the attribute/entity grammars in this crate understand it.
/// Deliberately narrower than `char::is_whitespace`.
pub(crate) fn is_html_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0C')
}

/// Length, in bytes, of the leading ASCII word-character run (`[A-Za-z0-9_]`).
pub(crate) fn word_prefix_len(s: &str) -> usize {
    s.bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
        .count()
}

/// If `s` begins with a well-formed entity reference *body* (the part
/// between `&` and `;`, not including either), returns its byte length
/// including the trailing `;`. Used both to decide whether a bare `&`
/// should be escaped and to find the end of a reference once we know one
/// starts here.
pub(crate) fn leading_entity_ref(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    if bytes.first() == Some(&b'#') {
        if matches!(bytes.get(1), Some(b'x') | Some(b'X')) {
            let digits = s[2..].bytes().take_while(|b| b.is_ascii_hexdigit()).count();
            if digits == 0 {
                return None;
            }
            return (s.as_bytes().get(2 + digits) == Some(&b';')).then_some(2 + digits + 1);
        }
        let digits = s[1..].bytes().take_while(|b| b.is_ascii_digit()).count();
        if digits == 0 {
            return None;
        }
        return (s.as_bytes().get(1 + digits) == Some(&b';')).then_some(1 + digits + 1);
    }
    let name_len = word_prefix_len(s);
    if name_len == 0 {
        return None;
    }
    (bytes.get(name_len) == Some(&b';')).then_some(name_len + 1)
}

/// Decodes a single named or numeric entity, `name` being the text between
/// `&` and `;` (no surrounding delimiters). Folds ASCII `A-Z` only, so this
/// is immune to the Turkish-locale `I`/`i` dotless-i problem.
///
/// Returns the empty string for anything not covered by the fixed,
/// deliberately minimal table (see the open question in `SPEC_FULL.md`
/// about expanding it to the full HTML5 named-character-reference list).
pub(crate) fn decode_entity(name: &str) -> String {
    if let Some(rest) = name.strip_prefix('#') {
        let (digits, radix) = match rest.strip_prefix(['x', 'X']) {
            Some(hex) => (hex, 16),
            None => (rest, 10),
        };
        return u32::from_str_radix(digits, radix)
            .ok()
            .and_then(char::from_u32)
            .map(|c| c.to_string())
            .unwrap_or_default();
    }

    let lower = ascii_fold(name);
    match lower.as_str() {
        "lt" => "<".to_string(),
        "gt" => ">".to_string(),
        "amp" => "&".to_string(),
        "nbsp" => "\u{00A0}".to_string(),
        "quot" => "\"".to_string(),
        "apos" => "'".to_string(),
        _ => String::new(),
    }
}

/// ASCII-only lowercasing. Never use `str::to_lowercase` for names that
/// must compare equal regardless of locale.
pub(crate) fn ascii_fold(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii() { c.to_ascii_lowercase() } else { c })
        .collect()
}

/// Replaces every `&(NAME);` where `NAME` matches `#\d+ | #x[0-9a-f]+ |
/// [A-Za-z0-9_]+` with its decoded value. Anything that merely looks like
/// an entity but doesn't fit the grammar is left verbatim.
pub fn unescape_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    loop {
        let Some(amp_at) = memchr::memchr(b'&', rest.as_bytes()) else {
            out.push_str(rest);
            break;
        };
        out.push_str(&rest[..amp_at]);
        let after_amp = &rest[amp_at + 1..];
        match leading_entity_ref(after_amp) {
            Some(len) => {
                let name = &after_amp[..len - 1];
                out.push_str(&decode_entity(name));
                rest = &after_amp[len..];
            }
            None => {
                out.push('&');
                rest = after_amp;
            }
        }
    }
    out
}

/// Escapes `&`, `<`, `>`, and `"` for use inside a double-quoted attribute
/// value. Applies to every occurrence, not just the first.
pub fn escape_attrib(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            _ => out.push(c),
        }
    }
    out
}

/// Normalizes text destined for an RCDATA element body (`<textarea>`,
/// `<title>`): bare `&` that isn't plausibly the start of an entity
/// reference is escaped to `&amp;` so it round-trips through a browser's
/// own RCDATA parsing; `<` and `>` are always escaped since RCDATA bodies
/// carry no markup.
pub fn normalize_rcdata(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    loop {
        let Some(amp_at) = memchr::memchr(b'&', rest.as_bytes()) else {
            break;
        };
        out.push_str(&rest[..amp_at]);
        let after_amp = &rest[amp_at + 1..];
        if leading_entity_ref(after_amp).is_some() {
            out.push('&');
        } else {
            out.push_str("&amp;");
        }
        rest = after_amp;
    }
    out.push_str(rest);
    out.replace('<', "&lt;").replace('>', "&gt;")
}

/// Removes every U+0000 from `s`.
pub(crate) fn strip_nuls(s: &str) -> String {
    if memchr::memchr(0, s.as_bytes()).is_none() {
        return s.to_string();
    }
    s.chars().filter(|&c| c != '\0').collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_named() {
        assert_eq!(decode_entity("lt"), "<");
        assert_eq!(decode_entity("AMP"), "&");
        assert_eq!(decode_entity("nbsp"), "\u{a0}");
    }

    #[test]
    fn decode_numeric() {
        assert_eq!(decode_entity("#65"), "A");
        assert_eq!(decode_entity("#x41"), "A");
        assert_eq!(decode_entity("#X41"), "A");
    }

    #[test]
    fn decode_unknown_is_empty() {
        assert_eq!(decode_entity("copy"), "");
        assert_eq!(decode_entity("#xFFFFFFFF"), "");
    }

    #[test]
    fn unescape_round_trip_on_safe_text() {
        let x = "plain sentence with no specials";
        assert_eq!(unescape_entities(&escape_attrib(x)), x);
    }

    #[test]
    fn unescape_leaves_malformed_verbatim() {
        assert_eq!(unescape_entities("a & b"), "a & b");
        assert_eq!(unescape_entities("&nosemicolon"), "&nosemicolon");
    }

    #[test]
    fn unescape_drops_unknown_named_entity() {
        // Per the minimal six-entry table, a syntactically valid but
        // unrecognized named entity decodes to empty string.
        assert_eq!(unescape_entities("&copy;"), "");
    }

    #[test]
    fn escape_attrib_all_occurrences() {
        assert_eq!(escape_attrib(r#">>>"#), "&gt;&gt;&gt;");
        assert_eq!(escape_attrib(r#"<a href="x">&"#), "&lt;a href=&#34;x&#34;&gt;&amp;");
    }

    #[test]
    fn normalize_rcdata_escapes_bare_amp_and_tags() {
        assert_eq!(normalize_rcdata("<b>raw</b>"), "&lt;b&gt;raw&lt;/b&gt;");
        assert_eq!(normalize_rcdata("Bob & Alice"), "Bob &amp; Alice");
        assert_eq!(normalize_rcdata("already &amp; encoded"), "already &amp; encoded");
    }

    #[test]
    fn strip_nuls_removes_all() {
        assert_eq!(strip_nuls("a\0b\0c"), "abc");
    }
}
