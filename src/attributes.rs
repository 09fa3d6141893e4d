//! Turns a run of tokens that looks like it opens a tag into a tag name
//! plus an attribute list. This is where unterminated quoted attribute
//! values are handled: a `'` or `"` opened inside the tag makes every
//! following `>` (and `<`, `&`, …) part of the attribute value until a
//! matching quote is found, however many would-be tag boundaries that
//! spans.

use crate::codec::{ascii_fold, is_html_space, strip_nuls, unescape_entities};
use crate::token::Token;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParsedTag {
    pub name: String,
    pub attrs: Vec<(String, Option<String>)>,
    pub self_closing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParsedEndTag {
    pub name: String,
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b':' || b == b'_'
}

fn update_quote_state(quote: &mut Option<char>, text: &str) {
    for c in text.chars() {
        match *quote {
            Some(q) if c == q => *quote = None,
            None if c == '\'' || c == '"' => *quote = Some(c),
            _ => {}
        }
    }
}

/// Scans forward from `start` (the token right after an opening `<` plus
/// tag name) looking for the `>` that closes this tag, honoring quotes.
/// Returns the assembled raw interior and the index of the first token
/// *after* the closing `>`. `None` means the tag never closes before the
/// token stream runs out, in which case the caller treats the opening `<`
/// as ordinary text.
fn scan_tag_interior(tokens: &[Token], start: usize) -> Option<(String, usize)> {
    let mut buf = String::new();
    let mut quote: Option<char> = None;
    let mut i = start;

    while i < tokens.len() {
        let tok = &tokens[i];
        if tok.is_greater_than() && quote.is_none() {
            return Some((buf, i + 1));
        }
        let text = tok.raw_text();
        update_quote_state(&mut quote, &text);
        buf.push_str(&text);
        i += 1;
    }
    None
}

/// Parses a start tag beginning right after its opening `<`. `tokens[start]`
/// is expected to be the tag name (or the start of it).
pub(crate) fn parse_tag(tokens: &[Token], start: usize) -> Option<(ParsedTag, usize)> {
    let (interior, next) = scan_tag_interior(tokens, start)?;
    let (name, rest) = read_tag_name(&interior)?;
    let (attrs, self_closing) = parse_attrs(rest);
    Some((
        ParsedTag {
            name,
            attrs,
            self_closing,
        },
        next,
    ))
}

/// Parses an end tag beginning right after its opening `</`. Any
/// "attributes" present are discarded, matching how real browsers treat
/// garbage inside a closing tag.
pub(crate) fn parse_end_tag(tokens: &[Token], start: usize) -> Option<(ParsedEndTag, usize)> {
    let (interior, next) = scan_tag_interior(tokens, start)?;
    let (name, _rest) = read_tag_name(&interior)?;
    Some((ParsedEndTag { name }, next))
}

/// Tag names follow `\w+`, distinct from the stricter attribute `NAME`
/// grammar below (tag names like `h1` carry digits).
fn read_tag_name(s: &str) -> Option<(String, &str)> {
    let bytes = s.as_bytes();
    let len = bytes.iter().take_while(|&&b| is_name_byte(b)).count();
    if len == 0 {
        return None;
    }
    Some((ascii_fold(&s[..len]), &s[len..]))
}

/// `NAME := [A-Za-z][A-Za-z-]*`. Returns `None` if `s` doesn't begin with
/// a letter.
fn read_attr_name(s: &str) -> Option<(String, &str)> {
    let bytes = s.as_bytes();
    if !bytes.first().is_some_and(u8::is_ascii_alphabetic) {
        return None;
    }
    let len = bytes.iter().take_while(|&&b| b.is_ascii_alphabetic() || b == b'-').count();
    Some((ascii_fold(&s[..len]), &s[len..]))
}

/// Rule 1 recovery: no `NAME` match at the current position. Drops the
/// first character plus any following run of bytes that are neither
/// letters nor space, then retries from there.
fn skip_unmatched(s: &str) -> &str {
    let mut chars = s.chars();
    let Some(first) = chars.next() else { return s };
    let rest = &s[first.len_utf8()..];
    let run_len: usize = rest
        .chars()
        .take_while(|&c| !c.is_ascii_alphabetic() && !is_html_space(c))
        .map(char::len_utf8)
        .sum();
    &rest[run_len..]
}

/// `(?=NAME \s* =)`: true if `s` looks like the start of the *next*
/// attribute (a name immediately followed by `=`), used to recognize the
/// positive-lookahead-empty `VALUE` alternative.
fn looks_like_next_attr(s: &str) -> bool {
    let Some((_, rest)) = read_attr_name(s) else { return false };
    rest.trim_start_matches(is_html_space).starts_with('=')
}

fn parse_attrs(mut s: &str) -> (Vec<(String, Option<String>)>, bool) {
    let mut attrs = Vec::new();
    let mut self_closing = false;

    loop {
        s = s.trim_start_matches(is_html_space);
        if s.is_empty() {
            break;
        }
        if s == "/" || s.starts_with('/') && s[1..].trim_start_matches(is_html_space).is_empty() {
            self_closing = true;
            break;
        }

        let Some((name, rest)) = read_attr_name(s) else {
            s = skip_unmatched(s);
            continue;
        };
        s = rest;

        let after_name = s.trim_start_matches(is_html_space);
        if let Some(after_eq) = after_name.strip_prefix('=') {
            let after_eq = after_eq.trim_start_matches(is_html_space);
            if looks_like_next_attr(after_eq) {
                // Positive-lookahead-empty VALUE: the `=` is present but
                // what follows is really the next attribute, so this one
                // gets its boolean (own-name) value and nothing is consumed.
                attrs.push((name.clone(), Some(name)));
                s = after_eq;
            } else {
                let (value, rest) = read_attr_value(after_eq);
                attrs.push((name, Some(unescape_entities(&strip_nuls(&value)))));
                s = rest;
            }
        } else {
            // Boolean-attribute convention: no `=value` means the value is
            // the attribute's own name (e.g. `disabled` -> `disabled="disabled"`).
            let value = name.clone();
            attrs.push((name, Some(value)));
        }
    }

    (attrs, self_closing)
}

fn read_attr_value(s: &str) -> (String, &str) {
    match s.as_bytes().first() {
        Some(&q @ (b'\'' | b'"')) => {
            let q = q as char;
            let rest = &s[1..];
            match rest.find(q) {
                Some(end) => (rest[..end].to_string(), &rest[end + 1..]),
                None => (rest.to_string(), ""),
            }
        }
        _ => {
            // `[^"' \t\n]*`: quote characters never belong to an unquoted value.
            let len = s
                .bytes()
                .take_while(|&b| !is_html_space(b as char) && b != b'\'' && b != b'"')
                .count();
            (s[..len].to_string(), &s[len..])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::splitter::split;

    fn parse_first_tag(html: &str) -> (ParsedTag, usize) {
        let tokens = split(html);
        // tokens[0] is the opening `<`.
        parse_tag(&tokens, 1).expect("tag should parse")
    }

    #[test]
    fn simple_tag_no_attrs() {
        let (tag, _) = parse_first_tag("<br>");
        assert_eq!(tag.name, "br");
        assert!(tag.attrs.is_empty());
        assert!(!tag.self_closing);
    }

    #[test]
    fn self_closing_tag() {
        let (tag, _) = parse_first_tag("<br/>");
        assert_eq!(tag.name, "br");
        assert!(tag.self_closing);
    }

    #[test]
    fn quoted_and_unquoted_and_boolean_attrs() {
        let (tag, _) = parse_first_tag(r#"<input type="text" value=x disabled>"#);
        assert_eq!(tag.name, "input");
        assert_eq!(
            tag.attrs,
            vec![
                ("type".to_string(), Some("text".to_string())),
                ("value".to_string(), Some("x".to_string())),
                ("disabled".to_string(), Some("disabled".to_string())),
            ]
        );
    }

    #[test]
    fn unterminated_quote_swallows_embedded_angle_brackets() {
        let tokens = split("<p title='>>>'>t</p>");
        let (tag, next) = parse_tag(&tokens, 1).expect("tag should parse");
        assert_eq!(tag.name, "p");
        assert_eq!(tag.attrs, vec![("title".to_string(), Some(">>>".to_string()))]);
        // What follows the tag should be the literal text "t".
        assert_eq!(tokens[next].raw_text(), "t");
    }

    #[test]
    fn attribute_value_entities_are_decoded() {
        let (tag, _) = parse_first_tag(r#"<a href="x?a=1&amp;b=2">"#);
        assert_eq!(tag.attrs[0].1.as_deref(), Some("x?a=1&b=2"));
    }

    #[test]
    fn name_is_ascii_folded() {
        let (tag, _) = parse_first_tag("<DIV CLASS=\"x\">");
        assert_eq!(tag.name, "div");
        assert_eq!(tag.attrs[0].0, "class");
    }

    #[test]
    fn dangling_equals_before_next_attr_is_boolean_not_a_greedy_value() {
        let (tag, _) = parse_first_tag(r#"<a title= id="x">"#);
        assert_eq!(tag.name, "a");
        assert_eq!(
            tag.attrs,
            vec![
                ("title".to_string(), Some("title".to_string())),
                ("id".to_string(), Some("x".to_string())),
            ]
        );
    }

    #[test]
    fn unquoted_value_stops_before_a_quote_character() {
        let (tag, _) = parse_first_tag(r#"<a title=foo"bar id="x">"#);
        assert_eq!(tag.attrs[0], ("title".to_string(), Some("foo".to_string())));
    }

    #[test]
    fn garbage_attribute_name_is_skipped_via_rule_one() {
        let (tag, _) = parse_first_tag("<a @#$foo=bar>");
        assert!(tag.attrs.iter().all(|(name, _)| name != "@#$foo"));
        assert_eq!(tag.attrs, vec![("foo".to_string(), Some("bar".to_string()))]);
    }
}
