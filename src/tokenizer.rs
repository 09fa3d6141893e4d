//! Walks the token stream produced by [`crate::splitter`] and emits SAX
//! events to a [`crate::sanitizer::SaxHandler`]. This is the biggest
//! component: it owns the two quadratic-avoidance latches, the fast paths
//! for plain tags, the fallback to the attribute parser, and the
//! CDATA/RCDATA text sub-parser.

use log::{debug, trace};

use crate::attributes::{parse_end_tag, parse_tag};
use crate::codec::{leading_entity_ref, normalize_rcdata};
use crate::schema::{ElementFlags, Schema};
use crate::sanitizer::SaxHandler;
use crate::token::Token;

fn starts_with_letter(tokens: &[Token], idx: usize) -> bool {
    matches!(tokens.get(idx), Some(Token::LiteralText(s)) if s.as_bytes().first().is_some_and(u8::is_ascii_alphabetic))
}

fn is_name_token(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b':' || b == b'_')
}

/// Scans forward from `start` for the next `>` token, returning its index.
/// Used by the bogus-declaration (`<!`) and processing-instruction (`<?`)
/// cases, neither of which need to understand quoting.
fn scan_to_gt(tokens: &[Token], start: usize) -> Option<usize> {
    (start..tokens.len()).find(|&k| tokens[k].is_greater_than())
}

/// Scans forward from `start` for a `>` token whose preceding token's raw
/// text ends in `--`, i.e. the real end of an HTML comment.
fn scan_comment_end(tokens: &[Token], start: usize) -> Option<usize> {
    (start..tokens.len()).find(|&k| tokens[k].is_greater_than() && k > 0 && tokens[k - 1].raw_text().ends_with("--"))
}

/// Finds the index of the `</name>` (the `</` token specifically) that
/// closes a CDATA/RCDATA element opened at `from`, matching the element
/// name case-insensitively and requiring it be followed by whitespace,
/// `/`, or end-of-token.
fn find_text_end(tokens: &[Token], from: usize, name: &str) -> Option<usize> {
    let mut k = from;
    while k + 1 < tokens.len() {
        if matches!(tokens[k], Token::LessThanSlash) {
            if let Token::LiteralText(s) = &tokens[k + 1] {
                let lower = s.to_ascii_lowercase();
                if let Some(rest) = lower.strip_prefix(name) {
                    if rest.is_empty() || rest.starts_with(|c: char| c.is_whitespace() || c == '/') {
                        return Some(k);
                    }
                }
            }
        }
        k += 1;
    }
    None
}

pub(crate) fn run<H: SaxHandler>(input: &str, schema: &Schema, handler: &mut H) {
    let mut tokens = crate::splitter::split(input);
    let mut i = 0usize;
    let mut no_more_gt = false;
    let mut no_more_end_comments = false;

    handler.start_doc();

    while i < tokens.len() {
        match &tokens[i] {
            Token::Ampersand => {
                i += 1;
                if let Some(Token::LiteralText(text)) = tokens.get(i) {
                    if let Some(len) = leading_entity_ref(text) {
                        trace!("pcdata: entity reference");
                        handler.pcdata(&format!("&{}", &text[..len]));
                        let remainder = text[len..].to_string();
                        tokens[i] = if remainder.is_empty() {
                            Token::Empty
                        } else {
                            Token::LiteralText(remainder)
                        };
                        continue;
                    }
                }
                trace!("pcdata: bare ampersand");
                handler.pcdata("&amp;");
            }

            Token::LessThanSlash => {
                if !starts_with_letter(&tokens, i + 1) {
                    trace!("pcdata: literal </ (no following name)");
                    handler.pcdata("&lt;/");
                    i += 1;
                    continue;
                }
                if let (Some(Token::LiteralText(s)), Some(Token::GreaterThan)) = (tokens.get(i + 1), tokens.get(i + 2)) {
                    if is_name_token(s) {
                        let name = crate::codec::ascii_fold(s);
                        if schema.is_known_element(&name) {
                            trace!("end_tag (fast path): {name}");
                            handler.end_tag(&name);
                        }
                        i += 3;
                        continue;
                    }
                }
                match parse_end_tag(&tokens, i + 1) {
                    Some((tag, next)) => {
                        if schema.is_known_element(&tag.name) {
                            trace!("end_tag (parsed): {}", tag.name);
                            handler.end_tag(&tag.name);
                        }
                        i = next;
                    }
                    None => {
                        debug!("unterminated end tag, dropping to end of input");
                        i = tokens.len();
                    }
                }
            }

            Token::LessThan => {
                if !starts_with_letter(&tokens, i + 1) {
                    trace!("pcdata: literal < (no following name)");
                    handler.pcdata("&lt;");
                    i += 1;
                    continue;
                }
                if let (Some(Token::LiteralText(s)), Some(Token::GreaterThan)) = (tokens.get(i + 1), tokens.get(i + 2)) {
                    if is_name_token(s) {
                        let name = crate::codec::ascii_fold(s);
                        i = emit_start_tag(schema, handler, &mut tokens, &name, Vec::new(), i + 3);
                        continue;
                    }
                }
                match parse_tag(&tokens, i + 1) {
                    Some((tag, next)) => {
                        i = emit_start_tag(schema, handler, &mut tokens, &tag.name, tag.attrs, next);
                    }
                    None => {
                        debug!("unterminated start tag, dropping to end of input");
                        i = tokens.len();
                    }
                }
            }

            Token::LessThanBangDashDash => {
                if no_more_end_comments {
                    handler.pcdata("&lt;!--");
                    i += 1;
                    continue;
                }
                match scan_comment_end(&tokens, i + 1) {
                    Some(end) => i = end + 1,
                    None => {
                        debug!("no terminator found for comment; latching no_more_end_comments");
                        no_more_end_comments = true;
                        handler.pcdata("&lt;!--");
                        i += 1;
                    }
                }
            }

            Token::LessThanBang => {
                if !starts_with_letter(&tokens, i + 1) {
                    handler.pcdata("&lt;!");
                    i += 1;
                    continue;
                }
                if no_more_gt {
                    handler.pcdata("&lt;!");
                    i += 1;
                    continue;
                }
                match scan_to_gt(&tokens, i + 1) {
                    Some(end) => i = end + 1,
                    None => {
                        debug!("no terminator found for bogus declaration; latching no_more_gt");
                        no_more_gt = true;
                        handler.pcdata("&lt;!");
                        i += 1;
                    }
                }
            }

            Token::LessThanQuestion => {
                if no_more_gt {
                    handler.pcdata("&lt;?");
                    i += 1;
                    continue;
                }
                match scan_to_gt(&tokens, i + 1) {
                    Some(end) => i = end + 1,
                    None => {
                        debug!("no terminator found for processing instruction; latching no_more_gt");
                        no_more_gt = true;
                        handler.pcdata("&lt;?");
                        i += 1;
                    }
                }
            }

            Token::GreaterThan => {
                handler.pcdata("&gt;");
                i += 1;
            }

            Token::Empty => {
                i += 1;
            }

            Token::LiteralText(s) => {
                handler.pcdata(s);
                i += 1;
            }
        }
    }

    handler.end_doc();
}

/// Common tail of both start-tag paths: look the name up, decide whether
/// to emit at all, and engage the text sub-parser when the element is
/// CDATA/RCDATA. Returns the cursor to resume the outer loop at.
fn emit_start_tag<H: SaxHandler>(
    schema: &Schema,
    handler: &mut H,
    tokens: &mut [Token],
    name: &str,
    attrs: Vec<(String, Option<String>)>,
    next: usize,
) -> usize {
    let Some(flags) = schema.element_flags(name) else {
        return next;
    };

    trace!("start_tag: {name}");
    handler.start_tag(name, attrs);

    if flags.intersects(ElementFlags::CDATA | ElementFlags::RCDATA) {
        match find_text_end(tokens, next, name) {
            Some(end) => {
                let buf: String = tokens[next..end].iter().map(|t| t.raw_text().into_owned()).collect();
                if flags.contains(ElementFlags::CDATA) {
                    handler.cdata(&buf);
                } else {
                    handler.rcdata(&normalize_rcdata(&buf));
                }
                end
            }
            None => {
                let buf: String = tokens[next..].iter().map(|t| t.raw_text().into_owned()).collect();
                if flags.contains(ElementFlags::CDATA) {
                    handler.cdata(&buf);
                } else {
                    handler.rcdata(&normalize_rcdata(&buf));
                }
                tokens.len()
            }
        }
    } else {
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sanitizer::SaxHandler;

    #[derive(Default)]
    struct Recorder(Vec<String>);

    impl SaxHandler for Recorder {
        fn start_doc(&mut self) {
            self.0.push("start_doc".into());
        }
        fn end_doc(&mut self) {
            self.0.push("end_doc".into());
        }
        fn start_tag(&mut self, name: &str, _attrs: Vec<(String, Option<String>)>) {
            self.0.push(format!("start_tag:{name}"));
        }
        fn end_tag(&mut self, name: &str) {
            self.0.push(format!("end_tag:{name}"));
        }
        fn pcdata(&mut self, text: &str) {
            self.0.push(format!("pcdata:{text}"));
        }
        fn rcdata(&mut self, text: &str) {
            self.0.push(format!("rcdata:{text}"));
        }
        fn cdata(&mut self, text: &str) {
            self.0.push(format!("cdata:{text}"));
        }
    }

    fn run_it(html: &str) -> Vec<String> {
        let mut rec = Recorder::default();
        run(html, Schema::builtin(), &mut rec);
        rec.0
    }

    #[test]
    fn simple_known_tags() {
        assert_eq!(
            run_it("<b>hi</b>"),
            vec!["start_doc", "start_tag:b", "pcdata:hi", "end_tag:b", "end_doc"]
        );
    }

    #[test]
    fn unknown_tag_suppressed_but_children_kept() {
        assert_eq!(
            run_it("<blink>hi</blink>"),
            vec!["start_doc", "pcdata:hi", "end_doc"]
        );
    }

    #[test]
    fn comment_is_dropped_entirely() {
        assert_eq!(
            run_it("<!--<script>x</script>-->"),
            vec!["start_doc", "end_doc"]
        );
    }

    #[test]
    fn textarea_is_rcdata() {
        assert_eq!(
            run_it("<textarea><b>raw</b></textarea>"),
            vec![
                "start_doc",
                "start_tag:textarea",
                "rcdata:&lt;b&gt;raw&lt;/b&gt;",
                "end_tag:textarea",
                "end_doc",
            ]
        );
    }

    #[test]
    fn script_is_cdata_and_dropped_by_schema_but_tokenizer_still_parses_it() {
        // schema marks <script> UNSAFE; the tokenizer still emits the
        // start_tag/cdata/end_tag events; it's the balancing sanitizer's
        // job to turn UNSAFE into silence.
        assert_eq!(
            run_it("<script>evil()</script>"),
            vec![
                "start_doc",
                "start_tag:script",
                "cdata:evil()",
                "end_tag:script",
                "end_doc",
            ]
        );
    }

    #[test]
    fn entity_reference_consumes_only_its_own_span() {
        assert_eq!(
            run_it("&amp;rest"),
            vec!["start_doc", "pcdata:&amp;", "pcdata:rest", "end_doc"]
        );
    }

    #[test]
    fn bare_ampersand_is_escaped() {
        assert_eq!(run_it("a & b"), vec!["start_doc", "pcdata:a ", "pcdata:&amp;", "pcdata: b", "end_doc"]);
    }
}
