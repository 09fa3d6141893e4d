//! The balancing sanitizer: a [`SaxHandler`] that tracks an open-element
//! stack, drops or auto-closes tags against the schema, and serializes
//! surviving markup to an output sink.

use log::debug;

use crate::policy::{self, NmTokenPolicy, TagPolicy, UriRewriter};
use crate::schema::{ElementFlags, Schema};
use crate::tokenizer;

/// The event interface the tokenizer drives. All methods default to
/// no-ops so a handler only needs to implement what it cares about.
pub trait SaxHandler {
    fn start_doc(&mut self) {}
    fn end_doc(&mut self) {}
    fn start_tag(&mut self, _name: &str, _attrs: Vec<(String, Option<String>)>) {}
    fn end_tag(&mut self, _name: &str) {}
    fn pcdata(&mut self, _text: &str) {}
    fn rcdata(&mut self, _text: &str) {}
    fn cdata(&mut self, _text: &str) {}
}

struct BalancingSanitizer<'a, P> {
    schema: &'a Schema,
    tag_policy: P,
    stack: Vec<String>,
    ignoring: bool,
    output: Vec<String>,
}

impl<'a, P: TagPolicy> BalancingSanitizer<'a, P> {
    fn new(schema: &'a Schema, tag_policy: P) -> Self {
        BalancingSanitizer {
            schema,
            tag_policy,
            stack: Vec::new(),
            ignoring: false,
            output: Vec::new(),
        }
    }

    fn flags_of(&self, name: &str) -> ElementFlags {
        self.schema.element_flags(name).unwrap_or(ElementFlags::empty())
    }

    fn close_optional_endtag(&mut self, name: &str) {
        let mut matched = None;
        for idx in (0..self.stack.len()).rev() {
            if self.stack[idx] == name {
                matched = Some(idx);
                break;
            }
            if !self.flags_of(&self.stack[idx]).contains(ElementFlags::OPTIONAL_ENDTAG) {
                debug!("</{name}> not closing: blocked by non-optional-endtag ancestor");
                return;
            }
        }
        let Some(matched) = matched else {
            debug!("stray end tag </{name}>, discarding");
            return;
        };
        while self.stack.len() > matched + 1 {
            let popped = self.stack.pop().unwrap();
            self.output.push(format!("</{popped}>"));
        }
        let popped = self.stack.pop().unwrap();
        self.output.push(format!("</{popped}>"));
    }

    fn close_required_endtag(&mut self, name: &str) {
        let Some(matched) = self.stack.iter().rposition(|n| n == name) else {
            debug!("stray end tag </{name}>, discarding");
            return;
        };
        while self.stack.len() > matched + 1 {
            let popped = self.stack.pop().unwrap();
            if self.flags_of(&popped).contains(ElementFlags::OPTIONAL_ENDTAG) {
                continue;
            }
            self.output.push(format!("</{popped}>"));
        }
        let popped = self.stack.pop().unwrap();
        self.output.push(format!("</{popped}>"));
    }
}

impl<'a, P: TagPolicy> SaxHandler for BalancingSanitizer<'a, P> {
    fn start_doc(&mut self) {
        self.stack.clear();
        self.ignoring = false;
    }

    fn end_doc(&mut self) {
        while let Some(name) = self.stack.pop() {
            self.output.push(format!("</{name}>"));
        }
    }

    fn start_tag(&mut self, name: &str, attrs: Vec<(String, Option<String>)>) {
        if self.ignoring {
            return;
        }
        let Some(flags) = self.schema.element_flags(name) else {
            return;
        };
        if flags.contains(ElementFlags::FOLDABLE) {
            return;
        }

        let Some(surviving) = self.tag_policy.check(name, attrs) else {
            debug!("dropping <{name}> via tag policy");
            if !flags.contains(ElementFlags::EMPTY) {
                self.ignoring = true;
            }
            return;
        };

        if !flags.contains(ElementFlags::EMPTY) {
            self.stack.push(name.to_string());
        }

        let mut out = String::with_capacity(name.len() + 2);
        out.push('<');
        out.push_str(name);
        for (attr_name, value) in surviving {
            if let Some(value) = value {
                out.push(' ');
                out.push_str(&attr_name);
                out.push_str("=\"");
                out.push_str(&policy::serialize_attr_value(&value));
                out.push('"');
            }
        }
        out.push('>');
        self.output.push(out);
    }

    fn end_tag(&mut self, name: &str) {
        if self.ignoring {
            self.ignoring = false;
            return;
        }
        let Some(flags) = self.schema.element_flags(name) else {
            return;
        };
        if flags.intersects(ElementFlags::EMPTY | ElementFlags::FOLDABLE) {
            return;
        }
        if flags.contains(ElementFlags::OPTIONAL_ENDTAG) {
            self.close_optional_endtag(name);
        } else {
            self.close_required_endtag(name);
        }
    }

    fn pcdata(&mut self, text: &str) {
        if !self.ignoring {
            self.output.push(text.to_string());
        }
    }

    fn rcdata(&mut self, text: &str) {
        if !self.ignoring {
            self.output.push(text.to_string());
        }
    }

    fn cdata(&mut self, text: &str) {
        if !self.ignoring {
            self.output.push(text.to_string());
        }
    }
}

fn run_sanitizer<P: TagPolicy>(input: &str, schema: &Schema, tag_policy: P) -> String {
    let mut sanitizer = BalancingSanitizer::new(schema, tag_policy);
    tokenizer::run(input, schema, &mut sanitizer);
    sanitizer.output.concat()
}

/// Sanitizes `input` against the bundled default schema. With no URI
/// rewriter, every `URI`-typed attribute is dropped; with no name-token
/// policy, id/class/etc. attributes pass through verbatim.
pub fn sanitize(
    input: &str,
    uri_rewriter: Option<&dyn UriRewriter>,
    nmtoken_policy: Option<&dyn NmTokenPolicy>,
) -> String {
    let schema = Schema::builtin();
    let tag_policy = policy::make_tag_policy(schema, uri_rewriter, nmtoken_policy, None);
    run_sanitizer(input, schema, tag_policy)
}

/// Sanitizes `input` against the bundled default schema using a
/// caller-supplied tag policy, for callers who need control beyond what
/// [`sanitize`]'s URI-rewriter/name-token-policy pair expresses.
pub fn sanitize_with_policy<P: TagPolicy>(input: &str, tag_policy: P) -> String {
    run_sanitizer(input, Schema::builtin(), tag_policy)
}

/// Builds a reusable sanitizing function from a tag policy. The returned
/// closure takes the input and a sink callback, invoked once per output
/// fragment, mirroring how the underlying sanitizer never buffers the
/// whole output itself.
pub fn make_html_sanitizer<P>(tag_policy: P) -> impl Fn(&str, &mut dyn FnMut(&str))
where
    P: TagPolicy + Clone,
{
    move |input, output_sink| {
        let schema = Schema::builtin();
        let mut sanitizer = BalancingSanitizer::new(schema, tag_policy.clone());
        tokenizer::run(input, schema, &mut sanitizer);
        for fragment in sanitizer.output {
            output_sink(&fragment);
        }
    }
}

/// Builds a reusable parsing function that drives a [`SaxHandler`]
/// directly, bypassing the balancing sanitizer entirely. Useful for
/// callers who want raw tokenizer events (e.g. to build a different kind
/// of consumer than the bundled sanitizer).
pub fn make_sax_parser(schema: &Schema) -> impl Fn(&str, &mut dyn SaxHandler) + '_ {
    move |input, handler| tokenizer::run(input, schema, handler)
}
