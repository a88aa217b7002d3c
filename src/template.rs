//! Expansion of `{name}` placeholder templates against call-time variables.
//!
//! A [`Template`] is a literal string interspersed with `{name}` placeholders.
//! Expansion substitutes each placeholder with its variable's string form,
//! percent-encoding the substituted value unless the caller marked it as
//! already encoded. Literal text is never double-encoded: existing `%XX`
//! sequences embedded in a pattern survive expansion untouched.
//!
//! Two template flavors exist on top of the generic engine:
//!
//! - URI templates ([`Template::uri`]) are strict: an unresolved placeholder
//!   is an error, and substituted values are aggressively percent-encoded.
//! - [`BodyTemplate`]s allow unresolved placeholders (preserved verbatim,
//!   braces included) and perform no encoding, so partially-supplied
//!   JSON-like bodies survive expansion.

use crate::{Error, Result};
use percent_encoding::{percent_encode, utf8_percent_encode, AsciiSet, CONTROLS, NON_ALPHANUMERIC};
use std::collections::HashMap;

/// Escapes everything outside the RFC 3986 unreserved set. Applied to
/// substituted variable values, so a value containing `/` becomes `%2F`
/// (see `RequestTemplate`'s slash-decoding flag for the way back).
const VALUE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Escapes only characters that are never legal in a URI. Applied to literal
/// pattern text and to pre-encoded values, both of which the caller already
/// shaped for the wire.
const LITERAL_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'|')
    .add(b'\\')
    .add(b'^');

/// Behavior when a placeholder has no matching variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpansionMode {
    /// An unresolved placeholder is an error.
    Strict,
    /// An unresolved placeholder is preserved verbatim as literal text.
    AllowUnresolved,
}

/// A call-time variable value plus its encoding marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    value: String,
    pre_encoded: bool,
}

impl Variable {
    /// A plain value; percent-encoded on substitution.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            pre_encoded: false,
        }
    }

    /// A value the caller has already percent-encoded; its `%XX` sequences
    /// are preserved on substitution.
    pub fn pre_encoded(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            pre_encoded: true,
        }
    }

    /// The raw string form.
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Name-to-value map consumed by [`Template::expand`].
pub type Variables = HashMap<String, Variable>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Chunk {
    Literal(String),
    Expression(String),
}

/// A parsed `{name}` placeholder template.
///
/// Expansion is a pure function of pattern and variables: expanding the same
/// template with the same variables twice yields identical output, and a
/// pattern without placeholders is returned unchanged (modulo literal
/// escaping of characters that are never URI-legal).
#[derive(Debug, Clone)]
pub struct Template {
    pattern: String,
    chunks: Vec<Chunk>,
    mode: ExpansionMode,
    encode: bool,
}

impl Template {
    pub(crate) fn new(pattern: impl Into<String>, mode: ExpansionMode, encode: bool) -> Self {
        let pattern = pattern.into();
        let chunks = parse(&pattern);
        Self {
            pattern,
            chunks,
            mode,
            encode,
        }
    }

    /// A strict, encoding template for URI paths.
    pub fn uri(pattern: impl Into<String>) -> Self {
        Self::new(pattern, ExpansionMode::Strict, true)
    }

    /// A lenient, encoding template for query and header values. Callers
    /// inspect [`Template::variables`] to drop pairs that stay unresolved.
    pub fn value(pattern: impl Into<String>) -> Self {
        Self::new(pattern, ExpansionMode::AllowUnresolved, true)
    }

    /// The original pattern string.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Names of all placeholders in the pattern, in order of appearance.
    pub fn variables(&self) -> Vec<&str> {
        self.chunks
            .iter()
            .filter_map(|c| match c {
                Chunk::Expression(name) => Some(name.as_str()),
                Chunk::Literal(_) => None,
            })
            .collect()
    }

    /// True if the pattern references the named placeholder.
    pub fn has_variable(&self, name: &str) -> bool {
        self.chunks
            .iter()
            .any(|c| matches!(c, Chunk::Expression(n) if n == name))
    }

    /// Substitutes `variables` into the pattern.
    pub fn expand(&self, variables: &Variables) -> Result<String> {
        let mut out = String::with_capacity(self.pattern.len());
        for chunk in &self.chunks {
            match chunk {
                Chunk::Literal(text) => {
                    if self.encode {
                        out.push_str(&encode_literal(text, LITERAL_SET));
                    } else {
                        out.push_str(text);
                    }
                }
                Chunk::Expression(name) => match variables.get(name) {
                    Some(var) => {
                        if !self.encode {
                            out.push_str(&var.value);
                        } else if var.pre_encoded {
                            out.push_str(&encode_literal(&var.value, LITERAL_SET));
                        } else {
                            out.extend(utf8_percent_encode(&var.value, VALUE_SET));
                        }
                    }
                    None => match self.mode {
                        ExpansionMode::Strict => {
                            return Err(Error::Contract(format!(
                                "unresolved template variable `{name}` in `{}`",
                                self.pattern
                            )));
                        }
                        ExpansionMode::AllowUnresolved => {
                            out.push('{');
                            out.push_str(name);
                            out.push('}');
                        }
                    },
                },
            }
        }
        Ok(out)
    }
}

/// Template for declarative request bodies. Unresolved placeholders are
/// preserved as literals and nothing is percent-encoded.
///
/// When the pattern is exactly a percent-encoded JSON object (it begins with
/// `%7B` and ends with `%7D`), only the outermost encoded brace pair is
/// decoded after expansion. This lets a JSON body participate in placeholder
/// syntax without its structural braces reading as expressions.
#[derive(Debug, Clone)]
pub struct BodyTemplate {
    template: Template,
    json: bool,
}

const JSON_TOKEN_START: &str = "{";
const JSON_TOKEN_END: &str = "}";
const JSON_TOKEN_START_ENCODED: &str = "%7B";
const JSON_TOKEN_END_ENCODED: &str = "%7D";

impl BodyTemplate {
    pub fn new(pattern: impl Into<String>) -> Self {
        let template = Template::new(pattern, ExpansionMode::AllowUnresolved, false);
        let json = template.pattern.starts_with(JSON_TOKEN_START_ENCODED)
            && template.pattern.ends_with(JSON_TOKEN_END_ENCODED);
        Self { template, json }
    }

    pub fn pattern(&self) -> &str {
        self.template.pattern()
    }

    pub fn variables(&self) -> Vec<&str> {
        self.template.variables()
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.template.has_variable(name)
    }

    /// Expands the body. Never fails: unresolved placeholders stay verbatim.
    pub fn expand(&self, variables: &Variables) -> String {
        let expanded = match self.template.expand(variables) {
            Ok(s) => s,
            Err(_) => unreachable!("allow-unresolved expansion cannot fail"),
        };
        if !self.json {
            return expanded;
        }
        // Decode only the outermost encoded brace pair.
        let start = match expanded.find(JSON_TOKEN_START_ENCODED) {
            Some(i) => i + JSON_TOKEN_START_ENCODED.len(),
            None => return expanded,
        };
        let end = match expanded.rfind(JSON_TOKEN_END_ENCODED) {
            Some(i) if i >= start => i,
            _ => return expanded,
        };
        let mut out = String::with_capacity(expanded.len());
        out.push_str(JSON_TOKEN_START);
        out.push_str(&expanded[start..end]);
        out.push_str(JSON_TOKEN_END);
        out
    }
}

/// How multi-valued query parameters are written on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollectionFormat {
    /// `name=a,b,c`
    Csv,
    /// `name=a%20b%20c`
    Ssv,
    /// `name=a%09b%09c`
    Tsv,
    /// `name=a%7Cb%7Cc`
    Pipes,
    /// `name=a&name=b&name=c`
    #[default]
    Exploded,
}

impl CollectionFormat {
    /// Renders one query parameter. `name` and `values` must already be
    /// percent-encoded.
    pub(crate) fn render(&self, name: &str, values: &[String]) -> String {
        if values.is_empty() {
            return name.to_string();
        }
        match self {
            CollectionFormat::Exploded => values
                .iter()
                .map(|v| format!("{name}={v}"))
                .collect::<Vec<_>>()
                .join("&"),
            CollectionFormat::Csv => format!("{name}={}", values.join(",")),
            CollectionFormat::Ssv => format!("{name}={}", values.join("%20")),
            CollectionFormat::Tsv => format!("{name}={}", values.join("%09")),
            CollectionFormat::Pipes => format!("{name}={}", values.join("%7C")),
        }
    }
}

/// Escapes for a query name or value: the literal set plus the characters
/// that delimit query pairs.
const QUERY_SET: &AsciiSet = &LITERAL_SET.add(b'&').add(b'=').add(b'+').add(b'#');

/// Percent-encodes a query name or value for the wire, preserving `%XX`
/// sequences already present.
pub(crate) fn encode_query_component(input: &str) -> String {
    encode_literal(input, QUERY_SET)
}

fn parse(pattern: &str) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut literal = String::new();
    let mut rest = pattern;
    while let Some(open) = rest.find('{') {
        match rest[open..].find('}') {
            Some(close_rel) => {
                literal.push_str(&rest[..open]);
                if !literal.is_empty() {
                    chunks.push(Chunk::Literal(std::mem::take(&mut literal)));
                }
                let name = &rest[open + 1..open + close_rel];
                chunks.push(Chunk::Expression(name.to_string()));
                rest = &rest[open + close_rel + 1..];
            }
            None => {
                // Unterminated brace reads as literal text.
                literal.push_str(rest);
                rest = "";
                break;
            }
        }
    }
    literal.push_str(rest);
    if !literal.is_empty() {
        chunks.push(Chunk::Literal(literal));
    }
    chunks
}

/// Percent-encodes `input` while preserving `%XX` sequences already present.
pub(crate) fn encode_literal(input: &str, set: &'static AsciiSet) -> String {
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(bytes.len());
    let mut run_start = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && bytes[i + 1].is_ascii_hexdigit()
            && bytes[i + 2].is_ascii_hexdigit()
        {
            for segment in percent_encode(&bytes[run_start..i], set) {
                out.push_str(segment);
            }
            out.push_str(&input[i..i + 3]);
            i += 3;
            run_start = i;
        } else {
            i += 1;
        }
    }
    for segment in percent_encode(&bytes[run_start..], set) {
        out.push_str(segment);
    }
    out
}
