//! RFC 6570 URI templates, levels 1 to 3 plus prefix modifiers.
//!
//! Values are plain strings, so list and associative-array values (and the
//! explode modifier's effect on them) do not apply. An explode marker is
//! accepted and ignored.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Unclosed brace | `"/a/{id"` | Remainder emitted as a literal |
//! | Empty expression | `"/a/{}"` | Emitted as a literal |
//! | Missing variable | No value for `{id}` | Variable skipped (RFC "undefined") |
//! | Bad prefix | `"{id:x}"` | Modifier ignored |

use std::fmt;

/// Expression operator, the first character inside `{...}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `{var}`
    Simple,
    /// `{+var}`
    Reserved,
    /// `{#var}`
    Fragment,
    /// `{.var}`
    Label,
    /// `{/var}`
    Path,
    /// `{;var}`
    PathParam,
    /// `{?var}`
    Query,
    /// `{&var}`
    QueryContinuation,
}

impl Operator {
    fn from_char(c: char) -> Option<Self> {
        Some(match c {
            '+' => Self::Reserved,
            '#' => Self::Fragment,
            '.' => Self::Label,
            '/' => Self::Path,
            ';' => Self::PathParam,
            '?' => Self::Query,
            '&' => Self::QueryContinuation,
            _ => return None,
        })
    }

    const fn first(self) -> &'static str {
        match self {
            Self::Simple | Self::Reserved => "",
            Self::Fragment => "#",
            Self::Label => ".",
            Self::Path => "/",
            Self::PathParam => ";",
            Self::Query => "?",
            Self::QueryContinuation => "&",
        }
    }

    const fn separator(self) -> &'static str {
        match self {
            Self::Simple | Self::Reserved | Self::Fragment => ",",
            Self::Label => ".",
            Self::Path => "/",
            Self::PathParam => ";",
            Self::Query | Self::QueryContinuation => "&",
        }
    }

    const fn named(self) -> bool {
        matches!(self, Self::PathParam | Self::Query | Self::QueryContinuation)
    }

    const fn if_empty(self) -> &'static str {
        match self {
            Self::Query | Self::QueryContinuation => "=",
            _ => "",
        }
    }

    const fn allows_reserved(self) -> bool {
        matches!(self, Self::Reserved | Self::Fragment)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct VarSpec {
    name: String,
    prefix: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Expression { op: Operator, vars: Vec<VarSpec> },
}

/// A parsed URI template.
#[derive(Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    parts: Vec<Part>,
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("source", &self.source)
            .finish()
    }
}

impl Template {
    /// Parse a template. Parsing never fails; malformed expressions are kept
    /// as literal text.
    #[must_use]
    pub fn parse(source: &str) -> Self {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars();

        while let Some(ch) = chars.next() {
            if ch != '{' {
                literal.push(ch);
                continue;
            }
            let mut body = String::new();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '}' {
                    closed = true;
                    break;
                }
                body.push(c);
            }
            match parse_expression(&body).filter(|_| closed) {
                Some(part) => {
                    if !literal.is_empty() {
                        parts.push(Part::Literal(std::mem::take(&mut literal)));
                    }
                    parts.push(part);
                }
                None => {
                    literal.push('{');
                    literal.push_str(&body);
                    if closed {
                        literal.push('}');
                    }
                }
            }
        }
        if !literal.is_empty() {
            parts.push(Part::Literal(literal));
        }

        Self {
            source: source.to_owned(),
            parts,
        }
    }

    /// The original template text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Variable names in order of appearance (duplicates kept).
    #[must_use]
    pub fn variables(&self) -> Vec<&str> {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Expression { vars, .. } => Some(vars.iter().map(|v| v.name.as_str())),
                Part::Literal(_) => None,
            })
            .flatten()
            .collect()
    }

    /// Expand against `(name, value)` pairs.
    #[must_use]
    pub fn expand(&self, params: &[(&str, &str)]) -> String {
        let mut out = String::with_capacity(self.source.len());
        for part in &self.parts {
            match part {
                Part::Literal(text) => out.push_str(text),
                Part::Expression { op, vars } => expand_expression(&mut out, *op, vars, params),
            }
        }
        out
    }
}

fn parse_expression(body: &str) -> Option<Part> {
    let mut chars = body.chars();
    let first = chars.next()?;
    let (op, rest) = match Operator::from_char(first) {
        Some(op) => (op, chars.as_str()),
        None => (Operator::Simple, body),
    };

    let mut vars = Vec::new();
    for spec in rest.split(',') {
        let spec = spec.strip_suffix('*').unwrap_or(spec);
        let (name, prefix) = match spec.split_once(':') {
            Some((name, len)) => (name, len.parse::<usize>().ok()),
            None => (spec, None),
        };
        if name.is_empty() || !name.chars().all(is_varchar) {
            return None;
        }
        vars.push(VarSpec {
            name: name.to_owned(),
            prefix,
        });
    }
    Some(Part::Expression { op, vars })
}

fn is_varchar(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '%'
}

fn expand_expression(out: &mut String, op: Operator, vars: &[VarSpec], params: &[(&str, &str)]) {
    let mut first = true;
    for var in vars {
        let Some(&(_, value)) = params.iter().find(|&&(name, _)| name == var.name) else {
            continue;
        };
        out.push_str(if first { op.first() } else { op.separator() });
        first = false;

        let value = match var.prefix {
            Some(n) => truncate_chars(value, n),
            None => value,
        };
        if op.named() {
            out.push_str(&var.name);
            if value.is_empty() {
                out.push_str(op.if_empty());
                continue;
            }
            out.push('=');
        }
        encode_into(out, value, op.allows_reserved());
    }
}

fn truncate_chars(value: &str, n: usize) -> &str {
    match value.char_indices().nth(n) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~')
}

fn is_reserved(b: u8) -> bool {
    matches!(
        b,
        b':' | b'/'
            | b'?'
            | b'#'
            | b'['
            | b']'
            | b'@'
            | b'!'
            | b'$'
            | b'&'
            | b'\''
            | b'('
            | b')'
            | b'*'
            | b'+'
            | b','
            | b';'
            | b'='
    )
}

/// Percent-encode `value`, keeping unreserved characters (and reserved ones
/// plus existing `%XX` triplets when `allow_reserved`).
fn encode_into(out: &mut String, value: &str, allow_reserved: bool) {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let bytes = value.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if is_unreserved(b) || (allow_reserved && is_reserved(b)) {
            out.push(char::from(b));
        } else if allow_reserved
            && b == b'%'
            && i + 2 < bytes.len()
            && bytes[i + 1].is_ascii_hexdigit()
            && bytes[i + 2].is_ascii_hexdigit()
        {
            out.push_str(&value[i..i + 3]);
            i += 3;
            continue;
        } else {
            out.push('%');
            out.push(char::from(HEX[usize::from(b >> 4)]));
            out.push(char::from(HEX[usize::from(b & 0x0F)]));
        }
        i += 1;
    }
}
