//! Attribute path addressing.
//!
//! A path string is parsed once into [`Segment`]s: `"a.b[0].c"` becomes
//! `Key("a"), Key("b"), Index(0), Key("c")`. Bracket groups that are not a
//! plain non-negative integer make the whole dot-separated part a literal
//! key, so `"a[x]"` addresses the attribute named `a[x]`.

use std::fmt;

/// One step of a [`Path`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Named attribute.
    Key(String),
    /// Positional element of a collection or array.
    Index(usize),
}

/// A parsed attribute path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Path {
    segments: Vec<Segment>,
}

impl Path {
    /// Parse dot and bracket notation.
    #[must_use]
    pub fn parse(source: &str) -> Self {
        let mut segments = Vec::new();
        for part in source.split('.') {
            match split_indices(part) {
                Some((name, indices)) => {
                    if !name.is_empty() || indices.is_empty() {
                        segments.push(Segment::Key(name.to_owned()));
                    }
                    segments.extend(indices.into_iter().map(Segment::Index));
                }
                None => segments.push(Segment::Key(part.to_owned())),
            }
        }
        Self { segments }
    }

    /// Whether `source` needs parsing (has a `.` or `[`).
    #[must_use]
    pub fn is_compound(source: &str) -> bool {
        source.contains(['.', '['])
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Split into the leading path and the trailing segment.
    #[must_use]
    pub fn split_last(&self) -> Option<(Path, &Segment)> {
        let (last, lead) = self.segments.split_last()?;
        Some((
            Path {
                segments: lead.to_vec(),
            },
            last,
        ))
    }
}

impl From<Vec<Segment>> for Path {
    fn from(segments: Vec<Segment>) -> Self {
        Self { segments }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Key(key) if i == 0 => f.write_str(key)?,
                Segment::Key(key) => write!(f, ".{key}")?,
                Segment::Index(idx) => write!(f, "[{idx}]")?,
            }
        }
        Ok(())
    }
}

fn split_indices(part: &str) -> Option<(&str, Vec<usize>)> {
    let Some(open) = part.find('[') else {
        return Some((part, Vec::new()));
    };
    let (name, mut rest) = part.split_at(open);
    let mut indices = Vec::new();
    while !rest.is_empty() {
        let body = rest.strip_prefix('[')?;
        let close = body.find(']')?;
        let digits = &body[..close];
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        indices.push(digits.parse().ok()?);
        rest = &body[close + 1..];
    }
    Some((name, indices))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key(k: &str) -> Segment {
        Segment::Key(k.to_owned())
    }

    #[test]
    fn plain_key() {
        assert_eq!(Path::parse("title").segments(), &[key("title")]);
    }

    #[test]
    fn dotted_path() {
        assert_eq!(
            Path::parse("a.b.c").segments(),
            &[key("a"), key("b"), key("c")]
        );
    }

    #[test]
    fn indexed_path() {
        assert_eq!(
            Path::parse("a[0].b").segments(),
            &[key("a"), Segment::Index(0), key("b")]
        );
        assert_eq!(
            Path::parse("grid[2][10]").segments(),
            &[key("grid"), Segment::Index(2), Segment::Index(10)]
        );
    }

    #[test]
    fn leading_index() {
        assert_eq!(
            Path::parse("[3].name").segments(),
            &[Segment::Index(3), key("name")]
        );
    }

    #[test]
    fn malformed_brackets_are_literal() {
        assert_eq!(Path::parse("a[x]").segments(), &[key("a[x]")]);
        assert_eq!(Path::parse("a[1").segments(), &[key("a[1")]);
        assert_eq!(Path::parse("a[]").segments(), &[key("a[]")]);
        assert_eq!(Path::parse("a[-1]").segments(), &[key("a[-1]")]);
    }

    #[test]
    fn empty_parts_survive() {
        assert_eq!(Path::parse("a.").segments(), &[key("a"), key("")]);
    }

    #[test]
    fn split_last_separates_trailing_segment() {
        let path = Path::parse("a.b.c");
        let (lead, last) = path.split_last().unwrap();
        assert_eq!(lead.to_string(), "a.b");
        assert_eq!(last, &key("c"));
        assert!(Path::default().split_last().is_none());
    }

    #[test]
    fn compound_detection() {
        assert!(Path::is_compound("a.b"));
        assert!(Path::is_compound("a[0]"));
        assert!(!Path::is_compound("plain"));
    }

    fn segment_strategy() -> impl Strategy<Value = Segment> {
        prop_oneof![
            "[a-z_][a-z0-9_]{0,7}".prop_map(Segment::Key),
            (0usize..1000).prop_map(Segment::Index),
        ]
    }

    proptest! {
        #[test]
        fn display_then_parse_round_trips(
            first in "[a-z_][a-z0-9_]{0,7}",
            rest in proptest::collection::vec(segment_strategy(), 0..6),
        ) {
            let mut segments = vec![Segment::Key(first)];
            segments.extend(rest);
            let path = Path::from(segments);
            prop_assert_eq!(Path::parse(&path.to_string()), path);
        }

        #[test]
        fn parse_never_panics(source in "\\PC{0,32}") {
            let _ = Path::parse(&source);
        }
    }
}
