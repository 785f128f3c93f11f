//! Canonical seed paths.
//!
//! Canonical form: leading `/`, no trailing `/`, no `.` or inner `..`
//! segments. A leading `/..` head survives normalization verbatim and marks
//! the visitors sub-forest.

use grove_types::{OpCode, OpError, OpResult};

/// If `path` addresses the visitors sub-forest, the remainder after the
/// `/..` head, else `None`.
pub fn is_visitors_path(path: &str) -> Option<&str> {
    let rest = path.strip_prefix("/..")?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

/// A normalized path plus the byte positions where each ancestor prefix
/// ends, shallow to deep, the full path excluded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AclPath {
    path: String,
    prefix_ends: Vec<usize>,
}

impl AclPath {
    pub fn as_str(&self) -> &str {
        &self.path
    }

    pub fn into_string(self) -> String {
        self.path
    }

    pub fn is_visitors(&self) -> bool {
        is_visitors_path(&self.path).is_some()
    }

    /// Ancestor prefixes, deepest first, starting with the path itself and
    /// ending at the head (`/` or `/..`).
    pub fn ancestors(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.path.as_str())
            .chain(self.prefix_ends.iter().rev().map(|&end| &self.path[..end]))
    }

    /// `(byte offset, segment)` pairs below the head.
    pub fn segments(&self) -> impl Iterator<Item = (usize, &str)> {
        let head_len = if self.is_visitors() { 3 } else { 0 };
        let body = &self.path[head_len..];
        body.split('/')
            .filter(|s| !s.is_empty())
            .scan(head_len + 1, move |pos, seg| {
                let at = *pos;
                *pos += seg.len() + 1;
                Some((at, seg))
            })
    }
}

impl std::fmt::Display for AclPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path)
    }
}

fn err_at(msg: &str, offset: usize) -> OpError {
    OpError::with_message(OpCode::PathFormat, msg).at(offset)
}

/// Normalize `raw` against the session's `curr` and `home` paths (both
/// already canonical). `/` prefixes are absolute, `~` is home-relative,
/// anything else is relative to `curr`. Normalizing a canonical path is a
/// no-op, so the operation is idempotent.
///
/// Error offsets point into the expanded path text.
pub fn normalize(raw: &str, curr: &str, home: &str) -> OpResult<AclPath> {
    let expanded: String = if raw.starts_with('/') {
        raw.to_string()
    } else if raw == "~" {
        home.to_string()
    } else if let Some(rest) = raw.strip_prefix("~/") {
        join(home, rest)
    } else {
        join(curr, raw)
    };

    let (head, body) = match is_visitors_path(&expanded) {
        Some(rest) => ("/..", rest),
        None => ("/", &expanded[1..]),
    };

    let mut stack: Vec<&str> = Vec::new();
    let head_end = head.len();
    let mut pos = if head == "/.." { head_end } else { 1 };
    let mut iter = body.split('/').peekable();
    while let Some(piece) = iter.next() {
        let at = pos;
        pos += piece.len() + 1;
        match piece {
            "" => {
                // The "/.." head leaves its separator in the body; one
                // trailing empty piece is just a trailing slash.
                if (at == head_end && head == "/..") || iter.peek().is_none() {
                    continue;
                }
                return Err(err_at("empty segment", at));
            }
            "." => continue,
            ".." => {
                if stack.pop().is_none() {
                    return Err(err_at("path escapes its root", at));
                }
            }
            seg => stack.push(seg),
        }
    }

    let mut path = if head == "/.." {
        String::from("/..")
    } else {
        String::with_capacity(expanded.len())
    };
    let mut prefix_ends = Vec::with_capacity(stack.len());
    for (i, seg) in stack.iter().enumerate() {
        prefix_ends.push(if i == 0 { head_end } else { path.len() });
        path.push('/');
        path.push_str(seg);
    }
    if stack.is_empty() {
        path = head.to_string();
    }
    Ok(AclPath { path, prefix_ends })
}

fn join(base: &str, rest: &str) -> String {
    if base.ends_with('/') {
        format!("{base}{rest}")
    } else {
        format!("{base}/{rest}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn norm(raw: &str) -> String {
        normalize(raw, "/curr/sub", "/home/fonwin")
            .unwrap()
            .into_string()
    }

    #[test]
    fn absolute_home_and_relative() {
        assert_eq!(norm("/Symbs/2330"), "/Symbs/2330");
        assert_eq!(norm("~"), "/home/fonwin");
        assert_eq!(norm("~/box"), "/home/fonwin/box");
        assert_eq!(norm("box"), "/curr/sub/box");
        assert_eq!(norm("."), "/curr/sub");
        assert_eq!(norm(".."), "/curr");
        assert_eq!(norm("../.."), "/");
    }

    #[test]
    fn dots_collapse_and_trailing_slash_drops() {
        assert_eq!(norm("/a/./b/../c/"), "/a/c");
        assert_eq!(norm("/"), "/");
    }

    #[test]
    fn visitors_head_survives() {
        assert_eq!(norm("/.."), "/..");
        assert_eq!(norm("/../Acl"), "/../Acl");
        assert_eq!(norm("/../Acl/.."), "/..");
    }

    #[test]
    fn escaping_the_root_is_an_error() {
        let err = normalize("/a/../../b", "/", "/").unwrap_err();
        assert_eq!(err.code, OpCode::PathFormat);
        assert_eq!(err.path_offset, Some(6));
        // Popping the visitors head is equally out of bounds.
        assert!(normalize("/../..", "/", "/").is_err());
    }

    #[test]
    fn empty_segment_is_an_error_with_offset() {
        let err = normalize("/a//b", "/", "/").unwrap_err();
        assert_eq!(err.code, OpCode::PathFormat);
        assert_eq!(err.path_offset, Some(3));
    }

    #[test]
    fn ancestors_walk_deepest_first() {
        let p = normalize("/Symbs/2330/Deal", "/", "/").unwrap();
        let walk: Vec<_> = p.ancestors().collect();
        assert_eq!(walk, vec!["/Symbs/2330/Deal", "/Symbs/2330", "/Symbs", "/"]);

        let v = normalize("/../Acl/Rules", "/", "/").unwrap();
        let walk: Vec<_> = v.ancestors().collect();
        assert_eq!(walk, vec!["/../Acl/Rules", "/../Acl", "/.."]);
    }

    #[test]
    fn segments_carry_offsets() {
        let p = normalize("/Symbs/2330", "/", "/").unwrap();
        let segs: Vec<_> = p.segments().collect();
        assert_eq!(segs, vec![(1, "Symbs"), (7, "2330")]);

        let root = normalize("/", "/", "/").unwrap();
        assert_eq!(root.segments().count(), 0);
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(segs in proptest::collection::vec("[A-Za-z0-9]{1,6}", 0..5)) {
            let raw = format!("/{}", segs.join("/"));
            let once = normalize(&raw, "/", "/").unwrap();
            let twice = normalize(once.as_str(), "/x", "/y").unwrap();
            prop_assert_eq!(once, twice);
        }
    }
}
