use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Characters a [`Name`] may never contain: path, tab, list, and assignment
/// separators plus the grid wire separators.
const FORBIDDEN: &[char] = &['/', '^', ',', '=', '\t', '\n', '\r'];

/// Why a name was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("name is empty")]
    Empty,
    #[error("name {0:?} contains forbidden character {1:?}")]
    ForbiddenChar(String, char),
    #[error("name {0:?} contains whitespace")]
    Whitespace(String),
}

/// A validated identifier for fields, tabs, and tree entries.
///
/// Names are unique within their owner (fields within a tab, tabs within a
/// layout, entries within a forest tree) and must be usable verbatim as a
/// path segment and as a grid cell.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Name(String);

impl Name {
    /// Validate and construct a name.
    pub fn new(s: impl Into<String>) -> Result<Self, NameError> {
        let s = s.into();
        if s.is_empty() {
            return Err(NameError::Empty);
        }
        if let Some(ch) = s.chars().find(|c| FORBIDDEN.contains(c)) {
            return Err(NameError::ForbiddenChar(s, ch));
        }
        if s.chars().any(char::is_whitespace) {
            return Err(NameError::Whitespace(s));
        }
        Ok(Name(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for Name {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Name {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Name {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Name {
    type Err = NameError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Name::new(s)
    }
}

impl TryFrom<&str> for Name {
    type Error = NameError;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Name::new(s)
    }
}

impl PartialEq<str> for Name {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Name {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({:?})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_identifiers() {
        for ok in ["Qty", "Symbs", "acl", "2317", "A-b.c_d"] {
            assert!(Name::new(ok).is_ok(), "{ok:?} should be accepted");
        }
    }

    #[test]
    fn rejects_separators_and_whitespace() {
        assert_eq!(Name::new(""), Err(NameError::Empty));
        assert!(matches!(Name::new("a/b"), Err(NameError::ForbiddenChar(_, '/'))));
        assert!(matches!(Name::new("a^b"), Err(NameError::ForbiddenChar(_, '^'))));
        assert!(matches!(Name::new("a=b"), Err(NameError::ForbiddenChar(_, '='))));
        assert!(matches!(Name::new("a,b"), Err(NameError::ForbiddenChar(_, ','))));
        assert!(matches!(Name::new("a b"), Err(NameError::Whitespace(_))));
    }

    #[test]
    fn borrows_as_str_for_map_lookup() {
        use std::collections::BTreeMap;
        let mut m: BTreeMap<Name, u32> = BTreeMap::new();
        m.insert(Name::new("Qty").unwrap(), 1);
        assert_eq!(m.get("Qty"), Some(&1));
    }
}
