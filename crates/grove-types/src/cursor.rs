use std::fmt;

use serde::{Deserialize, Serialize};

/// A listing cursor: either a concrete key or one of the two container
/// sentinels.
///
/// `Begin`/`End` replace the original framework's reserved pointer values:
/// `Begin` positions at the container's first entry, `End` past its last
/// (`End` also expresses "append" for trees that support keyless add).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyCursor {
    Begin,
    End,
    Key(String),
}

impl KeyCursor {
    pub fn key(k: impl Into<String>) -> Self {
        KeyCursor::Key(k.into())
    }

    pub fn is_begin(&self) -> bool {
        matches!(self, KeyCursor::Begin)
    }

    pub fn is_end(&self) -> bool {
        matches!(self, KeyCursor::End)
    }

    pub fn is_sentinel(&self) -> bool {
        !matches!(self, KeyCursor::Key(_))
    }

    /// The concrete key, if any.
    pub fn as_key(&self) -> Option<&str> {
        match self {
            KeyCursor::Key(k) => Some(k),
            _ => None,
        }
    }
}

impl Default for KeyCursor {
    fn default() -> Self {
        KeyCursor::Begin
    }
}

impl fmt::Display for KeyCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyCursor::Begin => f.write_str("<begin>"),
            KeyCursor::End => f.write_str("<end>"),
            KeyCursor::Key(k) => f.write_str(k),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_queries() {
        assert!(KeyCursor::Begin.is_begin());
        assert!(KeyCursor::End.is_end());
        assert!(KeyCursor::Begin.is_sentinel());
        assert!(!KeyCursor::key("2317").is_sentinel());
        assert_eq!(KeyCursor::key("2317").as_key(), Some("2317"));
        assert_eq!(KeyCursor::End.as_key(), None);
    }
}
