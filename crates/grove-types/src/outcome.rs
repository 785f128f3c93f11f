use std::fmt;

use serde::{Deserialize, Serialize};

/// The closed outcome taxonomy reported at every tree boundary.
///
/// Failure never crosses a tree boundary as a panic or an open-ended error
/// type: every operation resolves to exactly one of these codes. Callers
/// match on the code; the human message is advisory only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpCode {
    /// Success.
    Ok,
    /// A whole pod was removed.
    RemovedPod,
    /// A single seed was removed or cleared.
    RemovedSeed,

    /// The caller does not hold the needed rights for this path.
    AccessDenied,
    /// The supplied path could not be normalized.
    PathFormat,
    /// The supplied key could not be parsed for this tree.
    KeyFormat,
    /// A field value could not be parsed.
    ValueFormat,
    /// A numeric value exceeded the field's representable maximum.
    ValueOverflow,
    /// A numeric value exceeded the field's representable minimum.
    ValueUnderflow,
    /// `add` found the key already present.
    KeyExists,
    /// A seed command's arguments were malformed.
    BadCommandArgument,

    /// This tab does not accept seed commands.
    UnsupportedCommand,
    UnsupportedRead,
    UnsupportedWrite,
    UnsupportedNull,
    UnsupportedNumber,
    /// This tree does not allow pods to be added through the op interface.
    UnsupportedAddPod,
    UnsupportedRemovePod,
    /// The tree only removes whole pods, not a single seed.
    UnsupportedRemoveSeed,
    UnsupportedGridView,
    UnsupportedTreeOp,
    UnsupportedApply,
    /// The edit session's snapshot no longer matches the live table.
    StaleApply,

    NotFoundKey,
    NotFoundTab,
    NotFoundSeed,
    NotFoundSapling,
    NotFoundField,
}

impl OpCode {
    /// Returns `true` for the three non-failure outcomes.
    pub fn is_ok(self) -> bool {
        matches!(self, OpCode::Ok | OpCode::RemovedPod | OpCode::RemovedSeed)
    }

    /// Canonical short message for this code.
    pub fn message(self) -> &'static str {
        match self {
            OpCode::Ok => "no error",
            OpCode::RemovedPod => "pod removed",
            OpCode::RemovedSeed => "seed removed",
            OpCode::AccessDenied => "access denied",
            OpCode::PathFormat => "path format error",
            OpCode::KeyFormat => "key format error",
            OpCode::ValueFormat => "value format error",
            OpCode::ValueOverflow => "value overflow",
            OpCode::ValueUnderflow => "value underflow",
            OpCode::KeyExists => "key already exists",
            OpCode::BadCommandArgument => "bad command argument",
            OpCode::UnsupportedCommand => "command not supported",
            OpCode::UnsupportedRead => "read not supported",
            OpCode::UnsupportedWrite => "write not supported",
            OpCode::UnsupportedNull => "null not supported",
            OpCode::UnsupportedNumber => "number access not supported",
            OpCode::UnsupportedAddPod => "add pod not supported",
            OpCode::UnsupportedRemovePod => "remove pod not supported",
            OpCode::UnsupportedRemoveSeed => "remove seed not supported",
            OpCode::UnsupportedGridView => "grid view not supported",
            OpCode::UnsupportedTreeOp => "tree op not supported",
            OpCode::UnsupportedApply => "apply not supported",
            OpCode::StaleApply => "stale apply submission",
            OpCode::NotFoundKey => "key not found",
            OpCode::NotFoundTab => "tab not found",
            OpCode::NotFoundSeed => "seed not found",
            OpCode::NotFoundSapling => "sapling not found",
            OpCode::NotFoundField => "field not found",
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// A structured operation failure: code, optional path byte offset, message.
///
/// The offset points into the command's canonical path at the segment where
/// traversal failed, so a remote caller can highlight the failing component.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("{code}{}{}", self.offset_suffix(), self.message_suffix())]
pub struct OpError {
    pub code: OpCode,
    pub path_offset: Option<usize>,
    pub message: String,
}

impl OpError {
    /// A bare error from a code, with the code's canonical message.
    pub fn code(code: OpCode) -> Self {
        Self {
            code,
            path_offset: None,
            message: String::new(),
        }
    }

    /// An error with an explicit human message.
    pub fn with_message(code: OpCode, message: impl Into<String>) -> Self {
        Self {
            code,
            path_offset: None,
            message: message.into(),
        }
    }

    /// Attach the path byte offset where the failure occurred.
    pub fn at(mut self, path_offset: usize) -> Self {
        self.path_offset = Some(path_offset);
        self
    }

    /// The human message: explicit if set, else the code's canonical one.
    pub fn text(&self) -> &str {
        if self.message.is_empty() {
            self.code.message()
        } else {
            &self.message
        }
    }

    fn offset_suffix(&self) -> String {
        match self.path_offset {
            Some(pos) => format!(" @{pos}"),
            None => String::new(),
        }
    }

    fn message_suffix(&self) -> String {
        if self.message.is_empty() {
            String::new()
        } else {
            format!(": {}", self.message)
        }
    }
}

impl From<OpCode> for OpError {
    fn from(code: OpCode) -> Self {
        OpError::code(code)
    }
}

/// Result alias for tree-boundary operations.
pub type OpResult<T> = Result<T, OpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_codes() {
        assert!(OpCode::Ok.is_ok());
        assert!(OpCode::RemovedPod.is_ok());
        assert!(OpCode::RemovedSeed.is_ok());
        assert!(!OpCode::NotFoundKey.is_ok());
        assert!(!OpCode::StaleApply.is_ok());
    }

    #[test]
    fn error_display_carries_offset_and_message() {
        let e = OpError::with_message(OpCode::PathFormat, "empty segment").at(7);
        assert_eq!(e.to_string(), "path format error @7: empty segment");
        let bare = OpError::code(OpCode::NotFoundTab);
        assert_eq!(bare.to_string(), "tab not found");
        assert_eq!(bare.text(), "tab not found");
    }

    #[test]
    fn serde_round_trip() {
        let e = OpError::with_message(OpCode::StaleApply, "editing changed").at(3);
        let json = serde_json::to_string(&e).unwrap();
        let back: OpError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }
}
