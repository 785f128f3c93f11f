//! Structured command results.

use serde::Serialize;

use grove_schema::LayoutDescriptor;
use grove_tree::GridViewResult;
use grove_types::{OpCode, OpError};

/// Command-specific result data.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Payload {
    #[default]
    None,
    /// Free text: seed reads, write reports, command replies.
    Text(String),
    /// One grid window.
    Grid(GridViewResult),
    /// A layout descriptor from `pl`.
    Layout(LayoutDescriptor),
}

/// The structured result of one command line.
#[derive(Clone, Debug, Serialize)]
pub struct Outcome {
    pub code: OpCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_offset: Option<usize>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
    pub payload: Payload,
}

impl Outcome {
    pub fn ok(payload: Payload) -> Self {
        Outcome {
            code: OpCode::Ok,
            path_offset: None,
            message: String::new(),
            payload,
        }
    }

    pub fn done(code: OpCode, payload: Payload) -> Self {
        Outcome {
            code,
            path_offset: None,
            message: String::new(),
            payload,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code.is_ok()
    }
}

impl From<OpError> for Outcome {
    fn from(err: OpError) -> Self {
        Outcome {
            code: err.code,
            path_offset: err.path_offset,
            message: if err.message.is_empty() {
                err.code.message().to_string()
            } else {
                err.message
            },
            payload: Payload::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_outcomes_serialize_with_offset() {
        let out: Outcome = OpError::with_message(OpCode::NotFoundKey, "no 2454 here")
            .at(7)
            .into();
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["code"], "not_found_key");
        assert_eq!(json["path_offset"], 7);
        assert_eq!(json["message"], "no 2454 here");
        assert_eq!(json["payload"], "none");
    }

    #[test]
    fn ok_outcomes_skip_empty_parts() {
        let out = Outcome::ok(Payload::Text("Qty=100\n".into()));
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["code"], "ok");
        assert!(json.get("path_offset").is_none());
        assert!(json.get("message").is_none());
        assert_eq!(json["payload"]["text"], "Qty=100\n");
    }
}
