//! One-line command classification.
//!
//! The first token decides everything: a path-lead line (`/`, `.`, `~`, or
//! a quoted path) navigates or runs a seed command, a short verb selects
//! the operation, anything else is an error ticket.

use grove_types::{KeyCursor, OpCode, OpError, OpResult};

/// A classified command, paths still raw.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Ticket {
    /// Bare path: make it the session's current path.
    Navigate { path: String },
    /// Path followed by text: run the seed's command.
    SeedCommand { path: String, command: String },
    /// `ss,<field=value,...> <path>`
    Write { path: String, assignments: String },
    /// `ps <path>`
    Read { path: String },
    /// `rs <path>`
    Remove { path: String },
    /// `gv[,rows[,startKey[^tab]]] [path]`
    GridView {
        path: String,
        rows: Option<u16>,
        start: KeyCursor,
        tab: Option<String>,
    },
    /// `gv+`: next page of the previous grid view.
    GridContinue,
    /// `pl [path]`
    PrintLayout { path: String },
}

fn bad(msg: impl Into<String>) -> OpError {
    OpError::with_message(OpCode::BadCommandArgument, msg)
}

/// Split the leading token, honoring a quoted form. Returns (token, rest).
fn split_token(line: &str) -> OpResult<(&str, &str)> {
    let mut chars = line.char_indices();
    let (_, first) = chars.next().ok_or_else(|| bad("empty command"))?;
    if matches!(first, '\'' | '"' | '`') {
        let body = &line[first.len_utf8()..];
        let close = body
            .find(first)
            .ok_or_else(|| bad(format!("unterminated {first} quote")))?;
        Ok((&body[..close], body[close + first.len_utf8()..].trim_start()))
    } else {
        match line.find(char::is_whitespace) {
            Some(at) => Ok((&line[..at], line[at..].trim_start())),
            None => Ok((line, "")),
        }
    }
}

fn path_or_here(rest: &str) -> OpResult<String> {
    if rest.is_empty() {
        return Ok(".".to_string());
    }
    let (path, tail) = split_token(rest)?;
    if !tail.is_empty() {
        return Err(bad(format!("unexpected trailing text {tail:?}")));
    }
    Ok(path.to_string())
}

/// Classify one command line.
pub fn parse(cmdln: &str) -> OpResult<Ticket> {
    let line = cmdln.trim();
    if line.is_empty() {
        return Err(bad("empty command"));
    }
    let lead = line.chars().next().unwrap_or_default();
    if matches!(lead, '/' | '.' | '~' | '\'' | '"' | '`') {
        let (path, rest) = split_token(line)?;
        if path.is_empty() {
            return Err(bad("empty path"));
        }
        return Ok(if rest.is_empty() {
            Ticket::Navigate {
                path: path.to_string(),
            }
        } else {
            Ticket::SeedCommand {
                path: path.to_string(),
                command: rest.to_string(),
            }
        });
    }

    let (verb, rest) = split_token(line)?;
    match verb {
        "ps" => Ok(Ticket::Read {
            path: path_or_here(rest)?,
        }),
        "rs" => Ok(Ticket::Remove {
            path: path_or_here(rest)?,
        }),
        "pl" => Ok(Ticket::PrintLayout {
            path: path_or_here(rest)?,
        }),
        "gv+" => {
            if !rest.is_empty() {
                return Err(bad("gv+ takes no arguments"));
            }
            Ok(Ticket::GridContinue)
        }
        _ if verb == "gv" || verb.starts_with("gv,") => {
            let (rows, start, tab) = parse_gv_args(verb.strip_prefix("gv").unwrap_or_default())?;
            Ok(Ticket::GridView {
                path: path_or_here(rest)?,
                rows,
                start,
                tab,
            })
        }
        _ if verb.starts_with("ss,") => {
            let assignments = &verb[3..];
            if assignments.is_empty() {
                return Err(bad("ss needs field=value assignments"));
            }
            Ok(Ticket::Write {
                path: path_or_here(rest)?,
                assignments: assignments.to_string(),
            })
        }
        other => Err(OpError::with_message(
            OpCode::UnsupportedCommand,
            format!("unknown command {other:?}"),
        )),
    }
}

/// `",rows[,startKey[^tab]]"` after the `gv` verb.
fn parse_gv_args(args: &str) -> OpResult<(Option<u16>, KeyCursor, Option<String>)> {
    let Some(args) = args.strip_prefix(',') else {
        return Ok((None, KeyCursor::Begin, None));
    };
    let (rows_text, key_text) = match args.split_once(',') {
        Some((r, k)) => (r, Some(k)),
        None => (args, None),
    };
    let rows = if rows_text.is_empty() {
        None
    } else {
        Some(
            rows_text
                .parse::<u16>()
                .map_err(|_| bad(format!("bad row count {rows_text:?}")))?,
        )
    };
    let (start, tab) = match key_text {
        None | Some("") => (KeyCursor::Begin, None),
        Some(k) => {
            let (key, tab) = match k.split_once('^') {
                Some((key, tab)) => (key, Some(tab.to_string())),
                None => (k, None),
            };
            let start = if key.is_empty() {
                KeyCursor::Begin
            } else {
                KeyCursor::Key(key.to_string())
            };
            (start, tab)
        }
    };
    Ok((rows, start, tab))
}
