//! Paginated tabular views over a tree's pods.
//!
//! A grid view renders a window of rows as one string: cells split by `'\t'`,
//! rows split by `'\n'`, no trailing row splitter. The key cell always comes
//! first, then the requested tab's visible fields in schema order. Cell text
//! is never escaped, which is why separator bytes are banned from names and
//! rejected by `Chars` parsing.

use serde::{Deserialize, Serialize};

use grove_types::{KeyCursor, CELL_SEP, ROW_SEP};

/// Parameters of one grid view window.
#[derive(Clone, Debug, Default)]
pub struct GridViewRequest {
    /// Where the window starts before offset stepping.
    pub start: KeyCursor,
    /// Steps to move the start position. Negative steps toward begin and
    /// clamps there; positive steps toward end and clamps there.
    pub offset: isize,
    /// Maximum rows to render; 0 means implementation-chosen.
    pub max_rows: usize,
    /// Soft cap on grid bytes; 0 means unlimited. The row that crosses the
    /// cap is still kept whole.
    pub max_bytes: usize,
    /// Which tab's fields to render.
    pub tab_index: usize,
}

impl GridViewRequest {
    pub fn from_begin(max_rows: usize) -> Self {
        Self {
            max_rows,
            ..Default::default()
        }
    }

    pub fn starting_at(start: KeyCursor, max_rows: usize) -> Self {
        Self {
            start,
            max_rows,
            ..Default::default()
        }
    }
}

/// One rendered window plus placement metadata.
///
/// Distances use `None` for "not supported / unknown": `distance_begin` is
/// `Some(0)` only when the window starts at the container's first row, and
/// `distance_end` is `Some(0)` for an empty window at end or `Some(1)` when
/// the last rendered row is the container's last.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridViewResult {
    pub grid: String,
    pub row_count: usize,
    pub distance_begin: Option<usize>,
    pub distance_end: Option<usize>,
    pub container_size: Option<usize>,
    /// Key of the last rendered row, the continuation point for the next page.
    pub last_key: Option<String>,
}

impl GridViewResult {
    /// `true` when the last row of the container is in this window.
    pub fn at_end(&self) -> bool {
        matches!(self.distance_end, Some(0) | Some(1))
    }
}

/// Render a window over `len` rows starting from resolved position `start`.
///
/// `append_row(index, buf)` writes one row (key cell first) into `buf` and
/// returns the row's key. Row splitters go between rows only.
pub fn window_rows<F>(start: usize, len: usize, req: &GridViewRequest, mut append_row: F) -> GridViewResult
where
    F: FnMut(usize, &mut String) -> String,
{
    let mut pos = start.min(len);
    if req.offset < 0 {
        pos = pos.saturating_sub(req.offset.unsigned_abs());
    } else {
        pos = pos.saturating_add(req.offset as usize).min(len);
    }

    let mut res = GridViewResult {
        container_size: Some(len),
        distance_begin: if pos == 0 { Some(0) } else { None },
        ..Default::default()
    };
    if pos == len {
        res.distance_end = Some(0);
        return res;
    }
    loop {
        if !res.grid.is_empty() {
            res.grid.push(ROW_SEP);
        }
        let key = append_row(pos, &mut res.grid);
        res.last_key = Some(key);
        res.row_count += 1;
        pos += 1;
        if pos == len {
            res.distance_end = Some(1);
            break;
        }
        if req.max_rows > 0 && res.row_count >= req.max_rows {
            break;
        }
        if req.max_bytes > 0 && res.grid.len() >= req.max_bytes {
            break;
        }
    }
    res
}

/// Append one cell with its leading splitter.
pub fn push_cell(buf: &mut String, text: &str) {
    buf.push(CELL_SEP);
    buf.push_str(text);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> Vec<String> {
        ["2317", "2330", "2454", "3008"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn render(start: usize, req: &GridViewRequest) -> GridViewResult {
        let rows = keys();
        window_rows(start, rows.len(), req, |i, buf| {
            buf.push_str(&rows[i]);
            push_cell(buf, "x");
            rows[i].clone()
        })
    }

    #[test]
    fn first_page_from_begin() {
        let res = render(0, &GridViewRequest::from_begin(1));
        assert_eq!(res.grid, "2317\tx");
        assert_eq!(res.row_count, 1);
        assert_eq!(res.distance_begin, Some(0));
        assert_eq!(res.distance_end, None);
        assert_eq!(res.container_size, Some(4));
        assert_eq!(res.last_key.as_deref(), Some("2317"));
    }

    #[test]
    fn continuation_via_offset() {
        // gv+ resolves the last key then steps past it.
        let req = GridViewRequest {
            offset: 1,
            max_rows: 1,
            ..Default::default()
        };
        let res = render(0, &req);
        assert_eq!(res.grid, "2330\tx");
        assert_eq!(res.distance_begin, None);
        assert_eq!(res.distance_end, None);
    }

    #[test]
    fn last_row_reports_distance_end_one() {
        let res = render(3, &GridViewRequest::from_begin(10));
        assert_eq!(res.grid, "3008\tx");
        assert_eq!(res.distance_end, Some(1));
        assert!(res.at_end());
    }

    #[test]
    fn window_at_end_is_empty() {
        let res = render(4, &GridViewRequest::from_begin(10));
        assert_eq!(res.grid, "");
        assert_eq!(res.row_count, 0);
        assert_eq!(res.distance_end, Some(0));
        assert!(res.last_key.is_none());
    }

    #[test]
    fn negative_offset_clamps_at_begin() {
        let req = GridViewRequest {
            offset: -10,
            max_rows: 2,
            ..Default::default()
        };
        let res = render(2, &req);
        assert_eq!(res.grid, "2317\tx\n2330\tx");
        assert_eq!(res.distance_begin, Some(0));
        assert_eq!(res.row_count, 2);
    }

    #[test]
    fn whole_container_has_no_trailing_splitter() {
        let res = render(0, &GridViewRequest::from_begin(0));
        assert_eq!(res.grid, "2317\tx\n2330\tx\n2454\tx\n3008\tx");
        assert!(!res.grid.ends_with('\n'));
        assert_eq!(res.row_count, 4);
    }

    #[test]
    fn byte_cap_keeps_crossing_row_whole() {
        let req = GridViewRequest {
            max_bytes: 7,
            ..Default::default()
        };
        let res = render(0, &req);
        // First row already reaches 6 bytes; second row crosses the cap.
        assert_eq!(res.grid, "2317\tx\n2330\tx");
        assert_eq!(res.row_count, 2);
    }
}
