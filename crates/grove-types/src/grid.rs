//! Grid wire format constants.
//!
//! A grid view is serialized as rows separated by [`ROW_SEP`], cells within a
//! row separated by [`CELL_SEP`]. The separators are **never escaped**:
//! rendered field values must not contain them. [`Name`](crate::Name)
//! already rejects both characters; producers of free-text fields are
//! expected to strip them.

/// Separates rows in a serialized grid view. The last row carries no
/// trailing separator.
pub const ROW_SEP: char = '\n';

/// Separates cells within one grid row. The key cell comes first.
pub const CELL_SEP: char = '\t';

/// Returns `true` if `text` contains either reserved separator and is
/// therefore not safe to emit as a grid cell.
pub fn contains_separator(text: &str) -> bool {
    text.contains(ROW_SEP) || text.contains(CELL_SEP)
}
