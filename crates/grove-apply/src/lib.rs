//! The clone/edit/apply workflow.
//!
//! Bulk configuration changes never mutate a live tree row by row. A caller
//! asks the [`EditCenter`] for a detached copy of one tab's full row set,
//! edits that copy through the normal tree protocol, then submits it back.
//! The submit holds a single optimistic-concurrency check: the original
//! tab's current grid must still match, byte for byte, the snapshot the
//! caller edited against. Any concurrent change anywhere in the tab, even
//! an unrelated row, invalidates the whole pending submission.

mod center;

pub use center::{EditCenter, EditHandle};
