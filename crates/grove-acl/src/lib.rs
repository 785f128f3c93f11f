//! Seed path normalization and access control.
//!
//! Every session command resolves its target through two steps here: the
//! raw path text is normalized against the session's current and home
//! positions into a canonical [`AclPath`], then the session's
//! [`AccessList`] is consulted with the full set of rights the command
//! needs. Paths starting with `/..` address the per-session visitors
//! sub-forest instead of the shared forest.

pub mod config;
pub mod list;
pub mod path;

pub use config::{acl_layout, AclConfig};
pub use list::AccessList;
pub use path::{is_visitors_path, normalize, AclPath};
