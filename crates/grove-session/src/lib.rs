//! The session surface of a Grove forest.
//!
//! A [`Visitor`] owns the caller's view of the store: the shared forest
//! root, the per-session visitors sub-forest (ACL introspection lives
//! there), the caller's [`AclConfig`](grove_acl::AclConfig), and a current
//! path. Each command line is classified into a [`Ticket`], resolved and
//! rights-checked by the [`Fairy`], then executed by walking the path one
//! tree at a time. Every execution yields a structured [`Outcome`].

pub mod fairy;
pub mod outcome;
pub mod ticket;
pub mod visitor;

pub use fairy::Fairy;
pub use outcome::{Outcome, Payload};
pub use ticket::Ticket;
pub use visitor::Visitor;
