//! Per-session ACL configuration.

use std::sync::Arc;

use grove_field::FieldDef;
use grove_schema::{KeyDef, Layout, Tab, TabFlags};
use grove_types::{AccessRight, Name, OpResult, CELL_SEP, ROW_SEP};

use crate::list::AccessList;
use crate::path::normalize;

/// Layout of the ACL tree mounted under the visitors sub-forest:
/// key `Path`, tab `AclRights`, field `Rights`.
pub fn acl_layout() -> Arc<Layout> {
    let name = |s: &str| Name::new(s).expect("static name is valid");
    let tab = Tab::build(
        name("AclRights"),
        vec![FieldDef::chars(name("Rights"), 16)],
        TabFlags::WRITABLE,
        None,
    )
    .expect("static acl tab is valid");
    Layout::single(KeyDef::chars(name("Path")), tab).expect("static acl layout is valid")
}

/// What one session is allowed to touch, and where `~` points.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AclConfig {
    pub home: String,
    pub list: AccessList,
}

impl AclConfig {
    pub fn new(home: impl Into<String>) -> Self {
        AclConfig {
            home: home.into(),
            list: AccessList::new(),
        }
    }

    /// Home at `/`, full rights on both the forest and the visitors head.
    pub fn set_admin_mode(&mut self) {
        self.home = "/".to_string();
        self.list.grant("/", AccessRight::FULL);
        self.list.grant("/..", AccessRight::FULL);
    }

    /// Grant `rights` at `path` after normalizing it against home.
    pub fn grant(&mut self, path: &str, rights: AccessRight) -> OpResult<()> {
        let canon = normalize(path, &self.home, &self.home)?;
        self.list.grant(canon.into_string(), rights);
        Ok(())
    }

    /// Serialize the list in grid wire format for mounting under the
    /// visitors ACL tree.
    pub fn to_grid(&self) -> String {
        let mut out = String::new();
        for (path, rights) in self.list.iter() {
            if !out.is_empty() {
                out.push(ROW_SEP);
            }
            out.push_str(path);
            out.push(CELL_SEP);
            out.push_str(&rights.to_string());
        }
        out
    }
}
