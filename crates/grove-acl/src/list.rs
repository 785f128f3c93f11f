//! Per-path access rights.

use std::collections::BTreeMap;

use grove_types::{AccessRight, OpCode, OpError, OpResult};

use crate::path::AclPath;

/// Sorted map of normalized path to rights bitmask.
///
/// Resolution is deepest-exact-match: the entry at the longest matching
/// ancestor prefix decides outright, ancestor grants are never unioned in.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccessList {
    entries: BTreeMap<String, AccessRight>,
}

impl AccessList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the rights at `path` (expected canonical), replacing any
    /// previous entry.
    pub fn grant(&mut self, path: impl Into<String>, rights: AccessRight) {
        self.entries.insert(path.into(), rights);
    }

    pub fn revoke(&mut self, path: &str) -> Option<AccessRight> {
        self.entries.remove(path)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// An empty list denies everything.
    pub fn is_deny_all(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, AccessRight)> {
        self.entries.iter().map(|(p, &r)| (p.as_str(), r))
    }

    /// Effective rights at `path`: the deepest ancestor with an entry wins.
    pub fn resolve(&self, path: &AclPath) -> AccessRight {
        for prefix in path.ancestors() {
            if let Some(&rights) = self.entries.get(prefix) {
                return rights;
            }
        }
        AccessRight::NONE
    }

    /// Demand the whole `needed` bitmask at `path`. On success the effective
    /// rights come back so callers can refine later checks.
    pub fn check(&self, path: &AclPath, needed: AccessRight) -> OpResult<AccessRight> {
        let held = self.resolve(path);
        if held == AccessRight::NONE || !held.contains(needed) {
            return Err(OpError::with_message(
                OpCode::AccessDenied,
                format!("need {needed} at {path}"),
            ));
        }
        Ok(held)
    }
}

impl FromIterator<(String, AccessRight)> for AccessList {
    fn from_iter<I: IntoIterator<Item = (String, AccessRight)>>(iter: I) -> Self {
        AccessList {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::normalize;

    fn path(p: &str) -> AclPath {
        normalize(p, "/", "/").unwrap()
    }

    fn rights(s: &str) -> AccessRight {
        s.parse().unwrap()
    }

    #[test]
    fn deepest_entry_wins_outright() {
        let mut acl = AccessList::new();
        acl.grant("/", rights("r"));
        acl.grant("/Symbs", rights("rw"));
        acl.grant("/Symbs/2330", rights("x"));

        assert_eq!(acl.resolve(&path("/Other")), rights("r"));
        assert_eq!(acl.resolve(&path("/Symbs/2317")), rights("rw"));
        // No union with the ancestors: 2330 has exec only.
        assert_eq!(acl.resolve(&path("/Symbs/2330")), rights("x"));
        assert_eq!(acl.resolve(&path("/Symbs/2330/Deal")), rights("x"));
    }

    #[test]
    fn check_requires_the_full_mask() {
        let mut acl = AccessList::new();
        acl.grant("/Symbs", rights("rw"));

        assert_eq!(acl.check(&path("/Symbs"), rights("r")).unwrap(), rights("rw"));
        assert_eq!(acl.check(&path("/Symbs"), rights("rw")).unwrap(), rights("rw"));
        let err = acl.check(&path("/Symbs"), rights("rx")).unwrap_err();
        assert_eq!(err.code, OpCode::AccessDenied);
    }

    #[test]
    fn unlisted_root_denies() {
        let acl = AccessList::new();
        assert!(acl.is_deny_all());
        assert_eq!(acl.resolve(&path("/anything")), AccessRight::NONE);
        assert!(acl.check(&path("/"), AccessRight::NONE).is_err());
    }

    #[test]
    fn visitors_paths_resolve_from_their_own_head() {
        let mut acl = AccessList::new();
        acl.grant("/", AccessRight::FULL);
        // "/.." is not under "/", so nothing applies there.
        assert_eq!(acl.resolve(&path("/../Acl")), AccessRight::NONE);
        acl.grant("/..", rights("r"));
        assert_eq!(acl.resolve(&path("/../Acl")), rights("r"));
    }
}
