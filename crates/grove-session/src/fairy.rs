//! Path and rights resolution for one session.

use grove_acl::{normalize, AclConfig, AclPath};
use grove_types::{AccessRight, OpResult};

/// Resolves raw command paths against the session's current position and
/// ACL. The fairy holds no tree references; it only answers "where is this
/// path and may you touch it".
pub struct Fairy {
    config: AclConfig,
    curr: String,
}

impl Fairy {
    pub fn new(config: AclConfig) -> Self {
        Fairy {
            config,
            curr: "/".to_string(),
        }
    }

    pub fn config(&self) -> &AclConfig {
        &self.config
    }

    pub fn curr(&self) -> &str {
        &self.curr
    }

    /// Set the current path; callers pass an already-normalized path.
    pub fn set_curr(&mut self, canonical: String) {
        self.curr = canonical;
    }

    /// Normalize `raw` and demand the full `needed` bitmask there.
    pub fn resolve(&self, raw: &str, needed: AccessRight) -> OpResult<AclPath> {
        let path = normalize(raw, &self.curr, &self.config.home)?;
        self.config.list.check(&path, needed)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grove_types::OpCode;

    fn admin_fairy() -> Fairy {
        let mut cfg = AclConfig::new("/");
        cfg.set_admin_mode();
        Fairy::new(cfg)
    }

    #[test]
    fn resolves_relative_to_curr() {
        let mut fairy = admin_fairy();
        fairy.set_curr("/Symbs".to_string());
        let p = fairy.resolve("2330", AccessRight::READ).unwrap();
        assert_eq!(p.as_str(), "/Symbs/2330");
    }

    #[test]
    fn limited_acl_denies_outside_grant() {
        let mut cfg = AclConfig::new("/Symbs");
        cfg.grant("/Symbs", "r".parse().unwrap()).unwrap();
        let fairy = Fairy::new(cfg);

        assert!(fairy.resolve("/Symbs/2330", AccessRight::READ).is_ok());
        let err = fairy
            .resolve("/Symbs/2330", AccessRight::WRITE)
            .unwrap_err();
        assert_eq!(err.code, OpCode::AccessDenied);
        let err = fairy.resolve("/Elsewhere", AccessRight::READ).unwrap_err();
        assert_eq!(err.code, OpCode::AccessDenied);
    }

    #[test]
    fn home_expansion_uses_config_home() {
        let mut cfg = AclConfig::new("/Symbs");
        cfg.set_admin_mode();
        cfg.home = "/Symbs".to_string();
        let fairy = Fairy::new(cfg);
        let p = fairy.resolve("~/2330", AccessRight::READ).unwrap();
        assert_eq!(p.as_str(), "/Symbs/2330");
    }
}
