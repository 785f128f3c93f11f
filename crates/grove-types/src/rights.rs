use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Per-path permission bitmask.
///
/// `FULL` is all bits set, not just the union of the named rights, so a full
/// grant keeps covering rights added later.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessRight(u8);

impl AccessRight {
    pub const NONE: AccessRight = AccessRight(0x00);
    /// Read field contents or grid views.
    pub const READ: AccessRight = AccessRight(0x01);
    /// Modify field contents.
    pub const WRITE: AccessRight = AccessRight(0x02);
    /// Execute seed commands.
    pub const EXEC: AccessRight = AccessRight(0x04);
    pub const FULL: AccessRight = AccessRight(0xff);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if every bit of `needed` is present.
    pub fn contains(self, needed: AccessRight) -> bool {
        self.0 & needed.0 == needed.0
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn from_bits(bits: u8) -> Self {
        AccessRight(bits)
    }
}

impl BitOr for AccessRight {
    type Output = AccessRight;
    fn bitor(self, rhs: AccessRight) -> AccessRight {
        AccessRight(self.0 | rhs.0)
    }
}

impl BitOrAssign for AccessRight {
    fn bitor_assign(&mut self, rhs: AccessRight) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for AccessRight {
    type Output = AccessRight;
    fn bitand(self, rhs: AccessRight) -> AccessRight {
        AccessRight(self.0 & rhs.0)
    }
}

impl fmt::Display for AccessRight {
    /// `-` none, `*` full, otherwise the granted letters, e.g. `rw`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            return f.write_str("-");
        }
        if *self == AccessRight::FULL {
            return f.write_str("*");
        }
        if self.contains(AccessRight::READ) {
            f.write_str("r")?;
        }
        if self.contains(AccessRight::WRITE) {
            f.write_str("w")?;
        }
        if self.contains(AccessRight::EXEC) {
            f.write_str("x")?;
        }
        Ok(())
    }
}

impl fmt::Debug for AccessRight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessRight({self})")
    }
}

impl FromStr for AccessRight {
    type Err = String;

    /// Accepts the `Display` forms (`-`, `*`, letter runs) or a hex byte
    /// (`x1f`), the form the ACL config tables persist.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "-" | "" => return Ok(AccessRight::NONE),
            "*" => return Ok(AccessRight::FULL),
            _ => {}
        }
        // "x" alone is the exec letter; "x1f" style is a hex byte.
        if let Some(hexpart) = s.strip_prefix('x') {
            if !hexpart.is_empty() && hexpart.chars().all(|c| c.is_ascii_hexdigit()) {
                return u8::from_str_radix(hexpart, 16)
                    .map(AccessRight)
                    .map_err(|e| format!("bad rights hex {s:?}: {e}"));
            }
        }
        let mut out = AccessRight::NONE;
        for ch in s.chars() {
            out |= match ch {
                'r' => AccessRight::READ,
                'w' => AccessRight::WRITE,
                'x' => AccessRight::EXEC,
                _ => return Err(format!("bad rights char {ch:?} in {s:?}")),
            };
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_requires_full_bitmask() {
        let rw = AccessRight::READ | AccessRight::WRITE;
        assert!(rw.contains(AccessRight::READ));
        assert!(rw.contains(rw));
        assert!(!rw.contains(AccessRight::EXEC));
        assert!(!AccessRight::READ.contains(rw));
        assert!(AccessRight::FULL.contains(rw | AccessRight::EXEC));
    }

    #[test]
    fn display_and_parse_round_trip() {
        for r in [
            AccessRight::NONE,
            AccessRight::READ,
            AccessRight::READ | AccessRight::WRITE,
            AccessRight::READ | AccessRight::WRITE | AccessRight::EXEC,
            AccessRight::FULL,
        ] {
            let s = r.to_string();
            assert_eq!(s.parse::<AccessRight>().unwrap(), r, "via {s:?}");
        }
        assert_eq!("x05".parse::<AccessRight>().unwrap().bits(), 0x05);
        assert_eq!("x".parse::<AccessRight>().unwrap(), AccessRight::EXEC);
        assert!("q".parse::<AccessRight>().is_err());
    }
}
