//! Game version numbers as stored in blueprint JSON.
//!
//! Factorio packs `major.minor.patch.dev` into one 64-bit integer, 16 bits
//! per field with `major` in the high bits.

use std::fmt;
use std::str::FromStr;

use draftline_core::config::DEFAULT_VERSION;
use serde::{Deserialize, Serialize};

/// A four-part game version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
    pub dev: u16,
}

impl Default for Version {
    fn default() -> Self {
        Self::from(DEFAULT_VERSION)
    }
}

impl Version {
    pub const fn new(major: u16, minor: u16, patch: u16, dev: u16) -> Self {
        Self {
            major,
            minor,
            patch,
            dev,
        }
    }

    pub fn pack(self) -> u64 {
        (self.major as u64) << 48
            | (self.minor as u64) << 32
            | (self.patch as u64) << 16
            | self.dev as u64
    }

    pub fn unpack(packed: u64) -> Self {
        Self {
            major: (packed >> 48) as u16,
            minor: (packed >> 32) as u16,
            patch: (packed >> 16) as u16,
            dev: packed as u16,
        }
    }
}

impl From<[u16; 4]> for Version {
    fn from([major, minor, patch, dev]: [u16; 4]) -> Self {
        Self::new(major, minor, patch, dev)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}.{}", self.major, self.minor, self.patch, self.dev)
    }
}

/// Error parsing a dotted version string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid version string '{0}'")]
pub struct ParseVersionError(pub String);

impl FromStr for Version {
    type Err = ParseVersionError;

    /// Accepts two to four dot-separated parts; missing parts are zero.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseVersionError(s.to_string());
        let parts: Vec<&str> = s.trim().split('.').collect();
        if !(2..=4).contains(&parts.len()) {
            return Err(err());
        }
        let mut fields = [0u16; 4];
        for (slot, part) in fields.iter_mut().zip(&parts) {
            *slot = part.parse().map_err(|_| err())?;
        }
        Ok(Self::from(fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_1_1_110() {
        let v = Version::default();
        assert_eq!(v.to_string(), "1.1.110.0");
        assert_eq!(v.pack(), 281479278886912);
    }

    #[test]
    fn major_occupies_high_bits() {
        assert_eq!(Version::new(1, 0, 0, 0).pack(), 1 << 48);
        assert_eq!(Version::new(0, 0, 0, 1).pack(), 1);
        assert!(Version::new(2, 0, 0, 0).pack() > Version::new(1, 65535, 65535, 65535).pack());
    }

    #[test]
    fn parse_short_and_full() {
        assert_eq!("1.1".parse::<Version>().unwrap(), Version::new(1, 1, 0, 0));
        assert_eq!("1.1.104.3".parse::<Version>().unwrap(), Version::new(1, 1, 104, 3));
        assert!("1".parse::<Version>().is_err());
        assert!("1.x.0".parse::<Version>().is_err());
        assert!("1.1.70000".parse::<Version>().is_err());
    }
}
