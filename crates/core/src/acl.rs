//! Canned access-policy levels
//!
//! All four levels are accepted as creation-time headers. Only the first
//! three have a policy template; see [`crate::policy::synthesize`].

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A recognized access-policy level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CannedAcl {
    Private,
    PublicRead,
    PublicReadWrite,
    AuthenticatedRead,
}

impl CannedAcl {
    /// Every level, in the order shown in usage strings
    pub const ALL: [CannedAcl; 4] = [
        CannedAcl::Private,
        CannedAcl::PublicRead,
        CannedAcl::PublicReadWrite,
        CannedAcl::AuthenticatedRead,
    ];

    /// Wire name of the level, as sent in the `x-amz-acl` header
    pub const fn as_str(self) -> &'static str {
        match self {
            CannedAcl::Private => "private",
            CannedAcl::PublicRead => "public-read",
            CannedAcl::PublicReadWrite => "public-read-write",
            CannedAcl::AuthenticatedRead => "authenticated-read",
        }
    }

    /// `private|public-read|public-read-write|authenticated-read`
    pub fn choices() -> String {
        Self::ALL
            .iter()
            .map(|acl| acl.as_str())
            .collect::<Vec<_>>()
            .join("|")
    }
}

impl fmt::Display for CannedAcl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CannedAcl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|acl| acl.as_str() == s)
            .ok_or_else(|| Error::InvalidAcl(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_levels() {
        assert_eq!("private".parse::<CannedAcl>().unwrap(), CannedAcl::Private);
        assert_eq!(
            "public-read-write".parse::<CannedAcl>().unwrap(),
            CannedAcl::PublicReadWrite
        );
        assert_eq!(
            "authenticated-read".parse::<CannedAcl>().unwrap(),
            CannedAcl::AuthenticatedRead
        );
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert!("Private".parse::<CannedAcl>().is_err());
        assert!("public".parse::<CannedAcl>().is_err());
    }

    #[test]
    fn test_choices() {
        assert_eq!(
            CannedAcl::choices(),
            "private|public-read|public-read-write|authenticated-read"
        );
    }
}
