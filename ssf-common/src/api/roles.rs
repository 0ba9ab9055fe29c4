//! Caller roles read from the role cookie
//!
//! Coarse three-level authorization: only `super-admin` may change data.
//! A missing or unrecognised cookie value counts as `public`.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    #[default]
    Public,
    CountryAdmin,
    SuperAdmin,
}

impl Role {
    pub fn parse(value: &str) -> Option<Role> {
        match value.trim().to_ascii_lowercase().as_str() {
            "public" => Some(Role::Public),
            "country-admin" => Some(Role::CountryAdmin),
            "super-admin" => Some(Role::SuperAdmin),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Public => "public",
            Role::CountryAdmin => "country-admin",
            Role::SuperAdmin => "super-admin",
        }
    }

    /// Whether this role may create, update, delete or import
    pub fn can_write(self) -> bool {
        self == Role::SuperAdmin
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role named by cookie `cookie_name` in a `Cookie:` header value
pub fn role_from_cookie_header(header: &str, cookie_name: &str) -> Role {
    header
        .split(';')
        .filter_map(|pair| pair.split_once('='))
        .find(|(name, _)| name.trim() == cookie_name)
        .and_then(|(_, value)| Role::parse(value.trim().trim_matches('"')))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_cookie_header() {
        assert_eq!(
            role_from_cookie_header("theme=dark; ssf_role=super-admin", "ssf_role"),
            Role::SuperAdmin
        );
        assert_eq!(
            role_from_cookie_header("ssf_role=\"country-admin\"", "ssf_role"),
            Role::CountryAdmin
        );
        assert_eq!(role_from_cookie_header("ssf_role=root", "ssf_role"), Role::Public);
        assert_eq!(role_from_cookie_header("other=super-admin", "ssf_role"), Role::Public);
        assert_eq!(role_from_cookie_header("", "ssf_role"), Role::Public);
    }

    #[test]
    fn test_only_super_admin_writes() {
        assert!(Role::SuperAdmin.can_write());
        assert!(!Role::CountryAdmin.can_write());
        assert!(!Role::Public.can_write());
    }
}
