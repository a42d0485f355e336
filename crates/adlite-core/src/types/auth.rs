//! Authentication method types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of bind authentication methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    /// Credential hash comparison against the directory store
    #[default]
    Basic,
    /// Ticket exchange through the ticket authority
    #[serde(alias = "ticket")]
    Kerberos,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::Basic => "basic",
            AuthMethod::Kerberos => "kerberos",
        }
    }

    pub fn all() -> [AuthMethod; 2] {
        [AuthMethod::Basic, AuthMethod::Kerberos]
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMethod {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" | "simple" => Ok(AuthMethod::Basic),
            "kerberos" | "ticket" => Ok(AuthMethod::Kerberos),
            _ => Err(crate::Error::UnsupportedAuthMethod(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_method_names() {
        assert_eq!("basic".parse::<AuthMethod>().unwrap(), AuthMethod::Basic);
        assert_eq!("Kerberos".parse::<AuthMethod>().unwrap(), AuthMethod::Kerberos);
        assert_eq!("ticket".parse::<AuthMethod>().unwrap(), AuthMethod::Kerberos);

        let err = "ntlm".parse::<AuthMethod>().unwrap_err();
        assert!(matches!(err, crate::Error::UnsupportedAuthMethod(m) if m == "ntlm"));
    }
}
