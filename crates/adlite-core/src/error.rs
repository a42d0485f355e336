//! Error types for Adlite

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // Ticket Errors
    #[error("Pre-authentication expired or missing for {0}")]
    PreAuthExpired(String),

    #[error("Pre-authentication failed for {0}")]
    PreAuthFailed(String),

    #[error("Ticket expired or not found for {0}")]
    TicketExpired(String),

    #[error("Delegation not allowed: {0}")]
    DelegationNotAllowed(String),

    #[error("A session is already active for {0}")]
    SessionActive(String),

    // Bind Errors
    #[error("Auth method {0} not supported")]
    UnsupportedAuthMethod(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid distinguished name: {0}")]
    InvalidDn(String),

    // Directory Errors
    #[error("Principal already exists: {0}")]
    PrincipalExists(String),

    #[error("Group already exists: {0}")]
    GroupExists(String),

    #[error("The specified principal does not exist: {0}")]
    NoSuchPrincipal(String),

    #[error("The specified group does not exist: {0}")]
    NoSuchGroup(String),

    #[error("Directory store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Operation timed out after {0} ms")]
    Timeout(u64),

    // Configuration Errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // Internal Errors
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn code(&self) -> &'static str {
        match self {
            Error::PreAuthExpired(_) => "KDC_ERR_PREAUTH_REQUIRED",
            Error::PreAuthFailed(_) => "KDC_ERR_PREAUTH_FAILED",
            Error::TicketExpired(_) => "KRB_AP_ERR_TKT_EXPIRED",
            Error::DelegationNotAllowed(_) => "KRB_AP_ERR_DELEGATE_NOALLOWED",
            Error::SessionActive(_) => "KDC_ERR_SESSION_ACTIVE",
            Error::UnsupportedAuthMethod(_) => "AuthMethodNotSupported",
            Error::InvalidCredentials => "InvalidCredentials",
            Error::InvalidDn(_) => "InvalidDNSyntax",
            Error::PrincipalExists(_) | Error::GroupExists(_) => "EntryAlreadyExists",
            Error::NoSuchPrincipal(_) | Error::NoSuchGroup(_) => "NoSuchObject",
            Error::StoreUnavailable(_) => "Unavailable",
            Error::Timeout(_) => "TimeLimitExceeded",
            Error::InvalidConfig(_) | Error::InvalidArgument(_) => "InvalidArgument",
            Error::Crypto(_) | Error::InternalError(_) | Error::Io(_) | Error::Other(_) => {
                "OperationsError"
            }
        }
    }

    /// Whether the error means "the caller could not prove who they are",
    /// as opposed to the server failing to answer the question.
    pub fn is_credential_failure(&self) -> bool {
        matches!(
            self,
            Error::PreAuthExpired(_)
                | Error::PreAuthFailed(_)
                | Error::TicketExpired(_)
                | Error::SessionActive(_)
                | Error::InvalidCredentials
                | Error::InvalidDn(_)
                | Error::NoSuchPrincipal(_)
        )
    }

    /// LDAP result code for a bind that failed with this error
    pub fn ldap_result_code(&self) -> u8 {
        if self.is_credential_failure() {
            return 49;
        }

        match self {
            Error::DelegationNotAllowed(_) => 50,
            Error::PrincipalExists(_) | Error::GroupExists(_) => 68,
            Error::NoSuchGroup(_) => 32,
            Error::InvalidConfig(_) | Error::InvalidArgument(_) => 53,
            // Everything else is scoped to the single operation
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_errors_are_credential_failures() {
        assert!(Error::PreAuthExpired("bob".into()).is_credential_failure());
        assert!(Error::TicketExpired("bob".into()).is_credential_failure());
        assert!(!Error::StoreUnavailable("down".into()).is_credential_failure());
        assert!(!Error::Timeout(30_000).is_credential_failure());
    }

    #[test]
    fn test_ldap_result_codes() {
        assert_eq!(Error::InvalidCredentials.ldap_result_code(), 49);
        assert_eq!(Error::PreAuthFailed("bob".into()).ldap_result_code(), 49);
        assert_eq!(Error::StoreUnavailable("down".into()).ldap_result_code(), 1);
        assert_eq!(Error::Timeout(10).ldap_result_code(), 1);
        assert_eq!(
            Error::UnsupportedAuthMethod("ntlm".into()).ldap_result_code(),
            1
        );
    }

    #[test]
    fn test_codes() {
        assert_eq!(
            Error::DelegationNotAllowed("alice".into()).code(),
            "KRB_AP_ERR_DELEGATE_NOALLOWED"
        );
        assert_eq!(Error::Timeout(1).code(), "TimeLimitExceeded");
    }
}
