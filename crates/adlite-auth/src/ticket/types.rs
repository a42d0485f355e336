//! Ticket and pre-authentication types

use adlite_crypto::SessionKey;
use chrono::{DateTime, Duration, Utc};
use std::fmt;

/// Options carried on issued tickets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TicketFlags {
    pub forwardable: bool,
    pub proxiable: bool,
    pub delegatable: bool,
}

/// Proof returned by the pre-authentication step.
///
/// `encrypted_timestamp` is the timestamp sealed under the key derived from
/// the principal's secret; presenting it back with the same secret proves
/// knowledge of that secret.
#[derive(Debug, Clone)]
pub struct PreAuthData {
    pub timestamp: DateTime<Utc>,
    pub encrypted_timestamp: Vec<u8>,
}

/// Ticket-granting ticket issued by the AS exchange
#[derive(Debug, Clone)]
pub struct TicketGrantingTicket {
    pub client_name: String,
    pub realm: String,
    pub issued_at: DateTime<Utc>,
    pub validity: Duration,
    pub session_key: SessionKey,
    pub flags: TicketFlags,
}

impl TicketGrantingTicket {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.issued_at + self.validity
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.issued_at <= now && now < self.expires_at()
    }
}

/// Request options for the TGS exchange
#[derive(Debug, Clone, Default)]
pub struct ServiceTicketOptions {
    /// Target service name, if the caller names one
    pub service: Option<String>,
    /// Ask for a ticket that may be handed to [`delegate_credentials`]
    ///
    /// [`delegate_credentials`]: super::TicketAuthority::delegate_credentials
    pub delegation: bool,
    pub forwardable: bool,
}

impl ServiceTicketOptions {
    pub fn for_service(service: impl Into<String>) -> Self {
        Self {
            service: Some(service.into()),
            ..Default::default()
        }
    }

    pub fn with_delegation(mut self) -> Self {
        self.delegation = true;
        self
    }
}

/// Service ticket issued by the TGS exchange.
///
/// Shares the session key of the TGT it was issued from.
#[derive(Debug, Clone)]
pub struct ServiceTicket {
    pub client_name: String,
    pub realm: String,
    pub service: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub validity: Duration,
    pub session_key: SessionKey,
    pub flags: TicketFlags,
}

impl ServiceTicket {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.issued_at + self.validity
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.issued_at <= now && now < self.expires_at()
    }
}

/// Ticket a service obtains on behalf of a user who never authenticated to
/// the KDC (S4U2Self). Carries no session key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionTicket {
    pub client_name: String,
    pub realm: String,
    pub impersonator: String,
    pub service_target: String,
    pub issued_at: DateTime<Utc>,
    pub validity: Duration,
}

impl TransitionTicket {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.issued_at + self.validity
    }
}

/// Cached credential delegation, keyed by (principal, target service)
#[derive(Debug, Clone)]
pub struct DelegationRecord {
    pub principal: String,
    pub target_service: String,
    pub ticket: ServiceTicket,
    pub expires_at: DateTime<Utc>,
}

/// Where a principal currently stands in the ticket lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketState {
    NoTicket,
    PreAuthPending,
    Granted,
    ServiceAuthorized,
    Expired,
}

impl TicketState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketState::NoTicket => "no_ticket",
            TicketState::PreAuthPending => "pre_auth_pending",
            TicketState::Granted => "granted",
            TicketState::ServiceAuthorized => "service_authorized",
            TicketState::Expired => "expired",
        }
    }
}

impl fmt::Display for TicketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entries evicted by one cleanup sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub pre_auth: usize,
    pub tickets: usize,
    pub session_keys: usize,
    pub delegations: usize,
}

impl CleanupReport {
    pub fn total(&self) -> usize {
        self.pre_auth + self.tickets + self.session_keys + self.delegations
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}
