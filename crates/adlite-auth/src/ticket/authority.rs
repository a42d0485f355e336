//! Ticket authority and the in-process simulated KDC

use adlite_core::config::{KerberosConfig, SessionPolicy, TicketConfig};
use adlite_core::{Error, Result};
use adlite_crypto::{derive_pre_auth_key, open, seal, SessionKey};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::clock::{Clock, SystemClock};
use super::keytab::KeyTable;
use super::policy::DelegationPolicy;
use super::store::{PreAuthRecord, SessionEntry, TicketStore};
use super::types::{
    CleanupReport, DelegationRecord, PreAuthData, ServiceTicket, ServiceTicketOptions,
    TicketFlags, TicketGrantingTicket, TicketState, TransitionTicket,
};

/// Ticket-based authentication authority
pub trait TicketAuthority: Send + Sync {
    fn realm(&self) -> &str;

    /// Start an AS exchange: record a one-time pre-auth key for `principal`
    /// and return the proof derived from `secret`.
    fn perform_pre_auth(&self, principal: &str, secret: &[u8]) -> Result<PreAuthData>;

    /// Complete the AS exchange and issue a TGT
    fn request_tgt(
        &self,
        principal: &str,
        secret: &[u8],
        pre_auth: &PreAuthData,
    ) -> Result<TicketGrantingTicket>;

    /// TGS exchange
    fn request_service_ticket(
        &self,
        principal: &str,
        tgt: &TicketGrantingTicket,
        options: &ServiceTicketOptions,
    ) -> Result<ServiceTicket>;

    /// Check a service ticket against the stored session of `principal`
    fn validate_service_ticket(&self, principal: &str, ticket: &ServiceTicket) -> bool;

    /// S4U2Self: `source` obtains a ticket naming `target` for `target_service`
    fn protocol_transition(
        &self,
        source: &str,
        target: &str,
        target_service: &str,
    ) -> Result<TransitionTicket>;

    /// Cache `ticket` as a delegation of `principal`'s credentials to
    /// `target_service`
    fn delegate_credentials(
        &self,
        principal: &str,
        target_service: &str,
        ticket: &ServiceTicket,
    ) -> Result<bool>;

    /// Live delegation for (principal, target service), if any
    fn delegation(&self, principal: &str, target_service: &str) -> Option<DelegationRecord>;

    /// Drop every ticket, key and delegation held for `principal`
    fn revoke(&self, principal: &str) -> bool;

    fn ticket_state(&self, principal: &str) -> TicketState;

    /// Evict expired pre-auth keys, tickets, session keys and delegations
    fn cleanup(&self) -> CleanupReport;

    /// Run the whole chain (pre-auth, TGT, service ticket, validation).
    ///
    /// Any failing step yields `false`.
    fn authenticate(&self, principal: &str, secret: &[u8]) -> bool {
        let chain = || -> Result<bool> {
            let pre_auth = self.perform_pre_auth(principal, secret)?;
            let tgt = self.request_tgt(principal, secret, &pre_auth)?;
            let ticket =
                self.request_service_ticket(principal, &tgt, &ServiceTicketOptions::default())?;
            Ok(self.validate_service_ticket(principal, &ticket))
        };

        match chain() {
            Ok(valid) => valid,
            Err(e) => {
                debug!(principal = %principal, code = e.code(), "Ticket authentication failed: {}", e);
                false
            }
        }
    }
}

/// Pre-auth timestamps are sealed and re-derived from this exact rendering
fn timestamp_text(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

#[derive(Debug, Clone, Copy)]
struct Lifetimes {
    pre_auth: Duration,
    tgt: Duration,
    service: Duration,
    transition: Duration,
}

impl From<&TicketConfig> for Lifetimes {
    fn from(config: &TicketConfig) -> Self {
        Self {
            pre_auth: config.pre_auth_lifetime(),
            tgt: config.tgt_lifetime(),
            service: config.service_ticket_lifetime(),
            transition: config.transition_ticket_lifetime(),
        }
    }
}

/// In-process KDC simulation.
///
/// Session keys are random, pre-auth proofs are real AES-GCM ciphertexts,
/// but there is no wire protocol and no cross-realm support.
pub struct SimulatedKdc {
    realm: String,
    kdc: String,
    lifetimes: Lifetimes,
    delegation_policy: DelegationPolicy,
    session_policy: SessionPolicy,
    keytab: Option<KeyTable>,
    store: Arc<TicketStore>,
    clock: Arc<dyn Clock>,
}

impl SimulatedKdc {
    pub fn new(realm: impl Into<String>, kdc: impl Into<String>) -> Self {
        Self {
            realm: realm.into(),
            kdc: kdc.into(),
            lifetimes: Lifetimes::from(&TicketConfig::default()),
            delegation_policy: DelegationPolicy::default(),
            session_policy: SessionPolicy::default(),
            keytab: None,
            store: Arc::new(TicketStore::new()),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn from_config(kerberos: &KerberosConfig, tickets: &TicketConfig) -> Result<Self> {
        kerberos.validate()?;
        tickets.validate()?;

        Ok(Self {
            lifetimes: Lifetimes::from(tickets),
            delegation_policy: DelegationPolicy::from_config(kerberos),
            session_policy: kerberos.session_policy,
            ..Self::new(kerberos.realm.to_ascii_uppercase(), kerberos.kdc.clone())
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Check pre-auth secrets against `keytab`
    pub fn with_keytab(mut self, keytab: KeyTable) -> Self {
        self.keytab = Some(keytab);
        self
    }

    pub fn with_session_policy(mut self, policy: SessionPolicy) -> Self {
        self.session_policy = policy;
        self
    }

    pub fn with_delegation_policy(mut self, policy: DelegationPolicy) -> Self {
        self.delegation_policy = policy;
        self
    }

    pub fn kdc(&self) -> &str {
        &self.kdc
    }

    pub fn store(&self) -> Arc<TicketStore> {
        self.store.clone()
    }

    pub fn delegation_policy(&self) -> &DelegationPolicy {
        &self.delegation_policy
    }
}

impl TicketAuthority for SimulatedKdc {
    fn realm(&self) -> &str {
        &self.realm
    }

    fn perform_pre_auth(&self, principal: &str, secret: &[u8]) -> Result<PreAuthData> {
        if principal.is_empty() {
            return Err(Error::InvalidArgument("Principal must not be empty".into()));
        }
        if let Some(keytab) = &self.keytab {
            if !keytab.verify(principal, secret) {
                return Err(Error::InvalidCredentials);
            }
        }

        let now = self.clock.now();
        let timestamp = timestamp_text(now);
        let key = derive_pre_auth_key(secret, &timestamp);
        let encrypted_timestamp =
            seal(&key, timestamp.as_bytes()).map_err(|e| Error::Crypto(e.to_string()))?;

        self.store.lock().pre_auth.insert(
            principal.to_string(),
            PreAuthRecord {
                key,
                issued_at: now,
                expires_at: now + self.lifetimes.pre_auth,
            },
        );

        debug!(principal = %principal, "Pre-authentication recorded");
        Ok(PreAuthData {
            timestamp: now,
            encrypted_timestamp,
        })
    }

    fn request_tgt(
        &self,
        principal: &str,
        secret: &[u8],
        pre_auth: &PreAuthData,
    ) -> Result<TicketGrantingTicket> {
        let timestamp = timestamp_text(pre_auth.timestamp);
        let candidate = derive_pre_auth_key(secret, &timestamp);
        let proof_opens = open(&candidate, &pre_auth.encrypted_timestamp)
            .is_ok_and(|plain| plain == timestamp.as_bytes());

        let now = self.clock.now();
        let mut maps = self.store.lock();

        let live = maps
            .pre_auth
            .get(principal)
            .is_some_and(|r| now < r.expires_at);
        if !live {
            maps.pre_auth.remove(principal);
            return Err(Error::PreAuthExpired(principal.to_string()));
        }

        if self.session_policy == SessionPolicy::Exclusive && maps.live_tgt(principal, now).is_some()
        {
            return Err(Error::SessionActive(principal.to_string()));
        }

        // One-time: the record is consumed whether or not the proof matches
        let Some(record) = maps.pre_auth.remove(principal) else {
            return Err(Error::PreAuthExpired(principal.to_string()));
        };
        if !proof_opens || record.issued_at != pre_auth.timestamp || record.key != candidate {
            warn!(principal = %principal, "Pre-authentication proof rejected");
            return Err(Error::PreAuthFailed(principal.to_string()));
        }

        let tgt = TicketGrantingTicket {
            client_name: principal.to_string(),
            realm: self.realm.clone(),
            issued_at: now,
            validity: self.lifetimes.tgt,
            session_key: SessionKey::generate(),
            flags: TicketFlags {
                forwardable: true,
                proxiable: true,
                delegatable: false,
            },
        };

        if maps.tickets.contains_key(principal) {
            debug!(principal = %principal, "Replacing existing TGT");
        }
        maps.session_keys.insert(
            principal.to_string(),
            SessionEntry {
                key: tgt.session_key.clone(),
                expires_at: tgt.expires_at(),
                authorized_at: None,
            },
        );
        maps.tickets.insert(principal.to_string(), tgt.clone());

        info!(
            principal = %principal,
            realm = %self.realm,
            session = %tgt.session_key.fingerprint(),
            "TGT issued"
        );
        Ok(tgt)
    }

    fn request_service_ticket(
        &self,
        principal: &str,
        tgt: &TicketGrantingTicket,
        options: &ServiceTicketOptions,
    ) -> Result<ServiceTicket> {
        if tgt.client_name != principal {
            return Err(Error::InvalidCredentials);
        }

        let now = self.clock.now();
        let maps = self.store.lock();

        let stored = maps
            .live_tgt(principal, now)
            .ok_or_else(|| Error::TicketExpired(principal.to_string()))?;

        // A TGT replaced by a newer AS exchange is stale
        if stored.session_key != tgt.session_key {
            return Err(Error::TicketExpired(principal.to_string()));
        }

        // Service tickets never outlive the TGT they come from
        let validity = self.lifetimes.service.min(stored.expires_at() - now);

        let ticket = ServiceTicket {
            client_name: principal.to_string(),
            realm: stored.realm.clone(),
            service: options.service.clone(),
            issued_at: now,
            validity,
            session_key: stored.session_key.clone(),
            flags: TicketFlags {
                forwardable: options.forwardable && stored.flags.forwardable,
                proxiable: stored.flags.proxiable,
                delegatable: options.delegation,
            },
        };

        debug!(
            principal = %principal,
            service = ?ticket.service,
            delegatable = ticket.flags.delegatable,
            "Service ticket issued"
        );
        Ok(ticket)
    }

    fn validate_service_ticket(&self, principal: &str, ticket: &ServiceTicket) -> bool {
        let now = self.clock.now();

        if ticket.client_name != principal || ticket.realm != self.realm {
            return false;
        }
        if !ticket.is_valid_at(now) {
            debug!(principal = %principal, "Service ticket outside its validity window");
            return false;
        }

        let mut maps = self.store.lock();
        if maps.live_tgt(principal, now).is_none() {
            return false;
        }

        match maps.session_keys.get_mut(principal) {
            Some(session) if now < session.expires_at && session.key == ticket.session_key => {
                session.authorized_at.get_or_insert(now);
                true
            }
            _ => false,
        }
    }

    fn protocol_transition(
        &self,
        source: &str,
        target: &str,
        target_service: &str,
    ) -> Result<TransitionTicket> {
        if !self.delegation_policy.allows(source) {
            warn!(source = %source, target = %target, "Protocol transition refused");
            return Err(Error::DelegationNotAllowed(format!(
                "{} may not act on behalf of {}",
                source, target
            )));
        }
        if target.is_empty() || target_service.is_empty() {
            return Err(Error::InvalidArgument(
                "Protocol transition needs a target principal and service".into(),
            ));
        }

        let ticket = TransitionTicket {
            client_name: target.to_string(),
            realm: self.realm.clone(),
            impersonator: source.to_string(),
            service_target: target_service.to_string(),
            issued_at: self.clock.now(),
            validity: self.lifetimes.transition,
        };

        info!(
            source = %source,
            target = %target,
            service = %target_service,
            "Protocol transition ticket issued"
        );
        Ok(ticket)
    }

    fn delegate_credentials(
        &self,
        principal: &str,
        target_service: &str,
        ticket: &ServiceTicket,
    ) -> Result<bool> {
        if !ticket.flags.delegatable {
            return Err(Error::DelegationNotAllowed(format!(
                "Ticket of {} is not delegatable",
                principal
            )));
        }
        if ticket.client_name != principal {
            return Err(Error::DelegationNotAllowed(format!(
                "Ticket of {} cannot delegate {}",
                ticket.client_name, principal
            )));
        }

        let now = self.clock.now();
        if ticket.expires_at() <= now {
            return Err(Error::TicketExpired(principal.to_string()));
        }
        let expires_at = now + ticket.validity;

        self.store.lock().delegations.insert(
            (principal.to_string(), target_service.to_string()),
            DelegationRecord {
                principal: principal.to_string(),
                target_service: target_service.to_string(),
                ticket: ticket.clone(),
                expires_at,
            },
        );

        info!(principal = %principal, service = %target_service, "Credentials delegated");
        Ok(true)
    }

    fn delegation(&self, principal: &str, target_service: &str) -> Option<DelegationRecord> {
        let now = self.clock.now();
        self.store
            .lock()
            .delegations
            .get(&(principal.to_string(), target_service.to_string()))
            .filter(|d| now < d.expires_at)
            .cloned()
    }

    fn revoke(&self, principal: &str) -> bool {
        let revoked = self.store.lock().remove_principal(principal);
        if revoked {
            info!(principal = %principal, "Tickets revoked");
        }
        revoked
    }

    fn ticket_state(&self, principal: &str) -> TicketState {
        let now = self.clock.now();
        self.store.lock().state(principal, now)
    }

    fn cleanup(&self) -> CleanupReport {
        let now = self.clock.now();
        self.store.sweep(now)
    }
}
