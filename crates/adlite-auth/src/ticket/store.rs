//! In-memory ticket state
//!
//! The four maps (pre-auth keys, TGTs, session keys, delegations) live behind
//! one lock so that every read-check-write sequence of the KDC is atomic with
//! respect to the others and to cleanup.

use adlite_crypto::SessionKey;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};
use std::collections::HashMap;

use super::types::{CleanupReport, DelegationRecord, TicketGrantingTicket, TicketState};

/// Outstanding pre-authentication for a principal
#[derive(Debug, Clone)]
pub(crate) struct PreAuthRecord {
    pub key: SessionKey,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Session key of the principal's current TGT
#[derive(Debug, Clone)]
pub(crate) struct SessionEntry {
    pub key: SessionKey,
    pub expires_at: DateTime<Utc>,
    /// Set once a service ticket has validated against this session
    pub authorized_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub(crate) struct TicketMaps {
    pub pre_auth: HashMap<String, PreAuthRecord>,
    pub tickets: HashMap<String, TicketGrantingTicket>,
    pub session_keys: HashMap<String, SessionEntry>,
    pub delegations: HashMap<(String, String), DelegationRecord>,
}

impl TicketMaps {
    pub fn live_tgt(&self, principal: &str, now: DateTime<Utc>) -> Option<&TicketGrantingTicket> {
        self.tickets.get(principal).filter(|t| t.is_valid_at(now))
    }

    pub fn state(&self, principal: &str, now: DateTime<Utc>) -> TicketState {
        if self.live_tgt(principal, now).is_some() {
            let authorized = self
                .session_keys
                .get(principal)
                .is_some_and(|s| s.authorized_at.is_some());
            return if authorized {
                TicketState::ServiceAuthorized
            } else {
                TicketState::Granted
            };
        }

        if self.pre_auth.get(principal).is_some_and(|r| now < r.expires_at) {
            return TicketState::PreAuthPending;
        }

        if self.tickets.contains_key(principal) {
            TicketState::Expired
        } else {
            TicketState::NoTicket
        }
    }

    pub fn remove_principal(&mut self, principal: &str) -> bool {
        let mut removed = self.pre_auth.remove(principal).is_some();
        removed |= self.tickets.remove(principal).is_some();
        removed |= self.session_keys.remove(principal).is_some();

        let before = self.delegations.len();
        self.delegations.retain(|(p, _), _| p != principal);
        removed | (self.delegations.len() != before)
    }

    pub fn sweep(&mut self, now: DateTime<Utc>) -> CleanupReport {
        let mut report = CleanupReport::default();

        let before = self.pre_auth.len();
        self.pre_auth.retain(|_, r| now < r.expires_at);
        report.pre_auth = before - self.pre_auth.len();

        let before = self.tickets.len();
        self.tickets.retain(|_, t| now < t.expires_at());
        report.tickets = before - self.tickets.len();

        let before = self.session_keys.len();
        self.session_keys.retain(|_, s| now < s.expires_at);
        report.session_keys = before - self.session_keys.len();

        let before = self.delegations.len();
        self.delegations.retain(|_, d| now < d.expires_at);
        report.delegations = before - self.delegations.len();

        report
    }
}

/// Entry counts of a [`TicketStore`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCounts {
    pub pre_auth: usize,
    pub tickets: usize,
    pub session_keys: usize,
    pub delegations: usize,
}

/// Shared ticket state of a KDC
#[derive(Debug, Default)]
pub struct TicketStore {
    maps: Mutex<TicketMaps>,
}

impl TicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, TicketMaps> {
        self.maps.lock()
    }

    /// Evict every entry whose expiry is at or before `now`
    pub fn sweep(&self, now: DateTime<Utc>) -> CleanupReport {
        self.maps.lock().sweep(now)
    }

    pub fn counts(&self) -> StoreCounts {
        let maps = self.maps.lock();
        StoreCounts {
            pre_auth: maps.pre_auth.len(),
            tickets: maps.tickets.len(),
            session_keys: maps.session_keys.len(),
            delegations: maps.delegations.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticket::types::TicketFlags;
    use chrono::Duration;

    fn tgt(principal: &str, issued_at: DateTime<Utc>, validity: Duration) -> TicketGrantingTicket {
        TicketGrantingTicket {
            client_name: principal.to_string(),
            realm: "TEST.COM".to_string(),
            issued_at,
            validity,
            session_key: SessionKey::generate(),
            flags: TicketFlags::default(),
        }
    }

    #[test]
    fn test_sweep_evicts_at_expiry_instant() {
        let store = TicketStore::new();
        let now = Utc::now();

        {
            let mut maps = store.lock();
            maps.pre_auth.insert(
                "alice".into(),
                PreAuthRecord {
                    key: SessionKey::generate(),
                    issued_at: now,
                    expires_at: now + Duration::seconds(120),
                },
            );
            let t = tgt("bob", now, Duration::seconds(60));
            maps.session_keys.insert(
                "bob".into(),
                SessionEntry {
                    key: t.session_key.clone(),
                    expires_at: t.expires_at(),
                    authorized_at: None,
                },
            );
            maps.tickets.insert("bob".into(), t);
        }

        assert!(store.sweep(now + Duration::seconds(59)).is_empty());

        let report = store.sweep(now + Duration::seconds(60));
        assert_eq!(report.tickets, 1);
        assert_eq!(report.session_keys, 1);
        assert_eq!(report.pre_auth, 0);

        let report = store.sweep(now + Duration::seconds(120));
        assert_eq!(report.pre_auth, 1);
        assert_eq!(store.counts(), StoreCounts::default());
    }

    #[test]
    fn test_state_transitions() {
        let store = TicketStore::new();
        let now = Utc::now();
        let mut maps = store.lock();

        assert_eq!(maps.state("carol", now), TicketState::NoTicket);

        maps.pre_auth.insert(
            "carol".into(),
            PreAuthRecord {
                key: SessionKey::generate(),
                issued_at: now,
                expires_at: now + Duration::seconds(120),
            },
        );
        assert_eq!(maps.state("carol", now), TicketState::PreAuthPending);
        assert_eq!(maps.state("carol", now + Duration::seconds(120)), TicketState::NoTicket);

        maps.pre_auth.clear();
        let t = tgt("carol", now, Duration::hours(10));
        maps.session_keys.insert(
            "carol".into(),
            SessionEntry {
                key: t.session_key.clone(),
                expires_at: t.expires_at(),
                authorized_at: None,
            },
        );
        maps.tickets.insert("carol".into(), t);
        assert_eq!(maps.state("carol", now), TicketState::Granted);

        if let Some(s) = maps.session_keys.get_mut("carol") {
            s.authorized_at = Some(now);
        }
        assert_eq!(maps.state("carol", now), TicketState::ServiceAuthorized);
        assert_eq!(maps.state("carol", now + Duration::hours(10)), TicketState::Expired);

        assert!(maps.remove_principal("carol"));
        assert!(!maps.remove_principal("carol"));
        assert_eq!(maps.state("carol", now), TicketState::NoTicket);
    }
}
