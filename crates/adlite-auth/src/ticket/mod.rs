//! Simulated Kerberos-style ticket authority
//!
//! Chain for a principal:
//!
//! 1. Pre-authentication records a one-time key derived from the secret and a
//!    timestamp (valid 2 minutes by default)
//! 2. The AS exchange consumes that key and issues a TGT (10 hours) with a
//!    fresh session key
//! 3. The TGS exchange issues service tickets (1 hour) sharing that session key
//! 4. Validation checks a service ticket against the stored session key
//!
//! Protocol transition and credential delegation sit on top of this chain.

mod authority;
mod clock;
mod keytab;
mod policy;
mod store;
mod sweeper;
mod types;

pub use authority::{SimulatedKdc, TicketAuthority};
pub use clock::{Clock, ManualClock, SystemClock};
pub use keytab::KeyTable;
pub use policy::DelegationPolicy;
pub use store::{StoreCounts, TicketStore};
pub use sweeper::CleanupWorker;
pub use types::*;
