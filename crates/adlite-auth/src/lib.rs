//! Adlite Authentication
//!
//! Authentication core of the directory:
//! - Simulated Kerberos-style ticket authority (pre-auth, TGT, service
//!   tickets, protocol transition, delegation) with periodic cleanup
//! - Method dispatch between basic credential checks and the ticket chain
//! - Bind request handling and group membership checks
//!
//! The ticket authority runs entirely in process. It performs no wire
//! encoding and never contacts a real KDC.

pub mod bind;
pub mod groups;
pub mod provider;
pub mod ticket;

pub use bind::{BindHandler, BindRequest, BindResult};
pub use groups::GroupService;
pub use provider::{AuthProvider, Authenticator, BasicAuthenticator, TicketAuthenticator};
pub use ticket::{CleanupWorker, SimulatedKdc, TicketAuthority};
