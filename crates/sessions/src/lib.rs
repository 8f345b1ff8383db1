//! Server-side session management for guardian.
//!
//! Opaque identifiers, a typed key-value payload, and three expiry clocks
//! (idle, renewal, absolute lifetime).  Identifiers rotate on renewal
//! while the data stays put.  Persistence goes through a [`SessionStore`]
//! over any [`SessionBackend`].

pub mod backend;
pub mod codec;
pub mod context;
pub mod file;
pub mod lifecycle;
pub mod memory;
pub mod registry;
pub mod session;
pub mod session_id;
pub mod store;

pub use backend::SessionBackend;
pub use context::{ContextKey, RequestContext};
pub use file::FileBackend;
pub use lifecycle::{SessionManager, SessionManagerBuilder, Timeouts, Transition};
pub use memory::MemoryBackend;
pub use registry::{NamespaceRegistration, NamespaceRegistry};
pub use session::{
    InvalidationReason, SameSite, Session, SessionCookie, SessionData, SessionStatus, Value,
};
pub use session_id::{generate_session_id, is_well_formed};
pub use store::SessionStore;
