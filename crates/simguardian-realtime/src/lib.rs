//! # simguardian-realtime
//!
//! Real-time notification pipeline for SimGuardian. Provides:
//!
//! - The [`EventSource`](source::EventSource) boundary with Postgres
//!   (`LISTEN/NOTIFY`) and in-memory implementations
//! - An ordered notification list with an incrementally maintained
//!   unread counter
//! - A single-writer store actor with optimistic read-state persistence
//! - Session gating that drives the store lifecycle on sign-in/sign-out

pub mod notification;
pub mod session;
pub mod source;

pub use notification::store::NotificationStore;
pub use session::binding::SessionBinding;
pub use session::gate::SessionGate;
pub use source::EventSource;
