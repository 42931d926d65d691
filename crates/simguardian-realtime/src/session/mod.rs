//! Session lifecycle: who is signed in, and keeping the store bound to them.

pub mod binding;
pub mod gate;

pub use binding::SessionBinding;
pub use gate::SessionGate;
