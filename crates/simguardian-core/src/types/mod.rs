//! Core type definitions used across the SimGuardian workspace.

pub mod id;

pub use id::*;
