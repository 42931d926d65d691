//! Repository implementations for SimGuardian entities.

pub mod notification;

pub use notification::NotificationRepository;
