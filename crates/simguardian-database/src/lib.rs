//! # simguardian-database
//!
//! PostgreSQL connection management, migrations, and the notification
//! repository and insert listener.

pub mod connection;
pub mod listener;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
pub use listener::{INSERT_CHANNEL, InsertAnnouncement, NotificationListener};
