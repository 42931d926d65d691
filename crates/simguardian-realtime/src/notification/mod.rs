//! Notification store: ordered list, single-writer task, and presentation helpers.

mod actor;
pub mod formatter;
pub mod list;
pub mod snapshot;
pub mod store;

pub use formatter::{Toast, ToastVariant, notification_age, relative_time};
pub use list::NotificationList;
pub use snapshot::{NotificationSnapshot, StoreEvent, StoreState};
pub use store::NotificationStore;
