//! Ordered notification list with an incrementally maintained unread counter.

use std::collections::HashSet;

use simguardian_core::error::AppError;
use simguardian_core::result::AppResult;
use simguardian_core::types::id::NotificationId;
use simguardian_entity::notification::Notification;

/// Notifications for one identity, newest first.
///
/// Invariants held after every method returns:
/// - `records` is sorted by `(created_at, id)` descending
/// - `ids` holds exactly the ids in `records`
/// - `unread` equals the number of records with `is_read == false`
#[derive(Debug, Clone, Default)]
pub struct NotificationList {
    records: Vec<Notification>,
    ids: HashSet<NotificationId>,
    unread: usize,
}

impl NotificationList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a list from a bulk fetch. Duplicate ids keep the first occurrence.
    pub fn from_records(records: Vec<Notification>) -> Self {
        let mut ids = HashSet::with_capacity(records.len());
        let mut records: Vec<Notification> =
            records.into_iter().filter(|r| ids.insert(r.id)).collect();
        records.sort_by(|a, b| b.order_key().cmp(&a.order_key()));
        let unread = records.iter().filter(|r| r.is_unread()).count();
        Self {
            records,
            ids,
            unread,
        }
    }

    /// Build the list that replaces `self` after a re-fetch.
    ///
    /// Records already read locally stay read even if `records` says otherwise,
    /// since the local flip may not have been persisted yet.
    pub fn refreshed(&self, records: Vec<Notification>) -> Self {
        let records = records
            .into_iter()
            .map(|mut r| {
                if !r.is_read && self.get(r.id).is_some_and(|local| local.is_read) {
                    r.is_read = true;
                }
                r
            })
            .collect();
        Self::from_records(records)
    }

    /// Merge one inserted record. Returns `false` if the id was already present.
    pub fn merge(&mut self, record: Notification) -> bool {
        if !self.ids.insert(record.id) {
            return false;
        }
        let key = record.order_key();
        let pos = self.records.partition_point(|r| r.order_key() > key);
        if record.is_unread() {
            self.unread += 1;
        }
        self.records.insert(pos, record);
        true
    }

    /// Flip one record to read. Returns `true` if it was unread.
    pub fn mark_read(&mut self, id: NotificationId) -> AppResult<bool> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| not_found(id))?;
        if record.is_read {
            return Ok(false);
        }
        record.is_read = true;
        self.unread -= 1;
        Ok(true)
    }

    /// Flip every unread record to read and return the affected ids.
    pub fn mark_all_read(&mut self) -> Vec<NotificationId> {
        if self.unread == 0 {
            return Vec::new();
        }
        let mut flipped = Vec::with_capacity(self.unread);
        for record in self.records.iter_mut().filter(|r| !r.is_read) {
            record.is_read = true;
            flipped.push(record.id);
        }
        self.unread = 0;
        flipped
    }

    /// Remove one record from the local view and return it.
    pub fn dismiss(&mut self, id: NotificationId) -> AppResult<Notification> {
        let pos = self
            .records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| not_found(id))?;
        let record = self.records.remove(pos);
        self.ids.remove(&id);
        if record.is_unread() {
            self.unread -= 1;
        }
        Ok(record)
    }

    /// Drop every record.
    pub fn clear(&mut self) {
        self.records.clear();
        self.ids.clear();
        self.unread = 0;
    }

    /// Look up a record by id.
    pub fn get(&self, id: NotificationId) -> Option<&Notification> {
        if !self.ids.contains(&id) {
            return None;
        }
        self.records.iter().find(|r| r.id == id)
    }

    /// Whether a record with this id is present.
    pub fn contains(&self, id: NotificationId) -> bool {
        self.ids.contains(&id)
    }

    /// Records, newest first.
    pub fn records(&self) -> &[Notification] {
        &self.records
    }

    /// Number of unread records.
    pub fn unread_count(&self) -> usize {
        self.unread
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn not_found(id: NotificationId) -> AppError {
    AppError::not_found(format!("Notification {id} is not in the local list"))
}
