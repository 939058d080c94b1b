//! Placement order and page slicing.

use bizdir_core::BusinessRecord;
use chrono::{DateTime, Utc};

/// Something that can be placed in ranked results.
pub trait Rankable {
    /// Premium or sponsored placement.
    fn promoted(&self) -> bool;
    fn created_at(&self) -> DateTime<Utc>;
}

impl Rankable for BusinessRecord {
    fn promoted(&self) -> bool {
        self.is_promoted()
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Promoted first, then newest first. Ties keep their incoming order.
#[must_use]
pub fn rank<T: Rankable>(mut items: Vec<T>) -> Vec<T> {
    // `sort_by` is stable.
    items.sort_by(|a, b| {
        b.promoted()
            .cmp(&a.promoted())
            .then_with(|| b.created_at().cmp(&a.created_at()))
    });
    items
}

/// The `[offset, offset + size)` slice for a 1-based `page`.
///
/// A page past the end is empty, not an error.
#[must_use]
pub fn paginate<T>(items: &[T], page: u32, size: u32) -> &[T] {
    let size = usize::try_from(size).unwrap_or(usize::MAX);
    let offset = usize::try_from(page.saturating_sub(1))
        .unwrap_or(usize::MAX)
        .saturating_mul(size);
    if offset >= items.len() {
        return &[];
    }
    let end = offset.saturating_add(size).min(items.len());
    &items[offset..end]
}
