//! Side-table tracking which objects already had their timeout adjusted.
//!
//! The dynamic-language original tagged objects by injecting a hidden
//! property. Here the flag lives outside the object: a table keyed on the
//! `Arc` allocation's address, holding a `Weak` so the table never extends
//! an object's lifetime and a freed address reused by a new allocation reads
//! as unmarked.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

/// Records which objects already had their timeout adjusted, preventing a
/// second adjustment.
///
/// The flag is identity-scoped: it is not part of the object's value, never
/// serialized, and dies with the object.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use test_disposables::AdjustedTimeouts;
///
/// struct Step { timeout_ms: u64 }
///
/// let adjusted = AdjustedTimeouts::new();
/// let step = Arc::new(Step { timeout_ms: 2000 });
///
/// assert!(!adjusted.is_marked(&step));
///
/// // Marking returns the same object for fluent chaining.
/// let same = adjusted.mark(&step);
/// assert!(Arc::ptr_eq(&step, &same));
/// assert!(adjusted.is_marked(&step));
///
/// // Idempotent.
/// adjusted.mark(&step);
/// assert!(adjusted.is_marked(&step));
/// ```
#[derive(Default)]
pub struct AdjustedTimeouts {
    entries: Mutex<HashMap<usize, Weak<dyn Any + Send + Sync>>>,
}

impl AdjustedTimeouts {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    fn address<T>(target: &Arc<T>) -> usize {
        Arc::as_ptr(target) as *const () as usize
    }

    /// Marks `target` as already adjusted and returns it unchanged.
    ///
    /// Idempotent; dead entries are purged on the way in so the table stays
    /// bounded by the number of live marked objects.
    pub fn mark<T>(&self, target: &Arc<T>) -> Arc<T>
    where
        T: Send + Sync + 'static,
    {
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|_, weak| weak.strong_count() > 0);
        let cloned = Arc::clone(target);
        let erased: Arc<dyn Any + Send + Sync> = cloned;
        entries.insert(Self::address(target), Arc::downgrade(&erased));
        Arc::clone(target)
    }

    /// Whether `target` was marked. False for anything never marked,
    /// including a fresh allocation at an address a dead marked object once
    /// occupied.
    pub fn is_marked<T>(&self, target: &Arc<T>) -> bool
    where
        T: Send + Sync + 'static,
    {
        let entries = self.entries.lock().unwrap();
        entries
            .get(&Self::address(target))
            .map_or(false, |weak| weak.strong_count() > 0)
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

impl std::fmt::Debug for AdjustedTimeouts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdjustedTimeouts")
            .field("entries", &self.entries.lock().unwrap().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dead_entries_are_purged_on_mark() {
        let adjusted = AdjustedTimeouts::new();
        let a = Arc::new(1u32);
        adjusted.mark(&a);
        drop(a);

        let b = Arc::new(2u32);
        adjusted.mark(&b);
        // Only the live object remains tracked.
        assert_eq!(adjusted.tracked(), 1);
        assert!(adjusted.is_marked(&b));
    }

    #[test]
    fn dropping_the_object_clears_the_flag() {
        let adjusted = AdjustedTimeouts::new();
        let a = Arc::new(String::from("x"));
        adjusted.mark(&a);
        let held = Arc::clone(&a);
        drop(a);
        // Still alive through the second handle.
        assert!(adjusted.is_marked(&held));
        drop(held);
        assert_eq!(adjusted.tracked(), 1); // purge happens on next mark
        let b = Arc::new(String::from("y"));
        adjusted.mark(&b);
        assert_eq!(adjusted.tracked(), 1);
    }
}
