//! Per-user write serialization.
//!
//! Writers take the stripe for their user before reading the balance and hold
//! it until the batch is committed, so read-check-write sequences for one user
//! never interleave.

use std::sync::{Mutex, MutexGuard, PoisonError};

use creditbook_core::UserId;

/// Default number of lock stripes.
pub const DEFAULT_STRIPES: usize = 64;

/// A fixed set of mutexes indexed by user ID.
#[derive(Debug)]
pub struct UserLocks {
    stripes: Vec<Mutex<()>>,
}

impl UserLocks {
    /// Create a lock set with `count` stripes (at least one).
    #[must_use]
    pub fn new(count: usize) -> Self {
        Self {
            stripes: (0..count.max(1)).map(|_| Mutex::new(())).collect(),
        }
    }

    /// Acquire the write lock for `user_id`.
    pub fn lock(&self, user_id: &UserId) -> MutexGuard<'_, ()> {
        // A panic while holding the guard cannot leave `()` inconsistent.
        self.stripes[self.stripe_index(user_id)]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn stripe_index(&self, user_id: &UserId) -> usize {
        let hash = user_id
            .as_bytes()
            .iter()
            .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(usize::from(*b)));
        hash % self.stripes.len()
    }
}

impl Default for UserLocks {
    fn default() -> Self {
        Self::new(DEFAULT_STRIPES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_user_maps_to_same_stripe() {
        let locks = UserLocks::default();
        let user_id = UserId::generate();
        assert_eq!(locks.stripe_index(&user_id), locks.stripe_index(&user_id));
    }

    #[test]
    fn zero_stripes_is_clamped() {
        let locks = UserLocks::new(0);
        let _guard = locks.lock(&UserId::generate());
    }
}
