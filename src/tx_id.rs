use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::id::AccountId;

/// Guards against two transaction ids generated in the same process landing
/// on the same `valid_start` nanosecond -- required for S4's "strictly
/// increasing valid_start on regeneration" behavior when regeneration
/// happens faster than the wall clock's resolution.
static LAST_NANOS: AtomicU64 = AtomicU64::new(0);

/// Identifies a submitted transaction: the paying/operator account plus a
/// "valid start" instant, unique enough across the network to also serve as
/// the idempotency key nodes use to recognize a retried submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionId {
    pub account_id: AccountId,
    pub valid_start_nanos: u64,
}

impl TransactionId {
    /// Generates a fresh id for `account_id`, strictly after any id this
    /// process has generated so far.
    pub fn generate(account_id: AccountId) -> Self {
        let now_nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos() as u64;

        let mut valid_start_nanos = now_nanos;
        LAST_NANOS
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                valid_start_nanos = now_nanos.max(last + 1);
                Some(valid_start_nanos)
            })
            .expect("update closure always returns Some");

        Self { account_id, valid_start_nanos }
    }

    /// Derives a chunk's transaction id from the first chunk's id: same
    /// account, `valid_start` advanced by `chunk_index` nanoseconds so every
    /// chunk of a multi-chunk submission gets a distinct, order-preserving id.
    pub fn derive_chunk(first: Self, chunk_index: u64) -> Self {
        Self { account_id: first.account_id, valid_start_nanos: first.valid_start_nanos + chunk_index }
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.account_id, self.valid_start_nanos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successive_generations_strictly_increase() {
        let account = AccountId::from_number(1001);
        let first = TransactionId::generate(account);
        let second = TransactionId::generate(account);
        assert!(second.valid_start_nanos > first.valid_start_nanos);
    }

    #[test]
    fn derived_chunk_ids_share_account_and_advance_valid_start() {
        let first = TransactionId::generate(AccountId::from_number(1001));
        let chunk = TransactionId::derive_chunk(first, 2);
        assert_eq!(chunk.account_id, first.account_id);
        assert_eq!(chunk.valid_start_nanos, first.valid_start_nanos + 2);
    }
}
