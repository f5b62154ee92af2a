//! Account nonce allocation.
//!
//! Every submitted transaction needs a distinct nonce. [`NonceAllocator`]
//! hands them out from a local counter so concurrent submissions never wait
//! on the ledger, and [`NonceAllocator::resync`] pulls the authoritative
//! value back from the ledger after a failure.
//!
//! The counter lock is a `parking_lot::Mutex` held only for the read-bump
//! or the final overwrite, never across an `.await`.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::{info, warn};

use super::client::{LedgerRpc, RpcClientError};
use crate::config::RESYNC_ATTEMPTS;
use crate::identity::QkcAddress;

/// Errors from nonce resynchronisation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NonceError {
    #[error("nonce resync failed after {attempts} attempts: {last}")]
    ResyncExhausted {
        attempts: usize,
        last: RpcClientError,
    },
}

/// Anything that can report an account's next nonce.
#[async_trait]
pub trait NonceSource: Send + Sync {
    async fn fetch_nonce(&self, address: &QkcAddress) -> Result<u64, RpcClientError>;
}

/// The ledger's transaction count on the address's shard is its next nonce.
#[async_trait]
impl<T: LedgerRpc + ?Sized> NonceSource for T {
    async fn fetch_nonce(&self, address: &QkcAddress) -> Result<u64, RpcClientError> {
        Ok(self.account_data(address).await?.transaction_count)
    }
}

/// Thread-safe nonce counter.
#[derive(Debug)]
pub struct NonceAllocator {
    next: Mutex<u64>,
    resyncs: AtomicU64,
}

impl NonceAllocator {
    pub fn new(initial: u64) -> Self {
        Self {
            next: Mutex::new(initial),
            resyncs: AtomicU64::new(0),
        }
    }

    /// Returns the current value and advances the counter by one.
    ///
    /// Concurrent callers always receive distinct values.
    pub fn allocate(&self) -> u64 {
        let mut next = self.next.lock();
        let nonce = *next;
        *next += 1;
        nonce
    }

    /// The value the next [`allocate`](Self::allocate) will return.
    pub fn current(&self) -> u64 {
        *self.next.lock()
    }

    /// Number of resyncs attempted so far, successful or not.
    pub fn resync_count(&self) -> u64 {
        self.resyncs.load(Ordering::Relaxed)
    }

    /// Refreshes the counter from `source`.
    ///
    /// Tries up to [`RESYNC_ATTEMPTS`] times back to back. On success the
    /// counter is overwritten with the fetched value; on exhaustion it is left
    /// untouched.
    pub async fn resync<S: NonceSource + ?Sized>(
        &self,
        source: &S,
        address: &QkcAddress,
    ) -> Result<u64, NonceError> {
        self.resyncs.fetch_add(1, Ordering::Relaxed);

        let mut last = None;
        for attempt in 1..=RESYNC_ATTEMPTS {
            match source.fetch_nonce(address).await {
                Ok(nonce) => {
                    *self.next.lock() = nonce;
                    info!(%address, nonce, attempt, "nonce resynced");
                    return Ok(nonce);
                }
                Err(e) => {
                    warn!(%address, attempt, error = %e, "nonce fetch failed");
                    last = Some(e);
                }
            }
        }

        Err(NonceError::ResyncExhausted {
            attempts: RESYNC_ATTEMPTS,
            last: last.unwrap_or_else(|| RpcClientError::Transport("no attempts made".into())),
        })
    }
}

impl Default for NonceAllocator {
    fn default() -> Self {
        Self::new(0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
