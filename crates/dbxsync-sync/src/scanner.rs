//! Pull-based change streams
//!
//! Both sides of a synchronized pair expose their changes through the same
//! [`Scanner`] contract: call [`advance`](Scanner::advance) to move to the
//! next action, then read it with [`current`](Scanner::current).
//!
//! A scanner never ends on its own. `advance` returns `false` only after a
//! failure, and from then on it keeps returning `false` while
//! [`error`](Scanner::error) reports the failure that stopped it.

use async_trait::async_trait;

use crate::SyncError;

/// A lazy, possibly infinite sequence of actions
#[async_trait]
pub trait Scanner: Send {
    /// The action type produced by this scanner
    type Item: Clone + Send + Sync;

    /// Moves to the next action, waiting for one if necessary
    ///
    /// Returns `false` once the scanner has failed; the failure is sticky.
    async fn advance(&mut self) -> bool;

    /// The action produced by the last successful `advance`
    fn current(&self) -> Option<&Self::Item>;

    /// The error that stopped the scanner, if any
    fn error(&self) -> Option<&SyncError>;
}
