// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Cooperative cancellation for analysis passes.
//!
//! A pass holds a [`CancellationToken`] and calls [`CancellationToken::check`]
//! at block boundaries. The document worker cancels the token when a newer
//! edit arrives; the pass then unwinds with [`Cancelled`] and publishes
//! nothing.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// The analysis pass was abandoned because a newer edit arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("analysis cancelled")]
pub struct Cancelled;

/// A shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// A fresh, uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Every clone observes it.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Returns true once [`Self::cancel`] was called on any clone.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Returns `Err(Cancelled)` if cancellation was requested.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] once the token is cancelled.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}
