//! Resource Scope
//!
//! Shared lifetime boundary over every mapping of one storage handle.
//!
//! ## Concurrency:
//! - `closed`: Atomic flag, the single source of truth for liveness
//! - `generations`: RwLock held only long enough to clone the `Arc`
//! - Closing drops the scope's reference to the mappings. A mapping is
//!   unmapped exactly once, when its last owner (scope, cursor or returned
//!   slice) goes away, so no reader can ever touch unmapped memory.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::error::{GenKvError, Result};

use super::sstable::Generation;

/// Cloneable handle to one shared scope
#[derive(Clone)]
pub(crate) struct Scope {
    inner: Arc<ScopeInner>,
}

struct ScopeInner {
    closed: AtomicBool,
    /// Mapped generations, oldest → newest; `None` once closed
    generations: RwLock<Option<Arc<[Generation]>>>,
}

impl Scope {
    pub(crate) fn new(generations: Vec<Generation>) -> Self {
        Self {
            inner: Arc::new(ScopeInner {
                closed: AtomicBool::new(false),
                generations: RwLock::new(Some(generations.into())),
            }),
        }
    }

    pub(crate) fn is_alive(&self) -> bool {
        !self.inner.closed.load(Ordering::Acquire)
    }

    /// Snapshot of the generation set, or `Closed`
    pub(crate) fn generations(&self) -> Result<Arc<[Generation]>> {
        if !self.is_alive() {
            return Err(GenKvError::Closed);
        }
        self.inner.generations.read().clone().ok_or(GenKvError::Closed)
    }

    /// Translate a read-path failure: once the scope is gone the caller gets
    /// `Closed` instead of whatever low-level error the access produced.
    pub(crate) fn check(&self, err: GenKvError) -> GenKvError {
        if self.is_alive() {
            err
        } else {
            GenKvError::Closed
        }
    }

    /// Release the scope's mappings. Idempotent and safe to race; later and
    /// concurrent callers are no-ops once the flag has flipped.
    pub(crate) fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let released = self.inner.generations.write().take();
        let count = released.as_ref().map_or(0, |g| g.len());
        drop(released);

        debug!(generations = count, "Closed storage scope");
    }
}
