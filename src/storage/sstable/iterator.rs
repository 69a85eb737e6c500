//! SSTable Iterator
//!
//! Bounded forward walk over one generation's entries.

use crate::error::{GenKvError, Result};
use crate::storage::scope::Scope;
use crate::storage::Entry;

use super::Generation;

/// Lazy cursor over the half-open index range `[start, end)` of one
/// generation, in ascending key order.
///
/// Each step re-checks the owning scope, so advancing a cursor after its
/// storage was closed yields `Closed` (once) and then ends.
pub struct GenerationCursor {
    generation: Generation,
    scope: Scope,
    position: u64,
    end: u64,
}

impl GenerationCursor {
    pub(crate) fn new(generation: Generation, scope: Scope, start: u64, end: u64) -> Self {
        Self {
            generation,
            scope,
            position: start,
            end: end.max(start),
        }
    }

    /// Index of the generation this cursor walks (0 = oldest)
    pub fn generation_id(&self) -> usize {
        self.generation.id()
    }

    /// Entries left before the upper bound
    pub fn remaining(&self) -> u64 {
        self.end - self.position
    }

    fn stop(&mut self) {
        self.position = self.end;
    }
}

impl Iterator for GenerationCursor {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.end {
            return None;
        }

        if !self.scope.is_alive() {
            self.stop();
            return Some(Err(GenKvError::Closed));
        }

        match self.generation.entry_at(self.position) {
            Ok(entry) => {
                self.position += 1;
                Some(Ok(entry))
            }
            Err(e) => {
                self.stop();
                Some(Err(self.scope.check(e)))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.remaining()).unwrap_or(usize::MAX);
        (0, Some(remaining))
    }
}
