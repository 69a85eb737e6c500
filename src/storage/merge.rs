//! Multi-way merge over per-generation cursors.
//!
//! Turns the independently ordered cursors returned by
//! [`Storage::iterate`](super::Storage::iterate) into one ascending stream
//! where the newest generation wins on duplicate keys.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::error::{GenKvError, Result};

use super::Entry;

/// Head entry of one source in the merge heap
struct HeapEntry {
    entry: Entry,
    /// Position of the source in the input list; higher is newer
    source: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap: smallest key on top, and for equal keys
        // the newest source
        other
            .entry
            .key
            .cmp(&self.entry.key)
            .then_with(|| self.source.cmp(&other.source))
    }
}

/// Newest-wins merge of sorted sources, ordered oldest → newest.
///
/// Tombstones are dropped from the output unless built with
/// [`MergedRange::with_tombstones`]. The first error from any source is
/// yielded and ends the stream.
pub struct MergedRange<I> {
    sources: Vec<I>,
    heap: BinaryHeap<HeapEntry>,
    keep_tombstones: bool,
    pending_error: Option<GenKvError>,
    failed: bool,
}

impl<I> MergedRange<I>
where
    I: Iterator<Item = Result<Entry>>,
{
    /// Merge live entries only
    pub fn new(sources: Vec<I>) -> Self {
        Self::build(sources, false)
    }

    /// Merge keeping tombstones of the winning generation
    pub fn with_tombstones(sources: Vec<I>) -> Self {
        Self::build(sources, true)
    }

    fn build(sources: Vec<I>, keep_tombstones: bool) -> Self {
        let mut merged = Self {
            heap: BinaryHeap::with_capacity(sources.len()),
            sources,
            keep_tombstones,
            pending_error: None,
            failed: false,
        };
        for source in 0..merged.sources.len() {
            merged.advance(source);
        }
        merged
    }

    /// Pull the next entry of `source` into the heap
    fn advance(&mut self, source: usize) {
        if self.pending_error.is_some() {
            return;
        }
        match self.sources[source].next() {
            Some(Ok(entry)) => self.heap.push(HeapEntry { entry, source }),
            Some(Err(e)) => self.pending_error = Some(e),
            None => {}
        }
    }
}

impl<I> Iterator for MergedRange<I>
where
    I: Iterator<Item = Result<Entry>>,
{
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.failed {
                return None;
            }
            if let Some(e) = self.pending_error.take() {
                self.failed = true;
                return Some(Err(e));
            }

            let top = self.heap.pop()?;
            self.advance(top.source);

            // Older versions of the same key are shadowed
            while let Some(next) = self.heap.peek() {
                if next.entry.key != top.entry.key {
                    break;
                }
                let shadowed = self.heap.pop().map(|h| h.source);
                if let Some(source) = shadowed {
                    self.advance(source);
                }
            }

            if top.entry.is_tombstone() && !self.keep_tombstones {
                continue;
            }
            return Some(Ok(top.entry));
        }
    }
}
