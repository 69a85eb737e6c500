//! Entry type shared by the writer, the read path and the merge layer.

use bytes::Bytes;

/// A key with an optional value; `None` is a tombstone (logical deletion).
///
/// Entries produced by the read path borrow the mapped generation file:
/// `key` and `value` are zero-copy slices that keep the mapping alive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: Bytes,
    pub value: Option<Bytes>,
}

impl Entry {
    /// A live key/value pair
    pub fn new(key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
        }
    }

    /// A deletion marker for `key`
    pub fn tombstone(key: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            value: None,
        }
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn value(&self) -> Option<&[u8]> {
        self.value.as_deref()
    }

    pub fn is_tombstone(&self) -> bool {
        self.value.is_none()
    }
}
