//! Restores track order between the worker pool and the output stage.

use std::collections::BTreeMap;

use super::EncodeError;

/// Holds tracks that finished early until every earlier track has arrived.
///
/// Tracks are keyed by index; pushing the next expected index releases it
/// together with any contiguous run already waiting.
#[derive(Debug)]
pub struct ReorderBuffer<T> {
    next_index: u64,
    pending: BTreeMap<u64, T>,
    max_pending: usize,
}

impl<T> ReorderBuffer<T> {
    pub fn with_limit(max_pending: usize) -> Self {
        Self {
            next_index: 0,
            pending: BTreeMap::new(),
            max_pending: max_pending.max(1),
        }
    }

    /// Insert a track and return the tracks that are now in order.
    ///
    /// # Errors
    /// Fails on an index that was already released or is already waiting, and
    /// when an out-of-order track would exceed the limit.
    pub fn push(&mut self, index: u64, item: T) -> Result<Vec<T>, EncodeError> {
        if index < self.next_index || self.pending.contains_key(&index) {
            return Err(EncodeError::OutOfOrder {
                track_index: index,
                message: "track delivered twice".to_string(),
            });
        }

        if index != self.next_index && self.pending.len() >= self.max_pending {
            return Err(EncodeError::OutOfOrder {
                track_index: index,
                message: format!(
                    "{} tracks already waiting for track {}",
                    self.pending.len(),
                    self.next_index
                ),
            });
        }

        self.pending.insert(index, item);

        let mut ready = Vec::new();
        while let Some(item) = self.pending.remove(&self.next_index) {
            ready.push(item);
            self.next_index += 1;
        }
        Ok(ready)
    }

    pub fn next_expected(&self) -> u64 {
        self.next_index
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_releases_contiguous_runs() {
        let mut buffer = ReorderBuffer::with_limit(8);
        assert!(buffer.push(2, 'c').unwrap().is_empty());
        assert!(buffer.push(1, 'b').unwrap().is_empty());
        assert_eq!(buffer.pending_len(), 2);
        assert_eq!(buffer.push(0, 'a').unwrap(), vec!['a', 'b', 'c']);
        assert_eq!(buffer.next_expected(), 3);
        assert_eq!(buffer.push(3, 'd').unwrap(), vec!['d']);
        assert_eq!(buffer.pending_len(), 0);
    }

    #[test]
    fn test_rejects_duplicates() {
        let mut buffer = ReorderBuffer::with_limit(8);
        buffer.push(0, ()).unwrap();
        assert!(matches!(
            buffer.push(0, ()),
            Err(EncodeError::OutOfOrder { track_index: 0, .. })
        ));
        buffer.push(5, ()).unwrap();
        assert!(matches!(
            buffer.push(5, ()),
            Err(EncodeError::OutOfOrder { track_index: 5, .. })
        ));
    }

    #[test]
    fn test_limit_applies_to_out_of_order_only() {
        let mut buffer = ReorderBuffer::with_limit(2);
        buffer.push(1, ()).unwrap();
        buffer.push(2, ()).unwrap();
        match buffer.push(3, ()) {
            Err(EncodeError::OutOfOrder { track_index, message }) => {
                assert_eq!(track_index, 3);
                assert!(message.contains("waiting for track 0"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(buffer.push(0, ()).unwrap().len(), 3);
    }
}
