//! Fixed-capacity circular byte buffer owned by the reader side.

/// Capacity of the reader ring and the writer slot.
pub const BUFFER_SIZE: usize = 4096;

/// Circular buffer distinguishing empty from full without a counter.
///
/// Storage is one byte larger than the usable capacity: the buffer is full
/// when the write position sits immediately behind the read position, and
/// empty when the two are equal.
#[derive(Debug)]
pub struct RingBuffer {
    storage: Box<[u8]>,
    rptr: usize,
    wptr: usize,
}

impl Default for RingBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl RingBuffer {
    /// Creates a ring holding up to [`BUFFER_SIZE`] bytes.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(BUFFER_SIZE)
    }

    /// Creates a ring holding up to `capacity` bytes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            storage: vec![0; capacity + 1].into_boxed_slice(),
            rptr: 0,
            wptr: 0,
        }
    }

    /// Maximum number of bytes the ring can hold.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.len() - 1
    }

    /// Bytes currently buffered.
    #[must_use]
    pub fn len(&self) -> usize {
        let size = self.storage.len();
        (self.wptr + size - self.rptr) % size
    }

    /// Returns `true` when nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` when no more bytes fit.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }

    /// Bytes that can still be pushed.
    #[must_use]
    pub fn free(&self) -> usize {
        self.capacity() - self.len()
    }

    /// Returns `true` when `byte` is among the buffered bytes.
    #[must_use]
    pub fn contains(&self, byte: u8) -> bool {
        let (head, tail) = self.as_slices();
        head.contains(&byte) || tail.contains(&byte)
    }

    /// Returns the buffered bytes as up to two contiguous slices.
    #[must_use]
    pub fn as_slices(&self) -> (&[u8], &[u8]) {
        if self.rptr <= self.wptr {
            (&self.storage[self.rptr..self.wptr], &[])
        } else {
            (&self.storage[self.rptr..], &self.storage[..self.wptr])
        }
    }

    /// Rewinds both positions to the start when empty so the next push
    /// gets one contiguous run.
    pub fn rewind_if_empty(&mut self) {
        if self.rptr == self.wptr {
            self.rptr = 0;
            self.wptr = 0;
        }
    }

    /// Copies as much of `data` as fits and returns the number of bytes taken.
    pub fn push(&mut self, data: &[u8]) -> usize {
        let size = self.storage.len();
        let count = data.len().min(self.free());
        let first = count.min(size - self.wptr);
        self.storage[self.wptr..self.wptr + first].copy_from_slice(&data[..first]);
        let second = count - first;
        self.storage[..second].copy_from_slice(&data[first..count]);
        self.wptr = (self.wptr + count) % size;
        count
    }

    /// Moves up to `out.len()` bytes into `out` and returns how many were
    /// copied.
    pub fn pop(&mut self, out: &mut [u8]) -> usize {
        let (head, tail) = self.as_slices();
        let first = head.len().min(out.len());
        out[..first].copy_from_slice(&head[..first]);
        let second = tail.len().min(out.len() - first);
        out[first..first + second].copy_from_slice(&tail[..second]);
        let count = first + second;
        self.rptr = (self.rptr + count) % self.storage.len();
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn new_ring_is_empty_with_default_capacity() {
        let ring = RingBuffer::new();
        assert_eq!(ring.capacity(), BUFFER_SIZE);
        assert!(ring.is_empty());
        assert!(!ring.is_full());
    }

    #[test]
    fn push_stops_at_capacity() {
        let mut ring = RingBuffer::with_capacity(8);
        assert_eq!(ring.push(b"0123456789"), 8);
        assert!(ring.is_full());
        assert_eq!(ring.free(), 0);
        assert_eq!(ring.push(b"x"), 0);
    }

    #[test]
    fn wrapped_contents_pop_in_order() {
        let mut ring = RingBuffer::with_capacity(8);
        ring.push(b"abcdef");
        let mut out = [0u8; 4];
        assert_eq!(ring.pop(&mut out), 4);
        assert_eq!(&out, b"abcd");

        ring.push(b"ghijk");
        let (head, tail) = ring.as_slices();
        assert!(!tail.is_empty(), "contents should wrap: {head:?} {tail:?}");

        let mut rest = [0u8; 16];
        let n = ring.pop(&mut rest);
        assert_eq!(&rest[..n], b"efghijk");
        assert!(ring.is_empty());
    }

    #[test]
    fn contains_searches_both_halves() {
        let mut ring = RingBuffer::with_capacity(4);
        ring.push(b"abc");
        ring.pop(&mut [0u8; 2]);
        ring.push(b"\nx");
        assert!(ring.contains(b'\n'));
        assert!(!ring.contains(b'a'));
    }

    #[test]
    fn rewind_only_applies_when_empty() {
        let mut ring = RingBuffer::with_capacity(4);
        ring.push(b"ab");
        ring.pop(&mut [0u8; 1]);
        ring.rewind_if_empty();
        assert_eq!(ring.len(), 1);

        ring.pop(&mut [0u8; 1]);
        ring.rewind_if_empty();
        assert_eq!(ring.push(b"wxyz"), 4);
        assert_eq!(ring.as_slices().0, b"wxyz");
    }

    proptest! {
        #[test]
        fn len_tracks_bytes_written_minus_bytes_read(
            ops in proptest::collection::vec((0usize..64, 0usize..64), 1..64),
        ) {
            let mut ring = RingBuffer::with_capacity(100);
            let mut expected = 0usize;
            let mut scratch = [0u8; 64];
            for (write, read) in ops {
                let pushed = ring.push(&vec![7u8; write]);
                prop_assert_eq!(pushed, write.min(100 - expected));
                expected += pushed;
                let popped = ring.pop(&mut scratch[..read]);
                prop_assert_eq!(popped, read.min(expected));
                expected -= popped;

                prop_assert_eq!(ring.len(), expected);
                prop_assert!(!(ring.is_full() && ring.is_empty()));
            }
        }
    }
}
