/// Fixed-capacity circular buffer. Pre-allocated, no heap allocs after init.
/// Pushing into a full buffer overwrites the oldest entry.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    buf: Vec<T>,
    capacity: usize,
    head: usize,
    len: usize,
}

impl<T: Copy + Default> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buf: vec![T::default(); capacity],
            capacity,
            head: 0,
            len: 0,
        }
    }

    pub fn push(&mut self, value: T) {
        self.buf[self.head] = value;
        self.head = (self.head + 1) % self.capacity;
        if self.len < self.capacity {
            self.len += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    /// Most recently pushed value.
    pub fn last(&self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        Some(self.buf[(self.head + self.capacity - 1) % self.capacity])
    }

    /// Drop entries from the oldest end while `stale` holds.
    pub fn drop_oldest_while(&mut self, mut stale: impl FnMut(&T) -> bool) {
        while self.len > 0 {
            let oldest = (self.head + self.capacity - self.len) % self.capacity;
            if !stale(&self.buf[oldest]) {
                break;
            }
            self.len -= 1;
        }
    }

    /// Iterate from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        let start = (self.head + self.capacity - self.len) % self.capacity;
        let cap = self.capacity;
        (0..self.len).map(move |i| &self.buf[(start + i) % cap])
    }
}
