/// Anything carrying a simulated timestamp.
pub trait Timestamped {
    fn t(&self) -> f64;
}

/// Default number of samples kept for plotting.
pub const DEFAULT_CAPACITY: usize = 300;

/// Bounded FIFO ring of samples. Once full, each push overwrites the oldest
/// entry. Eviction is count-based only; time windows are a read-side concern.
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryBuffer<T> {
    slots: Vec<T>,
    capacity: usize,
    cursor: usize,
}

impl<T> HistoryBuffer<T> {
    /// `capacity` is raised to 1 if zero.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            cursor: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() == self.capacity
    }

    /// Append a sample, returning the evicted one when at capacity.
    pub fn push(&mut self, item: T) -> Option<T> {
        if self.slots.len() < self.capacity {
            self.slots.push(item);
            None
        } else {
            let old = std::mem::replace(&mut self.slots[self.cursor], item);
            self.cursor = (self.cursor + 1) % self.capacity;
            Some(old)
        }
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.cursor = 0;
    }

    /// Entry `i` counted from the oldest.
    pub fn get(&self, i: usize) -> Option<&T> {
        if i >= self.slots.len() {
            return None;
        }
        let slot = if self.is_full() { (self.cursor + i) % self.capacity } else { i };
        self.slots.get(slot)
    }

    pub fn oldest(&self) -> Option<&T> {
        self.get(0)
    }

    pub fn latest(&self) -> Option<&T> {
        self.len().checked_sub(1).and_then(|i| self.get(i))
    }

    /// Iterate oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + '_ {
        let split = if self.is_full() { self.cursor } else { 0 };
        let (newer, older) = self.slots.split_at(split);
        older.iter().chain(newer.iter())
    }

    /// The most recent `n` entries, oldest first.
    pub fn last_n(&self, n: usize) -> impl Iterator<Item = &T> + '_ {
        let skip = self.len().saturating_sub(n);
        self.iter().skip(skip)
    }

    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.iter().cloned().collect()
    }
}

impl<T: Timestamped> HistoryBuffer<T> {
    /// Entries with `t >= t_min`, oldest first.
    pub fn window_since(&self, t_min: f64) -> impl Iterator<Item = &T> + '_ {
        self.iter().filter(move |s| s.t() >= t_min)
    }

    /// Entries within the last `span` simulated seconds of the newest sample.
    pub fn window_last(&self, span: f64) -> Vec<&T> {
        match self.latest() {
            Some(last) => {
                let t_min = last.t() - span;
                self.window_since(t_min).collect()
            }
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct S(f64);

    impl Timestamped for S {
        fn t(&self) -> f64 {
            self.0
        }
    }

    #[test]
    fn test_len_never_exceeds_cap() {
        let mut h = HistoryBuffer::new(50);
        for i in 0..1000 {
            h.push(S(i as f64));
            assert!(h.len() <= 50, "len {} exceeded cap at push {}", h.len(), i);
        }
        assert_eq!(h.len(), 50);
    }

    #[test]
    fn test_fifo_eviction_order() {
        let mut h = HistoryBuffer::new(5);
        let mut evicted = Vec::new();
        for i in 0..12 {
            if let Some(old) = h.push(S(i as f64)) {
                evicted.push(old.0);
            }
            if let (Some(oldest), Some(&last_evicted)) = (h.oldest(), evicted.last()) {
                assert!(oldest.0 >= last_evicted, "oldest retained must not predate evicted");
            }
        }
        assert_eq!(evicted, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let kept: Vec<f64> = h.iter().map(|s| s.0).collect();
        assert_eq!(kept, vec![7.0, 8.0, 9.0, 10.0, 11.0]);
        assert_eq!(h.latest(), Some(&S(11.0)));
    }

    #[test]
    fn test_partial_fill_order() {
        let mut h = HistoryBuffer::new(8);
        for i in 0..3 {
            h.push(S(i as f64));
        }
        let kept: Vec<f64> = h.iter().map(|s| s.0).collect();
        assert_eq!(kept, vec![0.0, 1.0, 2.0]);
        assert_eq!(h.get(3), None);
    }

    #[test]
    fn test_last_n_and_window() {
        let mut h = HistoryBuffer::new(10);
        for i in 0..25 {
            h.push(S(i as f64 * 0.5));
        }
        let last: Vec<f64> = h.last_n(3).map(|s| s.0).collect();
        assert_eq!(last, vec![11.0, 11.5, 12.0]);
        let win: Vec<f64> = h.window_last(1.0).iter().map(|s| s.0).collect();
        assert_eq!(win, vec![11.0, 11.5, 12.0]);
        assert_eq!(h.window_since(100.0).count(), 0);
    }

    #[test]
    fn test_clear() {
        let mut h = HistoryBuffer::new(3);
        for i in 0..7 {
            h.push(S(i as f64));
        }
        h.clear();
        assert!(h.is_empty());
        h.push(S(42.0));
        assert_eq!(h.oldest(), Some(&S(42.0)));
    }

    #[test]
    fn test_zero_capacity_raised() {
        let mut h = HistoryBuffer::new(0);
        h.push(S(1.0));
        h.push(S(2.0));
        assert_eq!(h.len(), 1);
        assert_eq!(h.latest(), Some(&S(2.0)));
    }
}
