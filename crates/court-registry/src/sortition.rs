//! # Sortition Tree
//!
//! Fenwick (binary indexed) tree over slot weights. Slots are appended and
//! never removed; a juror leaving the pool keeps a zero-weight slot, which
//! the search skips naturally.
//!
//! Callers bound the total weight; the tree itself does unchecked `u128`
//! arithmetic on values that sum below that bound.

/// Cumulative-weight index for weighted sampling.
#[derive(Debug, Clone, Default)]
pub struct SortitionTree {
    values: Vec<u128>,
    /// 1-indexed Fenwick nodes; `nodes[0]` is unused.
    nodes: Vec<u128>,
}

fn lowbit(i: usize) -> usize {
    i & i.wrapping_neg()
}

impl SortitionTree {
    pub fn new() -> Self {
        Self {
            values: Vec::new(),
            nodes: vec![0],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Append a slot and return its index.
    pub fn push(&mut self, value: u128) -> usize {
        let i = self.values.len() + 1;
        // A new node covers (i - lowbit(i), i].
        let covered = self.prefix(i - 1) - self.prefix(i - lowbit(i));
        self.values.push(value);
        self.nodes.push(covered + value);
        i - 1
    }

    pub fn get(&self, index: usize) -> Option<u128> {
        self.values.get(index).copied()
    }

    /// Overwrite the weight of `index`. Returns `false` for unknown slots.
    pub fn set(&mut self, index: usize, value: u128) -> bool {
        let Some(old) = self.values.get(index).copied() else {
            return false;
        };
        self.values[index] = value;
        let mut i = index + 1;
        if value >= old {
            let delta = value - old;
            while i < self.nodes.len() {
                self.nodes[i] += delta;
                i += lowbit(i);
            }
        } else {
            let delta = old - value;
            while i < self.nodes.len() {
                self.nodes[i] -= delta;
                i += lowbit(i);
            }
        }
        true
    }

    /// Sum of all weights.
    pub fn total(&self) -> u128 {
        self.prefix(self.values.len())
    }

    /// Sum of the first `count` slots.
    pub fn prefix(&self, count: usize) -> u128 {
        let mut i = count.min(self.values.len());
        let mut sum = 0;
        while i > 0 {
            sum += self.nodes[i];
            i -= lowbit(i);
        }
        sum
    }

    /// The slot owning cumulative `position`: the first index whose running
    /// sum exceeds it. `None` when `position >= total()`.
    pub fn find(&self, position: u128) -> Option<usize> {
        let n = self.values.len();
        if n == 0 {
            return None;
        }
        let mut idx = 0;
        let mut remaining = position;
        let mut step = 1usize << (usize::BITS - 1 - n.leading_zeros());
        while step > 0 {
            let next = idx + step;
            if next <= n && self.nodes[next] <= remaining {
                idx = next;
                remaining -= self.nodes[next];
            }
            step >>= 1;
        }
        (idx < n).then_some(idx)
    }
}
