// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Event priority queue.
//
// Two storage strategies share one handle type:
//   SortArray: keys inserted before init() are bulk-sorted once, then popped
//              from the end of an indirection array.
//   Heap:      a 1-based binary min-heap with a handle table and free list,
//              used for every insertion after init().
// PriorityQueue combines them; extract_min compares both minima.
//
// Keys are opaque Copy values; the ordering is supplied per call as a
// `leq(a, b)` closure, since vertex order depends on mesh coordinates.

use rand::Rng;

/// Handle returned by insert, used for O(log n) deletion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PqHandle {
    /// Slot in the heap's handle table.
    Heap(u32),
    /// Slot in the pre-init sort array.
    Sorted(u32),
}

/// Partitions at or below this length are finished with insertion sort.
pub const INSERTION_SORT_CUTOFF: usize = 10;

// ─────────────────────────────── Heap ────────────────────────────────────────

#[derive(Clone, Debug)]
struct HeapSlot<K> {
    key: Option<K>,
    /// Heap position when live, next free slot when on the free list.
    node: usize,
}

/// Binary min-heap with stable handles.
#[derive(Clone, Debug)]
pub struct Heap<K> {
    /// nodes[1..=size] hold handle slots; nodes[0] is unused.
    nodes: Vec<usize>,
    handles: Vec<HeapSlot<K>>,
    size: usize,
    free_list: Option<usize>,
    initialized: bool,
}

impl<K: Copy> Default for Heap<K> {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl<K: Copy> Heap<K> {
    pub fn with_capacity(capacity: usize) -> Self {
        let mut nodes = Vec::with_capacity(capacity + 1);
        nodes.push(0);
        Heap {
            nodes,
            handles: Vec::with_capacity(capacity),
            size: 0,
            free_list: None,
            initialized: false,
        }
    }

    #[inline]
    fn key_at(&self, pos: usize) -> K {
        match self.handles[self.nodes[pos]].key {
            Some(k) => k,
            None => unreachable!("heap node {pos} refers to a freed handle"),
        }
    }

    #[inline]
    fn place(&mut self, pos: usize, h: usize) {
        self.nodes[pos] = h;
        self.handles[h].node = pos;
    }

    fn float_down<F: Fn(K, K) -> bool>(&mut self, mut curr: usize, leq: &F) {
        let h_curr = self.nodes[curr];
        let k_curr = self.key_at(curr);
        loop {
            let mut child = curr << 1;
            if child > self.size {
                break;
            }
            if child < self.size && leq(self.key_at(child + 1), self.key_at(child)) {
                child += 1;
            }
            if leq(k_curr, self.key_at(child)) {
                break;
            }
            let h_child = self.nodes[child];
            self.place(curr, h_child);
            curr = child;
        }
        self.place(curr, h_curr);
    }

    fn float_up<F: Fn(K, K) -> bool>(&mut self, mut curr: usize, leq: &F) {
        let h_curr = self.nodes[curr];
        let k_curr = self.key_at(curr);
        loop {
            let parent = curr >> 1;
            if parent == 0 || leq(self.key_at(parent), k_curr) {
                break;
            }
            let h_parent = self.nodes[parent];
            self.place(curr, h_parent);
            curr = parent;
        }
        self.place(curr, h_curr);
    }

    /// Establishes the heap property over everything inserted so far.
    pub fn init<F: Fn(K, K) -> bool>(&mut self, leq: &F) {
        for i in (1..=self.size).rev() {
            self.float_down(i, leq);
        }
        self.initialized = true;
    }

    pub fn insert<F: Fn(K, K) -> bool>(&mut self, key: K, leq: &F) -> u32 {
        self.size += 1;
        let curr = self.size;
        if self.nodes.len() <= curr {
            self.nodes.push(0);
        }

        let h = match self.free_list {
            Some(f) => {
                self.free_list = if self.handles[f].node == usize::MAX {
                    None
                } else {
                    Some(self.handles[f].node)
                };
                self.handles[f] = HeapSlot { key: Some(key), node: curr };
                f
            }
            None => {
                self.handles.push(HeapSlot { key: Some(key), node: curr });
                self.handles.len() - 1
            }
        };
        self.nodes[curr] = h;

        if self.initialized {
            self.float_up(curr, leq);
        }
        h as u32
    }

    #[inline]
    pub fn minimum(&self) -> Option<K> {
        if self.size == 0 {
            None
        } else {
            self.handles[self.nodes[1]].key
        }
    }

    fn release(&mut self, h: usize) {
        self.handles[h].key = None;
        self.handles[h].node = self.free_list.unwrap_or(usize::MAX);
        self.free_list = Some(h);
    }

    pub fn extract_min<F: Fn(K, K) -> bool>(&mut self, leq: &F) -> Option<K> {
        if self.size == 0 {
            return None;
        }
        let h_min = self.nodes[1];
        let min = self.handles[h_min].key;

        let h_last = self.nodes[self.size];
        self.place(1, h_last);
        self.release(h_min);

        self.size -= 1;
        if self.size > 0 {
            self.float_down(1, leq);
        }
        min
    }

    pub fn delete<F: Fn(K, K) -> bool>(&mut self, handle: u32, leq: &F) {
        let h = handle as usize;
        debug_assert!(self.handles[h].key.is_some(), "heap handle {h} already deleted");
        let curr = self.handles[h].node;

        let h_last = self.nodes[self.size];
        self.place(curr, h_last);
        self.size -= 1;

        if curr <= self.size {
            if curr <= 1 || leq(self.key_at(curr >> 1), self.key_at(curr)) {
                self.float_down(curr, leq);
            } else {
                self.float_up(curr, leq);
            }
        }
        self.release(h);
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }
}

// ───────────────────────────── Sort array ────────────────────────────────────

/// Keys collected before the sweep starts, sorted in bulk once.
#[derive(Clone, Debug)]
pub struct SortArray<K> {
    /// Deleted keys become None.
    keys: Vec<Option<K>>,
    /// Indices into `keys`, sorted descending so the minimum is at the end.
    order: Vec<usize>,
    /// Live prefix length of `order`.
    size: usize,
    initialized: bool,
}

impl<K: Copy> Default for SortArray<K> {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl<K: Copy> SortArray<K> {
    pub fn with_capacity(capacity: usize) -> Self {
        SortArray {
            keys: Vec::with_capacity(capacity),
            order: Vec::new(),
            size: 0,
            initialized: false,
        }
    }

    /// Appends a key. Only valid before init(); storage grows by doubling.
    pub fn insert(&mut self, key: K) -> u32 {
        debug_assert!(!self.initialized, "sort array is frozen after init");
        if self.keys.len() == self.keys.capacity() {
            self.keys.reserve(self.keys.len().max(16));
        }
        self.keys.push(Some(key));
        self.size = self.keys.len();
        (self.keys.len() - 1) as u32
    }

    /// Sorts the keys with a randomized quicksort using an explicit stack,
    /// finishing small partitions with insertion sort.
    pub fn init<F, R>(&mut self, rng: &mut R, leq: &F)
    where
        F: Fn(K, K) -> bool,
        R: Rng + ?Sized,
    {
        let keys = &self.keys;
        let key = |i: usize| match keys[i] {
            Some(k) => k,
            None => unreachable!("sort array slot {i} is not live"),
        };
        // gt(a, b): a sorts before b in descending order.
        let gt = |a: usize, b: usize| !leq(key(a), key(b));
        let lt = |a: usize, b: usize| !leq(key(b), key(a));

        // Keys deleted before init never enter the order.
        let mut order: Vec<usize> = (0..keys.len()).filter(|&i| keys[i].is_some()).collect();
        let mut stack: Vec<(isize, isize)> = Vec::new();
        if !order.is_empty() {
            stack.push((0, order.len() as isize - 1));
        }

        while let Some((mut p, mut r)) = stack.pop() {
            while (r - p + 1) as usize > INSERTION_SORT_CUTOFF {
                let pick = rng.gen_range(p..=r);
                order.swap(pick as usize, p as usize);
                let piv = order[p as usize];

                let mut i = p - 1;
                let mut j = r + 1;
                loop {
                    loop {
                        i += 1;
                        if !gt(order[i as usize], piv) {
                            break;
                        }
                    }
                    loop {
                        j -= 1;
                        if !lt(order[j as usize], piv) {
                            break;
                        }
                    }
                    if i >= j {
                        break;
                    }
                    order.swap(i as usize, j as usize);
                }
                // Hoare partition: [p, j] and [j+1, r]. Push the larger half,
                // keep working on the smaller one.
                if j - p < r - j {
                    stack.push((j + 1, r));
                    r = j;
                } else {
                    stack.push((p, j));
                    p = j + 1;
                }
            }

            for i in (p + 1)..=r {
                let piv = order[i as usize];
                let mut j = i;
                while j > p && lt(order[(j - 1) as usize], piv) {
                    order[j as usize] = order[(j - 1) as usize];
                    j -= 1;
                }
                order[j as usize] = piv;
            }
        }

        self.order = order;
        self.size = self.order.len();
        self.initialized = true;
        self.trim();
    }

    fn trim(&mut self) {
        while self.size > 0 && self.keys[self.order[self.size - 1]].is_none() {
            self.size -= 1;
        }
    }

    #[inline]
    pub fn minimum(&self) -> Option<K> {
        if self.size == 0 {
            None
        } else {
            self.keys[self.order[self.size - 1]]
        }
    }

    pub fn extract_min(&mut self) -> Option<K> {
        let min = self.minimum()?;
        self.size -= 1;
        self.trim();
        Some(min)
    }

    pub fn delete(&mut self, slot: u32) {
        let slot = slot as usize;
        debug_assert!(self.keys[slot].is_some(), "sort array slot {slot} already deleted");
        self.keys[slot] = None;
        if self.initialized {
            self.trim();
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        if self.initialized {
            self.size == 0
        } else {
            self.keys.iter().all(Option::is_none)
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        if self.initialized {
            self.order[..self.size].iter().filter(|&&i| self.keys[i].is_some()).count()
        } else {
            self.keys.iter().filter(|k| k.is_some()).count()
        }
    }
}

// ──────────────────────────── Hybrid queue ───────────────────────────────────

/// Sort array for the initial bulk load, heap for everything after.
#[derive(Clone, Debug)]
pub struct PriorityQueue<K> {
    heap: Heap<K>,
    sorted: SortArray<K>,
    initialized: bool,
}

impl<K: Copy> Default for PriorityQueue<K> {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl<K: Copy> PriorityQueue<K> {
    pub fn with_capacity(capacity: usize) -> Self {
        PriorityQueue {
            heap: Heap::with_capacity(capacity),
            sorted: SortArray::with_capacity(capacity),
            initialized: false,
        }
    }

    /// Inserts into the sort array before init(), into the heap after.
    pub fn insert<F: Fn(K, K) -> bool>(&mut self, key: K, leq: &F) -> PqHandle {
        if self.initialized {
            PqHandle::Heap(self.heap.insert(key, leq))
        } else {
            PqHandle::Sorted(self.sorted.insert(key))
        }
    }

    /// Bulk-sorts the pre-init keys. Call once, before any extraction.
    pub fn init<F, R>(&mut self, rng: &mut R, leq: &F)
    where
        F: Fn(K, K) -> bool,
        R: Rng + ?Sized,
    {
        self.sorted.init(rng, leq);
        self.heap.init(leq);
        self.initialized = true;
    }

    pub fn minimum<F: Fn(K, K) -> bool>(&self, leq: &F) -> Option<K> {
        match (self.sorted.minimum(), self.heap.minimum()) {
            (None, h) => h,
            (s, None) => s,
            (Some(s), Some(h)) => Some(if leq(h, s) { h } else { s }),
        }
    }

    pub fn extract_min<F: Fn(K, K) -> bool>(&mut self, leq: &F) -> Option<K> {
        match (self.sorted.minimum(), self.heap.minimum()) {
            (None, _) => self.heap.extract_min(leq),
            (Some(s), Some(h)) if leq(h, s) => self.heap.extract_min(leq),
            (Some(_), _) => self.sorted.extract_min(),
        }
    }

    pub fn delete<F: Fn(K, K) -> bool>(&mut self, handle: PqHandle, leq: &F) {
        match handle {
            PqHandle::Heap(h) => self.heap.delete(h, leq),
            PqHandle::Sorted(s) => self.sorted.delete(s),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty() && self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sorted.len() + self.heap.len()
    }
}
