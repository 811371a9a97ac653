// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Sorted doubly-linked list holding the active edge regions, ordered bottom
// to top along the sweep line. The ordering changes as the sweep advances,
// so the comparison is passed in per call instead of stored.

/// Index into Dict::nodes
pub type NodeIdx = u32;

/// Index of the head sentinel node.
pub const DICT_HEAD: NodeIdx = 0;

#[derive(Clone, Debug)]
struct DictNode<K> {
    /// None for the head sentinel and for freed nodes.
    key: Option<K>,
    next: NodeIdx,
    prev: NodeIdx,
}

/// The head sentinel lives at index 0; the list is circular through it.
/// Freed nodes are recycled.
#[derive(Clone, Debug)]
pub struct Dict<K> {
    nodes: Vec<DictNode<K>>,
    free: Vec<NodeIdx>,
}

impl<K: Copy> Dict<K> {
    pub fn new() -> Self {
        Dict {
            nodes: vec![DictNode { key: None, next: DICT_HEAD, prev: DICT_HEAD }],
            free: Vec::new(),
        }
    }

    /// Inserts `key` in order, searching backward from the top.
    pub fn insert<F>(&mut self, key: K, leq: &F) -> NodeIdx
    where
        F: Fn(K, K) -> bool,
    {
        self.insert_before(DICT_HEAD, key, leq)
    }

    /// Inserts `key` below `node`, walking downward until a node whose key is
    /// `leq` the new key.
    pub fn insert_before<F>(&mut self, mut node: NodeIdx, key: K, leq: &F) -> NodeIdx
    where
        F: Fn(K, K) -> bool,
    {
        loop {
            node = self.nodes[node as usize].prev;
            match self.nodes[node as usize].key {
                None => break,
                Some(k) if leq(k, key) => break,
                Some(_) => {}
            }
        }

        let next = self.nodes[node as usize].next;
        let fresh = DictNode { key: Some(key), next, prev: node };
        let idx = match self.free.pop() {
            Some(i) => {
                self.nodes[i as usize] = fresh;
                i
            }
            None => {
                self.nodes.push(fresh);
                (self.nodes.len() - 1) as NodeIdx
            }
        };
        self.nodes[node as usize].next = idx;
        self.nodes[next as usize].prev = idx;
        idx
    }

    pub fn delete(&mut self, node: NodeIdx) {
        debug_assert!(node != DICT_HEAD, "cannot delete the dictionary head");
        let DictNode { next, prev, .. } = self.nodes[node as usize];
        self.nodes[next as usize].prev = prev;
        self.nodes[prev as usize].next = next;
        self.nodes[node as usize].key = None;
        self.free.push(node);
    }

    /// Returns the lowest node for which `at_or_above(key)` holds, or
    /// DICT_HEAD if there is none.
    pub fn search<P>(&self, at_or_above: P) -> NodeIdx
    where
        P: Fn(K) -> bool,
    {
        let mut node = DICT_HEAD;
        loop {
            node = self.nodes[node as usize].next;
            match self.nodes[node as usize].key {
                None => return node,
                Some(k) if at_or_above(k) => return node,
                Some(_) => {}
            }
        }
    }

    #[inline]
    pub fn key(&self, node: NodeIdx) -> Option<K> {
        self.nodes[node as usize].key
    }

    #[inline]
    pub fn min(&self) -> NodeIdx {
        self.nodes[DICT_HEAD as usize].next
    }

    #[inline]
    pub fn max(&self) -> NodeIdx {
        self.nodes[DICT_HEAD as usize].prev
    }

    #[inline]
    pub fn succ(&self, node: NodeIdx) -> NodeIdx {
        self.nodes[node as usize].next
    }

    #[inline]
    pub fn pred(&self, node: NodeIdx) -> NodeIdx {
        self.nodes[node as usize].prev
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min() == DICT_HEAD
    }
}

impl<K: Copy> Default for Dict<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leq(a: u32, b: u32) -> bool {
        a <= b
    }

    fn keys(d: &Dict<u32>) -> Vec<u32> {
        let mut out = Vec::new();
        let mut n = d.min();
        while let Some(k) = d.key(n) {
            out.push(k);
            n = d.succ(n);
        }
        out
    }

    #[test]
    fn empty_dict() {
        let d: Dict<u32> = Dict::new();
        assert_eq!(d.min(), DICT_HEAD);
        assert_eq!(d.max(), DICT_HEAD);
        assert!(d.is_empty());
    }

    #[test]
    fn insert_keeps_order() {
        let mut d = Dict::new();
        d.insert(3, &leq);
        d.insert(1, &leq);
        d.insert(2, &leq);
        assert_eq!(keys(&d), vec![1, 2, 3]);
        assert_eq!(d.key(d.max()), Some(3));
    }

    #[test]
    fn insert_before_walks_down_from_hint() {
        let mut d = Dict::new();
        d.insert(10, &leq);
        let top = d.insert(30, &leq);
        d.insert_before(top, 20, &leq);
        d.insert_before(top, 5, &leq);
        assert_eq!(keys(&d), vec![5, 10, 20, 30]);
    }

    #[test]
    fn delete_recycles_nodes() {
        let mut d = Dict::new();
        d.insert(1, &leq);
        let n2 = d.insert(2, &leq);
        d.insert(3, &leq);
        d.delete(n2);
        assert_eq!(keys(&d), vec![1, 3]);
        let again = d.insert(2, &leq);
        assert_eq!(again, n2);
        assert_eq!(keys(&d), vec![1, 2, 3]);
    }

    #[test]
    fn search_finds_first_at_or_above() {
        let mut d = Dict::new();
        d.insert(1, &leq);
        d.insert(3, &leq);
        d.insert(5, &leq);

        assert_eq!(d.key(d.search(|k| 2 <= k)), Some(3));
        assert_eq!(d.key(d.search(|k| 3 <= k)), Some(3));
        assert_eq!(d.search(|k| 6 <= k), DICT_HEAD);
    }
}
