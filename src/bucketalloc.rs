// Copyright 2025 Lars Brubaker
// License: SGI Free Software License B (MIT-compatible)
//
// Slot arena with a free list. The sweep allocates and frees active regions
// at a high rate; slots are recycled so indices stay small and stable.

use std::ops::{Index, IndexMut};

pub struct BucketAlloc<T> {
    items: Vec<Option<T>>,
    free_list: Vec<u32>,
}

impl<T> BucketAlloc<T> {
    pub fn new() -> Self {
        Self { items: Vec::new(), free_list: Vec::new() }
    }

    /// Stores `item`, reusing a freed slot if there is one.
    pub fn alloc(&mut self, item: T) -> u32 {
        match self.free_list.pop() {
            Some(idx) => {
                self.items[idx as usize] = Some(item);
                idx
            }
            None => {
                self.items.push(Some(item));
                (self.items.len() - 1) as u32
            }
        }
    }

    /// Releases a slot, returning what it held.
    pub fn free(&mut self, idx: u32) -> Option<T> {
        let item = self.items.get_mut(idx as usize)?.take();
        if item.is_some() {
            self.free_list.push(idx);
        }
        item
    }

    pub fn get(&self, idx: u32) -> Option<&T> {
        self.items.get(idx as usize)?.as_ref()
    }

    pub fn get_mut(&mut self, idx: u32) -> Option<&mut T> {
        self.items.get_mut(idx as usize)?.as_mut()
    }

    /// Number of occupied slots.
    pub fn live(&self) -> usize {
        self.items.len() - self.free_list.len()
    }
}

impl<T> Default for BucketAlloc<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Index<u32> for BucketAlloc<T> {
    type Output = T;

    fn index(&self, idx: u32) -> &T {
        match self.get(idx) {
            Some(item) => item,
            None => panic!("slot {idx} is not allocated"),
        }
    }
}

impl<T> IndexMut<u32> for BucketAlloc<T> {
    fn index_mut(&mut self, idx: u32) -> &mut T {
        match self.get_mut(idx) {
            Some(item) => item,
            None => panic!("slot {idx} is not allocated"),
        }
    }
}
