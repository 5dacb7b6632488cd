use std::{fmt, mem};

/// Stable reference to a value pushed into a [`WaitQueue`].
///
/// Handles carry the generation of the push that created them, so a handle
/// whose value was removed never matches again, even once its slot is reused.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Handle {
    index: usize,
    generation: u64,
}

enum Slot<T> {
    Linked {
        value: T,
        generation: u64,
        prev: Option<usize>,
        next: Option<usize>,
    },
    Free {
        next_free: Option<usize>,
    },
}

/// A FIFO of waiters backed by an arena of slots.
///
/// Slots are linked both ways by index which gives O(1) `push_back`,
/// `pop_front` and removal of an arbitrary entry by [`Handle`].
pub struct WaitQueue<T> {
    slots: Vec<Slot<T>>,
    head: Option<usize>,
    tail: Option<usize>,
    free: Option<usize>,
    len: usize,
    generation: u64,
}

impl<T> Default for WaitQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for WaitQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T> WaitQueue<T> {
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            head: None,
            tail: None,
            free: None,
            len: 0,
            generation: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn push_back(&mut self, value: T) -> Handle {
        self.generation += 1;
        let generation = self.generation;
        let slot = Slot::Linked {
            value,
            generation,
            prev: self.tail,
            next: None,
        };

        let index = match self.free {
            Some(index) => {
                let old = mem::replace(&mut self.slots[index], slot);
                self.free = match old {
                    Slot::Free { next_free } => next_free,
                    Slot::Linked { .. } => unreachable!("free list points at a linked slot"),
                };
                index
            }
            None => {
                self.slots.push(slot);
                self.slots.len() - 1
            }
        };

        match self.tail {
            Some(tail) => self.set_next(tail, Some(index)),
            None => self.head = Some(index),
        }
        self.tail = Some(index);
        self.len += 1;

        Handle { index, generation }
    }

    pub fn front(&self) -> Option<&T> {
        self.head.and_then(|index| self.value_at(index))
    }

    pub fn pop_front(&mut self) -> Option<T> {
        let head = self.head?;
        Some(self.unlink(head))
    }

    /// Removes the value behind `handle`, or returns `None` if it already left.
    pub fn remove(&mut self, handle: Handle) -> Option<T> {
        if self.contains(handle) {
            Some(self.unlink(handle.index))
        } else {
            None
        }
    }

    pub fn contains(&self, handle: Handle) -> bool {
        match self.slots.get(handle.index) {
            Some(Slot::Linked { generation, .. }) => *generation == handle.generation,
            _ => false,
        }
    }

    #[inline]
    pub fn is_head(&self, handle: Handle) -> bool {
        self.head == Some(handle.index) && self.contains(handle)
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            queue: self,
            cursor: self.head,
        }
    }

    fn value_at(&self, index: usize) -> Option<&T> {
        match &self.slots[index] {
            Slot::Linked { value, .. } => Some(value),
            Slot::Free { .. } => None,
        }
    }

    fn set_next(&mut self, index: usize, new_next: Option<usize>) {
        if let Slot::Linked { next, .. } = &mut self.slots[index] {
            *next = new_next;
        }
    }

    fn set_prev(&mut self, index: usize, new_prev: Option<usize>) {
        if let Slot::Linked { prev, .. } = &mut self.slots[index] {
            *prev = new_prev;
        }
    }

    fn unlink(&mut self, index: usize) -> T {
        let free = Slot::Free {
            next_free: self.free,
        };

        let (value, prev, next) = match mem::replace(&mut self.slots[index], free) {
            Slot::Linked {
                value, prev, next, ..
            } => (value, prev, next),
            Slot::Free { .. } => unreachable!("unlinking a free slot"),
        };

        match prev {
            Some(prev) => self.set_next(prev, next),
            None => self.head = next,
        }
        match next {
            Some(next) => self.set_prev(next, prev),
            None => self.tail = prev,
        }

        self.free = Some(index);
        self.len -= 1;
        value
    }
}

pub struct Iter<'a, T> {
    queue: &'a WaitQueue<T>,
    cursor: Option<usize>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.cursor?;
        match &self.queue.slots[index] {
            Slot::Linked { value, next, .. } => {
                self.cursor = *next;
                Some(value)
            }
            Slot::Free { .. } => None,
        }
    }
}
