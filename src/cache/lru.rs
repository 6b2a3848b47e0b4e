//! LRU List Module
//!
//! Implements the recency ordering used for cache eviction.

// == Node Handle ==
/// Stable handle to a node in an [`LruList`].
///
/// A handle stays valid until its node is removed; the slot may then be
/// reused by a later insertion, so callers must drop handles on removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug)]
struct Node<T> {
    item: T,
    prev: Option<usize>,
    next: Option<usize>,
}

// == LRU List ==
/// Doubly-linked recency list stored in an arena of slots.
///
/// - Front = Most recently used
/// - Back = Least recently used
///
/// Nodes link to each other by slot index and the arena owns every node,
/// so moving an entry to the front or unlinking it is O(1).
#[derive(Debug)]
pub struct LruList<T> {
    slots: Vec<Option<Node<T>>>,
    /// Vacant slot indices available for reuse
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl<T> LruList<T> {
    // == Constructor ==
    /// Creates a new empty list.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty list with room for `capacity` nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    // == Length ==
    /// Returns the number of linked nodes.
    pub fn len(&self) -> usize {
        self.len
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    // == Push Front ==
    /// Inserts an item as the most recently used and returns its handle.
    pub fn push_front(&mut self, item: T) -> NodeId {
        let node = Node {
            item,
            prev: None,
            next: None,
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(node);
                idx
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };
        self.link_front(idx);
        self.len += 1;
        NodeId(idx)
    }

    // == Move To Front ==
    /// Marks a node as most recently used.
    ///
    /// Returns false if the handle does not refer to a live node.
    pub fn move_to_front(&mut self, id: NodeId) -> bool {
        if self.node(id.0).is_none() {
            return false;
        }
        if self.head != Some(id.0) {
            self.unlink(id.0);
            self.link_front(id.0);
        }
        true
    }

    // == Remove ==
    /// Unlinks a node and returns its item.
    pub fn remove(&mut self, id: NodeId) -> Option<T> {
        self.node(id.0)?;
        self.unlink(id.0);
        let node = self.slots.get_mut(id.0)?.take()?;
        self.free.push(id.0);
        self.len -= 1;
        Some(node.item)
    }

    // == Pop Back ==
    /// Removes and returns the least recently used item.
    pub fn pop_back(&mut self) -> Option<T> {
        let tail = self.tail?;
        self.remove(NodeId(tail))
    }

    // == Peek ==
    /// Returns the least recently used item without removing it.
    pub fn back(&self) -> Option<&T> {
        self.tail.and_then(|idx| self.node(idx)).map(|node| &node.item)
    }

    /// Returns the most recently used item.
    pub fn front(&self) -> Option<&T> {
        self.head.and_then(|idx| self.node(idx)).map(|node| &node.item)
    }

    // == Access ==
    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.node(id.0).map(|node| &node.item)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        self.node_mut(id.0).map(|node| &mut node.item)
    }

    // == Iteration ==
    /// Iterates from least to most recently used.
    pub fn iter_lru(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            cursor: self.tail,
            direction: Direction::TowardsFront,
            remaining: self.len,
        }
    }

    /// Iterates from most to least recently used.
    pub fn iter_mru(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            cursor: self.head,
            direction: Direction::TowardsBack,
            remaining: self.len,
        }
    }

    // == Drain ==
    /// Removes every item, returning them from least to most recently used.
    pub fn drain_lru(&mut self) -> Vec<T> {
        let mut items = Vec::with_capacity(self.len);
        while let Some(item) = self.pop_back() {
            items.push(item);
        }
        self.clear();
        items
    }

    // == Clear ==
    /// Drops every node and releases the arena.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    // == Internal Linking ==
    fn node(&self, idx: usize) -> Option<&Node<T>> {
        self.slots.get(idx).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, idx: usize) -> Option<&mut Node<T>> {
        self.slots.get_mut(idx).and_then(Option::as_mut)
    }

    /// Detaches a live node from its neighbours; the slot stays occupied.
    fn unlink(&mut self, idx: usize) {
        let Some((prev, next)) = self.node(idx).map(|node| (node.prev, node.next)) else {
            return;
        };

        match prev.and_then(|p| self.node_mut(p)) {
            Some(prev_node) => prev_node.next = next,
            None => self.head = next,
        }
        match next.and_then(|n| self.node_mut(n)) {
            Some(next_node) => next_node.prev = prev,
            None => self.tail = prev,
        }

        if let Some(node) = self.node_mut(idx) {
            node.prev = None;
            node.next = None;
        }
    }

    fn link_front(&mut self, idx: usize) {
        let old_head = self.head;
        if let Some(node) = self.node_mut(idx) {
            node.prev = None;
            node.next = old_head;
        }
        if let Some(head_node) = old_head.and_then(|h| self.node_mut(h)) {
            head_node.prev = Some(idx);
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }
}

impl<T> Default for LruList<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    TowardsFront,
    TowardsBack,
}

// == Iterator ==
/// Borrowing iterator over an [`LruList`].
pub struct Iter<'a, T> {
    list: &'a LruList<T>,
    cursor: Option<usize>,
    direction: Direction,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.list.node(self.cursor?)?;
        self.cursor = match self.direction {
            Direction::TowardsFront => node.prev,
            Direction::TowardsBack => node.next,
        };
        self.remaining = self.remaining.saturating_sub(1);
        Some(&node.item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}
