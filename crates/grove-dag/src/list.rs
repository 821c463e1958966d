//! Arena-backed doubly linked list with stable handles.
//!
//! Nodes are never removed, so a [`Handle`] stays valid for the life of the
//! list and insertion next to a known handle is O(1).

/// Position of a node in an [`AncestryList`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Handle(usize);

#[derive(Debug)]
struct Node<T> {
    value: T,
    prev: Option<usize>,
    next: Option<usize>,
}

/// An insertion-ordered list supporting O(1) insert after any handle.
#[derive(Debug)]
pub struct AncestryList<T> {
    nodes: Vec<Node<T>>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl<T> Default for AncestryList<T> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            head: None,
            tail: None,
        }
    }
}

impl<T> AncestryList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Append at the tail.
    pub fn push_back(&mut self, value: T) -> Handle {
        let idx = self.nodes.len();
        self.nodes.push(Node {
            value,
            prev: self.tail,
            next: None,
        });
        match self.tail {
            Some(tail) => self.nodes[tail].next = Some(idx),
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
        Handle(idx)
    }

    /// Insert directly after `at`.
    pub fn insert_after(&mut self, at: Handle, value: T) -> Handle {
        let idx = self.nodes.len();
        let next = self.nodes[at.0].next;
        self.nodes.push(Node {
            value,
            prev: Some(at.0),
            next,
        });
        self.nodes[at.0].next = Some(idx);
        match next {
            Some(n) => self.nodes[n].prev = Some(idx),
            None => self.tail = Some(idx),
        }
        Handle(idx)
    }

    pub fn get(&self, at: Handle) -> &T {
        &self.nodes[at.0].value
    }

    pub fn next(&self, at: Handle) -> Option<Handle> {
        self.nodes[at.0].next.map(Handle)
    }

    pub fn prev(&self, at: Handle) -> Option<Handle> {
        self.nodes[at.0].prev.map(Handle)
    }

    pub fn front(&self) -> Option<Handle> {
        self.head.map(Handle)
    }

    pub fn back(&self) -> Option<Handle> {
        self.tail.map(Handle)
    }

    /// Values from head to tail.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        std::iter::successors(self.head, |&i| self.nodes[i].next).map(|i| &self.nodes[i].value)
    }

    /// Consume the list into a `Vec` in list order.
    pub fn into_vec(self) -> Vec<T> {
        let order: Vec<usize> = std::iter::successors(self.head, |&i| self.nodes[i].next).collect();
        let mut slots: Vec<Option<T>> = self.nodes.into_iter().map(|n| Some(n.value)).collect();
        order.into_iter().filter_map(|i| slots[i].take()).collect()
    }
}
