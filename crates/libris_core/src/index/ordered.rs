//! Ordered key index (AVL tree) for sorted traversal by numeric key.

use crate::entity::BookId;
use std::cmp::Ordering;

type Link = Option<Box<Node>>;

#[derive(Debug, Clone)]
struct Node {
    key: i64,
    id: BookId,
    height: i32,
    left: Link,
    right: Link,
}

impl Node {
    fn leaf(key: i64, id: BookId) -> Box<Self> {
        Box::new(Self {
            key,
            id,
            height: 1,
            left: None,
            right: None,
        })
    }

    fn update_height(&mut self) {
        self.height = 1 + height(&self.left).max(height(&self.right));
    }

    fn balance_factor(&self) -> i32 {
        height(&self.left) - height(&self.right)
    }
}

fn height(link: &Link) -> i32 {
    link.as_ref().map_or(0, |node| node.height)
}

/// Self-balancing binary search tree mapping numeric keys to book IDs.
///
/// Duplicate keys are ignored: the first insertion wins. There is no
/// delete, so entries for removed books must be filtered by the caller.
#[derive(Debug, Clone, Default)]
pub struct OrderedKeyIndex {
    root: Link,
    len: usize,
}

impl OrderedKeyIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a `(key, id)` pair. Returns false if the key was already
    /// present, in which case the tree is unchanged.
    pub fn insert(&mut self, key: i64, id: BookId) -> bool {
        let mut inserted = false;
        self.root = Some(insert(self.root.take(), key, id, &mut inserted));
        if inserted {
            self.len += 1;
        }
        inserted
    }

    /// Returns all entries in strictly ascending key order.
    #[must_use]
    pub fn in_order(&self) -> Vec<(i64, BookId)> {
        let mut out = Vec::with_capacity(self.len);
        let mut stack: Vec<&Node> = Vec::new();
        let mut current = self.root.as_deref();
        loop {
            while let Some(node) = current {
                stack.push(node);
                current = node.left.as_deref();
            }
            let Some(node) = stack.pop() else {
                break;
            };
            out.push((node.key, node.id.clone()));
            current = node.right.as_deref();
        }
        out
    }

    /// Looks up the book stored under `key`.
    #[must_use]
    pub fn get(&self, key: i64) -> Option<&BookId> {
        let mut current = self.root.as_deref();
        while let Some(node) = current {
            current = match key.cmp(&node.key) {
                Ordering::Less => node.left.as_deref(),
                Ordering::Greater => node.right.as_deref(),
                Ordering::Equal => return Some(&node.id),
            };
        }
        None
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Height of the tree; 0 when empty.
    #[must_use]
    pub fn height(&self) -> i32 {
        height(&self.root)
    }

    /// Checks every node's cached height and balance factor.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        fn check(link: &Link) -> Option<i32> {
            let Some(node) = link else {
                return Some(0);
            };
            let left = check(&node.left)?;
            let right = check(&node.right)?;
            let h = 1 + left.max(right);
            ((left - right).abs() <= 1 && node.height == h).then_some(h)
        }
        check(&self.root).is_some()
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.root = None;
        self.len = 0;
    }
}

fn insert(link: Link, key: i64, id: BookId, inserted: &mut bool) -> Box<Node> {
    let Some(mut node) = link else {
        *inserted = true;
        return Node::leaf(key, id);
    };
    match key.cmp(&node.key) {
        Ordering::Less => node.left = Some(insert(node.left.take(), key, id, inserted)),
        Ordering::Greater => node.right = Some(insert(node.right.take(), key, id, inserted)),
        Ordering::Equal => return node,
    }
    rebalance(node, key)
}

/// Restores the AVL property at `node` after `key` was inserted below it.
fn rebalance(mut node: Box<Node>, key: i64) -> Box<Node> {
    node.update_height();
    let balance = node.balance_factor();

    if balance > 1 {
        let left_key = node.left.as_ref().map_or(key, |left| left.key);
        if key > left_key {
            node.left = node.left.take().map(rotate_left);
        }
        return rotate_right(node);
    }
    if balance < -1 {
        let right_key = node.right.as_ref().map_or(key, |right| right.key);
        if key < right_key {
            node.right = node.right.take().map(rotate_right);
        }
        return rotate_left(node);
    }
    node
}

fn rotate_right(mut node: Box<Node>) -> Box<Node> {
    let Some(mut pivot) = node.left.take() else {
        return node;
    };
    node.left = pivot.right.take();
    node.update_height();
    pivot.right = Some(node);
    pivot.update_height();
    pivot
}

fn rotate_left(mut node: Box<Node>) -> Box<Node> {
    let Some(mut pivot) = node.right.take() else {
        return node;
    };
    node.right = pivot.left.take();
    node.update_height();
    pivot.left = Some(node);
    pivot.update_height();
    pivot
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn id(key: i64) -> BookId {
        BookId::new(format!("b{key}"))
    }

    #[test]
    fn ascending_inserts_stay_balanced() {
        let mut index = OrderedKeyIndex::new();
        for key in 1..=1024 {
            assert!(index.insert(key, id(key)));
        }
        assert!(index.is_balanced());
        assert_eq!(index.height(), 11);
        assert_eq!(index.len(), 1024);
    }

    #[test]
    fn double_rotations() {
        // left-right
        let mut index = OrderedKeyIndex::new();
        for key in [30, 10, 20] {
            index.insert(key, id(key));
        }
        assert!(index.is_balanced());
        assert_eq!(index.height(), 2);

        // right-left
        let mut index = OrderedKeyIndex::new();
        for key in [10, 30, 20] {
            index.insert(key, id(key));
        }
        assert!(index.is_balanced());
        assert_eq!(index.height(), 2);
    }

    #[test]
    fn first_insert_wins() {
        let mut index = OrderedKeyIndex::new();
        assert!(index.insert(5, BookId::new("first")));
        assert!(!index.insert(5, BookId::new("second")));
        assert_eq!(index.len(), 1);
        assert_eq!(index.get(5), Some(&BookId::new("first")));
        assert_eq!(index.get(6), None);
    }

    #[test]
    fn empty_index() {
        let mut index = OrderedKeyIndex::new();
        assert!(index.is_empty());
        assert_eq!(index.height(), 0);
        assert!(index.in_order().is_empty());
        assert!(index.is_balanced());

        index.insert(-3, id(3));
        index.clear();
        assert!(index.is_empty());
    }

    proptest! {
        #[test]
        fn in_order_sorted_and_balanced(keys in prop::collection::vec(-500i64..500, 0..200)) {
            let mut index = OrderedKeyIndex::new();
            for &key in &keys {
                index.insert(key, id(key));
                prop_assert!(index.is_balanced());
            }

            let traversal = index.in_order();
            prop_assert!(traversal.windows(2).all(|w| w[0].0 < w[1].0));

            let mut expected = keys.clone();
            expected.sort_unstable();
            expected.dedup();
            let got: Vec<i64> = traversal.iter().map(|(key, _)| *key).collect();
            prop_assert_eq!(got, expected);
        }
    }
}
