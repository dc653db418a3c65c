//! Index-based red-black tree over a `Pcb` arena.
//!
//! A classic CLRS red-black tree (insert with fixup, transplant-based
//! delete with fixup) adapted so that every "pointer" is an
//! `Option<usize>` index into the arena slice passed to each method,
//! rather than a heap pointer. `None` plays the role of the sentinel nil
//! leaf, which CLRS colors black; we treat a missing node as black
//! wherever a color read is needed instead of allocating a real sentinel
//! node.
//!
//! The tree never owns the arena: every method takes `&[Pcb]` (or a
//! comparison key function) and mutates only through `Pcb::tree`'s
//! interior `Mutex<TreeLink>`. This lets a single arena be shared by the
//! ready queue, the CFS runqueue and the scheduler loop without any
//! borrow-checker contortions.

use crate::pcb::{Color, Pcb};

/// An intrusive red-black tree keyed by a caller-supplied ordering over
/// arena indices. `Key` is typically `i64` (vruntime).
pub struct RbTree {
    root: Option<usize>,
    count: usize,
}

impl RbTree {
    pub fn new() -> Self {
        Self { root: None, count: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    fn color_of(&self, arena: &[Pcb], node: Option<usize>) -> Color {
        match node {
            None => Color::Black,
            Some(i) => arena[i].tree.lock().unwrap().color,
        }
    }

    fn set_color(&self, arena: &[Pcb], node: Option<usize>, color: Color) {
        if let Some(i) = node {
            arena[i].tree.lock().unwrap().color = color;
        }
    }

    fn parent_of(&self, arena: &[Pcb], node: Option<usize>) -> Option<usize> {
        node.and_then(|i| arena[i].tree.lock().unwrap().parent)
    }

    fn left_of(&self, arena: &[Pcb], node: Option<usize>) -> Option<usize> {
        node.and_then(|i| arena[i].tree.lock().unwrap().left)
    }

    fn right_of(&self, arena: &[Pcb], node: Option<usize>) -> Option<usize> {
        node.and_then(|i| arena[i].tree.lock().unwrap().right)
    }

    fn set_parent(&self, arena: &[Pcb], node: Option<usize>, parent: Option<usize>) {
        if let Some(i) = node {
            arena[i].tree.lock().unwrap().parent = parent;
        }
    }

    fn set_left(&self, arena: &[Pcb], node: Option<usize>, left: Option<usize>) {
        if let Some(i) = node {
            arena[i].tree.lock().unwrap().left = left;
        }
    }

    fn set_right(&self, arena: &[Pcb], node: Option<usize>, right: Option<usize>) {
        if let Some(i) = node {
            arena[i].tree.lock().unwrap().right = right;
        }
    }

    fn left_rotate(&mut self, arena: &[Pcb], x: usize) {
        let y = self.right_of(arena, Some(x)).expect("left_rotate requires a right child");
        let y_left = self.left_of(arena, Some(y));
        self.set_right(arena, Some(x), y_left);
        self.set_parent(arena, y_left, Some(x));

        let x_parent = self.parent_of(arena, Some(x));
        self.set_parent(arena, Some(y), x_parent);
        match x_parent {
            None => self.root = Some(y),
            Some(p) if self.left_of(arena, Some(p)) == Some(x) => self.set_left(arena, Some(p), Some(y)),
            Some(p) => self.set_right(arena, Some(p), Some(y)),
        }
        self.set_left(arena, Some(y), Some(x));
        self.set_parent(arena, Some(x), Some(y));
    }

    fn right_rotate(&mut self, arena: &[Pcb], x: usize) {
        let y = self.left_of(arena, Some(x)).expect("right_rotate requires a left child");
        let y_right = self.right_of(arena, Some(y));
        self.set_left(arena, Some(x), y_right);
        self.set_parent(arena, y_right, Some(x));

        let x_parent = self.parent_of(arena, Some(x));
        self.set_parent(arena, Some(y), x_parent);
        match x_parent {
            None => self.root = Some(y),
            Some(p) if self.right_of(arena, Some(p)) == Some(x) => self.set_right(arena, Some(p), Some(y)),
            Some(p) => self.set_left(arena, Some(p), Some(y)),
        }
        self.set_right(arena, Some(y), Some(x));
        self.set_parent(arena, Some(x), Some(y));
    }

    /// Insert `node` keyed by `key_of(node)`. `key_of` is given an arena
    /// index and must return its ordering key; the tree never computes
    /// keys itself so callers (the CFS runqueue) can key on vruntime
    /// without this module knowing about it.
    pub fn insert(&mut self, arena: &[Pcb], node: usize, key_of: impl Fn(usize) -> i64) {
        {
            let mut link = arena[node].tree.lock().unwrap();
            link.parent = None;
            link.left = None;
            link.right = None;
            link.color = Color::Red;
            link.in_tree = true;
        }

        let mut parent = None;
        let mut cursor = self.root;
        let node_key = key_of(node);
        while let Some(c) = cursor {
            parent = Some(c);
            cursor = if node_key < key_of(c) {
                self.left_of(arena, Some(c))
            } else {
                self.right_of(arena, Some(c))
            };
        }
        self.set_parent(arena, Some(node), parent);
        match parent {
            None => self.root = Some(node),
            Some(p) if node_key < key_of(p) => self.set_left(arena, Some(p), Some(node)),
            Some(p) => self.set_right(arena, Some(p), Some(node)),
        }
        self.count += 1;
        self.insert_fixup(arena, node);
    }

    fn insert_fixup(&mut self, arena: &[Pcb], mut z: usize) {
        while self.color_of(arena, self.parent_of(arena, Some(z))) == Color::Red {
            let parent = self.parent_of(arena, Some(z)).unwrap();
            let grandparent = self.parent_of(arena, Some(parent)).unwrap();
            if Some(parent) == self.left_of(arena, Some(grandparent)) {
                let uncle = self.right_of(arena, Some(grandparent));
                if self.color_of(arena, uncle) == Color::Red {
                    self.set_color(arena, Some(parent), Color::Black);
                    self.set_color(arena, uncle, Color::Black);
                    self.set_color(arena, Some(grandparent), Color::Red);
                    z = grandparent;
                } else {
                    if Some(z) == self.right_of(arena, Some(parent)) {
                        z = parent;
                        self.left_rotate(arena, z);
                    }
                    let parent = self.parent_of(arena, Some(z)).unwrap();
                    let grandparent = self.parent_of(arena, Some(parent)).unwrap();
                    self.set_color(arena, Some(parent), Color::Black);
                    self.set_color(arena, Some(grandparent), Color::Red);
                    self.right_rotate(arena, grandparent);
                }
            } else {
                let uncle = self.left_of(arena, Some(grandparent));
                if self.color_of(arena, uncle) == Color::Red {
                    self.set_color(arena, Some(parent), Color::Black);
                    self.set_color(arena, uncle, Color::Black);
                    self.set_color(arena, Some(grandparent), Color::Red);
                    z = grandparent;
                } else {
                    if Some(z) == self.left_of(arena, Some(parent)) {
                        z = parent;
                        self.right_rotate(arena, z);
                    }
                    let parent = self.parent_of(arena, Some(z)).unwrap();
                    let grandparent = self.parent_of(arena, Some(parent)).unwrap();
                    self.set_color(arena, Some(parent), Color::Black);
                    self.set_color(arena, Some(grandparent), Color::Red);
                    self.left_rotate(arena, grandparent);
                }
            }
        }
        self.set_color(arena, self.root, Color::Black);
    }

    fn transplant(&mut self, arena: &[Pcb], u: usize, v: Option<usize>) {
        let u_parent = self.parent_of(arena, Some(u));
        match u_parent {
            None => self.root = v,
            Some(p) if self.left_of(arena, Some(p)) == Some(u) => self.set_left(arena, Some(p), v),
            Some(p) => self.set_right(arena, Some(p), v),
        }
        self.set_parent(arena, v, u_parent);
    }

    pub fn leftmost(&self, arena: &[Pcb]) -> Option<usize> {
        self.leftmost_from(arena, self.root)
    }

    fn leftmost_from(&self, arena: &[Pcb], mut node: Option<usize>) -> Option<usize> {
        node?;
        loop {
            match self.left_of(arena, node) {
                Some(l) => node = Some(l),
                None => return node,
            }
        }
    }

    /// Walk down from the root comparing `target_key` against `key_of`
    /// at each node, the standard BST search a red-black tree inherits
    /// unchanged from its ordering invariant.
    pub fn search(&self, arena: &[Pcb], target_key: i64, key_of: impl Fn(usize) -> i64) -> Option<usize> {
        let mut cursor = self.root;
        while let Some(c) = cursor {
            let k = key_of(c);
            if target_key == k {
                return Some(c);
            }
            cursor = if target_key < k {
                self.left_of(arena, Some(c))
            } else {
                self.right_of(arena, Some(c))
            };
        }
        None
    }

    pub fn rightmost(&self, arena: &[Pcb]) -> Option<usize> {
        let mut node = self.root?;
        loop {
            match self.right_of(arena, Some(node)) {
                Some(r) => node = r,
                None => return Some(node),
            }
        }
    }

    /// Remove `node` from the tree. `node` must currently be a member.
    pub fn remove(&mut self, arena: &[Pcb], node: usize) {
        let mut y = node;
        let mut y_original_color = self.color_of(arena, Some(y));
        let x;
        let x_parent;

        let left = self.left_of(arena, Some(node));
        let right = self.right_of(arena, Some(node));

        if left.is_none() {
            x = right;
            x_parent = self.parent_of(arena, Some(node));
            self.transplant(arena, node, right);
        } else if right.is_none() {
            x = left;
            x_parent = self.parent_of(arena, Some(node));
            self.transplant(arena, node, left);
        } else {
            y = self.leftmost_from(arena, right).unwrap();
            y_original_color = self.color_of(arena, Some(y));
            x = self.right_of(arena, Some(y));
            if self.parent_of(arena, Some(y)) == Some(node) {
                x_parent = Some(y);
                self.set_parent(arena, x, Some(y));
            } else {
                x_parent = self.parent_of(arena, Some(y));
                self.transplant(arena, y, self.right_of(arena, Some(y)));
                let right = self.right_of(arena, Some(node));
                self.set_right(arena, Some(y), right);
                self.set_parent(arena, right, Some(y));
            }
            self.transplant(arena, node, Some(y));
            let left = self.left_of(arena, Some(node));
            self.set_left(arena, Some(y), left);
            self.set_parent(arena, left, Some(y));
            self.set_color(arena, Some(y), self.color_of(arena, Some(node)));
        }

        {
            let mut link = arena[node].tree.lock().unwrap();
            link.in_tree = false;
            link.parent = None;
            link.left = None;
            link.right = None;
        }
        self.count -= 1;

        if y_original_color == Color::Black {
            self.remove_fixup(arena, x, x_parent);
        }
    }

    fn remove_fixup(&mut self, arena: &[Pcb], mut x: Option<usize>, mut x_parent: Option<usize>) {
        while x != self.root && self.color_of(arena, x) == Color::Black {
            let parent = match x_parent {
                Some(p) => p,
                None => break,
            };
            if x == self.left_of(arena, Some(parent)) {
                let mut w = self.right_of(arena, Some(parent));
                if self.color_of(arena, w) == Color::Red {
                    self.set_color(arena, w, Color::Black);
                    self.set_color(arena, Some(parent), Color::Red);
                    self.left_rotate(arena, parent);
                    w = self.right_of(arena, Some(parent));
                }
                let w_left_black = self.color_of(arena, self.left_of(arena, w)) == Color::Black;
                let w_right_black = self.color_of(arena, self.right_of(arena, w)) == Color::Black;
                if w_left_black && w_right_black {
                    self.set_color(arena, w, Color::Red);
                    x = Some(parent);
                    x_parent = self.parent_of(arena, Some(parent));
                } else {
                    if w_right_black {
                        self.set_color(arena, self.left_of(arena, w), Color::Black);
                        self.set_color(arena, w, Color::Red);
                        if let Some(wi) = w {
                            self.right_rotate(arena, wi);
                        }
                        w = self.right_of(arena, Some(parent));
                    }
                    self.set_color(arena, w, self.color_of(arena, Some(parent)));
                    self.set_color(arena, Some(parent), Color::Black);
                    self.set_color(arena, self.right_of(arena, w), Color::Black);
                    self.left_rotate(arena, parent);
                    x = self.root;
                    x_parent = None;
                }
            } else {
                let mut w = self.left_of(arena, Some(parent));
                if self.color_of(arena, w) == Color::Red {
                    self.set_color(arena, w, Color::Black);
                    self.set_color(arena, Some(parent), Color::Red);
                    self.right_rotate(arena, parent);
                    w = self.left_of(arena, Some(parent));
                }
                let w_right_black = self.color_of(arena, self.right_of(arena, w)) == Color::Black;
                let w_left_black = self.color_of(arena, self.left_of(arena, w)) == Color::Black;
                if w_right_black && w_left_black {
                    self.set_color(arena, w, Color::Red);
                    x = Some(parent);
                    x_parent = self.parent_of(arena, Some(parent));
                } else {
                    if w_left_black {
                        self.set_color(arena, self.right_of(arena, w), Color::Black);
                        self.set_color(arena, w, Color::Red);
                        if let Some(wi) = w {
                            self.left_rotate(arena, wi);
                        }
                        w = self.left_of(arena, Some(parent));
                    }
                    self.set_color(arena, w, self.color_of(arena, Some(parent)));
                    self.set_color(arena, Some(parent), Color::Black);
                    self.set_color(arena, self.left_of(arena, w), Color::Black);
                    self.right_rotate(arena, parent);
                    x = self.root;
                    x_parent = None;
                }
            }
        }
        self.set_color(arena, x, Color::Black);
    }

    pub fn inorder(&self, arena: &[Pcb]) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.count);
        self.inorder_from(arena, self.root, &mut out);
        out
    }

    fn inorder_from(&self, arena: &[Pcb], node: Option<usize>, out: &mut Vec<usize>) {
        if let Some(n) = node {
            self.inorder_from(arena, self.left_of(arena, Some(n)), out);
            out.push(n);
            self.inorder_from(arena, self.right_of(arena, Some(n)), out);
        }
    }

    /// Black height from `node` to any leaf, for invariant checks in
    /// tests. Panics if the subtree is not balanced.
    #[cfg(test)]
    fn black_height(&self, arena: &[Pcb], node: Option<usize>) -> usize {
        match node {
            None => 1,
            Some(n) => {
                let left = self.black_height(arena, self.left_of(arena, Some(n)));
                let right = self.black_height(arena, self.right_of(arena, Some(n)));
                assert_eq!(left, right, "black height mismatch at node {n}");
                let own = if self.color_of(arena, Some(n)) == Color::Black { 1 } else { 0 };
                left + own
            }
        }
    }

    #[cfg(test)]
    fn assert_no_red_red(&self, arena: &[Pcb], node: Option<usize>) {
        if let Some(n) = node {
            if self.color_of(arena, Some(n)) == Color::Red {
                let left = self.left_of(arena, Some(n));
                let right = self.right_of(arena, Some(n));
                assert_ne!(self.color_of(arena, left), Color::Red, "red-red violation at {n}");
                assert_ne!(self.color_of(arena, right), Color::Red, "red-red violation at {n}");
            }
            self.assert_no_red_red(arena, self.left_of(arena, Some(n)));
            self.assert_no_red_red(arena, self.right_of(arena, Some(n)));
        }
    }

    #[cfg(test)]
    fn assert_invariants(&self, arena: &[Pcb]) {
        assert_eq!(self.color_of(arena, self.root), Color::Black, "root must be black");
        self.assert_no_red_red(arena, self.root);
        self.black_height(arena, self.root);
    }
}

impl Default for RbTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena(n: usize) -> Vec<Pcb> {
        (0..n).map(|i| Pcb::new(i as u32, 1000, 1, 1, 0)).collect()
    }

    fn key_of(arena: &[Pcb]) -> impl Fn(usize) -> i64 + '_ {
        move |i| arena[i].vruntime.load(std::sync::atomic::Ordering::Relaxed)
    }

    #[test]
    fn insert_and_inorder_is_sorted() {
        let arena = arena(7);
        let values = [50i64, 10, 90, 30, 70, 20, 80];
        for (i, v) in values.iter().enumerate() {
            arena[i].vruntime.store(*v, std::sync::atomic::Ordering::Relaxed);
        }
        let mut tree = RbTree::new();
        for i in 0..7 {
            tree.insert(&arena, i, key_of(&arena));
            tree.assert_invariants(&arena);
        }
        let order = tree.inorder(&arena);
        let mut sorted_values: Vec<i64> = order.iter().map(|&i| values[i]).collect();
        let mut expected = values.to_vec();
        expected.sort();
        assert_eq!(sorted_values, expected);
        sorted_values.dedup();
        assert_eq!(tree.len(), 7);
    }

    #[test]
    fn leftmost_is_minimum() {
        let arena = arena(5);
        let values = [5i64, 3, 8, 1, 4];
        for (i, v) in values.iter().enumerate() {
            arena[i].vruntime.store(*v, std::sync::atomic::Ordering::Relaxed);
        }
        let mut tree = RbTree::new();
        for i in 0..5 {
            tree.insert(&arena, i, key_of(&arena));
        }
        let min = tree.leftmost(&arena).unwrap();
        assert_eq!(values[min], 1);
    }

    #[test]
    fn remove_all_preserves_invariants_along_the_way() {
        let arena = arena(10);
        for (i, pcb) in arena.iter().enumerate() {
            pcb.vruntime.store((i as i64 * 37) % 101, std::sync::atomic::Ordering::Relaxed);
        }
        let mut tree = RbTree::new();
        for i in 0..10 {
            tree.insert(&arena, i, key_of(&arena));
        }
        for i in 0..10 {
            tree.remove(&arena, i);
            tree.assert_invariants(&arena);
        }
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 0);
    }

    #[test]
    fn search_finds_existing_key_and_misses_absent_one() {
        let arena = arena(5);
        let values = [5i64, 3, 8, 1, 4];
        for (i, v) in values.iter().enumerate() {
            arena[i].vruntime.store(*v, std::sync::atomic::Ordering::Relaxed);
        }
        let mut tree = RbTree::new();
        for i in 0..5 {
            tree.insert(&arena, i, key_of(&arena));
        }
        assert_eq!(tree.search(&arena, 8, key_of(&arena)), Some(2));
        assert_eq!(tree.search(&arena, 99, key_of(&arena)), None);
    }

    #[test]
    fn remove_root_with_two_children() {
        let arena = arena(3);
        arena[0].vruntime.store(50, std::sync::atomic::Ordering::Relaxed);
        arena[1].vruntime.store(20, std::sync::atomic::Ordering::Relaxed);
        arena[2].vruntime.store(80, std::sync::atomic::Ordering::Relaxed);
        let mut tree = RbTree::new();
        for i in 0..3 {
            tree.insert(&arena, i, key_of(&arena));
        }
        tree.remove(&arena, 0);
        tree.assert_invariants(&arena);
        assert_eq!(tree.len(), 2);
        let order: Vec<i64> = tree.inorder(&arena).iter().map(|&i| arena[i].vruntime.load(std::sync::atomic::Ordering::Relaxed)).collect();
        assert_eq!(order, vec![20, 80]);
    }
}
