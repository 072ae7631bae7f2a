
use arrayvec::ArrayVec;

/// Branching factor shared by all three trees; must be a power of 2
pub const B: usize = 32;
const MIDPOINT: usize = B / 2;

/// Sentinel index meaning "no such element"
pub const NOTFOUND: usize = usize::MAX;

/// A child slot of a B+-tree node: an inner node, or a leaf block on the
/// mixed side or the separated side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Child {
    Node(usize),
    BtmM(usize),
    BtmS(usize),
}

/// Back-pointer fix for a bottom block displaced by a node split or shift.
/// Patches must be applied in emission order; later entries supersede earlier
/// ones for the same block.
#[derive(Clone, Copy, Debug)]
pub struct BtmPatch {
    pub child: Child,
    pub parent: usize,
    pub idx_in_sibling: u8,
}

/// A node in one of the three B+-trees. Roots of separated trees keep their
/// root flag while sitting under an alphabet-tree border node, so weight
/// deltas climb straight through into the alphabet tree.
#[derive(Clone, Debug)]
pub struct BTreeNode {
    /// top of its own tree; separated-tree roots still carry a parent
    pub is_root: bool,
    /// the last inner level: children are bottom blocks, or separated-tree
    /// roots in the alphabet tree
    pub is_border: bool,
    /// the far-left placeholder subtree of the alphabet tree
    pub is_dummy: bool,
    pub parent: usize,
    pub idx_in_sibling: u8,
    /// leftmost bottom block reachable through leftmost children
    pub lm_btm: Child,
    /// weight of each child's subtree
    pub psum: ArrayVec<u64, B>,
    pub children: ArrayVec<Child, B>,
}

impl BTreeNode {
    pub fn new_root(is_border: bool, lm_btm: Child) -> Self {
        BTreeNode {
            is_root: true,
            is_border,
            is_dummy: false,
            parent: NOTFOUND,
            idx_in_sibling: 0,
            lm_btm,
            psum: ArrayVec::new(),
            children: ArrayVec::new(),
        }
    }

    /// Total weight stored under this node.
    #[inline]
    pub fn sum(&self) -> u64 {
        self.psum.iter().sum()
    }

    /// Smallest child index whose cumulative weight exceeds `pos`, with the
    /// position made relative to that child's subtree. Zero-weight children
    /// are skipped, which keeps the dummy run invisible to position searches.
    #[inline]
    pub fn search_pos(&self, pos: u64) -> (usize, u64) {
        let mut rel = pos;
        for (i, &w) in self.psum.iter().enumerate() {
            if rel < w {
                return (i, rel);
            }
            rel -= w;
        }
        panic!("position out of bounds in node search");
    }
}

#[inline]
fn apply_delta(value: &mut u64, delta: i64) {
    if delta >= 0 {
        *value += delta as u64;
    } else {
        *value -= (-delta) as u64;
    }
}

/// Arena holding every node of the mixed, alphabet, and separated trees.
/// Nodes are addressed by stable indices and never freed.
#[derive(Clone, Debug, Default)]
pub struct NodeArena {
    nodes: Vec<BTreeNode>,
}

impl std::ops::Index<usize> for NodeArena {
    type Output = BTreeNode;
    #[inline]
    fn index(&self, id: usize) -> &BTreeNode {
        &self.nodes[id]
    }
}

impl std::ops::IndexMut<usize> for NodeArena {
    #[inline]
    fn index_mut(&mut self, id: usize) -> &mut BTreeNode {
        &mut self.nodes[id]
    }
}

impl NodeArena {
    pub fn new() -> Self {
        Default::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn alloc(&mut self, node: BTreeNode) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Resolves a child to the leftmost bottom block of its subtree.
    #[inline]
    pub fn leftmost_btm(&self, child: Child) -> Child {
        match child {
            Child::Node(c) => self.nodes[c].lm_btm,
            btm => btm,
        }
    }

    /// Sum of the subtree weights of all siblings strictly left of child
    /// position (`node`, `idx`), accumulated up to the owning tree's root.
    pub fn psum_left(&self, mut node: usize, mut idx: usize) -> u64 {
        let mut total: u64 = 0;
        loop {
            total += self.nodes[node].psum[..idx].iter().sum::<u64>();
            if self.nodes[node].is_root {
                return total;
            }
            idx = self.nodes[node].idx_in_sibling as usize;
            node = self.nodes[node].parent;
        }
    }

    /// Adds `delta` to every ancestor entry above `node`, crossing from a
    /// separated-tree root into the alphabet tree when one is reached.
    pub fn add_weight_above(&mut self, mut node: usize, delta: i64) {
        while self.nodes[node].parent != NOTFOUND {
            let idx = self.nodes[node].idx_in_sibling as usize;
            node = self.nodes[node].parent;
            apply_delta(&mut self.nodes[node].psum[idx], delta);
        }
    }

    /// Adds `delta` to the child entry at (`node`, `idx`) and to the whole
    /// ancestor chain above it.
    pub fn change_psum_from(&mut self, node: usize, idx: usize, delta: i64) {
        apply_delta(&mut self.nodes[node].psum[idx], delta);
        self.add_weight_above(node, delta);
    }

    /// Bottom block immediately preceding child position (`node`, `idx`)
    /// within the same tree, or None at the tree's left edge.
    pub fn prev_btm(&self, mut node: usize, mut idx: usize) -> Option<Child> {
        loop {
            if idx > 0 {
                idx -= 1;
                break;
            }
            if self.nodes[node].is_root {
                return None;
            }
            idx = self.nodes[node].idx_in_sibling as usize;
            node = self.nodes[node].parent;
        }
        loop {
            match self.nodes[node].children[idx] {
                Child::Node(c) => {
                    node = c;
                    idx = self.nodes[c].children.len() - 1;
                }
                btm => return Some(btm),
            }
        }
    }

    /// Bottom block immediately following child position (`node`, `idx`)
    /// within the same tree, or None at the tree's right edge.
    pub fn next_btm(&self, mut node: usize, mut idx: usize) -> Option<Child> {
        loop {
            if idx + 1 < self.nodes[node].children.len() {
                idx += 1;
                break;
            }
            if self.nodes[node].is_root {
                return None;
            }
            idx = self.nodes[node].idx_in_sibling as usize;
            node = self.nodes[node].parent;
        }
        loop {
            match self.nodes[node].children[idx] {
                Child::Node(c) => {
                    node = c;
                    idx = 0;
                }
                btm => return Some(btm),
            }
        }
    }

    /// Rightmost bottom block under `node`.
    pub fn rightmost_btm(&self, mut node: usize) -> Child {
        loop {
            let idx = self.nodes[node].children.len() - 1;
            match self.nodes[node].children[idx] {
                Child::Node(c) => node = c,
                btm => return btm,
            }
        }
    }

    /// Rewrites parent/idx_in_sibling of the children of `node` from position
    /// `from` onward; node children are fixed in place, bottom children are
    /// emitted as patches for the block owner.
    fn refresh_child_links(&mut self, node: usize, from: usize, patches: &mut Vec<BtmPatch>) {
        for i in from..self.nodes[node].children.len() {
            match self.nodes[node].children[i] {
                Child::Node(c) => {
                    self.nodes[c].parent = node;
                    self.nodes[c].idx_in_sibling = i as u8;
                }
                btm => patches.push(BtmPatch {
                    child: btm,
                    parent: node,
                    idx_in_sibling: i as u8,
                }),
            }
        }
    }

    /// Inserts `child` with subtree weight `weight` immediately after child
    /// position `after_idx` of `node`, splitting full nodes in half and
    /// growing the root in place when the split reaches it. Returns the final
    /// (parent node, index) of the inserted child.
    ///
    /// `weight` must already be counted in every ancestor's total: the caller
    /// subtracts it from the donor sibling's entry first, so the insertion is
    /// a net-zero move and every subtree sum is conserved.
    pub fn insert_child_after(
        &mut self,
        node: usize,
        after_idx: usize,
        child: Child,
        weight: u64,
        patches: &mut Vec<BtmPatch>,
    ) -> (usize, usize) {
        let at = after_idx + 1;
        if self.nodes[node].children.len() < B {
            self.nodes[node].children.insert(at, child);
            self.nodes[node].psum.insert(at, weight);
            self.refresh_child_links(node, at, patches);
            return (node, at);
        }

        //the node is full: split off the upper half into a fresh right sibling
        let right_children: ArrayVec<Child, B> = self.nodes[node].children.drain(MIDPOINT..).collect();
        let right_psum: ArrayVec<u64, B> = self.nodes[node].psum.drain(MIDPOINT..).collect();
        let moved: u64 = right_psum.iter().sum();
        let right_lm = self.leftmost_btm(right_children[0]);
        let right_id = self.alloc(BTreeNode {
            is_root: false,
            is_border: self.nodes[node].is_border,
            is_dummy: false,
            parent: NOTFOUND,
            idx_in_sibling: 0,
            lm_btm: right_lm,
            psum: right_psum,
            children: right_children,
        });
        self.refresh_child_links(right_id, 0, patches);

        //place the new child on whichever side now owns its position
        let mut placed = if at <= MIDPOINT {
            self.nodes[node].children.insert(at, child);
            self.nodes[node].psum.insert(at, weight);
            self.refresh_child_links(node, at, patches);
            (node, at)
        } else {
            self.nodes[right_id].children.insert(at - MIDPOINT, child);
            self.nodes[right_id].psum.insert(at - MIDPOINT, weight);
            self.refresh_child_links(right_id, at - MIDPOINT, patches);
            (right_id, at - MIDPOINT)
        };

        if self.nodes[node].is_root {
            //grow in place so the root id stays stable: the left half moves to
            //a fresh child and the root becomes a two-child inner node
            let mut left = self.nodes[node].clone();
            left.is_root = false;
            left.is_dummy = false;
            left.parent = node;
            left.idx_in_sibling = 0;
            let left_sum = left.sum();
            let left_id = self.alloc(left);
            self.refresh_child_links(left_id, 0, patches);
            if placed.0 == node {
                placed.0 = left_id;
            }

            let right_sum = self.nodes[right_id].sum();
            self.nodes[right_id].parent = node;
            self.nodes[right_id].idx_in_sibling = 1;

            let root = &mut self.nodes[node];
            root.is_border = false;
            root.children.clear();
            root.psum.clear();
            root.children.push(Child::Node(left_id));
            root.children.push(Child::Node(right_id));
            root.psum.push(left_sum);
            root.psum.push(right_sum);
            placed
        } else {
            //hand the right sibling to the parent; the moved weight leaves the
            //left entry and re-enters as the new child entry, so nothing above
            //the parent changes
            let parent = self.nodes[node].parent;
            let pidx = self.nodes[node].idx_in_sibling as usize;
            apply_delta(&mut self.nodes[parent].psum[pidx], -(moved as i64));
            self.insert_child_after(parent, pidx, Child::Node(right_id), moved, patches);
            placed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Mirror of the bottom-block side tables, kept in sync through patches.
    struct BtmTable {
        parent: Vec<usize>,
        idx_in_sibling: Vec<u8>,
    }

    impl BtmTable {
        fn apply(&mut self, patches: &[BtmPatch]) {
            for p in patches {
                if let Child::BtmM(b) = p.child {
                    self.parent[b] = p.parent;
                    self.idx_in_sibling[b] = p.idx_in_sibling;
                }
            }
        }
    }

    /// Builds a single-tree arena by appending `n` bottoms of weight 1 each,
    /// always inserting after the current rightmost bottom.
    fn build_chain(n: usize) -> (NodeArena, BtmTable, usize) {
        let mut arena = NodeArena::new();
        let root = arena.alloc(BTreeNode::new_root(true, Child::BtmM(0)));
        let mut table = BtmTable {
            parent: vec![NOTFOUND; n],
            idx_in_sibling: vec![0; n],
        };
        let mut patches = vec![];
        arena[root].children.push(Child::BtmM(0));
        arena[root].psum.push(1);
        table.parent[0] = root;
        for b in 1..n {
            patches.clear();
            let (pnode, pidx) = (table.parent[b - 1], table.idx_in_sibling[b - 1] as usize);
            let placed = arena.insert_child_after(pnode, pidx, Child::BtmM(b), 0, &mut patches);
            table.apply(&patches);
            table.parent[b] = placed.0;
            table.idx_in_sibling[b] = placed.1 as u8;
            arena.change_psum_from(placed.0, placed.1, 1);
        }
        (arena, table, root)
    }

    fn collect_btms(arena: &NodeArena, root: usize) -> Vec<usize> {
        let mut out = vec![];
        let mut current = arena.leftmost_btm(Child::Node(root));
        loop {
            if let Child::BtmM(b) = current {
                out.push(b);
            }
            //find current's parent position by scanning (test-only)
            let (mut pn, mut pi) = (NOTFOUND, 0);
            'outer: for id in 0..arena.len() {
                for (i, &c) in arena[id].children.iter().enumerate() {
                    if c == current {
                        pn = id;
                        pi = i;
                        break 'outer;
                    }
                }
            }
            match arena.next_btm(pn, pi) {
                Some(next) => current = next,
                None => break,
            }
        }
        out
    }

    #[test]
    fn test_chain_order_and_sums() {
        for &n in &[1usize, 2, B, B + 1, B * B + 7, 2000] {
            let (arena, table, root) = build_chain(n);
            //total weight equals the number of bottoms
            assert_eq!(arena[root].sum(), n as u64);
            //every side-table back-pointer is live and correct
            for b in 0..n {
                let pn = table.parent[b];
                let pi = table.idx_in_sibling[b] as usize;
                assert_eq!(arena[pn].children[pi], Child::BtmM(b));
                assert!(arena[pn].is_border);
            }
            //in-order traversal returns the bottoms in creation order
            assert_eq!(collect_btms(&arena, root), (0..n).collect::<Vec<usize>>());
        }
    }

    #[test]
    fn test_psum_left_matches_position() {
        let n = 3 * B + 5;
        let (arena, table, _root) = build_chain(n);
        for b in 0..n {
            let left = arena.psum_left(table.parent[b], table.idx_in_sibling[b] as usize);
            assert_eq!(left, b as u64);
        }
    }

    #[test]
    fn test_search_pos_descent() {
        let n = 4 * B;
        let (arena, _table, root) = build_chain(n);
        for pos in 0..n as u64 {
            //descend to the border and check the bottom index matches
            let mut node = root;
            let mut rel = pos;
            loop {
                let (idx, r) = arena[node].search_pos(rel);
                rel = r;
                match arena[node].children[idx] {
                    Child::Node(c) => node = c,
                    Child::BtmM(b) => {
                        assert_eq!(b as u64, pos);
                        assert_eq!(rel, 0);
                        break;
                    }
                    Child::BtmS(_) => unreachable!(),
                }
            }
        }
    }

    #[test]
    fn test_prev_next_navigation() {
        let n = 2 * B + 3;
        let (arena, table, _root) = build_chain(n);
        for b in 0..n {
            let pn = table.parent[b];
            let pi = table.idx_in_sibling[b] as usize;
            let prev = arena.prev_btm(pn, pi);
            let next = arena.next_btm(pn, pi);
            if b == 0 {
                assert_eq!(prev, None);
            } else {
                assert_eq!(prev, Some(Child::BtmM(b - 1)));
            }
            if b == n - 1 {
                assert_eq!(next, None);
            } else {
                assert_eq!(next, Some(Child::BtmM(b + 1)));
            }
        }
    }

    #[test]
    fn test_middle_insertion_conserves_sums() {
        //repeatedly insert after bottom 0 so splits hit the same leftmost node
        let mut arena = NodeArena::new();
        let root = arena.alloc(BTreeNode::new_root(true, Child::BtmM(0)));
        arena[root].children.push(Child::BtmM(0));
        arena[root].psum.push(5);
        let mut table = BtmTable {
            parent: vec![root; 200],
            idx_in_sibling: vec![0; 200],
        };
        let mut patches = vec![];
        for b in 1..200 {
            patches.clear();
            let placed = arena.insert_child_after(
                table.parent[0],
                table.idx_in_sibling[0] as usize,
                Child::BtmM(b),
                0,
                &mut patches,
            );
            table.apply(&patches);
            table.parent[b] = placed.0;
            table.idx_in_sibling[b] = placed.1 as u8;
            arena.change_psum_from(placed.0, placed.1, 3);
        }
        assert_eq!(arena[root].sum(), 5 + 199 * 3);
        //order is 0 followed by the others newest-first
        let mut expected: Vec<usize> = (1..200).rev().collect();
        expected.insert(0, 0);
        assert_eq!(collect_btms(&arena, root), expected);
    }
}
