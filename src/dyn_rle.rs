
use crate::bottom_blocks::{BottomBlocks, DUMMY_IDX};
use crate::btree_node::{BTreeNode, BtmPatch, Child, NodeArena, B};
use crate::tag_relabel::{OrderedLabels, TagRelabeler};

/// Dynamic run-length encoded sequence with an associated u64 per run.
///
/// Three B+-trees share one node arena: the mixed tree orders runs by text
/// position, one separated tree per character orders that character's runs,
/// and the alphabet tree orders the separated trees by character code. Leaves
/// live in [BottomBlocks]; `idxM` names a run on the mixed side, `idxS` its
/// mirror on the separated side, and the two stay bijective through every
/// shift and split.
///
/// Positions are 0-based over the expanded sequence. `rank` counts are
/// inclusive of the queried position.
pub struct DynRleAssoc {
    arena: NodeArena,
    btm: BottomBlocks,
    relabeler: TagRelabeler,
    root_m: usize,
    root_a: usize,
    num_runs: usize,
    num_strees: usize,
}

/// View of the mixed-side blocks as the ordered list seen by the relabeler.
struct MLabelOrder<'a> {
    arena: &'a NodeArena,
    btm: &'a mut BottomBlocks,
}

impl OrderedLabels for MLabelOrder<'_> {
    fn prev(&self, elem: usize) -> Option<usize> {
        match self
            .arena
            .prev_btm(self.btm.parent_m(elem), self.btm.idx_in_sib_m(elem))
        {
            Some(Child::BtmM(b)) => Some(b),
            None => None,
            _ => unreachable!("mixed-tree borders hold mixed blocks"),
        }
    }
    fn next(&self, elem: usize) -> Option<usize> {
        match self
            .arena
            .next_btm(self.btm.parent_m(elem), self.btm.idx_in_sib_m(elem))
        {
            Some(Child::BtmM(b)) => Some(b),
            None => None,
            _ => unreachable!("mixed-tree borders hold mixed blocks"),
        }
    }
    fn label(&self, elem: usize) -> u64 {
        self.btm.label_m(elem)
    }
    fn set_label(&mut self, elem: usize, label: u64) {
        self.btm.set_label_m(elem, label);
    }
}

impl Default for DynRleAssoc {
    fn default() -> Self {
        let mut arena = NodeArena::new();
        let mut btm = BottomBlocks::new();

        //mixed tree over the dummy run
        let root_m = arena.alloc(BTreeNode::new_root(true, Child::BtmM(0)));
        arena[root_m].children.push(Child::BtmM(0));
        arena[root_m].psum.push(0);
        btm.set_parent_m(0, root_m, 0);

        //alphabet tree over the dummy separated tree
        let mut dummy_root = BTreeNode::new_root(true, Child::BtmS(0));
        dummy_root.is_dummy = true;
        dummy_root.children.push(Child::BtmS(0));
        dummy_root.psum.push(0);
        let s_dummy = arena.alloc(dummy_root);
        btm.set_parent_s(0, s_dummy, 0);

        let root_a = arena.alloc(BTreeNode::new_root(true, Child::BtmS(0)));
        arena[root_a].children.push(Child::Node(s_dummy));
        arena[root_a].psum.push(0);
        arena[s_dummy].parent = root_a;
        arena[s_dummy].idx_in_sibling = 0;

        DynRleAssoc {
            arena,
            btm,
            relabeler: TagRelabeler::new(1),
            root_m,
            root_a,
            num_runs: 0,
            num_strees: 1,
        }
    }
}

impl DynRleAssoc {
    pub fn new() -> Self {
        Default::default()
    }

    //////////////////////////////// totals

    /// Length of the represented sequence.
    #[inline]
    pub fn total_weight(&self) -> u64 {
        self.arena[self.root_m].sum()
    }

    /// Occurrences of `ch` in the whole sequence.
    pub fn weight_of(&self, ch: u64) -> u64 {
        let (s_root, exact) = self.search_char_a(ch);
        if exact {
            self.arena[s_root].sum()
        } else {
            0
        }
    }

    /// Number of runs currently stored.
    #[inline]
    pub fn num_runs(&self) -> usize {
        self.num_runs
    }

    /// Number of separated trees in the alphabet tree, the dummy included.
    #[inline]
    pub fn num_char_trees(&self) -> usize {
        self.num_strees
    }

    /// Occurrences of all characters strictly smaller than `ch`.
    pub fn weight_smaller(&self, ch: u64) -> u64 {
        let (s_node, exact) = self.search_char_a(ch);
        let mut total = self.sum_left_a(s_node);
        if !exact {
            total += self.arena[s_node].sum();
        }
        total
    }

    //////////////////////////////// run accessors

    #[inline]
    pub fn char_from_idx_m(&self, idx_m: usize) -> u64 {
        self.btm.char_from_idx_m(idx_m)
    }

    #[inline]
    pub fn weight_from_idx_m(&self, idx_m: usize) -> u64 {
        self.btm.weight(idx_m)
    }

    #[inline]
    pub fn get_assoc(&self, idx_m: usize) -> u64 {
        self.btm.assoc(idx_m)
    }

    #[inline]
    pub fn set_assoc(&mut self, idx_m: usize, value: u64) {
        self.btm.set_assoc(idx_m, value);
    }

    /// Run preceding `idx_m` in text order; the dummy run is the left end.
    pub fn prev_idx_m(&self, idx_m: usize) -> Option<usize> {
        let b = idx_m / B;
        if idx_m % B > 0 {
            return Some(idx_m - 1);
        }
        match self.arena.prev_btm(self.btm.parent_m(b), self.btm.idx_in_sib_m(b)) {
            Some(Child::BtmM(pb)) => Some(pb * B + self.btm.num_children_m(pb) - 1),
            None => None,
            _ => unreachable!(),
        }
    }

    /// Run following `idx_m` in text order.
    pub fn next_idx_m(&self, idx_m: usize) -> Option<usize> {
        let b = idx_m / B;
        if idx_m % B + 1 < self.btm.num_children_m(b) {
            return Some(idx_m + 1);
        }
        match self.arena.next_btm(self.btm.parent_m(b), self.btm.idx_in_sib_m(b)) {
            Some(Child::BtmM(nb)) => Some(nb * B),
            None => None,
            _ => unreachable!(),
        }
    }

    //////////////////////////////// queries

    /// Finds the run covering `pos` (0 <= pos < total) and the position's
    /// offset inside it.
    pub fn search_pos_m(&self, pos: u64) -> (usize, u64) {
        assert!(pos < self.total_weight());
        let mut node = self.root_m;
        let mut rel = pos;
        loop {
            let (i, r) = self.arena[node].search_pos(rel);
            rel = r;
            match self.arena[node].children[i] {
                Child::Node(c) => node = c,
                Child::BtmM(b) => {
                    let mut slot = 0;
                    loop {
                        debug_assert!(slot < self.btm.num_children_m(b));
                        let w = self.btm.weight(b * B + slot);
                        if rel < w {
                            return (b * B + slot, rel);
                        }
                        rel -= w;
                        slot += 1;
                    }
                }
                Child::BtmS(_) => unreachable!("mixed tree holds mixed blocks"),
            }
        }
    }

    /// Occurrences of `ch` in positions [0, pos] (inclusive); with
    /// `total_rank` also adds the occurrences of all smaller characters.
    pub fn rank(&self, ch: u64, pos: u64, total_rank: bool) -> u64 {
        let (idx_m, rel) = self.search_pos_m(pos);
        self.rank_with_idx(ch, idx_m, rel, total_rank)
    }

    /// `rank` when the covering run and relative position are already known.
    pub fn rank_with_idx(&self, ch: u64, idx_m: usize, rel: u64, total_rank: bool) -> u64 {
        let cur = self.btm.char_from_idx_m(idx_m);
        if cur == ch {
            let idx_s = self.btm.idx_m2s(idx_m);
            let mut r = self.sum_left_s(idx_s) + rel + 1;
            if total_rank {
                r += self.sum_left_a(self.s_root_of(idx_s));
            }
            r
        } else {
            let (s_node, exact) = self.search_char_a(ch);
            let mut r = 0;
            if exact {
                if let Some(ps) = self.pred_idx_s(ch, s_node, idx_m) {
                    r = self.sum_left_s(ps) + self.btm.weight(self.btm.idx_s2m(ps));
                }
            }
            if total_rank {
                r += self.sum_left_a(s_node);
                if !exact {
                    //the predecessor tree's own occurrences are also smaller
                    r += self.arena[s_node].sum();
                }
            }
            r
        }
    }

    /// Position of the k-th occurrence of `ch` (1-based), or None past occ(ch).
    pub fn select(&self, ch: u64, k: u64) -> Option<u64> {
        if k == 0 {
            return None;
        }
        let (s_root, exact) = self.search_char_a(ch);
        if !exact || k > self.arena[s_root].sum() {
            return None;
        }
        let mut node = s_root;
        let mut rel = k - 1;
        loop {
            let (i, r) = self.arena[node].search_pos(rel);
            rel = r;
            match self.arena[node].children[i] {
                Child::Node(c) => node = c,
                Child::BtmS(b) => {
                    let mut slot = 0;
                    loop {
                        debug_assert!(slot < self.btm.num_children_s(b));
                        let w = self.btm.weight(self.btm.idx_s2m(b * B + slot));
                        if rel < w {
                            break;
                        }
                        rel -= w;
                        slot += 1;
                    }
                    let idx_m = self.btm.idx_s2m(b * B + slot);
                    return Some(self.sum_left_m(idx_m) + rel);
                }
                Child::BtmM(_) => unreachable!("separated trees hold separated blocks"),
            }
        }
    }

    //////////////////////////////// insertion

    /// Inserts the run ch^w starting at `pos` (0 <= pos <= total), merging
    /// with an equal-character neighbour when possible and splitting the
    /// covering run otherwise. Returns the index of the run now containing
    /// the inserted characters and their offset inside it.
    pub fn insert_run(&mut self, pos: u64, ch: u64, w: u64) -> (usize, u64) {
        self.insert_run_inner(pos, ch, w, true)
    }

    /// Like [insert_run](Self::insert_run) but always creates a fresh run,
    /// even next to runs of the same character.
    pub fn insert_run_without_merge(&mut self, pos: u64, ch: u64, w: u64) -> (usize, u64) {
        self.insert_run_inner(pos, ch, w, false)
    }

    /// Appends the run ch^w at the end of the sequence.
    pub fn push_back_run(&mut self, ch: u64, w: u64) -> (usize, u64) {
        self.push_back_inner(ch, w, true)
    }

    pub fn push_back_run_without_merge(&mut self, ch: u64, w: u64) -> (usize, u64) {
        self.push_back_inner(ch, w, false)
    }

    /// Inserts a fresh run ch^w immediately after run `idx_m`, without
    /// merging. Callers guarantee that neither neighbour carries `ch`.
    pub fn insert_run_after(&mut self, idx_m: usize, ch: u64, w: u64) -> usize {
        debug_assert!(idx_m == DUMMY_IDX || self.btm.char_from_idx_m(idx_m) != ch);
        debug_assert!(self
            .next_idx_m(idx_m)
            .map_or(true, |n| self.btm.char_from_idx_m(n) != ch));
        self.insert_new_run_after(idx_m, ch, w).0
    }

    fn insert_run_inner(&mut self, pos: u64, ch: u64, w: u64, merge: bool) -> (usize, u64) {
        assert!(w >= 1);
        assert!(pos <= self.total_weight());
        if pos == self.total_weight() {
            return self.push_back_inner(ch, w, merge);
        }
        let (idx_m, rel) = self.search_pos_m(pos);
        let cur = self.btm.char_from_idx_m(idx_m);
        if merge && cur == ch {
            self.change_weight(idx_m, w as i64);
            return (idx_m, rel);
        }
        if rel == 0 {
            //in front of this run; the dummy guarantees a predecessor
            let pred = self.prev_idx_m(idx_m).expect("dummy run sits at the far left");
            if merge && pred != DUMMY_IDX && self.btm.char_from_idx_m(pred) == ch {
                let pred_w = self.btm.weight(pred);
                self.change_weight(pred, w as i64);
                return (pred, pred_w);
            }
            let (new_idx, _) = self.insert_new_run_after(pred, ch, w);
            return (new_idx, 0);
        }
        //split: the covering run keeps the first `rel` characters, the new
        //run follows, and the old tail is re-inserted after it
        let old_w = self.btm.weight(idx_m);
        self.change_weight(idx_m, rel as i64 - old_w as i64);
        let (new_idx, _) = self.insert_new_run_after(idx_m, ch, w);
        let (_, new_idx_after) = self.insert_new_run_after(new_idx, cur, old_w - rel);
        (new_idx_after, 0)
    }

    fn push_back_inner(&mut self, ch: u64, w: u64, merge: bool) -> (usize, u64) {
        let last = match self.arena.rightmost_btm(self.root_m) {
            Child::BtmM(b) => b * B + self.btm.num_children_m(b) - 1,
            _ => unreachable!(),
        };
        if merge && last != DUMMY_IDX && self.btm.char_from_idx_m(last) == ch {
            let last_w = self.btm.weight(last);
            self.change_weight(last, w as i64);
            return (last, last_w);
        }
        let (new_idx, _) = self.insert_new_run_after(last, ch, w);
        (new_idx, 0)
    }

    /// Grows or shrinks run `idx_m` by `delta`, propagating through the
    /// mixed tree and through the bound separated tree into the alphabet tree.
    pub fn change_weight(&mut self, idx_m: usize, delta: i64) {
        debug_assert!(idx_m != DUMMY_IDX);
        let w = self.btm.weight(idx_m) as i64 + delta;
        debug_assert!(w >= 1);
        self.btm.set_weight(idx_m, w as u64);
        let b = idx_m / B;
        self.arena
            .change_psum_from(self.btm.parent_m(b), self.btm.idx_in_sib_m(b), delta);
        let idx_s = self.btm.idx_m2s(idx_m);
        let sb = idx_s / B;
        self.arena
            .change_psum_from(self.btm.parent_s(sb), self.btm.idx_in_sib_s(sb), delta);
    }

    //////////////////////////////// internal structure

    fn apply_patches(&mut self, patches: &[BtmPatch]) {
        for p in patches {
            match p.child {
                Child::BtmM(b) => self.btm.set_parent_m(b, p.parent, p.idx_in_sibling),
                Child::BtmS(b) => self.btm.set_parent_s(b, p.parent, p.idx_in_sibling),
                Child::Node(_) => unreachable!("node children are patched in place"),
            }
        }
    }

    /// Creates the run ch^w immediately after run `pred` on both sides.
    /// Returns the new run's index and `pred`'s possibly relocated index.
    fn insert_new_run_after(&mut self, pred: usize, ch: u64, w: u64) -> (usize, usize) {
        let (new_m, pred_after) = self.make_slot_after_m(pred, w);
        let (s_root, exact) = self.search_char_a(ch);
        let new_s = if exact {
            match self.pred_idx_s(ch, s_root, new_m) {
                Some(ps) => self.make_slot_after_s(ps, w),
                None => self.make_head_slot_s(s_root, w),
            }
        } else {
            let s_root = self.setup_new_stree(ch);
            self.make_head_slot_s(s_root, w)
        };
        self.btm.set_links(new_m, new_s);
        self.num_runs += 1;
        (new_m, pred_after)
    }

    /// Opens a mixed-side slot right after `pred`, splitting its block when
    /// full, and stores weight `w` there. The slot's link stays unbound.
    fn make_slot_after_m(&mut self, pred: usize, w: u64) -> (usize, usize) {
        let b = pred / B;
        let slot = pred % B;
        let pred_after = if self.btm.num_children_m(b) == B {
            let new_btm = self.btm.alloc_btm_m();
            self.relabeler.reserve(self.btm.num_btms_m());
            let moved = self.btm.split_btm_m(b, new_btm);
            let parent = self.btm.parent_m(b);
            let pidx = self.btm.idx_in_sib_m(b);
            self.arena[parent].psum[pidx] -= moved;
            let mut patches = vec![];
            self.arena
                .insert_child_after(parent, pidx, Child::BtmM(new_btm), moved, &mut patches);
            self.apply_patches(&patches);
            let mut view = MLabelOrder {
                arena: &self.arena,
                btm: &mut self.btm,
            };
            self.relabeler.assign(&mut view, new_btm);
            if slot < B / 2 {
                pred
            } else {
                new_btm * B + (slot - B / 2)
            }
        } else {
            pred
        };
        let target = pred_after + 1;
        self.btm.insert_slot_m(target, w, 0);
        let tb = target / B;
        self.arena
            .change_psum_from(self.btm.parent_m(tb), self.btm.idx_in_sib_m(tb), w as i64);
        (target, pred_after)
    }

    /// Opens a separated-side slot right after leaf `pred_s` and accounts
    /// weight `w` for it. The slot's link stays unbound.
    fn make_slot_after_s(&mut self, pred_s: usize, w: u64) -> usize {
        let b = pred_s / B;
        let slot = pred_s % B;
        let pred_after = if self.btm.num_children_s(b) == B {
            let new_btm = self.btm.alloc_btm_s(self.btm.char_s(b));
            let moved = self.btm.split_btm_s(b, new_btm);
            let parent = self.btm.parent_s(b);
            let pidx = self.btm.idx_in_sib_s(b);
            self.arena[parent].psum[pidx] -= moved;
            let mut patches = vec![];
            self.arena
                .insert_child_after(parent, pidx, Child::BtmS(new_btm), moved, &mut patches);
            self.apply_patches(&patches);
            if slot < B / 2 {
                pred_s
            } else {
                new_btm * B + (slot - B / 2)
            }
        } else {
            pred_s
        };
        let target = pred_after + 1;
        self.btm.insert_slot_s(target);
        let tb = target / B;
        self.arena
            .change_psum_from(self.btm.parent_s(tb), self.btm.idx_in_sib_s(tb), w as i64);
        target
    }

    /// Opens the first slot of the separated tree under `s_root`, for a run
    /// preceding every stored run of its character.
    fn make_head_slot_s(&mut self, s_root: usize, w: u64) -> usize {
        let b = match self.arena[s_root].lm_btm {
            Child::BtmS(b) => b,
            _ => unreachable!(),
        };
        if self.btm.num_children_s(b) == B {
            let new_btm = self.btm.alloc_btm_s(self.btm.char_s(b));
            let moved = self.btm.split_btm_s(b, new_btm);
            let parent = self.btm.parent_s(b);
            let pidx = self.btm.idx_in_sib_s(b);
            self.arena[parent].psum[pidx] -= moved;
            let mut patches = vec![];
            self.arena
                .insert_child_after(parent, pidx, Child::BtmS(new_btm), moved, &mut patches);
            self.apply_patches(&patches);
        }
        let target = b * B;
        self.btm.insert_slot_s(target);
        self.arena
            .change_psum_from(self.btm.parent_s(b), self.btm.idx_in_sib_s(b), w as i64);
        target
    }

    /// Registers a fresh separated tree for `ch` as a new alphabet-tree
    /// border child after its character predecessor.
    fn setup_new_stree(&mut self, ch: u64) -> usize {
        let (pred_root, exact) = self.search_char_a(ch);
        debug_assert!(!exact);
        let sb = self.btm.alloc_btm_s(ch);
        let mut root = BTreeNode::new_root(true, Child::BtmS(sb));
        root.children.push(Child::BtmS(sb));
        root.psum.push(0);
        let s_root = self.arena.alloc(root);
        self.btm.set_parent_s(sb, s_root, 0);

        let parent = self.arena[pred_root].parent;
        let pidx = self.arena[pred_root].idx_in_sibling as usize;
        let mut patches = vec![];
        self.arena
            .insert_child_after(parent, pidx, Child::Node(s_root), 0, &mut patches);
        self.apply_patches(&patches);
        self.num_strees += 1;
        s_root
    }

    //////////////////////////////// internal searches

    /// Character at the leftmost separated block of an alphabet subtree.
    fn char_of_child(&self, child: Child) -> u64 {
        match self.arena.leftmost_btm(child) {
            Child::BtmS(b) => self.btm.char_s(b),
            _ => unreachable!("alphabet subtrees bottom out in separated blocks"),
        }
    }

    /// Separated-tree root with the largest character <= `ch`; `exact` tells
    /// whether it is `ch`'s own tree (dummy counts as inexact).
    fn search_char_a(&self, ch: u64) -> (usize, bool) {
        let mut node = self.root_a;
        loop {
            let n = &self.arena[node];
            let mut i = 0;
            while i + 1 < n.children.len() && self.char_of_child(n.children[i + 1]) <= ch {
                i += 1;
            }
            match n.children[i] {
                Child::Node(c) => {
                    if n.is_border {
                        let exact =
                            !self.arena[c].is_dummy && self.char_of_child(Child::Node(c)) == ch;
                        return (c, exact);
                    }
                    node = c;
                }
                _ => unreachable!("alphabet-tree children are nodes"),
            }
        }
    }

    /// Root of the separated tree containing leaf `idx_s`.
    fn s_root_of(&self, idx_s: usize) -> usize {
        let mut node = self.btm.parent_s(idx_s / B);
        while !self.arena[node].is_root {
            node = self.arena[node].parent;
        }
        node
    }

    /// Label ordering key of a separated subtree's leftmost leaf.
    fn label_of_child(&self, child: Child) -> u64 {
        match self.arena.leftmost_btm(child) {
            Child::BtmS(b) => self.btm.label_of_btm_s(b),
            _ => unreachable!(),
        }
    }

    /// Last leaf of the tree under `s_root` whose mixed-block label is
    /// <= `key`, or None when even the first leaf is past it.
    fn search_label_s(&self, s_root: usize, key: u64) -> Option<usize> {
        if self.label_of_child(Child::Node(s_root)) > key {
            return None;
        }
        let mut node = s_root;
        loop {
            let n = &self.arena[node];
            let mut i = 0;
            while i + 1 < n.children.len() && self.label_of_child(n.children[i + 1]) <= key {
                i += 1;
            }
            match n.children[i] {
                Child::Node(c) => node = c,
                Child::BtmS(b) => {
                    let mut slot = 0;
                    while slot + 1 < self.btm.num_children_s(b)
                        && self.btm.label_m(self.btm.idx_s2m(b * B + slot + 1) / B) <= key
                    {
                        slot += 1;
                    }
                    return Some(b * B + slot);
                }
                Child::BtmM(_) => unreachable!(),
            }
        }
    }

    /// Separated leaf of the last `ch`-run at or before run `idx_m` in text
    /// order (idx_m itself excluded): a leftward scan inside idx_m's block,
    /// falling through to a label-ordered search for earlier blocks.
    fn pred_idx_s(&self, ch: u64, s_root: usize, idx_m: usize) -> Option<usize> {
        let b = idx_m / B;
        for j in (0..idx_m % B).rev() {
            let cand = b * B + j;
            if cand != DUMMY_IDX && self.btm.char_from_idx_m(cand) == ch {
                return Some(self.btm.idx_m2s(cand));
            }
        }
        if b == 0 {
            //block 0 is always the textually first block
            return None;
        }
        self.search_label_s(s_root, self.btm.label_m(b) - 1)
    }

    //////////////////////////////// partial sums

    /// Total weight of runs strictly before `idx_m` in text order.
    fn sum_left_m(&self, idx_m: usize) -> u64 {
        let b = idx_m / B;
        let mut sum: u64 = 0;
        for j in 0..idx_m % B {
            sum += self.btm.weight(b * B + j);
        }
        sum + self
            .arena
            .psum_left(self.btm.parent_m(b), self.btm.idx_in_sib_m(b))
    }

    /// Total weight of `ch`-runs strictly before leaf `idx_s` in its tree.
    fn sum_left_s(&self, idx_s: usize) -> u64 {
        let b = idx_s / B;
        let mut sum: u64 = 0;
        for j in 0..idx_s % B {
            sum += self.btm.weight(self.btm.idx_s2m(b * B + j));
        }
        sum + self
            .arena
            .psum_left(self.btm.parent_s(b), self.btm.idx_in_sib_s(b))
    }

    /// Total weight of all separated trees left of `s_root` in the alphabet
    /// tree: the occurrences of every smaller character.
    fn sum_left_a(&self, s_root: usize) -> u64 {
        self.arena.psum_left(
            self.arena[s_root].parent,
            self.arena[s_root].idx_in_sibling as usize,
        )
    }

    //////////////////////////////// iteration

    /// Iterates the runs in text order as (character, weight) pairs.
    pub fn run_iter(&self) -> RunIter<'_> {
        RunIter {
            rle: self,
            cursor: self.next_idx_m(DUMMY_IDX),
        }
    }

    /// Expands the whole sequence; for debugging and tests.
    pub fn to_vec(&self) -> Vec<u64> {
        let mut out = Vec::with_capacity(self.total_weight() as usize);
        for (ch, w) in self.run_iter() {
            for _ in 0..w {
                out.push(ch);
            }
        }
        out
    }
}

/// In-order run iterator over a [DynRleAssoc].
pub struct RunIter<'a> {
    rle: &'a DynRleAssoc,
    cursor: Option<usize>,
}

impl<'a> Iterator for RunIter<'a> {
    type Item = (u64, u64);
    fn next(&mut self) -> Option<(u64, u64)> {
        let idx_m = self.cursor?;
        self.cursor = self.rle.next_idx_m(idx_m);
        Some((
            self.rle.btm.char_from_idx_m(idx_m),
            self.rle.btm.weight(idx_m),
        ))
    }
}

#[cfg(test)]
impl DynRleAssoc {
    /// Exhaustive structural validation used by the randomised tests.
    pub(crate) fn check_consistency(&self) {
        //every node's child entries match the child subtree sums
        for id in 0..self.arena.len() {
            for (i, &child) in self.arena[id].children.iter().enumerate() {
                let expected = match child {
                    Child::Node(c) => {
                        assert_eq!(self.arena[c].parent, id);
                        assert_eq!(self.arena[c].idx_in_sibling as usize, i);
                        self.arena[c].sum()
                    }
                    Child::BtmM(b) => {
                        assert_eq!(self.btm.parent_m(b), id);
                        assert_eq!(self.btm.idx_in_sib_m(b), i);
                        (0..self.btm.num_children_m(b))
                            .map(|s| self.btm.weight(b * B + s))
                            .sum()
                    }
                    Child::BtmS(b) => {
                        assert_eq!(self.btm.parent_s(b), id);
                        assert_eq!(self.btm.idx_in_sib_s(b), i);
                        (0..self.btm.num_children_s(b))
                            .map(|s| self.btm.weight(self.btm.idx_s2m(b * B + s)))
                            .sum()
                    }
                };
                assert_eq!(
                    self.arena[id].psum[i], expected,
                    "stale psum at node {} child {}",
                    id, i
                );
            }
        }

        //link bijection and no empty runs
        for b in 0..self.btm.num_btms_m() {
            for s in 0..self.btm.num_children_m(b) {
                let idx_m = b * B + s;
                assert_eq!(self.btm.idx_s2m(self.btm.idx_m2s(idx_m)), idx_m);
                if idx_m != DUMMY_IDX {
                    assert!(self.btm.weight(idx_m) >= 1);
                }
            }
        }
        for b in 0..self.btm.num_btms_s() {
            for s in 0..self.btm.num_children_s(b) {
                let idx_s = b * B + s;
                assert_eq!(self.btm.idx_m2s(self.btm.idx_s2m(idx_s)), idx_s);
            }
        }

        //labels strictly increase along the mixed blocks in tree order
        let mut cursor = Child::BtmM(0);
        loop {
            let b = match cursor {
                Child::BtmM(b) => b,
                _ => unreachable!(),
            };
            match self
                .arena
                .next_btm(self.btm.parent_m(b), self.btm.idx_in_sib_m(b))
            {
                Some(next) => {
                    let nb = match next {
                        Child::BtmM(nb) => nb,
                        _ => unreachable!(),
                    };
                    assert!(self.btm.label_m(b) < self.btm.label_m(nb));
                    cursor = next;
                }
                None => break,
            }
        }

        //the three trees agree on the total weight
        assert_eq!(self.arena[self.root_m].sum(), self.arena[self.root_a].sum());
    }

    /// Asserts the merged-run invariant: no equal-character neighbours.
    pub(crate) fn check_no_adjacent_equal(&self) {
        let mut prev: Option<u64> = None;
        for (ch, _w) in self.run_iter() {
            if let Some(p) = prev {
                assert_ne!(p, ch, "adjacent runs share a character");
            }
            prev = Some(ch);
        }
    }
}
