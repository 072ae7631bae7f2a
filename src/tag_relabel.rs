
/// Largest assignable label; the top bit of the 64-bit label space is reserved.
pub const MAX_LABEL: u64 = (1u64 << 63) - 1;

/// Ordered-list view used by the relabeling algorithm. Elements are addressed
/// by their block index; only relative label order is ever observable.
pub trait OrderedLabels {
    fn prev(&self, elem: usize) -> Option<usize>;
    fn next(&self, elem: usize) -> Option<usize>;
    fn label(&self, elem: usize) -> u64;
    fn set_label(&mut self, elem: usize, label: u64);
}

/// Density thresholds for the window-doubling relabel, indexed by traCode - 9.
/// Each entry approximates the element capacity of the 63-bit label space at
/// growth factor traCode/8; only amortised cost depends on these values.
const TRA_CAPACITIES: [u64; 7] = [
    1_600,
    1_250_000,
    500_000_000,
    120_000_000_000,
    19_000_000_000_000,
    2_000_000_000_000_000,
    150_000_000_000_000_000,
];

/// Assigns monotone 64-bit labels to an ordered list of blocks.
/// New labels take the midpoint of the neighbouring gap; when the gap is
/// exhausted, the surrounding window is doubled level by level until its
/// density drops below the traCode-derived threshold, then relabeled uniformly.
#[derive(Clone, Debug)]
pub struct TagRelabeler {
    /// density growth code in [9, 16); threshold at level l+1 is (code/8) * threshold at l
    tra_code: u8,
}

impl TagRelabeler {
    /// Picks the smallest traCode whose capacity covers `reserved` blocks.
    pub fn new(reserved: usize) -> Self {
        TagRelabeler {
            tra_code: Self::smallest_tra_code(reserved),
        }
    }

    fn smallest_tra_code(reserved: usize) -> u8 {
        for (i, &cap) in TRA_CAPACITIES.iter().enumerate() {
            if reserved as u64 <= cap {
                return 9 + i as u8;
            }
        }
        15
    }

    #[inline]
    pub fn tra_code(&self) -> u8 {
        self.tra_code
    }

    /// Re-derives the code after the reserved block count changes.
    /// The code only ever grows; already-assigned labels stay valid.
    pub fn reserve(&mut self, reserved: usize) {
        let code = Self::smallest_tra_code(reserved);
        if code > self.tra_code {
            self.tra_code = code;
        }
    }

    #[inline]
    fn next_overflow_num(&self, overflow_num: u64) -> u64 {
        std::cmp::max(overflow_num + 1, (overflow_num * self.tra_code as u64) >> 3)
    }

    /// Labels `elem`, which must already sit in list order between a labeled
    /// predecessor (always present, the far-left dummy block) and an optional
    /// labeled successor. Relabels a surrounding window on overflow.
    pub fn assign<L: OrderedLabels>(&self, list: &mut L, elem: usize) {
        let prev = list.prev(elem).expect("new blocks are always inserted after the dummy");
        let prev_label = list.label(prev);
        let next = list.next(elem);
        let next_label = match next {
            Some(n) => list.label(n),
            None => MAX_LABEL,
        };
        if next_label - prev_label > 1 {
            list.set_label(elem, prev_label + (next_label - prev_label) / 2);
            return;
        }

        //the gap is exhausted; double the window around prev until it is sparse enough
        let mut level: u32 = 1;
        let mut base = prev_label >> 1;
        let mut num: u64 = 1; //elem itself, still unlabeled
        let mut first = elem;
        let mut left = Some(prev);
        let mut right = next;
        let mut overflow_num: u64 = 2;
        loop {
            while let Some(p) = left {
                if list.label(p) >> level != base {
                    break;
                }
                num += 1;
                first = p;
                left = list.prev(p);
            }
            while let Some(n) = right {
                if list.label(n) >> level != base {
                    break;
                }
                num += 1;
                right = list.next(n);
            }
            //at level 63 the window spans the whole label space and must be taken
            if num <= overflow_num || level == 63 {
                break;
            }
            level += 1;
            base >>= 1;
            overflow_num = self.next_overflow_num(overflow_num);
        }

        //uniform redistribution of the window across [base << level, (base+1) << level)
        let step = (1u64 << level) / num;
        debug_assert!(step >= 1);
        let mut label = base << level;
        let mut cursor = first;
        for i in 0..num {
            list.set_label(cursor, label);
            label += step;
            if i + 1 < num {
                cursor = list.next(cursor).expect("window walk stays inside the list");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Plain Vec-backed list: element ids are stable, order is id order.
    struct VecList {
        labels: Vec<u64>,
    }

    impl OrderedLabels for VecList {
        fn prev(&self, elem: usize) -> Option<usize> {
            if elem == 0 {
                None
            } else {
                Some(elem - 1)
            }
        }
        fn next(&self, elem: usize) -> Option<usize> {
            if elem + 1 < self.labels.len() {
                Some(elem + 1)
            } else {
                None
            }
        }
        fn label(&self, elem: usize) -> u64 {
            self.labels[elem]
        }
        fn set_label(&mut self, elem: usize, label: u64) {
            self.labels[elem] = label;
        }
    }

    fn assert_strictly_increasing(list: &VecList) {
        for w in list.labels.windows(2) {
            assert!(w[0] < w[1], "labels out of order: {:?}", list.labels);
        }
    }

    #[test]
    fn test_smallest_code() {
        assert_eq!(TagRelabeler::new(1).tra_code(), 9);
        assert_eq!(TagRelabeler::new(1_600).tra_code(), 9);
        assert_eq!(TagRelabeler::new(1_601).tra_code(), 10);
        assert_eq!(TagRelabeler::new(2_000_000).tra_code(), 11);
        assert_eq!(TagRelabeler::new(usize::MAX).tra_code(), 15);
    }

    #[test]
    fn test_reserve_only_grows() {
        let mut r = TagRelabeler::new(2_000_000);
        assert_eq!(r.tra_code(), 11);
        r.reserve(10);
        assert_eq!(r.tra_code(), 11);
        r.reserve(1_000_000_000_000);
        assert_eq!(r.tra_code(), 13);
    }

    #[test]
    fn test_midpoint_assignment() {
        let relabeler = TagRelabeler::new(64);
        let mut list = VecList { labels: vec![0, 0] };
        //append after the dummy: midpoint of [0, MAX_LABEL]
        relabeler.assign(&mut list, 1);
        assert_eq!(list.labels[1], MAX_LABEL / 2);
    }

    #[test]
    fn test_append_chain() {
        //repeated appends halve the remaining gap and never collide
        let relabeler = TagRelabeler::new(64);
        let mut list = VecList { labels: vec![0] };
        for _ in 0..60 {
            list.labels.push(0);
            let elem = list.labels.len() - 1;
            relabeler.assign(&mut list, elem);
            assert_strictly_increasing(&list);
        }
    }

    #[test]
    fn test_dense_head_insertion_relabels() {
        //always inserting right after the dummy exhausts the low gap quickly,
        //forcing window relabels; order must survive every one of them
        let relabeler = TagRelabeler::new(1024);
        let mut list = VecList { labels: vec![0] };
        for _ in 0..512 {
            list.labels.insert(1, 0);
            relabeler.assign(&mut list, 1);
            assert_strictly_increasing(&list);
        }
    }

    #[test]
    fn test_mixed_insertion_positions() {
        let relabeler = TagRelabeler::new(4096);
        let mut list = VecList { labels: vec![0] };
        //deterministic but scattered insertion points
        let mut state: usize = 0x9E37;
        for i in 0..2000 {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let at = 1 + state % (i + 1);
            list.labels.insert(at, 0);
            relabeler.assign(&mut list, at);
            assert_strictly_increasing(&list);
        }
    }
}
