
extern crate log;

use log::info;
use std::io::Write;

use crate::dyn_rle::DynRleAssoc;

/// Basic struct for containing a range in a BWT.
/// Only contains fields `l` and `h`, representing a range [l, h).
#[derive(Clone, Copy, Default, Debug, Eq, PartialEq)]
pub struct BwtRange {
    /// the lower bound, inclusive
    pub l: u64,
    /// the upper bound, exclusive
    pub h: u64,
}

/// Online RLBWT builder over a [DynRleAssoc] with unit run weights.
///
/// An implicit end marker sits at `em_pos`; it is never stored, only its
/// position is tracked, so the represented BWT is one character longer than
/// the stored sequence. [extend](Self::extend) appends a character at the end
/// marker the classic way; [spt_extend](Self::spt_extend) instead tracks the
/// interval of lexicographically tied suffixes and picks the insertion point
/// inside it that avoids splitting a run, keeping the run count small.
pub struct OnlineRlbwt {
    drle: DynRleAssoc,
    /// current position (0-based) of the implicit end marker
    em_pos: u64,
    /// end-marker code; must not occur in the input text
    em: u64,
    /// end markers inserted so far, the implicit one included
    num_em: u64,
    /// current interval [sap_s, sap_e] of tied suffixes
    sap_s: u64,
    sap_e: u64,
}

impl Default for OnlineRlbwt {
    fn default() -> Self {
        Self::with_end_marker(1)
    }
}

impl OnlineRlbwt {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_end_marker(em: u64) -> Self {
        OnlineRlbwt {
            drle: DynRleAssoc::new(),
            em_pos: 0,
            em,
            num_em: 1,
            sap_s: 0,
            sap_e: 0,
        }
    }

    #[inline]
    pub fn end_marker(&self) -> u64 {
        self.em
    }

    #[inline]
    pub fn end_marker_pos(&self) -> u64 {
        self.em_pos
    }

    /// Current length including the implicit end marker.
    #[inline]
    pub fn len_with_em(&self) -> u64 {
        self.drle.total_weight() + 1
    }

    /// Number of runs in the stored BWT.
    #[inline]
    pub fn num_runs(&self) -> usize {
        self.drle.num_runs()
    }

    #[inline]
    pub fn rle(&self) -> &DynRleAssoc {
        &self.drle
    }

    //////////////////////////////// construction

    /// Extends the RLBWT by one character at the end-marker position.
    pub fn extend(&mut self, ch: u64) {
        let (idx_m, rel) = self.drle.insert_run(self.em_pos, ch, 1);
        if ch == self.em {
            self.em_pos = 0;
        } else {
            self.em_pos = self.drle.rank_with_idx(ch, idx_m, rel, true);
        }
    }

    /// Extends the RLBWT by one character, placed inside the current tied
    /// interval so that an existing run is extended whenever the tie allows.
    pub fn spt_extend(&mut self, ch: u64) {
        if self.sap_s == self.sap_e {
            //no suffix ties with the target, only one legal position
            self.drle.insert_run(self.sap_s, ch, 1);
        } else {
            //is the appended character already present inside the interval?
            //sap_e may sit one past the last stored position, where the
            //inclusive rank saturates to the full count
            let s_n = if self.sap_s == 0 {
                0
            } else {
                self.drle.rank(ch, self.sap_s - 1, false)
            };
            let e_cap = std::cmp::min(self.sap_e, self.drle.total_weight() - 1);
            let e_n = self.drle.rank(ch, e_cap, false);
            if e_n - s_n > 0 {
                //yes: join the first of them
                let pos = self.drle.select(ch, s_n + 1).unwrap();
                self.drle.insert_run(pos, ch, 1);
            } else {
                self.insert_opt_run(ch);
            }
        }

        //the tied interval for the next insertion
        if ch == self.em {
            self.num_em += 1;
            self.sap_s = 0;
            self.sap_e = self.num_em - 1;
        } else if self.sap_s == self.sap_e {
            let tmp = self.drle.rank(ch, self.sap_s, true);
            self.sap_s = tmp;
            self.sap_e = tmp;
        } else {
            self.sap_s = if self.sap_s == 0 {
                self.drle.weight_smaller(ch) + 1
            } else {
                self.drle.rank(ch, self.sap_s - 1, true) + 1
            };
            let e_cap = std::cmp::min(self.sap_e, self.drle.total_weight() - 1);
            self.sap_e = self.drle.rank(ch, e_cap, true);
        }
    }

    /// Inserts `ch` into [sap_s, sap_e] without splitting a run when the
    /// choice is free: first try to grow a ch-run ending at sap_s - 1; then,
    /// if the run covering sap_s ends strictly before sap_e, slot a new run
    /// right after it; only otherwise insert at sap_s itself.
    fn insert_opt_run(&mut self, ch: u64) -> usize {
        if self.sap_s != 0 {
            let (idx_m, _) = self.drle.search_pos_m(self.sap_s - 1);
            if self.drle.char_from_idx_m(idx_m) == ch {
                self.drle.change_weight(idx_m, 1);
                return idx_m;
            }
        }
        let (idx_m, rel) = self.drle.search_pos_m(self.sap_s);
        let weight = self.drle.weight_from_idx_m(idx_m);
        if self.sap_s - rel + weight - 1 < self.sap_e {
            return self.drle.insert_run_after(idx_m, ch, 1);
        }
        self.drle.insert_run(self.sap_s, ch, 1).0
    }

    //////////////////////////////// queries

    /// BWT character at `pos`, the implicit end marker included.
    pub fn access(&self, pos: u64) -> u64 {
        assert!(pos < self.len_with_em());
        if pos == self.em_pos {
            return self.em;
        }
        let p = pos - (pos > self.em_pos) as u64;
        let (idx_m, _) = self.drle.search_pos_m(p);
        self.drle.char_from_idx_m(idx_m)
    }

    /// Rank of `ch` at `pos` plus the total occurrences of all smaller
    /// characters, adjusted for the implicit end marker.
    pub fn total_rank(&self, ch: u64, pos: u64) -> u64 {
        assert!(pos < self.len_with_em());
        let p = pos - (pos > self.em_pos) as u64;
        self.drle.rank(ch, p, true)
    }

    /// One LF-mapping step from position `i`.
    pub fn lf_map(&self, i: u64) -> u64 {
        assert!(i < self.len_with_em());
        let p = i - (i > self.em_pos) as u64;
        let (idx_m, rel) = self.drle.search_pos_m(p);
        let ch = self.drle.char_from_idx_m(idx_m);
        self.drle.rank_with_idx(ch, idx_m, rel, true)
    }

    /// Backward-search step: the BWT interval for ch·W from the interval for
    /// W. Intervals are [l, h), the upper bound excluded.
    pub fn lf_map_range(&self, range: BwtRange, ch: u64) -> BwtRange {
        assert!(range.l <= self.len_with_em() && range.h <= self.len_with_em());
        if self.drle.weight_of(ch) == 0 || range.l >= range.h {
            return BwtRange { l: 0, h: 0 };
        }
        let l = range.l - (range.l > self.em_pos) as u64;
        let r = range.h - (range.h > self.em_pos) as u64;
        if l >= self.drle.total_weight() || r == 0 {
            //the interval covers nothing but the implicit end-marker row
            return BwtRange { l: 0, h: 0 };
        }
        let (idx_m, rel) = self.drle.search_pos_m(l);
        let on_ch = (self.drle.char_from_idx_m(idx_m) == ch) as u64;
        //+1 because the implicit end marker occupies a row that the stored
        //sequence does not know about
        BwtRange {
            l: self.drle.rank_with_idx(ch, idx_m, rel, true) - on_ch + 1,
            h: self.drle.rank(ch, r - 1, true) + 1,
        }
    }

    /// Reconstructs the appended text, end markers included, by iterated LF
    /// steps from position 0. Only meaningful for extend-built transforms,
    /// which keep `em_pos` current.
    pub fn invert(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len_with_em() as usize - 1);
        let mut pos: u64 = 0;
        for _ in 0..self.len_with_em() - 1 {
            let p = pos - (pos > self.em_pos) as u64;
            let (idx_m, rel) = self.drle.search_pos_m(p);
            let ch = self.drle.char_from_idx_m(idx_m);
            out.push(ch as u8);
            pos = self.drle.rank_with_idx(ch, idx_m, rel, true);
        }
        out
    }

    //////////////////////////////// output

    /// The stored BWT expanded to raw bytes; for tests and small transforms.
    pub fn to_bwt_bytes(&self) -> Vec<u8> {
        self.drle.run_iter().flat_map(|(ch, w)| std::iter::repeat(ch as u8).take(w as usize)).collect()
    }

    /// Writes the expanded BWT, rendering the byte 0 as '$' so the end-of-text
    /// sentinel stays visible in textual output.
    pub fn write_bwt(&self, writer: &mut impl Write) -> std::io::Result<()> {
        for (ch, w) in self.drle.run_iter() {
            let byte = if ch == 0 { b'$' } else { ch as u8 };
            let run = vec![byte; w as usize];
            writer.write_all(&run)?;
        }
        Ok(())
    }

    /// Logs summary statistics of the current transform.
    pub fn log_statistics(&self) {
        info!("BWT length (with end marker): {}", self.len_with_em());
        info!("runs: {}", self.drle.num_runs());
        info!("distinct characters: {}", self.drle.num_char_trees() - 1);
        info!("end marker {} at position {}", self.em, self.em_pos);
    }
}
